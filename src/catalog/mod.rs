pub mod location;
pub mod resolve;
pub mod seed;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::filters::{FilterRecord, SaleType};
use crate::models::Listing;
use crate::sort::SortOrder;

pub use resolve::{resolve_from_text, slugify};
pub use seed::load_seed;

/// Append/merge-only set of listings, kept in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    listings: Vec<Listing>,
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_listings(listings: impl IntoIterator<Item = Listing>) -> Self {
        let mut catalog = Self::new();
        for listing in listings {
            catalog.upsert(listing);
        }
        catalog
    }

    /// Insert a new listing or shallow-merge into the existing record.
    ///
    /// Returns `false` when the listing has no identity and was dropped.
    pub fn upsert(&mut self, listing: Listing) -> bool {
        let zpid = listing.zpid.trim().to_string();
        if zpid.is_empty() {
            warn!("Dropping listing without zpid: {:?}", listing.address_line());
            return false;
        }

        match self.index.get(&zpid) {
            Some(&position) => {
                debug!("Merging update into listing {}", zpid);
                self.listings[position].merge_from(&listing);
            }
            None => {
                let mut listing = listing;
                listing.zpid = zpid.clone();
                self.index.insert(zpid, self.listings.len());
                self.listings.push(listing);
            }
        }
        true
    }

    pub fn get(&self, zpid: &str) -> Option<&Listing> {
        self.index.get(zpid.trim()).map(|&i| &self.listings[i])
    }

    pub fn contains(&self, zpid: &str) -> bool {
        self.index.contains_key(zpid.trim())
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

/// Listings passing `filters`, in input order
pub fn evaluate<'a>(listings: &'a [Listing], filters: &FilterRecord) -> Vec<&'a Listing> {
    let groups = location::location_groups(&filters.query);
    listings
        .iter()
        .filter(|listing| matches(listing, filters, &groups))
        .collect()
}

fn matches(listing: &Listing, filters: &FilterRecord, groups: &[Vec<String>]) -> bool {
    if !groups.is_empty() && !location::matches_groups(&listing.location_haystack(), groups) {
        return false;
    }

    // The demo dataset only carries homes for sale.
    if filters.sale_type != SaleType::ForSale {
        return false;
    }

    if let Some(price) = listing.price_value() {
        if filters.price_min.is_some_and(|min| price < min as f64) {
            return false;
        }
        if filters.price_max.is_some_and(|max| price > max as f64) {
            return false;
        }
    }

    let beds_ok = if filters.exact_beds {
        listing.beds.is_some_and(|beds| beds == filters.beds_min as f64)
    } else {
        within(listing.beds, filters.beds_min, filters.beds_max)
    };
    if !beds_ok {
        return false;
    }

    if !within(listing.baths, filters.baths_min, filters.baths_max) {
        return false;
    }

    if let Some(max) = filters.sqft_max {
        if !listing.living_area.is_some_and(|area| area.is_finite() && area <= max as f64) {
            return false;
        }
    }

    if filters.all_home_types() {
        return true;
    }
    listing
        .normalized_home_type()
        .is_some_and(|home_type| filters.home_types.contains(&home_type))
}

fn within(value: Option<f64>, min: u32, max: Option<u32>) -> bool {
    if min == 0 && max.is_none() {
        return true;
    }
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return false;
    };
    value >= min as f64 && max.map_or(true, |max| value <= max as f64)
}

/// Stable sort; listings missing the sort field always come last
pub fn sort_by<'a>(mut listings: Vec<&'a Listing>, order: SortOrder) -> Vec<&'a Listing> {
    let key: fn(&Listing) -> Option<f64> = match order {
        SortOrder::HomesForYou => return listings,
        SortOrder::PriceLowHigh | SortOrder::PriceHighLow => Listing::price_value,
        SortOrder::Newest => |l| l.zpid.trim().parse::<f64>().ok(),
        SortOrder::BedsHighLow => |l| l.beds,
        SortOrder::BathsHighLow => |l| l.baths,
        SortOrder::SqftHighLow => |l| l.living_area,
    };
    let ascending = order == SortOrder::PriceLowHigh;
    let sentinel = if ascending { f64::INFINITY } else { f64::NEG_INFINITY };
    let value = |l: &Listing| key(l).filter(|v| v.is_finite()).unwrap_or(sentinel);

    listings.sort_by(|a, b| {
        let ordering = value(a).partial_cmp(&value(b)).unwrap_or(Ordering::Equal);
        if ascending {
            ordering
        } else {
            ordering.reverse()
        }
    });
    listings
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapCenter {
    pub latitude: f64,
    pub longitude: f64,
}

/// Bounding box and centroid of listings that carry coordinates
pub fn map_meta<'a>(listings: impl IntoIterator<Item = &'a Listing>) -> Option<(MapBounds, MapCenter)> {
    let coords: Vec<(f64, f64)> = listings
        .into_iter()
        .filter_map(|l| Some((l.latitude?, l.longitude?)))
        .filter(|(lat, lng)| lat.is_finite() && lng.is_finite())
        .collect();
    if coords.is_empty() {
        return None;
    }

    let count = coords.len() as f64;
    let bounds = MapBounds {
        north: coords.iter().map(|c| c.0).fold(f64::MIN, f64::max),
        south: coords.iter().map(|c| c.0).fold(f64::MAX, f64::min),
        east: coords.iter().map(|c| c.1).fold(f64::MIN, f64::max),
        west: coords.iter().map(|c| c.1).fold(f64::MAX, f64::min),
    };
    let center = MapCenter {
        latitude: coords.iter().map(|c| c.0).sum::<f64>() / count,
        longitude: coords.iter().map(|c| c.1).sum::<f64>() / count,
    };
    Some((bounds, center))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::sanitize;
    use crate::models::HomeType;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn listing(value: serde_json::Value) -> Listing {
        serde_json::from_value(value).unwrap()
    }

    fn pair() -> Vec<Listing> {
        vec![
            listing(json!({"zpid": "1", "priceRaw": 300000, "beds": 3, "baths": 2, "livingArea": 1500, "homeType": "SingleFamilyResidence"})),
            listing(json!({"zpid": "2", "priceRaw": 600000, "beds": 4, "baths": 3, "livingArea": 2600, "homeType": "Condominium"})),
        ]
    }

    fn ids(listings: &[&Listing]) -> Vec<String> {
        listings.iter().map(|l| l.zpid.clone()).collect()
    }

    #[test]
    fn price_max_filters_out_expensive_listing() {
        let listings = pair();
        let filters = sanitize(&json!({"priceMax": 400000}));
        assert_eq!(ids(&evaluate(&listings, &filters)), vec!["1"]);
    }

    #[test]
    fn unknown_price_passes_price_filter() {
        let listings = vec![listing(json!({"zpid": "7", "beds": 2}))];
        let filters = sanitize(&json!({"priceMin": 100000, "priceMax": 200000}));
        assert_eq!(evaluate(&listings, &filters).len(), 1);
    }

    #[test]
    fn exact_beds_and_bounds() {
        let listings = pair();
        let exact = sanitize(&json!({"bedsMin": 4, "bedsMax": 4, "exactBeds": true}));
        assert_eq!(ids(&evaluate(&listings, &exact)), vec!["2"]);

        let ranged = sanitize(&json!({"bedsMin": 3, "bedsMax": 3, "bathsMin": 2}));
        assert_eq!(ids(&evaluate(&listings, &ranged)), vec!["1"]);

        let missing = vec![listing(json!({"zpid": "9"}))];
        assert!(evaluate(&missing, &sanitize(&json!({"bedsMin": 1}))).is_empty());
        assert_eq!(evaluate(&missing, &FilterRecord::default()).len(), 1);
    }

    #[test]
    fn home_types_and_sale_type() {
        let listings = pair();
        let mut filters = FilterRecord::default();
        filters.home_types = [HomeType::Condominium].into_iter().collect();
        assert_eq!(ids(&evaluate(&listings, &filters)), vec!["2"]);

        filters.home_types.clear();
        assert!(evaluate(&listings, &filters).is_empty());

        let rent = sanitize(&json!({"saleType": "forRent"}));
        assert!(evaluate(&listings, &rent).is_empty());
    }

    #[test]
    fn query_matches_state_names_and_abbreviations() {
        let listings = vec![
            listing(json!({"zpid": "1", "displayAddress": "1 Oak St", "address": {"city": "Austin", "state": "TX"}})),
            listing(json!({"zpid": "2", "displayAddress": "2 Pine Rd", "address": {"city": "Denver", "state": "CO"}})),
        ];
        assert_eq!(ids(&evaluate(&listings, &sanitize(&json!({"query": "Texas"})))), vec!["1"]);
        assert_eq!(ids(&evaluate(&listings, &sanitize(&json!({"query": "denver colorado"})))), vec!["2"]);
    }

    #[test]
    fn sort_puts_missing_values_last() {
        let listings = vec![
            listing(json!({"zpid": "10", "priceRaw": 500000, "beds": 2})),
            listing(json!({"zpid": "abc", "beds": 5})),
            listing(json!({"zpid": "30", "priceRaw": 200000})),
        ];
        let all: Vec<&Listing> = listings.iter().collect();

        assert_eq!(ids(&sort_by(all.clone(), SortOrder::PriceLowHigh)), vec!["30", "10", "abc"]);
        assert_eq!(ids(&sort_by(all.clone(), SortOrder::PriceHighLow)), vec!["10", "30", "abc"]);
        assert_eq!(ids(&sort_by(all.clone(), SortOrder::BedsHighLow)), vec!["abc", "10", "30"]);
        assert_eq!(ids(&sort_by(all.clone(), SortOrder::Newest)), vec!["30", "10", "abc"]);
        assert_eq!(ids(&sort_by(all, SortOrder::HomesForYou)), vec!["10", "abc", "30"]);
    }

    #[test]
    fn catalog_merges_and_drops_anonymous_records() {
        let mut catalog = Catalog::from_listings(pair());
        let mut update = Listing::new("1");
        update.price = Some("$310,000".to_string());

        assert!(catalog.upsert(update));
        assert!(!catalog.upsert(Listing::new("  ")));

        let merged = catalog.get("1").unwrap();
        assert_eq!(merged.price.as_deref(), Some("$310,000"));
        assert_eq!(merged.beds, Some(3.0));
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn map_meta_spans_coordinates() {
        let listings = vec![
            listing(json!({"zpid": "1", "latitude": 30.0, "longitude": -97.0})),
            listing(json!({"zpid": "2", "latitude": 32.0, "longitude": -95.0})),
            listing(json!({"zpid": "3"})),
        ];
        let (bounds, center) = map_meta(&listings).unwrap();
        assert_eq!((bounds.north, bounds.south, bounds.east, bounds.west), (32.0, 30.0, -95.0, -97.0));
        assert_eq!((center.latitude, center.longitude), (31.0, -96.0));
        assert!(map_meta(listings[2..].iter()).is_none());
    }
}
