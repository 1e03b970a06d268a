//! Metadata attached to outbound chat messages.
//!
//! The agent reads filters and the focused listing from several key spellings,
//! so every snapshot is written under each of them.

use serde_json::{json, Map, Value};

use crate::catalog::resolve_from_text;
use crate::directives::{self, Directives};
use crate::filters::FilterRecord;
use crate::models::Listing;
use crate::reconcile::ViewState;
use crate::sort::SortOrder;

const SNAPSHOT_KEYS: [&str; 3] = ["filters", "activeFilters", "uiFilters"];

/// Build the metadata for a message the user is about to send
pub fn build(state: &ViewState, text: &str) -> Map<String, Value> {
    let mut metadata = Map::new();

    if let Some(listing) = referenced_listing(state, text) {
        insert_listing(&mut metadata, listing);
    }

    let snapshot = filter_snapshot(&state.filters, state.sort);
    for key in SNAPSHOT_KEYS {
        metadata.insert(key.to_string(), snapshot.clone());
    }

    let overrides = filter_overrides(&directives::parse(text));
    if !overrides.is_empty() {
        metadata.insert("filterOverrides".to_string(), Value::Object(overrides));
    }

    metadata
}

/// Listing named in `text`, falling back to the one already in focus
fn referenced_listing<'a>(state: &'a ViewState, text: &str) -> Option<&'a Listing> {
    let focused = |listing: &Listing| state.listing_context.as_deref() == Some(listing.zpid.as_str());
    let visible = state.visible();
    resolve_from_text(text, visible.iter().copied(), None)
        .or_else(|| resolve_from_text(text, state.catalog.listings(), Some(&focused)))
        .or_else(|| state.focused())
}

fn insert_listing(metadata: &mut Map<String, Value>, listing: &Listing) {
    metadata.insert("zpid".to_string(), json!(listing.zpid));
    metadata.insert("listing_zpid".to_string(), json!(listing.zpid));
    if let Some(url) = &listing.detail_url {
        metadata.insert("detailUrl".to_string(), json!(url));
        metadata.insert("listing_detail_url".to_string(), json!(url));
    }
    if let Some(address) = listing.address_line() {
        metadata.insert("listingAddress".to_string(), json!(address));
        metadata.insert("listing_address".to_string(), json!(address));
    }
    if let Some(price) = listing.price.clone().or_else(|| listing.price_value().map(|p| p.to_string())) {
        metadata.insert("listing_price".to_string(), json!(price));
    }
}

/// Sanitized filters plus sort order, with legacy key aliases
pub fn filter_snapshot(filters: &FilterRecord, sort: SortOrder) -> Value {
    let mut snapshot = match serde_json::to_value(filters) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };

    let aliases = [
        ("location", json!(filters.query)),
        ("minPrice", json!(filters.price_min)),
        ("maxPrice", json!(filters.price_max)),
        ("minBeds", json!(filters.beds_min)),
        ("maxBeds", json!(filters.beds_max)),
        ("minBaths", json!(filters.baths_min)),
        ("maxBaths", json!(filters.baths_max)),
        ("maxSqft", json!(filters.sqft_max)),
        ("sortOrder", json!(sort.key())),
    ];
    for (key, value) in aliases {
        snapshot.insert(key.to_string(), value);
    }
    Value::Object(snapshot)
}

/// Only the fields the message asks to change
pub fn filter_overrides(directives: &Directives) -> Map<String, Value> {
    let mut overrides = match serde_json::to_value(&directives.delta) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    let aliases: Vec<(&str, Value)> = [
        ("minPrice", overrides.get("priceMin").cloned()),
        ("maxPrice", overrides.get("priceMax").cloned()),
        ("minBeds", overrides.get("bedsMin").cloned()),
        ("maxBeds", overrides.get("bedsMax").cloned()),
        ("minBaths", overrides.get("bathsMin").cloned()),
        ("maxBaths", overrides.get("bathsMax").cloned()),
        ("maxSqft", overrides.get("sqftMax").cloned()),
    ]
    .into_iter()
    .filter_map(|(key, value)| Some((key, value?)))
    .collect();
    for (key, value) in aliases {
        overrides.insert(key.to_string(), value);
    }
    if let Some(sort) = directives.sort {
        overrides.insert("sortOrder".to_string(), json!(sort.key()));
    }
    overrides
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::filters::sanitize;
    use crate::reconcile::{open_listing, set_filters};
    use pretty_assertions::assert_eq;

    fn state() -> ViewState {
        let listings: Vec<Listing> = serde_json::from_value(json!([
            {"zpid": "49023318", "displayAddress": "742 Evergreen Terrace, Springfield, IL", "price": "$214,900",
             "detailUrl": "https://www.zillow.com/homedetails/742-Evergreen-Terrace-Springfield-IL-62704/49023318_zpid/"},
            {"zpid": "13249875", "displayAddress": "18 Maple St, Boulder, CO", "priceRaw": 1150000}
        ]))
        .unwrap();
        ViewState::new(Catalog::from_listings(listings))
    }

    #[test]
    fn snapshots_carry_camel_case_and_legacy_names() {
        let state = set_filters(&state(), &sanitize(&json!({"query": "Boulder", "priceMax": 1200000})));
        let metadata = build(&state, "hello");

        for key in SNAPSHOT_KEYS {
            let snapshot = &metadata[key];
            assert_eq!(snapshot["query"], json!("Boulder"));
            assert_eq!(snapshot["location"], json!("Boulder"));
            assert_eq!(snapshot["priceMax"], json!(1200000));
            assert_eq!(snapshot["maxPrice"], json!(1200000));
            assert_eq!(snapshot["sortOrder"], json!("homesForYou"));
        }
        assert!(!metadata.contains_key("filterOverrides"));
        assert!(!metadata.contains_key("zpid"));
    }

    #[test]
    fn mentioned_listing_is_attached() {
        let metadata = build(&state(), "is 742 Evergreen Terrace still available?");
        assert_eq!(metadata["zpid"], json!("49023318"));
        assert_eq!(metadata["listing_zpid"], json!("49023318"));
        assert_eq!(metadata["listing_price"], json!("$214,900"));
        assert_eq!(metadata["listingAddress"], json!("742 Evergreen Terrace, Springfield, IL"));
        assert!(metadata["listing_detail_url"].as_str().is_some_and(|u| u.contains("49023318_zpid")));
    }

    #[test]
    fn focused_listing_is_the_fallback() {
        let state = open_listing(&state(), "13249875");
        let metadata = build(&state, "how are the schools nearby?");
        assert_eq!(metadata["zpid"], json!("13249875"));
        assert_eq!(metadata["listing_price"], json!("1150000"));
    }

    #[test]
    fn overrides_name_only_requested_fields() {
        let metadata = build(&state(), "under $400k with 3+ beds, newest first");
        assert_eq!(
            metadata["filterOverrides"],
            json!({"priceMax": 400000, "bedsMin": 3, "maxPrice": 400000, "minBeds": 3, "sortOrder": "newest"})
        );
    }

    #[test]
    fn overrides_use_the_same_legacy_names_as_snapshots() {
        let metadata = build(&state(), "between 1 and 2 baths, no more than 4 bedrooms");
        let overrides = &metadata["filterOverrides"];
        let snapshot = &metadata["filters"];
        for (key, legacy) in [("bathsMin", "minBaths"), ("bathsMax", "maxBaths"), ("bedsMax", "maxBeds")] {
            assert_eq!(overrides[legacy], overrides[key]);
            assert!(snapshot.get(legacy).is_some());
        }
        assert_eq!(overrides["minBaths"], json!(1));
        assert_eq!(overrides["maxBeds"], json!(4));
    }
}
