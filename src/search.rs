//! Local property search over the catalog, answering in the tool output shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::catalog::{self, Catalog, MapBounds, MapCenter};
use crate::filters::{self, FilterRecord};
use crate::models::Listing;
use crate::reconcile::ALL_LISTINGS_LABEL;
use crate::sort::{self, SortOrder};

/// Search arguments, as the agent passes them to the tool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beds_min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beds_max: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baths_min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baths_max: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqft_max: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl SearchRequest {
    /// Request mirroring the filters the user currently sees
    pub fn from_filters(filters: &FilterRecord, sort: SortOrder, limit: Option<usize>) -> Self {
        Self {
            location: (!filters.query.is_empty()).then(|| filters.query.clone()),
            min_price: filters.price_min,
            max_price: filters.price_max,
            beds_min: (filters.beds_min > 0).then_some(filters.beds_min),
            beds_max: filters.beds_max,
            baths_min: (filters.baths_min > 0).then_some(filters.baths_min),
            baths_max: filters.baths_max,
            sqft_max: filters.sqft_max,
            home_types: (!filters.all_home_types())
                .then(|| filters.home_types.iter().map(|t| t.id().to_string()).collect()),
            sort_order: (sort != SortOrder::HomesForYou).then(|| sort.key().to_string()),
            limit,
        }
    }
}

/// Echo of the arguments the search actually ran with
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedFilters {
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
    pub beds_min: Option<u32>,
    pub beds_max: Option<u32>,
    pub baths_min: Option<u32>,
    pub baths_max: Option<u32>,
    pub sqft_max: Option<u32>,
    pub sort_order: Option<SortOrder>,
    pub home_types: Option<Vec<String>>,
}

/// One result row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingSummary {
    pub zpid: String,
    pub address: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub price: Option<u64>,
    pub price_display: Option<String>,
    pub beds: Option<f64>,
    pub baths: Option<f64>,
    pub area: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status_text: Option<String>,
    pub home_type: Option<String>,
    pub detail_url: Option<String>,
    pub image: Option<String>,
}

impl From<&Listing> for ListingSummary {
    fn from(listing: &Listing) -> Self {
        Self {
            zpid: listing.zpid.clone(),
            address: listing.address_line().unwrap_or_else(|| "Unknown address".to_string()),
            city: listing.city_name().map(str::to_string),
            state: listing.state_code().map(str::to_string),
            zip: listing.zip_code().map(str::to_string),
            price: listing.price_value().map(|p| p.round() as u64),
            price_display: listing.price.clone(),
            beds: listing.beds,
            baths: listing.baths,
            area: listing.living_area,
            latitude: listing.latitude,
            longitude: listing.longitude,
            status_text: listing.status_text.clone().or_else(|| listing.home_type.clone()),
            home_type: listing.home_type.clone(),
            detail_url: listing.detail_url.clone(),
            image: listing.image.clone().or_else(|| listing.images.first().cloned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub location: String,
    pub applied_filters: AppliedFilters,
    pub total_available: usize,
    pub returned_count: usize,
    pub map_bounds: Option<MapBounds>,
    pub map_center: Option<MapCenter>,
    pub listings: Vec<ListingSummary>,
}

impl SearchResult {
    /// Serialize into the payload shape the reconciliation engine consumes
    pub fn to_payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Filter, sort and truncate the catalog
pub fn run(catalog: &Catalog, request: &SearchRequest) -> SearchResult {
    let raw = serde_json::to_value(request).unwrap_or(Value::Null);
    let record = filters::sanitize(&raw);
    let order = request.sort_order.as_deref().and_then(sort::normalize);

    let filtered = catalog::evaluate(catalog.listings(), &record);
    let total_available = filtered.len();
    let mut sorted = catalog::sort_by(filtered, order.unwrap_or_default());
    if let Some(limit) = request.limit.filter(|l| *l > 0) {
        sorted.truncate(limit);
    }

    let listings: Vec<ListingSummary> = sorted.iter().map(|l| ListingSummary::from(*l)).collect();
    let meta = catalog::map_meta(sorted.iter().copied());
    let location = request
        .location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(ALL_LISTINGS_LABEL)
        .to_string();

    info!(
        "Property search location={} matched {} of {} listings",
        location,
        total_available,
        catalog.len()
    );

    SearchResult {
        location,
        applied_filters: AppliedFilters {
            min_price: record.price_min,
            max_price: record.price_max,
            beds_min: request.beds_min,
            beds_max: request.beds_max,
            baths_min: request.baths_min,
            baths_max: request.baths_max,
            sqft_max: request.sqft_max,
            sort_order: order,
            home_types: (!record.all_home_types())
                .then(|| record.home_types.iter().map(|t| t.id().to_string()).collect()),
        },
        total_available,
        returned_count: listings.len(),
        map_bounds: meta.map(|(bounds, _)| bounds),
        map_center: meta.map(|(_, center)| center),
        listings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn catalog() -> Catalog {
        let listings: Vec<Listing> = serde_json::from_value(json!([
            {"zpid": "1001", "displayAddress": "123 Main St", "address": {"city": "Austin", "state": "TX", "zipcode": "78701"},
             "priceRaw": 350000, "beds": 3, "baths": 2, "livingArea": 1800, "homeType": "SingleFamily", "latitude": 30.0, "longitude": -97.0},
            {"zpid": "1002", "displayAddress": "456 Oak Ave", "address": {"city": "Dallas", "state": "TX", "zipcode": "75201"},
             "priceRaw": 500000, "beds": 4, "baths": 3, "livingArea": 2500, "homeType": "SingleFamily", "latitude": 32.0, "longitude": -96.0},
            {"zpid": "1003", "displayAddress": "789 Pine Rd", "address": {"city": "Houston", "state": "TX", "zipcode": "77001"},
             "priceRaw": 275000, "beds": 2, "baths": 1, "livingArea": 1200, "homeType": "Townhouse"}
        ]))
        .unwrap();
        Catalog::from_listings(listings)
    }

    fn zpids(result: &SearchResult) -> Vec<&str> {
        result.listings.iter().map(|l| l.zpid.as_str()).collect()
    }

    #[test]
    fn no_arguments_returns_everything() {
        let result = run(&catalog(), &SearchRequest::default());
        assert_eq!(result.location, ALL_LISTINGS_LABEL);
        assert_eq!(result.total_available, 3);
        assert_eq!(zpids(&result), vec!["1001", "1002", "1003"]);
    }

    #[test]
    fn swaps_conflicting_price_bounds() {
        let request = SearchRequest {
            min_price: Some(400_000),
            max_price: Some(300_000),
            ..SearchRequest::default()
        };
        let result = run(&catalog(), &request);
        assert_eq!(result.applied_filters.min_price, Some(300_000));
        assert_eq!(result.applied_filters.max_price, Some(400_000));
        assert_eq!(zpids(&result), vec!["1001"]);
    }

    #[test]
    fn sorts_and_limits() {
        let request = SearchRequest {
            location: Some("Texas".to_string()),
            sort_order: Some("Price: High to Low".to_string()),
            limit: Some(2),
            ..SearchRequest::default()
        };
        let result = run(&catalog(), &request);
        assert_eq!(zpids(&result), vec!["1002", "1001"]);
        assert_eq!(result.total_available, 3);
        assert_eq!(result.returned_count, 2);
        assert_eq!(result.applied_filters.sort_order, Some(SortOrder::PriceHighLow));
        assert_eq!(result.map_center.map(|c| c.latitude), Some(31.0));
    }

    #[test]
    fn home_type_aliases_filter_results() {
        let request = SearchRequest {
            home_types: Some(vec!["townhome".to_string()]),
            ..SearchRequest::default()
        };
        assert_eq!(zpids(&run(&catalog(), &request)), vec!["1003"]);
    }

    #[test]
    fn payload_uses_tool_field_names() {
        let payload = run(&catalog(), &SearchRequest::default()).to_payload();
        assert_eq!(payload["listings"][0]["area"], json!(1800.0));
        assert_eq!(payload["listings"][0]["price"], json!(350000));
        assert_eq!(payload["appliedFilters"]["sortOrder"], Value::Null);
        assert!(payload["mapBounds"].is_object());
    }

    #[test]
    fn request_from_default_filters_is_empty() {
        let request = SearchRequest::from_filters(&FilterRecord::default(), SortOrder::HomesForYou, None);
        assert_eq!(request, SearchRequest::default());
    }
}
