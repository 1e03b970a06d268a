//! Reconciliation of chat text and tool results into the listing view-state.
//!
//! [`apply`] is a pure function of `(input, state)`: the caller owns the state
//! and decides when the returned value becomes the new source of truth.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::catalog::{self, resolve_from_text, Catalog, MapBounds, MapCenter};
use crate::directives;
use crate::filters::{self, dollars, FilterDelta, FilterRecord};
use crate::models::Listing;
use crate::payload::{self, coerce_number, coerce_string, find_first, keys};
use crate::sort::{self, SortOrder};

/// Location label the search tool emits when no location was given
pub const ALL_LISTINGS_LABEL: &str = "All sample listings";

/// Display-only summary, recomputed on every reconciliation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSummary {
    pub total_available: usize,
    pub returned_count: usize,
    pub location: Option<String>,
    pub applied_filters: FilterRecord,
    pub sort_order: SortOrder,
    pub map_bounds: Option<MapBounds>,
    pub map_center: Option<MapCenter>,
}

/// Everything the listing view renders from
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub catalog: Catalog,
    pub filters: FilterRecord,
    pub sort: SortOrder,
    pub summary: SearchSummary,
    /// `zpid` of the listing currently relevant to chat
    pub listing_context: Option<String>,
}

impl ViewState {
    pub fn new(catalog: Catalog) -> Self {
        let filters = FilterRecord::default();
        let sort = SortOrder::default();
        let summary = summarize(&catalog, &filters, sort);
        Self {
            catalog,
            filters,
            sort,
            summary,
            listing_context: None,
        }
    }

    /// Listings passing the current filters, in display order
    pub fn visible(&self) -> Vec<&Listing> {
        catalog::sort_by(catalog::evaluate(self.catalog.listings(), &self.filters), self.sort)
    }

    /// The listing in chat focus, if any
    pub fn focused(&self) -> Option<&Listing> {
        self.listing_context.as_deref().and_then(|zpid| self.catalog.get(zpid))
    }

    fn refreshed(mut self) -> Self {
        self.summary = summarize(&self.catalog, &self.filters, self.sort);
        self
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(Catalog::new())
    }
}

fn summarize(catalog: &Catalog, filters: &FilterRecord, sort: SortOrder) -> SearchSummary {
    let visible = catalog::evaluate(catalog.listings(), filters);
    let meta = catalog::map_meta(visible.iter().copied());
    SearchSummary {
        total_available: catalog.len(),
        returned_count: visible.len(),
        location: (!filters.query.is_empty()).then(|| filters.query.clone()),
        applied_filters: filters.clone(),
        sort_order: sort,
        map_bounds: meta.map(|(bounds, _)| bounds),
        map_center: meta.map(|(_, center)| center),
    }
}

/// One unit of reconciliation input
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Structured tool-call result, possibly wrapped or JSON-encoded
    Payload(Value),
    /// Free-form chat text
    Text(String),
}

/// Compute the next view-state for `input`
pub fn apply(input: &Input, state: &ViewState) -> ViewState {
    match input {
        Input::Payload(raw) => apply_payload(raw, state),
        Input::Text(text) => apply_text(text, state),
    }
}

/// Replace the filters wholesale, as the manual filter controls do
pub fn set_filters(state: &ViewState, filters: &FilterRecord) -> ViewState {
    let mut next = state.clone();
    next.filters = filters::resanitize(filters);
    next.refreshed()
}

pub fn set_sort(state: &ViewState, sort: SortOrder) -> ViewState {
    let mut next = state.clone();
    next.sort = sort;
    next.refreshed()
}

/// Focus a listing; unknown ids leave the state untouched
pub fn open_listing(state: &ViewState, zpid: &str) -> ViewState {
    let Some(listing) = state.catalog.get(zpid) else {
        warn!("Ignoring request to open unknown listing {}", zpid);
        return state.clone();
    };
    let mut next = state.clone();
    next.listing_context = Some(listing.zpid.clone());
    next
}

pub fn close_listing(state: &ViewState) -> ViewState {
    let mut next = state.clone();
    next.listing_context = None;
    next
}

fn apply_payload(raw: &Value, state: &ViewState) -> ViewState {
    let flat = payload::flatten(raw);
    let Value::Object(map) = &flat else {
        debug!("Ignoring non-object tool payload");
        return state.clone();
    };

    let mut next = state.clone();
    let mut merged = 0;
    if let Some(items) = map.get("listings").and_then(Value::as_array) {
        for item in items {
            if upsert_item(&mut next.catalog, item) {
                merged += 1;
            }
        }
        debug!("Merged {} of {} payload listings", merged, items.len());
    }

    if is_listing_focus(map) {
        return apply_listing_focus(map, next);
    }

    let hints = extract_hints(map);
    if hints.is_empty() {
        if map.contains_key("error") && !map.contains_key("listings") {
            warn!("Tool reported an error: {}", map.get("error").map(serde_json::Value::to_string).unwrap_or_default());
            return state.clone();
        }
        info!("🔄 Tool result carried no filters; resetting to defaults");
        next.filters = FilterRecord::default();
        next.sort = SortOrder::default();
    } else {
        next.filters = filters::merge_delta(&state.filters, &hints.delta);
        if let Some(sort) = hints.sort {
            next.sort = sort;
        }
        info!("🔎 Filters now: {} (sort {})", next.filters, next.sort);
    }

    next.listing_context = None;
    next.refreshed()
}

fn is_listing_focus(map: &Map<String, Value>) -> bool {
    if !keys::ZPID.iter().any(|key| map.get(*key).is_some_and(|v| !v.is_null())) {
        return false;
    }
    map.contains_key("homeDetails") || !(map.contains_key("listings") || map.contains_key("appliedFilters"))
}

fn apply_listing_focus(map: &Map<String, Value>, mut next: ViewState) -> ViewState {
    let item = Value::Object(map.clone());
    let Some(listing) = listing_from_item(&item) else {
        return next.refreshed();
    };
    let zpid = listing.zpid.clone();
    if next.catalog.upsert(listing) {
        info!("🏠 Listing {} is now in focus", zpid);
        next.listing_context = Some(zpid);
    }
    next.refreshed()
}

fn apply_text(text: &str, state: &ViewState) -> ViewState {
    let text = text.trim();
    if text.is_empty() {
        return state.clone();
    }

    if let Some(parsed) = payload::parse_embedded(text) {
        if payload::flatten(&parsed).is_object() {
            return apply_payload(&parsed, state);
        }
    }

    let parsed = directives::parse(text);
    if !parsed.is_empty() {
        let mut next = state.clone();
        next.filters = filters::merge_delta(&state.filters, &parsed.delta);
        if let Some(sort) = parsed.sort {
            next.sort = sort;
        }
        next.listing_context = None;
        info!("💬 Chat directives applied: {} (sort {})", next.filters, next.sort);
        return next.refreshed();
    }

    let visible = state.visible();
    let found = resolve_from_text(text, visible.iter().copied(), None)
        .or_else(|| resolve_from_text(text, state.catalog.listings(), None))
        .map(|listing| listing.zpid.clone());

    match found {
        Some(zpid) => {
            info!("🏠 Chat refers to listing {}", zpid);
            let mut next = state.clone();
            next.listing_context = Some(zpid);
            next
        }
        None => state.clone(),
    }
}

#[derive(Debug, Default)]
struct Hints {
    delta: FilterDelta,
    sort: Option<SortOrder>,
}

impl Hints {
    fn is_empty(&self) -> bool {
        self.delta.is_empty() && self.sort.is_none()
    }
}

fn lookup<'a>(applied: Option<&'a Value>, scope: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    applied
        .and_then(|filters| find_first(filters, keys))
        .or_else(|| find_first(scope, keys))
}

fn extract_hints(map: &Map<String, Value>) -> Hints {
    let mut scope = map.clone();
    scope.remove("listings");
    let scope = Value::Object(scope);
    let applied = map.get("appliedFilters").filter(|v| v.is_object());

    let whole = |keys: &[&str]| {
        lookup(applied, &scope, keys)
            .and_then(coerce_number)
            .filter(|n| *n >= 0.0)
            .map(|n| n.round())
    };

    let location = lookup(applied, &scope, keys::LOCATION)
        .and_then(coerce_string)
        .filter(|label| !label.eq_ignore_ascii_case(ALL_LISTINGS_LABEL));

    let hints = Hints {
        delta: FilterDelta {
            query: location,
            price_min: whole(keys::MIN_PRICE).map(|n| n as u64),
            price_max: whole(keys::MAX_PRICE).map(|n| n as u64),
            beds_min: whole(keys::BEDS_MIN).map(|n| n as u32),
            beds_max: whole(keys::BEDS_MAX).map(|n| n as u32),
            baths_min: whole(keys::BATHS_MIN).map(|n| n as u32),
            baths_max: whole(keys::BATHS_MAX).map(|n| n as u32),
            sqft_max: whole(keys::SQFT_MAX).map(|n| n as u32),
            ..FilterDelta::default()
        },
        sort: lookup(applied, &scope, keys::SORT)
            .and_then(Value::as_str)
            .and_then(sort::normalize),
    };
    debug!("Extracted payload hints: {:?}", hints);
    hints
}

/// Keys only the tool output shape uses; records carrying them are not catalog records
const TOOL_SHAPE_KEYS: &[&str] = &["area", "priceDisplay", "homeDetails"];

fn is_catalog_record(map: &Map<String, Value>) -> bool {
    map.get("zpid").is_some_and(|v| !v.is_null())
        && map.get("address").map_or(true, Value::is_object)
        && map.get("price").map_or(true, |v| !v.is_number())
        && !TOOL_SHAPE_KEYS.iter().any(|key| map.contains_key(*key))
}

/// Merge one payload listing into the catalog.
///
/// Full records shallow-merge as-is. Tool-shaped records are rebuilt into a
/// [`Listing`] first, so only the fields they actually carry override.
fn upsert_item(catalog: &mut Catalog, item: &Value) -> bool {
    let Some(map) = item.as_object() else {
        return false;
    };
    if is_catalog_record(map) {
        return match serde_json::from_value::<Listing>(item.clone()) {
            Ok(listing) => catalog.upsert(listing),
            Err(e) => {
                warn!("Dropping malformed listing record: {}", e);
                false
            }
        };
    }

    match listing_from_item(item) {
        Some(listing) => catalog.upsert(listing),
        None => {
            warn!("Dropping payload listing without zpid/id");
            false
        }
    }
}

fn string_at(map: &Map<String, Value>, details: Option<&Map<String, Value>>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| map.get(*key).and_then(coerce_string))
        .or_else(|| details.and_then(|d| keys.iter().find_map(|key| d.get(*key).and_then(coerce_string))))
}

fn number_at(map: &Map<String, Value>, details: Option<&Map<String, Value>>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|key| map.get(*key).and_then(coerce_number))
        .or_else(|| details.and_then(|d| keys.iter().find_map(|key| d.get(*key).and_then(coerce_number))))
}

fn strings(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(coerce_string).collect())
        .unwrap_or_default()
}

fn item_zpid(map: &Map<String, Value>) -> Option<String> {
    keys::ZPID
        .iter()
        .chain(["id"].iter())
        .find_map(|key| map.get(*key).and_then(coerce_string))
}

/// Build a listing from a tool-shaped item (search result or detail result)
fn listing_from_item(item: &Value) -> Option<Listing> {
    let map = item.as_object()?;
    let zpid = item_zpid(map)?;
    let details = map.get("homeDetails").and_then(Value::as_object);

    let mut listing = Listing::new(zpid);
    listing.display_address = map
        .get("address")
        .filter(|v| v.is_string())
        .and_then(coerce_string)
        .or_else(|| string_at(map, None, &["displayAddress", "name"]));
    listing.name = string_at(map, None, &["name"]);
    listing.city = string_at(map, None, &["city"]);
    listing.state = string_at(map, None, &["state"]);
    listing.zip = string_at(map, None, &["zip", "zipcode"]);

    listing.price_raw = number_at(map, details, &["priceRaw", "price"]).filter(|p| *p > 0.0);
    listing.price = map
        .get("priceDisplay")
        .and_then(coerce_string)
        .or_else(|| map.get("price").filter(|v| v.is_string()).and_then(coerce_string))
        .or_else(|| listing.price_raw.map(|p| dollars(p.round() as u64)));

    listing.beds = number_at(map, details, &["beds"]);
    listing.baths = number_at(map, details, &["baths"]);
    listing.living_area = number_at(map, details, &["area", "livingArea"]);
    listing.home_type = string_at(map, details, &["homeType"]);
    listing.status_text = string_at(map, None, &["statusText"]);
    listing.description = string_at(map, details, &["description"]);
    listing.detail_url = string_at(map, None, keys::DETAIL_URL);
    listing.latitude = number_at(map, None, &["latitude"]);
    listing.longitude = number_at(map, None, &["longitude"]);
    listing.open_house = map.get("openHouse").filter(|v| !v.is_null()).cloned();
    listing.school_note = string_at(map, None, &["schoolNote"]);
    listing.neighborhood_note = string_at(map, None, &["neighborhoodNote"]);
    listing.highlights = strings(map.get("highlights"));

    listing.images = strings(map.get("images"));
    listing.image = string_at(map, None, &["image", "primaryPhoto"]);

    Some(listing)
}
