//! Best-effort unwrapping of tool-call payloads.
//!
//! Tool results reach the frontend through a chat platform that may wrap them
//! in envelope objects, JSON-encode them into strings, or both. Nothing in here
//! fails: a value that cannot be unwrapped is returned as it is.

use serde_json::Value;
use tracing::{debug, warn};

/// Recursion bound for [`flatten`] and [`find_first`]
pub const MAX_DEPTH: usize = 6;

/// Wrapper keys, in preference order
pub const ENVELOPE_KEYS: [&str; 6] = ["data", "payload", "response", "result", "body", "args"];

/// Key spellings used by tools and the UI for the same concept
pub mod keys {
    pub const LOCATION: &[&str] = &[
        "location",
        "query",
        "searchTerm",
        "search_query",
        "searchQuery",
        "searchText",
        "search_text",
        "keyword",
        "keywords",
        "city",
        "state",
        "region",
        "zip",
        "zipcode",
        "postalCode",
        "place",
    ];

    pub const MIN_PRICE: &[&str] = &[
        "minPrice",
        "priceMin",
        "minimum",
        "min_price",
        "min",
        "minBudget",
        "min_budget",
        "lowerPrice",
        "price_lower",
        "priceFloor",
        "price_floor",
    ];

    pub const MAX_PRICE: &[&str] = &[
        "maxPrice",
        "priceMax",
        "maximum",
        "max_price",
        "max",
        "maxBudget",
        "max_budget",
        "upperPrice",
        "price_upper",
        "priceCeiling",
        "price_ceiling",
    ];

    pub const BEDS_MIN: &[&str] = &["bedsMin", "minBeds", "beds", "bedrooms", "min_beds"];
    pub const BEDS_MAX: &[&str] = &["bedsMax", "maxBeds", "bedsMaxValue", "beds_upper", "max_beds"];
    pub const BATHS_MIN: &[&str] = &["bathsMin", "minBaths", "baths", "bathrooms", "min_baths"];
    pub const BATHS_MAX: &[&str] = &["bathsMax", "maxBaths", "bathsMaxValue", "baths_upper", "max_baths"];

    pub const SQFT_MAX: &[&str] = &[
        "sqftMax",
        "maxSqft",
        "squareFootageMax",
        "maxSquareFeet",
        "maxSquareFootage",
        "livingAreaMax",
        "maxLivingArea",
        "square_footage_max",
    ];

    pub const SORT: &[&str] = &["sortOrder", "sort", "sort_order", "order", "ordering", "sortBy"];

    pub const ZPID: &[&str] = &[
        "zpid",
        "listing_zpid",
        "listingZpid",
        "homeId",
        "propertyId",
        "property_id",
        "listingId",
        "listing_id",
    ];

    pub const DETAIL_URL: &[&str] = &["detailUrl", "detail_url", "listing_detail_url", "listingDetailUrl"];
}

/// Unwrap envelopes, single-element arrays and JSON-encoded strings
pub fn flatten(value: &Value) -> Value {
    flatten_with_depth(value, MAX_DEPTH)
}

pub fn flatten_with_depth(value: &Value, max_depth: usize) -> Value {
    unwrap(value, 0, max_depth)
}

fn unwrap(value: &Value, depth: usize, max_depth: usize) -> Value {
    if depth >= max_depth {
        return value.clone();
    }

    match value {
        Value::String(text) => match parse_embedded(text) {
            Some(parsed) => unwrap(&parsed, depth + 1, max_depth),
            None => value.clone(),
        },
        Value::Array(items) if items.len() == 1 => unwrap(&items[0], depth + 1, max_depth),
        Value::Object(map) => {
            // Scalar envelope values ("result": "ok") are status fields, not content.
            let inner = ENVELOPE_KEYS
                .iter()
                .filter_map(|key| map.get(*key).map(|v| (*key, v)))
                .find(|(_, v)| is_unwrappable(v));
            match inner {
                Some((key, inner)) => {
                    debug!("Unwrapping envelope key `{}` at depth {}", key, depth);
                    unwrap(inner, depth + 1, max_depth)
                }
                None => value.clone(),
            }
        }
        _ => value.clone(),
    }
}

fn is_unwrappable(value: &Value) -> bool {
    match value {
        Value::Object(_) | Value::Array(_) => true,
        Value::String(text) => looks_like_json(text),
        _ => false,
    }
}

fn looks_like_json(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.starts_with('{') || trimmed.starts_with('[')
}

/// Parse a string that looks like a JSON object or array
pub fn parse_embedded(text: &str) -> Option<Value> {
    if !looks_like_json(text) {
        return None;
    }
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!("Keeping unparsable JSON-looking string as text: {}", e);
            None
        }
    }
}

/// Depth-limited search for the first non-null value under any of `keys`.
///
/// Direct keys of an object win over anything nested below it.
pub fn find_first<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    search(value, keys, 0)
}

fn search<'a>(value: &'a Value, keys: &[&str], depth: usize) -> Option<&'a Value> {
    if depth > MAX_DEPTH {
        return None;
    }
    match value {
        Value::Object(map) => keys
            .iter()
            .filter_map(|key| map.get(*key))
            .find(|v| !v.is_null())
            .or_else(|| map.values().find_map(|v| search(v, keys, depth + 1))),
        Value::Array(items) => items.iter().find_map(|v| search(v, keys, depth + 1)),
        _ => None,
    }
}

/// Numbers, or strings such as "$400,000", "400k" and "1.2M"
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|n| n.is_finite()),
        Value::String(text) => parse_number(text),
        _ => None,
    }
}

fn parse_number(text: &str) -> Option<f64> {
    let lower = text.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }

    let (body, multiplier) = match (lower.strip_suffix('k'), lower.strip_suffix('m')) {
        (Some(body), _) if ends_with_digit(body) => (body, 1_000.0),
        (_, Some(body)) if ends_with_digit(body) => (body, 1_000_000.0),
        _ => (lower.as_str(), 1.0),
    };

    let cleaned: String = body
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+'))
        .collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(|n| n * multiplier)
}

fn ends_with_digit(text: &str) -> bool {
    text.trim_end().chars().last().is_some_and(|c| c.is_ascii_digit())
}

/// Trimmed non-empty strings; numbers are stringified
pub fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(text) => match text.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "y" | "t" | "on" | "enabled" => Some(true),
            "false" | "0" | "no" | "n" | "f" | "off" | "disabled" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        _ => None,
    }
}
