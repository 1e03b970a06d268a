//! Search filter record and its sanitization rules.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

use crate::models::HomeType;
use crate::payload::{coerce_bool, coerce_number, coerce_string};

/// Sale status the user is browsing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SaleType {
    #[default]
    ForSale,
    ForRent,
    Sold,
}

impl SaleType {
    fn parse(value: &str) -> Option<Self> {
        let key: String = value
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "forsale" | "sale" | "buy" => Some(SaleType::ForSale),
            "forrent" | "rent" | "rental" => Some(SaleType::ForRent),
            "sold" | "recentlysold" => Some(SaleType::Sold),
            _ => None,
        }
    }
}

/// Fully sanitized search filters.
///
/// Only [`sanitize`] and [`merge_delta`] produce values of this type outside of
/// `Default`, so every instance satisfies the bound invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterRecord {
    pub query: String,
    pub sale_type: SaleType,
    pub price_min: Option<u64>,
    pub price_max: Option<u64>,
    pub beds_min: u32,
    pub beds_max: Option<u32>,
    pub baths_min: u32,
    pub baths_max: Option<u32>,
    pub sqft_max: Option<u32>,
    pub exact_beds: bool,
    pub home_types: BTreeSet<HomeType>,
}

impl Default for FilterRecord {
    fn default() -> Self {
        Self {
            query: String::new(),
            sale_type: SaleType::ForSale,
            price_min: None,
            price_max: None,
            beds_min: 0,
            beds_max: None,
            baths_min: 0,
            baths_max: None,
            sqft_max: None,
            exact_beds: false,
            home_types: HomeType::ALL.into_iter().collect(),
        }
    }
}

impl FilterRecord {
    /// Whether the home-type selection is the untouched full vocabulary
    pub fn all_home_types(&self) -> bool {
        self.home_types.len() == HomeType::ALL.len()
    }

    fn repair(mut self) -> Self {
        self.query = self.query.trim().to_string();
        if let (Some(min), Some(max)) = (self.price_min, self.price_max) {
            if min > max {
                self.price_min = Some(max);
                self.price_max = Some(min);
            }
        }
        if let Some(max) = self.beds_max {
            self.beds_max = Some(max.max(self.beds_min));
        }
        if let Some(max) = self.baths_max {
            self.baths_max = Some(max.max(self.baths_min));
        }
        if self.exact_beds && self.beds_max != Some(self.beds_min) {
            self.exact_beds = false;
        }
        self
    }
}

/// A partial filter update: `None` fields leave the current value alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_type: Option<SaleType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_min: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_max: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beds_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beds_max: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baths_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baths_max: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sqft_max: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact_beds: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_types: Option<BTreeSet<HomeType>>,
}

impl FilterDelta {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

const QUERY_KEYS: &[&str] = &["query", "location"];
const SALE_TYPE_KEYS: &[&str] = &["saleType", "sale_type", "listingType"];
const PRICE_MIN_KEYS: &[&str] = &["priceMin", "minPrice", "min_price"];
const PRICE_MAX_KEYS: &[&str] = &["priceMax", "maxPrice", "max_price"];
const BEDS_MIN_KEYS: &[&str] = &["bedsMin", "minBeds", "beds_min"];
const BEDS_MAX_KEYS: &[&str] = &["bedsMax", "maxBeds", "beds_max"];
const BATHS_MIN_KEYS: &[&str] = &["bathsMin", "minBaths", "baths_min"];
const BATHS_MAX_KEYS: &[&str] = &["bathsMax", "maxBaths", "baths_max"];
const SQFT_MAX_KEYS: &[&str] = &["sqftMax", "maxSqft", "sqft_max"];
const EXACT_BEDS_KEYS: &[&str] = &["exactBeds", "exact_beds", "useExactBeds"];
const HOME_TYPES_KEYS: &[&str] = &["homeTypes", "home_types"];

fn field<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|key| map.get(*key)).find(|v| !v.is_null())
}

fn non_negative(value: &Value) -> Option<f64> {
    coerce_number(value).filter(|n| *n >= 0.0)
}

fn as_u64(value: &Value) -> Option<u64> {
    non_negative(value).map(|n| n.round() as u64)
}

fn as_u32(value: &Value) -> Option<u32> {
    non_negative(value).map(|n| n.round().min(u32::MAX as f64) as u32)
}

fn home_types(value: Option<&Value>) -> BTreeSet<HomeType> {
    match value {
        None | Some(Value::Null) => HomeType::ALL.into_iter().collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().and_then(HomeType::normalize))
            .collect(),
        Some(Value::String(text)) => HomeType::parse_list(text).into_iter().collect(),
        Some(_) => HomeType::ALL.into_iter().collect(),
    }
}

/// Build a fully populated, invariant-satisfying record from untrusted input.
///
/// Never fails: anything missing or unparsable takes the field default.
pub fn sanitize(raw: &Value) -> FilterRecord {
    let empty = Map::new();
    let map = raw.as_object().unwrap_or(&empty);
    let u64_field = |keys: &[&str]| field(map, keys).and_then(as_u64);
    let u32_field = |keys: &[&str]| field(map, keys).and_then(as_u32);

    FilterRecord {
        query: field(map, QUERY_KEYS).and_then(coerce_string).unwrap_or_default(),
        sale_type: field(map, SALE_TYPE_KEYS)
            .and_then(Value::as_str)
            .and_then(SaleType::parse)
            .unwrap_or_default(),
        price_min: u64_field(PRICE_MIN_KEYS),
        price_max: u64_field(PRICE_MAX_KEYS),
        beds_min: u32_field(BEDS_MIN_KEYS).unwrap_or(0),
        beds_max: u32_field(BEDS_MAX_KEYS),
        baths_min: u32_field(BATHS_MIN_KEYS).unwrap_or(0),
        baths_max: u32_field(BATHS_MAX_KEYS),
        sqft_max: u32_field(SQFT_MAX_KEYS),
        exact_beds: field(map, EXACT_BEDS_KEYS).and_then(coerce_bool).unwrap_or(false),
        home_types: home_types(HOME_TYPES_KEYS.iter().find_map(|key| map.get(*key))),
    }
    .repair()
}

/// Re-run sanitization over an existing record
pub fn resanitize(record: &FilterRecord) -> FilterRecord {
    match serde_json::to_value(record) {
        Ok(value) => sanitize(&value),
        Err(_) => record.clone().repair(),
    }
}

/// Apply the fields `delta` mentions on top of `current`.
///
/// When the delta sets one side of a min/max pair and the other side, which it
/// left alone, would contradict it, that other side is clamped to the new value.
pub fn merge_delta(current: &FilterRecord, delta: &FilterDelta) -> FilterRecord {
    let mut next = current.clone();

    if let Some(query) = &delta.query {
        next.query = query.clone();
    }
    if let Some(sale_type) = delta.sale_type {
        next.sale_type = sale_type;
    }
    if let Some(exact) = delta.exact_beds {
        next.exact_beds = exact;
    }
    if let Some(home_types) = &delta.home_types {
        next.home_types = home_types.clone();
    }
    if let Some(sqft) = delta.sqft_max {
        next.sqft_max = Some(sqft);
    }

    merge_optional_pair(&mut next.price_min, &mut next.price_max, delta.price_min, delta.price_max);
    merge_floor_pair(&mut next.beds_min, &mut next.beds_max, delta.beds_min, delta.beds_max);
    merge_floor_pair(&mut next.baths_min, &mut next.baths_max, delta.baths_min, delta.baths_max);

    resanitize(&next)
}

fn merge_optional_pair<T: Copy + Ord>(
    min: &mut Option<T>,
    max: &mut Option<T>,
    new_min: Option<T>,
    new_max: Option<T>,
) {
    match (new_min, new_max) {
        (Some(lo), Some(hi)) => {
            *min = Some(lo);
            *max = Some(hi);
        }
        (Some(lo), None) => {
            *min = Some(lo);
            if max.is_some_and(|hi| hi < lo) {
                *max = Some(lo);
            }
        }
        (None, Some(hi)) => {
            *max = Some(hi);
            if min.is_some_and(|lo| lo > hi) {
                *min = Some(hi);
            }
        }
        (None, None) => {}
    }
}

fn merge_floor_pair(min: &mut u32, max: &mut Option<u32>, new_min: Option<u32>, new_max: Option<u32>) {
    match (new_min, new_max) {
        (Some(lo), Some(hi)) => {
            *min = lo;
            *max = Some(hi);
        }
        (Some(lo), None) => {
            *min = lo;
            if max.is_some_and(|hi| hi < lo) {
                *max = Some(lo);
            }
        }
        (None, Some(hi)) => {
            *max = Some(hi);
            if *min > hi {
                *min = hi;
            }
        }
        (None, None) => {}
    }
}

impl fmt::Display for FilterRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();

        if !self.query.is_empty() {
            parts.push(format!("location={}", self.query));
        }
        if self.sale_type != SaleType::ForSale {
            parts.push(format!("saleType={:?}", self.sale_type));
        }
        match (self.price_min, self.price_max) {
            (Some(min), Some(max)) => parts.push(format!("price {} – {}", dollars(min), dollars(max))),
            (Some(min), None) => parts.push(format!("price {}+", dollars(min))),
            (None, Some(max)) => parts.push(format!("price <= {}", dollars(max))),
            (None, None) => {}
        }
        if self.exact_beds {
            parts.push(format!("beds={}", self.beds_min));
        } else if self.beds_min > 0 {
            parts.push(format!("bedsMin>={}", self.beds_min));
        }
        if let (false, Some(max)) = (self.exact_beds, self.beds_max) {
            parts.push(format!("bedsMax<={}", max));
        }
        if self.baths_min > 0 {
            parts.push(format!("bathsMin>={}", self.baths_min));
        }
        if let Some(max) = self.baths_max {
            parts.push(format!("bathsMax<={}", max));
        }
        if let Some(max) = self.sqft_max {
            parts.push(format!("sqftMax<={}", max));
        }
        if !self.all_home_types() {
            let ids: Vec<&str> = self.home_types.iter().map(|t| t.id()).collect();
            parts.push(format!("homeTypes={}", ids.join("/")));
        }

        if parts.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&parts.join("; "))
        }
    }
}

/// "$1,250,000"
pub fn dollars(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    format!("${}", out)
}
