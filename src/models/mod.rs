mod home_type;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::filters::dollars;
use crate::payload::{coerce_number, coerce_string};

pub use home_type::HomeType;

/// Structured street address of a listing
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub street_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub zipcode: Option<String>,
}

/// Core listing data model.
///
/// Every optional field is skipped when absent so that a serialized record only
/// carries what is actually known. [`Listing::merge_from`] relies on this.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    #[serde(deserialize_with = "identity")]
    pub zpid: String,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub display_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub zip: Option<String>,
    /// Pre-formatted display price, e.g. "$310,000"
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_number")]
    pub price_raw: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_number")]
    pub beds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_number")]
    pub baths: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_number")]
    pub living_area: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub home_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub status_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub detail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_number")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_number")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_house: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub highlights: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub school_note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub neighborhood_note: Option<String>,
    /// Nested schema blocks (price history, schools, ...) kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Listing {
    /// Create an otherwise empty listing with the given identity
    pub fn new(zpid: impl Into<String>) -> Self {
        Self {
            zpid: zpid.into(),
            ..Self::default()
        }
    }

    /// Shallow-merge `newer` into this record.
    ///
    /// Fields present in `newer` win; fields it omits keep their current value.
    /// A price given in only one form replaces the other form too.
    pub fn merge_from(&mut self, newer: &Listing) {
        match (&newer.price, newer.price_raw.filter(|p| p.is_finite() && *p > 0.0)) {
            (Some(_), None) => self.price_raw = None,
            (None, Some(raw)) => self.price = Some(dollars(raw.round() as u64)),
            _ => {}
        }

        let (Ok(Value::Object(mut base)), Ok(Value::Object(overlay))) =
            (serde_json::to_value(&*self), serde_json::to_value(newer))
        else {
            return;
        };

        for (key, value) in overlay {
            if !value.is_null() {
                base.insert(key, value);
            }
        }

        match serde_json::from_value::<Listing>(Value::Object(base)) {
            Ok(merged) => *self = merged,
            Err(e) => tracing::warn!("Failed to merge listing {}: {}", self.zpid, e),
        }
    }

    /// Numeric price: `priceRaw`, or the digits of the display price
    pub fn price_value(&self) -> Option<f64> {
        if let Some(raw) = self.price_raw.filter(|p| p.is_finite()) {
            return Some(raw);
        }
        let digits: String = self
            .price
            .as_deref()?
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();
        digits.parse::<f64>().ok().filter(|p| *p > 0.0)
    }

    pub fn street(&self) -> Option<&str> {
        self.address.as_ref()?.street_address.as_deref()
    }

    pub fn city_name(&self) -> Option<&str> {
        self.address
            .as_ref()
            .and_then(|a| a.city.as_deref())
            .or(self.city.as_deref())
    }

    pub fn state_code(&self) -> Option<&str> {
        self.address
            .as_ref()
            .and_then(|a| a.state.as_deref())
            .or(self.state.as_deref())
    }

    pub fn zip_code(&self) -> Option<&str> {
        self.address
            .as_ref()
            .and_then(|a| a.zipcode.as_deref())
            .or(self.zip.as_deref())
    }

    /// Address shown to the user: display address, then name, then the joined components
    pub fn address_line(&self) -> Option<String> {
        if let Some(line) = self.display_address.as_deref().or(self.name.as_deref()) {
            return Some(line.to_string());
        }
        let parts: Vec<&str> = [self.street(), self.city_name(), self.state_code(), self.zip_code()]
            .into_iter()
            .flatten()
            .collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    }

    /// Canonical home type, from `homeType` or failing that `statusText`
    pub fn normalized_home_type(&self) -> Option<HomeType> {
        self.home_type
            .as_deref()
            .and_then(HomeType::normalize)
            .or_else(|| self.status_text.as_deref().and_then(HomeType::normalize))
    }

    /// Lowercased haystack used for location matching
    pub fn location_haystack(&self) -> String {
        [
            self.display_address.as_deref(),
            self.street(),
            self.city_name(),
            self.state_code(),
            self.zip_code(),
            self.name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
    }
}

fn identity<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    coerce_string(&value).ok_or_else(|| serde::de::Error::custom("listing identity must be a string or number"))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|v| coerce_string(&v)))
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|v| coerce_number(&v)))
}
