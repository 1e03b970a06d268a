use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical sort keys understood by the listing view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    #[default]
    HomesForYou,
    PriceLowHigh,
    PriceHighLow,
    Newest,
    BedsHighLow,
    BathsHighLow,
    SqftHighLow,
}

impl SortOrder {
    pub fn key(self) -> &'static str {
        match self {
            SortOrder::HomesForYou => "homesForYou",
            SortOrder::PriceLowHigh => "priceLowHigh",
            SortOrder::PriceHighLow => "priceHighLow",
            SortOrder::Newest => "newest",
            SortOrder::BedsHighLow => "bedsHighLow",
            SortOrder::BathsHighLow => "bathsHighLow",
            SortOrder::SqftHighLow => "sqftHighLow",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

const ALIASES: &[(&str, SortOrder)] = &[
    ("homesforyou", SortOrder::HomesForYou),
    ("default", SortOrder::HomesForYou),
    ("recommended", SortOrder::HomesForYou),
    ("pricelowhigh", SortOrder::PriceLowHigh),
    ("pricelowtohigh", SortOrder::PriceLowHigh),
    ("lowtohigh", SortOrder::PriceLowHigh),
    ("lowestprice", SortOrder::PriceLowHigh),
    ("priceasc", SortOrder::PriceLowHigh),
    ("ascprice", SortOrder::PriceLowHigh),
    ("priceascending", SortOrder::PriceLowHigh),
    ("cheapest", SortOrder::PriceLowHigh),
    ("pricehighlow", SortOrder::PriceHighLow),
    ("pricehightolow", SortOrder::PriceHighLow),
    ("hightolow", SortOrder::PriceHighLow),
    ("highestprice", SortOrder::PriceHighLow),
    ("pricedesc", SortOrder::PriceHighLow),
    ("descprice", SortOrder::PriceHighLow),
    ("pricedescending", SortOrder::PriceHighLow),
    ("mostexpensive", SortOrder::PriceHighLow),
    ("newest", SortOrder::Newest),
    ("recent", SortOrder::Newest),
    ("recentlyadded", SortOrder::Newest),
    ("latest", SortOrder::Newest),
    ("bedshighlow", SortOrder::BedsHighLow),
    ("mostbeds", SortOrder::BedsHighLow),
    ("bedroomsdesc", SortOrder::BedsHighLow),
    ("mostbedrooms", SortOrder::BedsHighLow),
    ("bathshighlow", SortOrder::BathsHighLow),
    ("mostbaths", SortOrder::BathsHighLow),
    ("bathroomsdesc", SortOrder::BathsHighLow),
    ("mostbathrooms", SortOrder::BathsHighLow),
    ("sqfthighlow", SortOrder::SqftHighLow),
    ("largest", SortOrder::SqftHighLow),
    ("sizehighlow", SortOrder::SqftHighLow),
    ("biggestsize", SortOrder::SqftHighLow),
    ("mostsquarefeet", SortOrder::SqftHighLow),
];

const ASCENDING_CUES: &[&str] = &["low to high", "ascending", "asc", "lowest", "cheapest"];
const DESCENDING_CUES: &[&str] = &["high to low", "descending", "desc", "highest", "expensive"];
const NEWEST_CUES: &[&str] = &["newest", "recent", "latest"];
const SQFT_SPELLINGS: &[&str] = &[
    "sqft",
    "sq.ft",
    "sq ft",
    "sq-feet",
    "sqfeet",
    "squarefoot",
    "squarefeet",
    "squarefootage",
    "square feet",
];

fn lookup(key: &str) -> Option<SortOrder> {
    ALIASES.iter().find(|(alias, _)| *alias == key).map(|(_, order)| *order)
}

/// Map a free-form or aliased sort token to a canonical key.
///
/// `None` means "no opinion" and must never be read as a reset to the default.
pub fn normalize(token: &str) -> Option<SortOrder> {
    let raw = token.trim();
    if raw.is_empty() {
        return None;
    }

    let lower = raw.to_lowercase();
    if let Some(order) = lookup(&lower) {
        return Some(order);
    }

    let compact: String = lower.chars().filter(|c| c.is_ascii_alphabetic()).collect();
    if let Some(order) = lookup(&compact) {
        return Some(order);
    }

    let contains_any = |cues: &[&str]| cues.iter().any(|cue| lower.contains(cue));

    if lower.contains("price") {
        if contains_any(ASCENDING_CUES) {
            return Some(SortOrder::PriceLowHigh);
        }
        if contains_any(DESCENDING_CUES) {
            return Some(SortOrder::PriceHighLow);
        }
    }
    if compact.contains("bed") {
        return Some(SortOrder::BedsHighLow);
    }
    if compact.contains("bath") {
        return Some(SortOrder::BathsHighLow);
    }
    if contains_any(NEWEST_CUES) {
        return Some(SortOrder::Newest);
    }
    if contains_any(SQFT_SPELLINGS) {
        return Some(SortOrder::SqftHighLow);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_price_aliases() {
        assert_eq!(normalize("Price: Low to High"), Some(SortOrder::PriceLowHigh));
        assert_eq!(normalize("pricelowhigh"), Some(SortOrder::PriceLowHigh));
        assert_eq!(normalize("lowest price"), Some(SortOrder::PriceLowHigh));
        assert_eq!(normalize("price (highest first)"), Some(SortOrder::PriceHighLow));
        assert_eq!(normalize("Most expensive"), Some(SortOrder::PriceHighLow));
    }

    #[test]
    fn resolves_keyword_heuristics() {
        assert_eq!(normalize("Bedrooms"), Some(SortOrder::BedsHighLow));
        assert_eq!(normalize("most bathrooms first"), Some(SortOrder::BathsHighLow));
        assert_eq!(normalize("recently listed"), Some(SortOrder::Newest));
        assert_eq!(normalize("Square Feet"), Some(SortOrder::SqftHighLow));
        assert_eq!(normalize("sq.ft (big to small)"), Some(SortOrder::SqftHighLow));
        assert_eq!(normalize("homesForYou"), Some(SortOrder::HomesForYou));
    }

    #[test]
    fn unknown_tokens_have_no_opinion() {
        assert_eq!(normalize("banana"), None);
        assert_eq!(normalize("   "), None);
    }

    #[test]
    fn canonical_keys_round_trip_through_normalize() {
        for order in [
            SortOrder::HomesForYou,
            SortOrder::PriceLowHigh,
            SortOrder::PriceHighLow,
            SortOrder::Newest,
            SortOrder::BedsHighLow,
            SortOrder::BathsHighLow,
            SortOrder::SqftHighLow,
        ] {
            assert_eq!(normalize(order.key()), Some(order));
        }
    }
}
