use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed home-type vocabulary used by filters and listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HomeType {
    SingleFamilyResidence,
    Townhouse,
    MultiFamily,
    Condominium,
    LotsLand,
    Apartment,
    Manufactured,
}

impl HomeType {
    /// Every home type, in display order
    pub const ALL: [HomeType; 7] = [
        HomeType::SingleFamilyResidence,
        HomeType::Townhouse,
        HomeType::MultiFamily,
        HomeType::Condominium,
        HomeType::LotsLand,
        HomeType::Apartment,
        HomeType::Manufactured,
    ];

    pub fn id(self) -> &'static str {
        match self {
            HomeType::SingleFamilyResidence => "SingleFamilyResidence",
            HomeType::Townhouse => "Townhouse",
            HomeType::MultiFamily => "MultiFamily",
            HomeType::Condominium => "Condominium",
            HomeType::LotsLand => "LotsLand",
            HomeType::Apartment => "Apartment",
            HomeType::Manufactured => "Manufactured",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            HomeType::SingleFamilyResidence => &[
                "single family residence",
                "singlefamily",
                "single family",
                "single-family",
                "house",
                "houses",
                "sfr",
            ],
            HomeType::Townhouse => &["town home", "townhome", "townhomes", "townhouses", "town house"],
            HomeType::MultiFamily => &["multi family", "multi-family", "duplex", "triplex", "quadplex"],
            HomeType::Condominium => &["condo", "condos", "co-op", "coop"],
            HomeType::LotsLand => &["lot", "lots", "land", "acreage", "vacant"],
            HomeType::Apartment => &["apartments", "flat", "flats"],
            HomeType::Manufactured => &["mobile", "mobilehome", "mobile home", "trailer"],
        }
    }

    /// Resolve a canonical id or any alias, ignoring case and whitespace
    pub fn normalize(value: &str) -> Option<Self> {
        let key = compact(value);
        if key.is_empty() {
            return None;
        }
        Self::ALL.into_iter().find(|home_type| {
            compact(home_type.id()) == key || home_type.aliases().iter().any(|alias| compact(alias) == key)
        })
    }

    /// Split a delimited list ("condo, townhouse") into distinct home types
    pub fn parse_list(value: &str) -> Vec<Self> {
        let mut found = Vec::new();
        for part in value.split(|c: char| matches!(c, ',' | ';' | '|' | '/') || c.is_whitespace()) {
            if let Some(home_type) = Self::normalize(part) {
                if !found.contains(&home_type) {
                    found.push(home_type);
                }
            }
        }
        found
    }
}

impl fmt::Display for HomeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

fn compact(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
