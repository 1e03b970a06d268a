//! Loosely-patterned filter directives in chat text.
//!
//! Recognizes phrases like "under $400k", "over 300,000", "at least 3 beds",
//! "2+ baths", "under 2000 sqft", "between $300k and $500k" and
//! "sorted by newest". Everything else in the text is ignored.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;
use tracing::debug;

use crate::filters::FilterDelta;
use crate::sort::{self, SortOrder};

/// Plain numbers below this are not read as prices unless marked with `$` or a suffix
const MIN_BARE_PRICE: f64 = 1_000.0;

static BETWEEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bbetween\s+(?P<lo>\$?\s*\d[\d,]*(?:\.\d+)?)\s*(?P<lo_suffix>k|m|million|thousand)?\s+(?:and|to|-)\s+(?P<hi>\$?\s*\d[\d,]*(?:\.\d+)?)\s*(?P<hi_suffix>k|m|million|thousand)?\b\s*(?P<unit>sq\.?\s*ft\.?|sqft|square\s+f(?:ee|oo)t|bed(?:room)?s?|br|bath(?:room)?s?|ba)?\b",
    )
    .expect("valid regex")
});

static BOUND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?P<op>under|below|less\s+than|at\s+most|up\s+to|no\s+more\s+than|max(?:imum)?(?:\s+of)?|over|above|more\s+than|at\s+least|min(?:imum)?(?:\s+of)?|starting\s+at|from)\s+(?P<num>\$?\s*\d[\d,]*(?:\.\d+)?)\s*(?P<suffix>k|m|million|thousand)?\b\s*(?P<unit>sq\.?\s*ft\.?|sqft|square\s+f(?:ee|oo)t|bed(?:room)?s?|br|bath(?:room)?s?|ba)?\b",
    )
    .expect("valid regex")
});

static COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?P<n>\d{1,2})\s*(?P<plus>\+)?\s*-?\s*(?P<unit>bed(?:room)?s?|br|bath(?:room)?s?|ba)\b")
        .expect("valid regex")
});

static SORT_BY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:sort(?:ed)?|order(?:ed)?|rank(?:ed)?)\s+by\s+(?P<token>[^.,;!?]+)").expect("valid regex")
});

static FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?P<token>cheapest|most\s+expensive|newest|latest|largest|biggest)\s+(?:ones?\s+)?first\b")
        .expect("valid regex")
});

/// Filter changes and sort request found in one message
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Directives {
    pub delta: FilterDelta,
    pub sort: Option<SortOrder>,
}

impl Directives {
    pub fn is_empty(&self) -> bool {
        self.delta.is_empty() && self.sort.is_none()
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Unit {
    Price,
    Sqft,
    Beds,
    Baths,
}

fn unit_of(text: Option<&str>) -> Unit {
    let Some(text) = text else {
        return Unit::Price;
    };
    let lower = text.to_lowercase();
    if lower.starts_with("sq") {
        Unit::Sqft
    } else if lower.starts_with("bed") || lower == "br" {
        Unit::Beds
    } else if lower.starts_with("bath") || lower == "ba" {
        Unit::Baths
    } else {
        Unit::Price
    }
}

/// Amount in dollars and whether it was explicitly written as money
fn amount(raw: &str, suffix: Option<&str>) -> Option<(f64, bool)> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    let base = digits.parse::<f64>().ok().filter(|n| n.is_finite())?;
    let multiplier = match suffix.map(str::to_lowercase).as_deref() {
        Some("k") | Some("thousand") => 1_000.0,
        Some("m") | Some("million") => 1_000_000.0,
        _ => 1.0,
    };
    let explicit = raw.contains('$') || suffix.is_some();
    Some((base * multiplier, explicit))
}

fn overlaps(taken: &[Range<usize>], range: &Range<usize>) -> bool {
    taken.iter().any(|t| t.start < range.end && range.start < t.end)
}

fn is_ceiling(op: &str) -> bool {
    let op = op.to_lowercase();
    ["under", "below", "less", "at most", "up to", "no more", "max"]
        .iter()
        .any(|prefix| op.starts_with(prefix))
}

/// Extract directives from free-form text
pub fn parse(text: &str) -> Directives {
    let mut delta = FilterDelta::default();
    let mut taken: Vec<Range<usize>> = Vec::new();

    for caps in BETWEEN.captures_iter(text) {
        let (Some(whole), Some(lo), Some(hi)) = (caps.get(0), caps.name("lo"), caps.name("hi")) else {
            continue;
        };
        // "between 300 and 500k": the upper suffix scales both ends
        let hi_suffix = caps.name("hi_suffix").map(|m| m.as_str());
        let lo_suffix = caps.name("lo_suffix").map(|m| m.as_str()).or(hi_suffix);
        let (Some((lo, lo_money)), Some((hi, hi_money))) =
            (amount(lo.as_str(), lo_suffix), amount(hi.as_str(), hi_suffix))
        else {
            continue;
        };
        let (low, high) = (lo.min(hi), lo.max(hi));

        match unit_of(caps.name("unit").map(|m| m.as_str())) {
            Unit::Price => {
                let priced = |value: f64, money: bool| money || value >= MIN_BARE_PRICE;
                if !(priced(lo, lo_money) && priced(hi, hi_money)) {
                    continue;
                }
                delta.price_min = Some(low.round() as u64);
                delta.price_max = Some(high.round() as u64);
            }
            Unit::Sqft => delta.sqft_max = Some(high.round() as u32),
            Unit::Beds => {
                delta.beds_min = Some(low.round() as u32);
                delta.beds_max = Some(high.round() as u32);
            }
            Unit::Baths => {
                delta.baths_min = Some(low.round() as u32);
                delta.baths_max = Some(high.round() as u32);
            }
        }
        taken.push(whole.range());
    }

    for caps in BOUND.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if overlaps(&taken, &whole.range()) {
            continue;
        }
        let (Some(op), Some(num)) = (caps.name("op"), caps.name("num")) else {
            continue;
        };
        let Some((value, explicit)) = amount(num.as_str(), caps.name("suffix").map(|m| m.as_str())) else {
            continue;
        };
        let ceiling = is_ceiling(op.as_str());

        match unit_of(caps.name("unit").map(|m| m.as_str())) {
            Unit::Price if explicit || value >= MIN_BARE_PRICE => {
                let value = value.round() as u64;
                if ceiling {
                    delta.price_max = Some(value);
                } else {
                    delta.price_min = Some(value);
                }
            }
            Unit::Price => continue,
            Unit::Sqft if ceiling => delta.sqft_max = Some(value.round() as u32),
            Unit::Sqft => continue,
            Unit::Beds if ceiling => delta.beds_max = Some(value.round() as u32),
            Unit::Beds => delta.beds_min = Some(value.round() as u32),
            Unit::Baths if ceiling => delta.baths_max = Some(value.round() as u32),
            Unit::Baths => delta.baths_min = Some(value.round() as u32),
        }
        taken.push(whole.range());
    }

    for caps in COUNT.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if overlaps(&taken, &whole.range()) {
            continue;
        }
        let Some(count) = caps.name("n").and_then(|m| m.as_str().parse::<u32>().ok()) else {
            continue;
        };
        match unit_of(caps.name("unit").map(|m| m.as_str())) {
            Unit::Beds => delta.beds_min = Some(count),
            Unit::Baths => delta.baths_min = Some(count),
            _ => continue,
        }
        taken.push(whole.range());
    }

    let sort = SORT_BY
        .captures(text)
        .or_else(|| FIRST.captures(text))
        .and_then(|caps| caps.name("token").map(|m| m.as_str().to_string()))
        .and_then(|token| sort::normalize(&token));

    let directives = Directives { delta, sort };
    if !directives.is_empty() {
        debug!("Parsed directives from text: {:?}", directives);
    }
    directives
}
