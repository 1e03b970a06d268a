//! Fuzzy resolution of free-form text ("that house on Maple St") to a listing.

use tracing::debug;

use crate::models::Listing;

const STOPWORDS: &[&str] = &[
    "http",
    "https",
    "www",
    "com",
    "www-zillow-com",
    "zillow",
    "zillow-com",
    "homedetails",
    "m",
    "app",
];

const MIN_SLUG_LEN: usize = 3;

/// Lowercase, hyphen-delimited form used for identity matching
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    for c in value.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

fn keep_slug(slug: &str) -> bool {
    slug.len() >= MIN_SLUG_LEN
        && !STOPWORDS.contains(&slug)
        && !slug.starts_with("http-")
        && !slug.starts_with("https-")
}

fn slug_tokens(slug: &str) -> Vec<&str> {
    slug.split('-')
        .filter(|t| !t.is_empty() && !STOPWORDS.contains(t))
        .collect()
}

/// Slugs that identify `listing`: detail URL, address variants and street-anchored components
pub fn identifying_slugs(listing: &Listing) -> Vec<String> {
    let mut slugs: Vec<String> = Vec::new();
    let mut add = |value: &str| {
        let slug = slugify(value);
        if keep_slug(&slug) && !slugs.contains(&slug) {
            slugs.push(slug);
        }
    };

    if let Some(url) = listing.detail_url.as_deref() {
        add(url);
        for segment in url.split('/') {
            add(segment);
        }
    }

    for label in [listing.display_address.as_deref(), listing.name.as_deref()]
        .into_iter()
        .flatten()
    {
        add(label);
        let segments: Vec<&str> = label.split(',').map(str::trim).collect();
        add(segments[0]);
        if segments.len() > 1 {
            add(&format!("{}, {}", segments[0], segments[1]));
            add(&format!("{} {}", segments[0], segments[1]));
        }
    }

    if let Some(street) = listing.street() {
        let mut combined = street.to_string();
        add(&combined);
        for part in [listing.city_name(), listing.state_code(), listing.zip_code()]
            .into_iter()
            .flatten()
        {
            combined = format!("{} {}", combined, part);
            add(&combined);
        }
    }

    slugs
}

fn contains_window(haystack: &[&str], needle: &[&str]) -> bool {
    !needle.is_empty()
        && needle.len() <= haystack.len()
        && haystack.windows(needle.len()).any(|window| window == needle)
}

fn mentions_label(lower: &str, text_slug: &str, label: &str) -> bool {
    let label_lower = label.trim().to_lowercase();
    if label_lower.is_empty() {
        return false;
    }
    let text = lower.trim();
    if text.contains(&label_lower) || (text.len() >= MIN_SLUG_LEN && label_lower.contains(text)) {
        return true;
    }

    let label_slug = slugify(&label_lower);
    !label_slug.is_empty()
        && !text_slug.is_empty()
        && (text_slug.contains(&label_slug)
            || (text_slug.len() >= MIN_SLUG_LEN && label_slug.contains(text_slug)))
}

/// Resolve a listing mentioned in `text`, first rule to match wins.
///
/// Rules: id containment, address containment, slug token windows, then `fallback`.
pub fn resolve_from_text<'a, I>(
    text: &str,
    candidates: I,
    fallback: Option<&dyn Fn(&Listing) -> bool>,
) -> Option<&'a Listing>
where
    I: IntoIterator<Item = &'a Listing>,
{
    let candidates: Vec<&Listing> = candidates.into_iter().collect();
    let lower = text.to_lowercase();
    if lower.trim().is_empty() {
        return None;
    }

    if let Some(found) = candidates.iter().find(|listing| {
        let zpid = listing.zpid.trim().to_lowercase();
        !zpid.is_empty() && lower.contains(&zpid)
    }) {
        debug!("Resolved listing {} by id", found.zpid);
        return Some(*found);
    }

    let text_slug = slugify(&lower);
    if let Some(found) = candidates.iter().find(|listing| {
        [listing.display_address.as_deref(), listing.name.as_deref()]
            .into_iter()
            .flatten()
            .any(|label| mentions_label(&lower, &text_slug, label))
    }) {
        debug!("Resolved listing {} by address", found.zpid);
        return Some(*found);
    }

    let input_tokens = slug_tokens(&text_slug);
    if !input_tokens.is_empty() {
        if let Some(found) = candidates.iter().find(|listing| {
            identifying_slugs(listing).iter().any(|slug| {
                let tokens = slug_tokens(slug);
                if tokens.len() <= input_tokens.len() {
                    contains_window(&input_tokens, &tokens)
                } else {
                    contains_window(&tokens, &input_tokens)
                }
            })
        }) {
            debug!("Resolved listing {} by slug", found.zpid);
            return Some(*found);
        }
    }

    let found = fallback.and_then(|predicate| candidates.iter().copied().find(|l| predicate(l)));
    if let Some(found) = found {
        debug!("Resolved listing {} by fallback", found.zpid);
    }
    found
}
