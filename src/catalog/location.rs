//! Location query matching with US state name/abbreviation equivalence.

const STATES: &[(&str, &str)] = &[
    ("alabama", "al"),
    ("alaska", "ak"),
    ("arizona", "az"),
    ("arkansas", "ar"),
    ("california", "ca"),
    ("colorado", "co"),
    ("connecticut", "ct"),
    ("delaware", "de"),
    ("district of columbia", "dc"),
    ("florida", "fl"),
    ("georgia", "ga"),
    ("hawaii", "hi"),
    ("idaho", "id"),
    ("illinois", "il"),
    ("indiana", "in"),
    ("iowa", "ia"),
    ("kansas", "ks"),
    ("kentucky", "ky"),
    ("louisiana", "la"),
    ("maine", "me"),
    ("maryland", "md"),
    ("massachusetts", "ma"),
    ("michigan", "mi"),
    ("minnesota", "mn"),
    ("mississippi", "ms"),
    ("missouri", "mo"),
    ("montana", "mt"),
    ("nebraska", "ne"),
    ("nevada", "nv"),
    ("new hampshire", "nh"),
    ("new jersey", "nj"),
    ("new mexico", "nm"),
    ("new york", "ny"),
    ("north carolina", "nc"),
    ("north dakota", "nd"),
    ("ohio", "oh"),
    ("oklahoma", "ok"),
    ("oregon", "or"),
    ("pennsylvania", "pa"),
    ("rhode island", "ri"),
    ("south carolina", "sc"),
    ("south dakota", "sd"),
    ("tennessee", "tn"),
    ("texas", "tx"),
    ("utah", "ut"),
    ("vermont", "vt"),
    ("virginia", "va"),
    ("washington", "wa"),
    ("west virginia", "wv"),
    ("wisconsin", "wi"),
    ("wyoming", "wy"),
];

/// Full name and abbreviation for a state given either form
pub fn normalize_state(value: &str) -> Option<(&'static str, &'static str)> {
    let lower = value.trim().to_lowercase();
    STATES
        .iter()
        .find(|(name, abbr)| *name == lower || *abbr == lower)
        .copied()
}

/// Lowercased alphanumeric tokens
pub fn tokenize(value: &str) -> Vec<String> {
    value
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// One group of acceptable spellings per query token
pub fn location_groups(query: &str) -> Vec<Vec<String>> {
    tokenize(query)
        .into_iter()
        .map(|token| {
            let mut group = vec![token.clone()];
            if let Some((name, abbr)) = normalize_state(&token) {
                for variant in [name, abbr] {
                    if !group.iter().any(|g| g == variant) {
                        group.push(variant.to_string());
                    }
                }
            }
            group
        })
        .collect()
}

/// Spellings this short only match a whole haystack token
const MAX_TOKEN_ONLY_LEN: usize = 2;

/// Every group must have at least one spelling present in the haystack
pub fn matches_groups(haystack: &str, groups: &[Vec<String>]) -> bool {
    let tokens = tokenize(haystack);
    groups.iter().all(|group| {
        group.iter().any(|option| {
            if option.len() <= MAX_TOKEN_ONLY_LEN {
                tokens.iter().any(|token| token == option)
            } else {
                haystack.contains(option.as_str())
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_variants_work_both_ways() {
        assert_eq!(normalize_state("Texas"), Some(("texas", "tx")));
        assert_eq!(normalize_state(" TX "), Some(("texas", "tx")));
        assert_eq!(normalize_state("Springfield"), None);

        let haystack = "123 main st austin tx 78701";
        assert!(matches_groups(haystack, &location_groups("Austin, Texas")));

        let haystack = "9 elm st portland oregon";
        assert!(matches_groups(haystack, &location_groups("Portland OR")));
        assert!(!matches_groups(haystack, &location_groups("Portland Maine")));
    }

    #[test]
    fn state_abbreviations_match_whole_tokens_only() {
        let groups = location_groups("Indiana");
        assert!(!matches_groups("100 main st springfield il 62704", &groups));
        assert!(matches_groups("5 oak ave bloomington in 47401", &groups));
        assert!(matches_groups("5 oak ave bloomington indiana", &groups));

        assert!(matches_groups("1408 w 9th st austin tx 78703", &location_groups("aus")));
    }
}
