use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

use super::Catalog;
use crate::models::Listing;

/// Load the static seed set: a JSON array of listing records
pub async fn load_seed(path: impl AsRef<Path>) -> Result<Catalog> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read seed listings from {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Seed file {} is not valid JSON", path.display()))?;

    let Value::Array(items) = value else {
        bail!("Seed file {} must contain a JSON array of listings", path.display());
    };

    let mut catalog = Catalog::new();
    for (i, item) in items.into_iter().enumerate() {
        let item = normalize_identity(item);
        match serde_json::from_value::<Listing>(item) {
            Ok(listing) => {
                catalog.upsert(listing);
            }
            Err(e) => warn!("Skipping seed record #{}: {}", i, e),
        }
    }

    info!("📦 Loaded {} seed listings from {}", catalog.len(), path.display());
    Ok(catalog)
}

/// Records keyed by `id` instead of `zpid` are accepted
fn normalize_identity(mut item: Value) -> Value {
    if let Value::Object(map) = &mut item {
        if map.get("zpid").map_or(true, Value::is_null) {
            if let Some(id) = map.remove("id") {
                map.insert("zpid".to_string(), id);
            }
        }
    }
    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn loads_records_and_skips_anonymous_ones() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"zpid": 101, "displayAddress": "1 Oak St, Austin, TX", "priceRaw": 350000}},
                {{"id": "102", "displayAddress": "2 Pine Rd, Denver, CO"}},
                {{"displayAddress": "no identity"}},
                {{"zpid": "101", "beds": 3}}
            ]"#
        )
        .unwrap();

        let catalog = load_seed(file.path()).await.unwrap();
        assert_eq!(catalog.len(), 2);
        let merged = catalog.get("101").unwrap();
        assert_eq!(merged.beds, Some(3.0));
        assert_eq!(merged.price_raw, Some(350_000.0));
        assert!(catalog.contains("102"));
    }

    #[tokio::test]
    async fn rejects_non_array_seed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"zpid": "1"}}"#).unwrap();
        assert!(load_seed(file.path()).await.is_err());
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_seed(dir.path().join("absent.json")).await.is_err());
    }
}
