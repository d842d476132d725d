use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::error::LookupError;
use crate::types::PostalLocality;

/// Bundled subset of the GeoNames US postal table, used when no full table is configured.
const SAMPLE_TABLE: &str = include_str!("../data/us_postal_sample.txt");

#[derive(Debug, Clone, PartialEq, Eq)]
struct PostalRow {
    place_name: String,
    state_code: String,
    county_name: String,
}

/// Offline postal-code geography, keyed by postal code.
///
/// Rows use the GeoNames tab-separated layout:
/// `country, postal code, place, state name, state code, county, county code, ...`.
#[derive(Debug, Clone, Default)]
pub struct PostalTable {
    rows: HashMap<String, PostalRow>,
}

impl PostalTable {
    pub fn bundled() -> Self {
        Self::parse(SAMPLE_TABLE)
    }

    pub async fn from_path(path: &Path) -> Result<Self, LookupError> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            LookupError::config(format!(
                "Failed to read postal table {}: {}",
                path.display(),
                e
            ))
        })?;
        let table = Self::parse(&raw);
        if table.is_empty() {
            return Err(LookupError::config(format!(
                "Postal table {} contains no usable rows",
                path.display()
            )));
        }
        info!("Loaded {} postal codes from {}", table.len(), path.display());
        Ok(table)
    }

    /// Load from `path` when given, otherwise fall back to the bundled sample.
    pub async fn load(path: Option<&Path>) -> Result<Self, LookupError> {
        match path {
            Some(p) => Self::from_path(p).await,
            None => {
                let table = Self::bundled();
                info!("Using bundled postal table ({} postal codes)", table.len());
                Ok(table)
            }
        }
    }

    /// Parse GeoNames rows. Malformed lines are skipped; the first row for a code wins.
    pub fn parse(raw: &str) -> Self {
        let mut rows = HashMap::new();
        let mut skipped = 0usize;
        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let cols: Vec<&str> = line.split('\t').collect();
            if cols.len() < 6 || cols[1].trim().is_empty() {
                skipped += 1;
                continue;
            }
            rows.entry(normalize_code(cols[1])).or_insert_with(|| PostalRow {
                place_name: cols[2].trim().to_string(),
                state_code: cols[4].trim().to_string(),
                county_name: cols[5].trim().to_string(),
            });
        }
        if skipped > 0 {
            debug!("Skipped {} malformed postal table rows", skipped);
        }
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Resolve a postal code. The input is not format-checked; unknown codes
    /// yield a locality with no place name.
    pub fn resolve(&self, postal_code: &str) -> PostalLocality {
        let key = normalize_code(postal_code);
        match self.rows.get(&key) {
            Some(row) if !row.place_name.is_empty() => PostalLocality {
                postal_code: postal_code.to_string(),
                place_name: Some(row.place_name.clone()),
                state_code: non_empty(&row.state_code),
                county_name: non_empty(&row.county_name),
            },
            _ => PostalLocality::missing(postal_code),
        }
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() { None } else { Some(value.to_string()) }
}
