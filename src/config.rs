use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use url::Url;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_CENSUS_BASE_URL: &str = "https://api.census.gov";
pub const DEFAULT_CENSUS_YEAR: &str = "2021";
pub const DEFAULT_FEMA_BASE_URL: &str = "https://www.fema.gov";
pub const DEFAULT_FEMA_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_BIGQUERY_BASE_URL: &str = "https://bigquery.googleapis.com";
pub const DEFAULT_BQ_PROJECT_ID: &str = "ccibt-hack25ww7-751";
pub const DEFAULT_BQ_DATASET_ID: &str = "real_estate_dataset";
pub const DEFAULT_BQ_MAX_ROWS: u32 = 50;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const RENTCAST_PLACEHOLDER: &str = "YOUR_RENTCAST_API_KEY";

/// Hosted generative-text model settings.
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

/// Statistical-data (Census ACS) settings.
#[derive(Debug, Clone)]
pub struct CensusSettings {
    /// `None` when unset or still a placeholder.
    pub api_key: Option<String>,
    pub base_url: String,
    pub year: String,
}

#[derive(Debug, Clone)]
pub struct FemaSettings {
    pub base_url: String,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct WarehouseSettings {
    pub project_id: String,
    pub dataset_id: String,
    /// Static bearer token; Application Default Credentials are used when unset.
    pub access_token: Option<String>,
    pub base_url: String,
    pub max_rows: u32,
}

/// Application configuration, loaded once at startup and handed to each
/// component when it is constructed.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini: GeminiSettings,
    pub census: CensusSettings,
    pub fema: FemaSettings,
    pub warehouse: WarehouseSettings,
    /// GeoNames-format postal table; the bundled sample is used when unset.
    pub postal_table_path: Option<PathBuf>,
    /// Rental-listings key. Carried for completeness, no component calls the API.
    pub rentcast_api_key: Option<String>,
    /// Timeout in seconds for calls without a dedicated one.
    pub timeout: u64,
}

impl Config {
    /// Load from the process environment. Call `dotenv::dotenv()` first to pick up `.env`.
    pub fn load() -> Result<Self> {
        let config = Self::from_source(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Build from an arbitrary key lookup without validating.
    pub fn from_source<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let census_key = get("CENSUS_API_KEY");
        if census_key.as_deref().is_some_and(is_placeholder) {
            tracing::warn!("CENSUS_API_KEY is a placeholder; demographics lookups are disabled");
        }

        let fema_timeout = match get("FEMA_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().context("FEMA_TIMEOUT_SECS must be an integer")?,
            None => DEFAULT_FEMA_TIMEOUT_SECS,
        };
        let timeout = match get("HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().context("HTTP_TIMEOUT_SECS must be an integer")?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };
        let max_rows = match get("BQ_MAX_ROWS") {
            Some(raw) => raw.parse::<u32>().context("BQ_MAX_ROWS must be an integer")?,
            None => DEFAULT_BQ_MAX_ROWS,
        };

        Ok(Self {
            gemini: GeminiSettings {
                api_key: get("GEMINI_API_KEY")
                    .or_else(|| get("GOOGLE_API_KEY"))
                    .filter(|k| !is_placeholder(k)),
                model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                base_url: get("GEMINI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            },
            census: CensusSettings {
                api_key: census_key.filter(|k| !is_placeholder(k)),
                base_url: get("CENSUS_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_CENSUS_BASE_URL.to_string()),
                year: get("CENSUS_YEAR").unwrap_or_else(|| DEFAULT_CENSUS_YEAR.to_string()),
            },
            fema: FemaSettings {
                base_url: get("FEMA_BASE_URL").unwrap_or_else(|| DEFAULT_FEMA_BASE_URL.to_string()),
                timeout: fema_timeout,
            },
            warehouse: WarehouseSettings {
                project_id: get("BQ_PROJECT_ID").unwrap_or_else(|| DEFAULT_BQ_PROJECT_ID.to_string()),
                dataset_id: get("BQ_DATASET_ID").unwrap_or_else(|| DEFAULT_BQ_DATASET_ID.to_string()),
                access_token: get("BIGQUERY_ACCESS_TOKEN"),
                base_url: get("BIGQUERY_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_BIGQUERY_BASE_URL.to_string()),
                max_rows,
            },
            postal_table_path: get("POSTAL_TABLE_PATH").map(PathBuf::from),
            rentcast_api_key: Some(
                get("RENTCAST_API_KEY").unwrap_or_else(|| RENTCAST_PLACEHOLDER.to_string()),
            )
            .filter(|k| !is_placeholder(k)),
            timeout,
        })
    }

    pub fn validate(&self) -> Result<()> {
        for (name, raw) in [
            ("GEMINI_BASE_URL", &self.gemini.base_url),
            ("CENSUS_BASE_URL", &self.census.base_url),
            ("FEMA_BASE_URL", &self.fema.base_url),
            ("BIGQUERY_BASE_URL", &self.warehouse.base_url),
        ] {
            Url::parse(raw).with_context(|| format!("{} is not a valid URL: {}", name, raw))?;
        }
        if self.gemini.model.is_empty() {
            bail!("GEMINI_MODEL must not be empty");
        }
        if self.census.year.len() != 4 || !self.census.year.chars().all(|c| c.is_ascii_digit()) {
            bail!("CENSUS_YEAR must be a four digit year, got {}", self.census.year);
        }
        if self.fema.timeout == 0 || self.timeout == 0 {
            bail!("timeouts must be greater than zero");
        }
        if self.warehouse.project_id.is_empty() || self.warehouse.dataset_id.is_empty() {
            bail!("BQ_PROJECT_ID and BQ_DATASET_ID must not be empty");
        }
        if self.warehouse.max_rows == 0 {
            bail!("BQ_MAX_ROWS must be greater than zero");
        }
        if let Some(path) = &self.postal_table_path
            && !path.exists()
        {
            bail!("POSTAL_TABLE_PATH does not exist: {}", path.display());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini: GeminiSettings {
                api_key: None,
                model: DEFAULT_MODEL.to_string(),
                base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            },
            census: CensusSettings {
                api_key: None,
                base_url: DEFAULT_CENSUS_BASE_URL.to_string(),
                year: DEFAULT_CENSUS_YEAR.to_string(),
            },
            fema: FemaSettings {
                base_url: DEFAULT_FEMA_BASE_URL.to_string(),
                timeout: DEFAULT_FEMA_TIMEOUT_SECS,
            },
            warehouse: WarehouseSettings {
                project_id: DEFAULT_BQ_PROJECT_ID.to_string(),
                dataset_id: DEFAULT_BQ_DATASET_ID.to_string(),
                access_token: None,
                base_url: DEFAULT_BIGQUERY_BASE_URL.to_string(),
                max_rows: DEFAULT_BQ_MAX_ROWS,
            },
            postal_table_path: None,
            rentcast_api_key: None,
            timeout: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

/// Keys copied from a template (`YOUR_...`) count as unset.
pub fn is_placeholder(key: &str) -> bool {
    key.contains("YOUR_")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_source(|key| map.get(key).cloned()).unwrap()
    }

    #[test]
    fn defaults_match_reference_services() {
        let cfg = config_from(&[]);
        assert_eq!(cfg.gemini.model, "gemini-2.5-flash");
        assert_eq!(cfg.census.year, "2021");
        assert_eq!(cfg.fema.timeout, 10);
        assert_eq!(cfg.warehouse.dataset_id, "real_estate_dataset");
        assert!(cfg.census.api_key.is_none());
        assert!(cfg.rentcast_api_key.is_none());
        cfg.validate().unwrap();
    }

    #[test]
    fn placeholder_keys_are_treated_as_unset() {
        let cfg = config_from(&[
            ("CENSUS_API_KEY", "YOUR_CENSUS_API_KEY"),
            ("GEMINI_API_KEY", "YOUR_GEMINI_KEY"),
        ]);
        assert!(cfg.census.api_key.is_none());
        assert!(cfg.gemini.api_key.is_none());
    }

    #[test]
    fn google_api_key_is_a_fallback() {
        let cfg = config_from(&[("GOOGLE_API_KEY", "g-123"), ("CENSUS_API_KEY", " abc ")]);
        assert_eq!(cfg.gemini.api_key.as_deref(), Some("g-123"));
        assert_eq!(cfg.census.api_key.as_deref(), Some("abc"));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let cfg = config_from(&[("FEMA_BASE_URL", "not a url")]);
        assert!(cfg.validate().is_err());

        let cfg = config_from(&[("CENSUS_YEAR", "21")]);
        assert!(cfg.validate().is_err());

        let cfg = config_from(&[("FEMA_TIMEOUT_SECS", "0")]);
        assert!(cfg.validate().is_err());

        let map: HashMap<&str, &str> = [("FEMA_TIMEOUT_SECS", "ten")].into_iter().collect();
        assert!(Config::from_source(|k| map.get(k).map(|v| v.to_string())).is_err());
    }
}
