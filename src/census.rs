use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::CensusSettings;
use crate::error::LookupError;
use crate::types::DemographicsRecord;

/// ACS variables: name, total population, median household income.
pub const ACS_VARIABLES: &str = "NAME,B01003_001E,B19013_001E";

pub const KEY_NOT_CONFIGURED: &str = "Error: Census API Key not configured.";
pub const DEMOGRAPHICS_NOT_FOUND: &str = "Demographic data not found for this zip code.";

/// Demographics fetcher over the Census ACS 5-year API.
#[derive(Debug, Clone)]
pub struct CensusClient {
    client: Client,
    settings: CensusSettings,
}

impl CensusClient {
    pub fn new(settings: CensusSettings, timeout: u64) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .user_agent("property_analyzer/0.1.0")
            .build()
            .map_err(|e| LookupError::config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, settings })
    }

    pub fn is_configured(&self) -> bool {
        self.settings.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/data/{}/acs/acs5",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.year
        )
    }

    /// Population and median household income for a zip code tabulation area.
    pub async fn get_demographics(&self, zip_code: &str) -> Result<DemographicsRecord, LookupError> {
        let Some(api_key) = self.settings.api_key.as_deref() else {
            return Err(LookupError::config(KEY_NOT_CONFIGURED));
        };

        info!("Fetching ACS {} demographics for {}", self.settings.year, zip_code);
        let area = format!("zip code tabulation area:{}", zip_code);
        let response = self
            .client
            .get(self.endpoint())
            .query(&[("get", ACS_VARIABLES), ("for", area.as_str()), ("key", api_key)])
            .send()
            .await
            .map_err(LookupError::from_reqwest)?;

        let status = response.status();
        let body = response.text().await.map_err(LookupError::from_reqwest)?;
        if !status.is_success() {
            return Err(LookupError::transport(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }
        // The API answers an unknown area with an empty body rather than an empty table.
        if body.trim().is_empty() {
            return Err(LookupError::not_found(DEMOGRAPHICS_NOT_FOUND));
        }

        let table: Vec<Vec<Value>> = serde_json::from_str(&body)?;
        debug!("Census returned {} rows for {}", table.len(), zip_code);
        parse_table(zip_code, &table)
    }
}

/// Header row first, then one data row with values in request order.
fn parse_table(zip_code: &str, table: &[Vec<Value>]) -> Result<DemographicsRecord, LookupError> {
    let Some(row) = table.get(1) else {
        return Err(LookupError::not_found(DEMOGRAPHICS_NOT_FOUND));
    };
    if row.len() < 3 {
        return Err(LookupError::parse(format!(
            "expected 3 columns in data row, got {}",
            row.len()
        )));
    }
    Ok(DemographicsRecord {
        zip_code: zip_code.to_string(),
        population: cell(&row[1]),
        median_household_income: format!("${}", cell(&row[2])),
    })
}

fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "N/A".to_string(),
        other => other.to_string(),
    }
}
