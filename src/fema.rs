use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::FemaSettings;
use crate::error::LookupError;
use crate::geo::PostalTable;
use crate::types::{FloodDeclaration, FloodReport};

pub const DECLARATIONS_PATH: &str = "/api/open/v2/DisasterDeclarationsSummaries";
pub const SELECT_FIELDS: &str = "disasterNumber,declarationDate,declarationTitle";
pub const ORDER_BY: &str = "declarationDate desc";
pub const MAX_DECLARATIONS: usize = 10;

#[derive(Debug, Deserialize)]
struct DeclarationsResponse {
    #[serde(rename = "DisasterDeclarationsSummaries", default)]
    summaries: Vec<FloodDeclaration>,
}

/// Strip a literal trailing " County" so the name matches OpenFEMA's
/// `designatedArea` convention, e.g. `Miami-Dade County` -> `Miami-Dade`.
///
/// This only covers counties. Parishes, boroughs and independent cities
/// will not match OpenFEMA's naming and simply return no declarations.
pub fn normalize_county(county_name: &str) -> &str {
    county_name.strip_suffix(" County").unwrap_or(county_name)
}

/// OData filter selecting flood declarations for one county.
pub fn flood_filter(state_code: &str, county: &str) -> String {
    format!(
        "state eq '{}' and designatedArea eq '{} (County)' and incidentType eq 'Flood'",
        escape_odata(state_code),
        escape_odata(county)
    )
}

fn escape_odata(value: &str) -> String {
    value.replace('\'', "''")
}

pub fn location_not_found(zip_code: &str) -> String {
    format!("Could not find location data for zip code {}.", zip_code)
}

/// Flood-history fetcher: zip code -> county -> OpenFEMA flood declarations.
#[derive(Debug, Clone)]
pub struct FemaClient {
    client: Client,
    settings: FemaSettings,
    postal: Arc<PostalTable>,
}

impl FemaClient {
    pub fn new(settings: FemaSettings, postal: Arc<PostalTable>) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout))
            .user_agent("property_analyzer/0.1.0")
            .build()
            .map_err(|e| LookupError::config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            settings,
            postal,
        })
    }

    pub async fn check_flood_history(&self, zip_code: &str) -> Result<FloodReport, LookupError> {
        let locality = self.postal.resolve(zip_code);
        if locality.is_missing() {
            return Err(LookupError::not_found(location_not_found(zip_code)));
        }
        // A row with a place but no state or county cannot be filtered on either.
        let (Some(state_code), Some(county_name)) =
            (locality.state_code.as_deref(), locality.county_name.as_deref())
        else {
            return Err(LookupError::not_found(location_not_found(zip_code)));
        };

        let county = normalize_county(county_name);
        debug!("Looking up FEMA data for {}, {}", county, state_code);

        let url = format!("{}{}", self.settings.base_url.trim_end_matches('/'), DECLARATIONS_PATH);
        let filter = flood_filter(state_code, county);
        let top = MAX_DECLARATIONS.to_string();
        let response = self
            .client
            .get(url)
            .query(&[
                ("$filter", filter.as_str()),
                ("$select", SELECT_FIELDS),
                ("$orderby", ORDER_BY),
                ("$top", top.as_str()),
            ])
            .send()
            .await
            .map_err(LookupError::from_reqwest)?
            .error_for_status()
            .map_err(LookupError::from_reqwest)?;

        let body: DeclarationsResponse = response.json().await.map_err(LookupError::from_reqwest)?;
        let mut declarations = body.summaries;
        declarations.truncate(MAX_DECLARATIONS);
        info!(
            "OpenFEMA returned {} flood declarations for {}, {}",
            declarations.len(),
            county,
            state_code
        );

        Ok(FloodReport {
            county: county.to_string(),
            state_code: state_code.to_string(),
            declarations,
        })
    }
}
