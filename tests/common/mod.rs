#![allow(dead_code)]

use std::sync::Arc;

use property_analyzer::agents::Coordinator;
use property_analyzer::config::Config;
use property_analyzer::geo::PostalTable;

pub const CENSUS_KEY: &str = "census-test-key";
pub const GEMINI_KEY: &str = "gemini-test-key";
pub const BQ_TOKEN: &str = "bq-test-token";

/// Configuration with every external service pointed at one mock server.
pub fn config_for(uri: &str) -> Config {
    let mut config = Config::default();
    config.census.api_key = Some(CENSUS_KEY.to_string());
    config.census.base_url = uri.to_string();
    config.fema.base_url = uri.to_string();
    config.gemini.api_key = Some(GEMINI_KEY.to_string());
    config.gemini.base_url = uri.to_string();
    config.warehouse.access_token = Some(BQ_TOKEN.to_string());
    config.warehouse.base_url = uri.to_string();
    config.warehouse.project_id = "test-project".to_string();
    config.warehouse.dataset_id = "real_estate_dataset".to_string();
    config.timeout = 5;
    config
}

pub fn postal() -> Arc<PostalTable> {
    Arc::new(PostalTable::bundled())
}

pub fn coordinator(config: &Config) -> Coordinator {
    Coordinator::new(config, postal()).expect("coordinator")
}
