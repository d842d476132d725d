mod common;

use google_cloud_auth::credentials::{Credentials, user_account};
use property_analyzer::warehouse::BigQueryClient;
use serde_json::json;
use wiremock::matchers::{bearer_token, body_partial_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const QUERIES: &str = "/bigquery/v2/projects/test-project/queries";
const TABLES: &str = "/bigquery/v2/projects/test-project/datasets/real_estate_dataset/tables";

fn client(config: &property_analyzer::Config) -> BigQueryClient {
    BigQueryClient::new(config.warehouse.clone(), config.timeout).unwrap()
}

#[tokio::test]
async fn select_runs_against_default_dataset() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(QUERIES))
        .and(bearer_token(common::BQ_TOKEN))
        .and(body_partial_json(json!({
            "query": "SELECT zip_code, rent_2br FROM safmr_2025 WHERE zip_code = '33101'",
            "useLegacySql": false,
            "maxResults": 50,
            "defaultDataset": {"projectId": "test-project", "datasetId": "real_estate_dataset"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobComplete": true,
            "totalRows": "1",
            "schema": {"fields": [
                {"name": "zip_code", "type": "STRING"},
                {"name": "rent_2br", "type": "INTEGER"}
            ]},
            "rows": [{"f": [{"v": "33101"}, {"v": "2480"}]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = common::config_for(&server.uri());
    let result = client(&config)
        .execute_sql("SELECT zip_code, rent_2br FROM safmr_2025 WHERE zip_code = '33101'")
        .await
        .unwrap();
    assert_eq!(result.columns, vec!["zip_code", "rent_2br"]);
    assert_eq!(result.total_rows, 1);
    assert_eq!(result.rows[0]["rent_2br"], json!(2480));
}

#[tokio::test]
async fn writes_are_blocked_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = common::config_for(&server.uri());
    let output = common::coordinator(&config)
        .invoke("execute_sql", json!({"query": "UPDATE realtor_daat SET price = 0 WHERE true"}))
        .await;
    assert_eq!(output, "Write operations are blocked: UPDATE statements are not allowed");
}

#[tokio::test]
async fn incomplete_job_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(QUERIES))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jobComplete": false})))
        .mount(&server)
        .await;

    let config = common::config_for(&server.uri());
    let output = common::coordinator(&config)
        .invoke("execute_sql", json!({"query": "SELECT 1"}))
        .await;
    assert_eq!(
        output,
        "Error querying BigQuery: query did not complete within the request timeout"
    );
}

#[tokio::test]
async fn api_error_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(QUERIES))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "Unrecognized name: rent"}
        })))
        .mount(&server)
        .await;

    let config = common::config_for(&server.uri());
    let output = common::coordinator(&config)
        .invoke("execute_sql", json!({"query": "SELECT rent FROM safmr_2025"}))
        .await;
    assert_eq!(output, "Error querying BigQuery: HTTP 400: Unrecognized name: rent");
}

#[tokio::test]
async fn lists_tables_and_describes_one() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLES))
        .and(bearer_token(common::BQ_TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tables": [
                {"tableReference": {"projectId": "test-project", "datasetId": "real_estate_dataset", "tableId": "realtor_daat"}},
                {"tableReference": {"projectId": "test-project", "datasetId": "real_estate_dataset", "tableId": "safmr_2025"}}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/safmr_2025", TABLES)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "numRows": "27000",
            "schema": {"fields": [{"name": "zip_code", "type": "STRING"}]}
        })))
        .mount(&server)
        .await;

    let config = common::config_for(&server.uri());
    let bq = client(&config);
    assert_eq!(bq.list_table_ids().await.unwrap(), vec!["realtor_daat", "safmr_2025"]);

    let info = bq.get_table_info("safmr_2025").await.unwrap();
    assert_eq!(info["num_rows"], "27000");
    assert_eq!(info["schema"]["fields"][0]["name"], "zip_code");

    let err = bq.get_table_info("safmr_2025/../x").await.unwrap_err();
    assert_eq!(err.kind(), "parse");
}

/// Authorized-user credentials whose token exchange hits the mock server.
fn user_credentials(server: &MockServer) -> Credentials {
    user_account::Builder::new(json!({
        "type": "authorized_user",
        "client_id": "test-client.apps.googleusercontent.com",
        "client_secret": "test-secret",
        "refresh_token": "test-refresh-token",
        "token_uri": format!("{}/token", server.uri()),
    }))
    .build()
    .unwrap()
}

#[tokio::test]
async fn default_credentials_authorize_requests_without_a_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("test-refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "adc-access-token",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(TABLES))
        .and(bearer_token("adc-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tables": [{"tableReference": {"tableId": "realtor_daat"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(QUERIES))
        .and(bearer_token("adc-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobComplete": true,
            "schema": {"fields": [{"name": "f0_", "type": "INTEGER"}]},
            "rows": [{"f": [{"v": "1"}]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = common::config_for(&server.uri());
    config.warehouse.access_token = None;
    let bq = BigQueryClient::with_credentials(
        config.warehouse.clone(),
        config.timeout,
        user_credentials(&server),
    )
    .unwrap();

    assert_eq!(bq.list_table_ids().await.unwrap(), vec!["realtor_daat"]);
    let result = bq.execute_sql("SELECT 1").await.unwrap();
    assert_eq!(result.rows[0]["f0_"], json!(1));
}

#[tokio::test]
async fn rejected_credentials_never_reach_the_warehouse() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(TABLES))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = common::config_for(&server.uri());
    let bq = BigQueryClient::with_credentials(
        config.warehouse.clone(),
        config.timeout,
        user_credentials(&server),
    )
    .unwrap();

    let err = bq.list_table_ids().await.unwrap_err();
    assert_eq!(err.kind(), "config");
    assert!(err.to_string().starts_with("Error: BigQuery credentials unavailable"));
}
