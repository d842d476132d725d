mod common;

use property_analyzer::orchestrator::{AnalysisRequest, Orchestrator};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mock_services(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/data/2021/acs/acs5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            ["NAME", "B01003_001E", "B19013_001E"],
            ["ZCTA5 33101", "4102", "48750"]
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/open/v2/DisasterDeclarationsSummaries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "DisasterDeclarationsSummaries": [{
                "disasterNumber": 4337,
                "declarationDate": "2017-09-10T00:00:00.000Z",
                "declarationTitle": "Hurricane Irma"
            }]
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/bigquery/v2/projects/test-project/queries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobComplete": true,
            "schema": {"fields": [{"name": "rent_2br", "type": "INTEGER"}]},
            "rows": [{"f": [{"v": "2480"}]}]
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .and(body_string_contains("Hurricane Irma (Disaster #4337)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "MEMORANDUM\nEXECUTIVE SUMMARY\nInvest."}]}}]
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn analysis_gathers_data_and_writes_memo() {
    let server = MockServer::start().await;
    mock_services(&server).await;
    let out_dir = tempfile::tempdir().unwrap();

    let config = common::config_for(&server.uri());
    let orchestrator = Orchestrator::new(common::coordinator(&config), common::postal());
    let request = AnalysisRequest {
        zip_code: "33101".into(),
        queries: vec!["SELECT rent_2br FROM safmr_2025 WHERE zip_code = '33101'".into()],
        notes: Some("Client prefers multifamily.".into()),
    };

    let outcome = orchestrator.run(&request, out_dir.path()).await.unwrap();

    assert!(outcome.analysis.contains("LOCATION: Miami, FL (Miami-Dade county)"));
    assert!(outcome.analysis.contains("\"median_household_income\":\"$48750\""));
    assert!(outcome.analysis.contains("- 2017-09-10: Hurricane Irma (Disaster #4337)"));
    assert!(outcome.analysis.contains("\"rent_2br\":2480"));
    assert!(outcome.analysis.ends_with("ANALYST NOTES:\nClient prefers multifamily."));
    assert_eq!(outcome.memo, "MEMORANDUM\nEXECUTIVE SUMMARY\nInvest.");

    let saved_memo = std::fs::read_to_string(&outcome.memo_path).unwrap();
    assert_eq!(saved_memo, outcome.memo);
    let saved_analysis = std::fs::read_to_string(&outcome.analysis_path).unwrap();
    assert_eq!(saved_analysis, outcome.analysis);
}

#[tokio::test]
async fn unknown_zip_still_produces_a_memo_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .and(body_string_contains("Could not find location data for zip code 99999."))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "MEMORANDUM"}]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = common::config_for(&server.uri());
    config.census.api_key = None;
    let orchestrator = Orchestrator::new(common::coordinator(&config), common::postal());
    let out_dir = tempfile::tempdir().unwrap();

    let outcome = orchestrator
        .run(
            &AnalysisRequest {
                zip_code: "99999".into(),
                ..Default::default()
            },
            out_dir.path(),
        )
        .await
        .unwrap();

    assert!(outcome.analysis.contains("LOCATION: unknown location"));
    assert!(outcome.analysis.contains("Error: Census API Key not configured."));
    assert_eq!(outcome.memo, "MEMORANDUM");
}
