mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn health_reports_database_status() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{}/health", server.base_url)).send().await?;
    let status = resp.status();
    let body: Value = resp.json().await?;

    match status {
        StatusCode::OK => {
            assert_eq!(body["status"], "OK");
            assert_eq!(body["database"], "Connected");
        }
        StatusCode::SERVICE_UNAVAILABLE => {
            assert_eq!(body["status"], "Error");
            assert_eq!(body["database"], "Disconnected");
        }
        other => panic!("unexpected health status {}", other),
    }
    assert!(body["timestamp"].is_string());
    Ok(())
}

#[tokio::test]
async fn root_lists_api_surfaces() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let resp = client.get(&server.base_url).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await?;
    assert_eq!(body["message"], "Store Rating System API");
    assert_eq!(body["endpoints"]["stores"], "/api/stores");
    assert_eq!(body["endpoints"]["dashboard"], "/api/dashboard");
    Ok(())
}

#[tokio::test]
async fn unknown_routes_get_structured_404() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{}/api/nope", server.base_url)).send().await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = resp.json().await?;
    assert_eq!(body["error"], "Route not found");
    assert_eq!(body["path"], "/api/nope");
    assert_eq!(body["method"], "GET");
    Ok(())
}
