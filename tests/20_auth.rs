mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn login_rejects_malformed_email_before_touching_the_database() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/auth/login", server.base_url))
        .json(&json!({ "email": "not-an-email", "password": "whatever" }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = resp.json().await?;
    assert_eq!(body["error"], "Validation failed");
    assert!(body["details"]["email"].is_string());
    Ok(())
}

#[tokio::test]
async fn login_requires_a_password() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/auth/login", server.base_url))
        .json(&json!({ "email": "user@example.com", "password": "" }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = resp.json().await?;
    assert_eq!(body["details"]["password"], "Password is required");
    Ok(())
}

#[tokio::test]
async fn register_collects_field_errors() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    // Short name, weak password: both fields should be reported at once
    let resp = client
        .post(format!("{}/api/auth/register", server.base_url))
        .json(&json!({
            "name": "Shorty",
            "email": "shorty@example.com",
            "password": "weak",
            "address": "1 Main St"
        }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = resp.json().await?;
    assert_eq!(body["error"], "Validation failed");
    assert!(body["details"]["name"].is_string());
    assert!(body["details"]["password"].is_string());
    assert!(body["details"].get("email").is_none());
    Ok(())
}

#[tokio::test]
async fn wrongly_typed_fields_get_the_json_error_envelope() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    // A number where a string belongs must not fall through to axum's
    // plain-text 422 rejection
    let resp = client
        .post(format!("{}/api/auth/login", server.base_url))
        .json(&json!({ "email": 5, "password": "whatever" }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = resp.json().await?;
    assert!(body["error"].is_string());
    Ok(())
}

#[tokio::test]
async fn malformed_json_bodies_get_the_json_error_envelope() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/auth/register", server.base_url))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = resp.json().await?;
    assert!(body["error"].is_string());
    Ok(())
}

#[tokio::test]
async fn profile_requires_a_token() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{}/api/auth/profile", server.base_url)).send().await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = resp.json().await?;
    assert_eq!(body["error"], "Access token required");
    Ok(())
}

#[tokio::test]
async fn change_password_requires_a_token() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let resp = client
        .put(format!("{}/api/auth/change-password", server.base_url))
        .json(&json!({ "currentPassword": "old", "newPassword": "New!Pass1" }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
