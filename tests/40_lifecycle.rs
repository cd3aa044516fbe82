// End-to-end scenarios against a live Postgres. Each test no-ops when
// DATABASE_URL is not set; the schema from migrations/ must be applied.

mod common;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

const NAME: &str = "Integration Coverage Person";
const PASSWORD: &str = "Str0ng!pass";

fn database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok()
}

fn unique(tag: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}-{}", tag, nanos)
}

async fn register(
    client: &reqwest::Client,
    base: &str,
    email: &str,
    address: &str,
) -> Result<(String, String)> {
    let resp = client
        .post(format!("{}/api/auth/register", base))
        .json(&json!({ "name": NAME, "email": email, "password": PASSWORD, "address": address }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::CREATED, "registration of {} failed", email);

    let body: Value = resp.json().await?;
    let token = body["token"].as_str().context("missing token")?.to_string();
    let id = body["user"]["id"].as_str().context("missing user id")?.to_string();
    Ok((token, id))
}

async fn promote_to_admin(db_url: &str, email: &str) -> Result<()> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(1)
        .connect(db_url)
        .await?;
    sqlx::query("UPDATE users SET role = 'admin' WHERE email = $1")
        .bind(email)
        .execute(&pool)
        .await?;
    Ok(())
}

/// Registers a fresh account and promotes it to admin directly in the
/// database; the middleware re-fetches the role per request, so the
/// registration token gains admin rights immediately.
async fn setup_admin(client: &reqwest::Client, base: &str, db_url: &str) -> Result<String> {
    let email = format!("{}@example.com", unique("admin"));
    let (token, _) = register(client, base, &email, "1 Admin Way").await?;
    promote_to_admin(db_url, &email).await?;
    Ok(token)
}

async fn create_store(
    client: &reqwest::Client,
    base: &str,
    admin_token: &str,
    owner_id: &str,
) -> Result<String> {
    let resp = client
        .post(format!("{}/api/stores", base))
        .bearer_auth(admin_token)
        .json(&json!({
            "name": "Lifecycle Test Store",
            "email": format!("{}@example.com", unique("store")),
            "address": "2 Market Square",
            "ownerId": owner_id
        }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = resp.json().await?;
    Ok(body["store"]["id"].as_str().context("missing store id")?.to_string())
}

#[tokio::test]
async fn registering_the_same_email_twice_conflicts() -> Result<()> {
    let Some(_) = database_url() else {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    };
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let email = format!("{}@example.com", unique("dup"));
    let (_, _) = register(&client, &server.base_url, &email, "3 Oak Lane").await?;

    let resp = client
        .post(format!("{}/api/auth/register", server.base_url))
        .json(&json!({ "name": NAME, "email": email, "password": PASSWORD, "address": "3 Oak Lane" }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let body: Value = resp.json().await?;
    assert_eq!(body["error"], "User with this email already exists");

    // The first registration remains usable
    let resp = client
        .post(format!("{}/api/auth/login", server.base_url))
        .json(&json!({ "email": email, "password": PASSWORD }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await?;
    let token = body["token"].as_str().unwrap();

    let resp = client
        .get(format!("{}/api/auth/profile", server.base_url))
        .bearer_auth(token)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await?;
    assert_eq!(body["user"]["email"], email.as_str());
    Ok(())
}

#[tokio::test]
async fn store_creation_promotes_the_designated_owner() -> Result<()> {
    let Some(db_url) = database_url() else {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    };
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let admin_token = setup_admin(&client, &server.base_url, &db_url).await?;
    let owner_email = format!("{}@example.com", unique("owner"));
    let (_, owner_id) = register(&client, &server.base_url, &owner_email, "4 Elm Row").await?;

    create_store(&client, &server.base_url, &admin_token, &owner_id).await?;

    let resp = client
        .get(format!("{}/api/users/{}", server.base_url, owner_id))
        .bearer_auth(&admin_token)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await?;
    assert_eq!(body["user"]["role"], "store_owner");
    Ok(())
}

#[tokio::test]
async fn duplicate_rating_conflicts_and_update_replaces() -> Result<()> {
    let Some(db_url) = database_url() else {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    };
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let admin_token = setup_admin(&client, &server.base_url, &db_url).await?;
    let (_, owner_id) = register(
        &client,
        &server.base_url,
        &format!("{}@example.com", unique("owner")),
        "5 Birch Close",
    )
    .await?;
    let store_id = create_store(&client, &server.base_url, &admin_token, &owner_id).await?;

    let (rater_token, _) = register(
        &client,
        &server.base_url,
        &format!("{}@example.com", unique("rater")),
        "6 Cedar Walk",
    )
    .await?;

    let resp = client
        .post(format!("{}/api/ratings", server.base_url))
        .bearer_auth(&rater_token)
        .json(&json!({ "storeId": store_id, "rating": 4 }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // Second submission for the same pair hits the unique constraint
    let resp = client
        .post(format!("{}/api/ratings", server.base_url))
        .bearer_auth(&rater_token)
        .json(&json!({ "storeId": store_id, "rating": 5 }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await?;
    assert_eq!(body["error"], "You have already rated this store. Use update rating instead.");

    let resp = client
        .put(format!("{}/api/ratings", server.base_url))
        .bearer_auth(&rater_token)
        .json(&json!({ "storeId": store_id, "rating": 2 }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    // Exactly one row for this rater, carrying the updated value
    let resp = client
        .get(format!("{}/api/ratings/store/{}", server.base_url, store_id))
        .bearer_auth(&rater_token)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await?;
    let ratings = body["ratings"].as_array().unwrap();
    assert_eq!(ratings.len(), 1);
    assert_eq!(ratings[0]["rating"], 2);
    assert_eq!(body["pagination"]["totalCount"], 1);
    Ok(())
}

#[tokio::test]
async fn deleting_a_store_cascades_its_ratings() -> Result<()> {
    let Some(db_url) = database_url() else {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    };
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let admin_token = setup_admin(&client, &server.base_url, &db_url).await?;
    let (_, owner_id) = register(
        &client,
        &server.base_url,
        &format!("{}@example.com", unique("owner")),
        "7 Willow Court",
    )
    .await?;
    let store_id = create_store(&client, &server.base_url, &admin_token, &owner_id).await?;

    let (rater_token, _) = register(
        &client,
        &server.base_url,
        &format!("{}@example.com", unique("rater")),
        "8 Maple Drive",
    )
    .await?;
    let resp = client
        .post(format!("{}/api/ratings", server.base_url))
        .bearer_auth(&rater_token)
        .json(&json!({ "storeId": store_id, "rating": 3 }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = client
        .delete(format!("{}/api/stores/{}", server.base_url, store_id))
        .bearer_auth(&admin_token)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    // The rater's only rating went with the store
    let resp = client
        .get(format!("{}/api/ratings/my-ratings", server.base_url))
        .bearer_auth(&rater_token)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await?;
    assert_eq!(body["pagination"]["totalCount"], 0);
    assert!(body["ratings"].as_array().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn user_listing_paginates_with_filters() -> Result<()> {
    let Some(db_url) = database_url() else {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    };
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let admin_token = setup_admin(&client, &server.base_url, &db_url).await?;

    // A unique address tag scopes the listing to this test's rows
    let tag = unique("page-street");
    for i in 0..25 {
        let email = format!("{}-{}@example.com", unique("paged"), i);
        register(&client, &server.base_url, &email, &format!("{} no. {}", tag, i)).await?;
    }

    let resp = client
        .get(format!(
            "{}/api/users?address={}&limit=10&page=2",
            server.base_url, tag
        ))
        .bearer_auth(&admin_token)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await?;
    assert_eq!(body["users"].as_array().unwrap().len(), 10);
    assert_eq!(body["pagination"]["currentPage"], 2);
    assert_eq!(body["pagination"]["totalPages"], 3);
    assert_eq!(body["pagination"]["totalCount"], 25);
    assert_eq!(body["pagination"]["limit"], 10);
    Ok(())
}
