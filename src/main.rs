use axum::extract::OriginalUri;
use axum::http::{Method, StatusCode};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

mod auth;
mod config;
mod database;
mod error;
mod extract;
mod handlers;
mod middleware;
mod query;
mod validation;

use database::models::Capability;
use database::Database;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = config::config();
    tracing::info!("Starting store rating API in {:?} mode", config.environment);

    let app = app();

    let port = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(5000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server");

    Database::close().await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("terminate handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}

fn app() -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_routes())
        // Authenticated API
        .merge(user_routes())
        .merge(store_routes())
        .merge(rating_routes())
        .merge(dashboard_routes())
        .fallback(not_found)
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Attach a capability gate to a route group. `jwt_auth` is layered outside
/// these, so the gate always sees an `AuthUser` extension.
fn gated(router: Router, capability: Capability) -> Router {
    router.route_layer(axum::middleware::from_fn(move |req, next| {
        middleware::authorize::require_capability(capability, req, next)
    }))
}

fn authenticated(router: Router) -> Router {
    router.route_layer(axum::middleware::from_fn(middleware::auth::jwt_auth))
}

fn auth_routes() -> Router {
    use axum::routing::{post, put};
    use handlers::auth;

    let public = Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/register", post(auth::register));

    let protected = authenticated(
        Router::new()
            .route("/api/auth/profile", get(auth::profile))
            .route("/api/auth/change-password", put(auth::change_password)),
    );

    public.merge(protected)
}

fn user_routes() -> Router {
    use handlers::users;

    authenticated(gated(
        Router::new()
            .route("/api/users", get(users::list).post(users::create))
            .route(
                "/api/users/:id",
                get(users::get_by_id).put(users::update).delete(users::delete),
            ),
        Capability::ManageUsers,
    ))
}

fn store_routes() -> Router {
    use axum::routing::{delete, post};
    use handlers::stores;

    let open = Router::new()
        .route("/api/stores", get(stores::list))
        .route("/api/stores/:id", get(stores::get_by_id).put(stores::update));

    let create = gated(
        Router::new().route("/api/stores", post(stores::create)),
        Capability::CreateStores,
    );
    let remove = gated(
        Router::new().route("/api/stores/:id", delete(stores::delete)),
        Capability::DeleteStores,
    );
    let mine = gated(
        Router::new().route("/api/stores/my-stores", get(stores::list_mine)),
        Capability::ViewOwnedStores,
    );

    authenticated(open.merge(create).merge(remove).merge(mine))
}

fn rating_routes() -> Router {
    use axum::routing::post;
    use handlers::ratings;

    let open = Router::new()
        .route("/api/ratings", post(ratings::submit).put(ratings::update))
        .route("/api/ratings/my-ratings", get(ratings::list_mine))
        .route(
            "/api/ratings/store/:store_id",
            get(ratings::list_by_store).delete(ratings::delete),
        );

    let all = gated(
        Router::new().route("/api/ratings/all", get(ratings::list_all)),
        Capability::ViewAllRatings,
    );

    authenticated(open.merge(all))
}

fn dashboard_routes() -> Router {
    use handlers::dashboard;

    let admin = gated(
        Router::new().route("/api/dashboard/admin", get(dashboard::admin_stats)),
        Capability::ViewAdminDashboard,
    );
    let owner = gated(
        Router::new().route("/api/dashboard/store-owner", get(dashboard::store_owner_stats)),
        Capability::ViewOwnerDashboard,
    );
    let user = gated(
        Router::new().route("/api/dashboard/user", get(dashboard::user_stats)),
        Capability::ViewUserDashboard,
    );
    let store = gated(
        Router::new().route("/api/dashboard/store/:store_id", get(dashboard::store_stats)),
        Capability::ViewStoreDashboard,
    );

    authenticated(admin.merge(owner).merge(user).merge(store))
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Store Rating System API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "auth": "/api/auth",
            "users": "/api/users",
            "stores": "/api/stores",
            "ratings": "/api/ratings",
            "dashboard": "/api/dashboard",
            "health": "/health"
        }
    }))
}

async fn health() -> (StatusCode, Json<Value>) {
    match Database::health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "OK",
                "timestamp": Utc::now().to_rfc3339(),
                "database": "Connected"
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "Error",
                "timestamp": Utc::now().to_rfc3339(),
                "database": "Disconnected",
                "error": e.to_string()
            })),
        ),
    }
}

async fn not_found(method: Method, OriginalUri(uri): OriginalUri) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Route not found",
            "path": uri.to_string(),
            "method": method.as_str(),
            "timestamp": Utc::now().to_rfc3339()
        })),
    )
}
