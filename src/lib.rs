use std::sync::Arc;

use axum::{
    middleware as layer,
    routing::{delete, get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod store;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn store::IdentityStore>,
    pub reports: Arc<dyn store::ReportStore>,
}

pub fn app(state: AppState) -> Router {
    let staff_routes = Router::new()
        .route("/api/auth/whoami", get(handlers::auth::whoami))
        .route(
            "/api/reports",
            get(handlers::reports::list).post(handlers::reports::create),
        )
        .route_layer(layer::from_fn(middleware::require_staff));

    let admin_routes = Router::new()
        .route(
            "/api/admin/users",
            get(handlers::admin::list_users).post(handlers::admin::create_user),
        )
        .route("/api/admin/users/:id/role", put(handlers::admin::set_role))
        .route("/api/admin/users/:id", delete(handlers::admin::delete_user))
        .route_layer(layer::from_fn(middleware::require_admin));

    // Authentication runs before either role gate.
    let protected = staff_routes
        .merge(admin_routes)
        .route_layer(layer::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        // Public
        .route("/", get(index))
        .route("/health", get(health))
        // Token acquisition and exchange
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .merge(protected)
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Storereport API",
            "version": version,
            "endpoints": {
                "home": "/ (public)",
                "auth": "/auth/login, /auth/refresh (public - token acquisition)",
                "whoami": "/api/auth/whoami (protected)",
                "reports": "/api/reports (protected - staff)",
                "admin": "/api/admin/users[/:id] (protected - admin)",
            }
        }
    }))
}

async fn health() -> axum::response::Json<Value> {
    axum::response::Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "timestamp": chrono::Utc::now(),
        }
    }))
}
