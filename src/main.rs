use std::sync::Arc;
use std::time::Duration;

use storereport_api::store::memory::{MemoryIdentityStore, MemoryReportStore};
use storereport_api::store::postgres::{PgIdentityStore, PgReportStore};
use storereport_api::{app, config, AppState};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storereport_api=info,tower_http=info".into()),
        )
        .init();

    let config = config::config();
    tracing::info!("starting storereport-api in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        // Refuse to start: every token this server signed would be forgeable.
        eprintln!("JWT_SECRET must be set in staging/production");
        std::process::exit(1);
    }

    let state = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .acquire_timeout(Duration::from_secs(config.database.connection_timeout_secs))
                .connect(&url)
                .await
                .unwrap_or_else(|e| panic!("failed to connect to database: {}", e));
            tracing::info!("connected to postgres");
            AppState {
                users: Arc::new(PgIdentityStore::new(pool.clone())),
                reports: Arc::new(PgReportStore::new(pool)),
            }
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set, using in-memory stores");
            let users = MemoryIdentityStore::with_seed_admin(&config.seed)
                .unwrap_or_else(|e| panic!("failed to seed admin account: {}", e));
            AppState {
                users: Arc::new(users),
                reports: Arc::new(MemoryReportStore::new()),
            }
        }
    };

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("listening on http://{}", bind_addr);
    axum::serve(listener, app(state)).await.expect("server");
}
