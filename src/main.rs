use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use battery_leads_api::api;
use battery_leads_api::config::Config;
use battery_leads_api::db::Database;
use battery_leads_api::db_storage::PgStore;
use battery_leads_api::handlers::AppState;
use battery_leads_api::sheets_client::SheetForwarder;

/// Main entry point for the application.
///
/// Initializes logging, configuration, the database pool, the sheet
/// forwarder and the HTTP routes, then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "battery_leads_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Initialize database connection pool
    let db = Database::new(&config.database_url).await?;
    tracing::info!("Database connection pool established");
    let store = Arc::new(PgStore::new(db.pool.clone()));

    let sheets = SheetForwarder::new(
        config.sheets_web_app_url.clone(),
        config.sheets_secret_key.clone(),
        Duration::from_secs(config.sheets_timeout_secs),
    )?;

    // Build application state
    let app_state = Arc::new(AppState {
        config: config.clone(),
        leads: store.clone(),
        vehicles: store,
        sheets,
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let protected_routes = api::api_routes().layer(
        // Rate limiting: 10 req/sec per IP, burst of 20 (public lead forms)
        ServiceBuilder::new().layer(GovernorLayer {
            config: governor_conf,
        }),
    );

    // Health check bypasses rate limiting
    let app = api::app(protected_routes, app_state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
