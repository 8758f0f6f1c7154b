//! referral-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use referral_gateway::api;
use referral_gateway::app_state::AppState;
use referral_gateway::config::GatewayConfig;
use referral_gateway::domain::EventBus;
use referral_gateway::gateway::HttpTokenGateway;
use referral_gateway::service::{AccountService, RewardService};
use referral_gateway::store::PostgresLedger;
use referral_gateway::ws::handler::ws_handler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = GatewayConfig::from_env()
        .map_err(|e| anyhow::anyhow!("configuration error: {e}"))?;
    tracing::info!(addr = %config.listen_addr, "starting referral-gateway");

    // Connect to the ledger database and apply migrations
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    let store = Arc::new(PostgresLedger::new(pool));

    // Token transfer gateway client
    let transfer_timeout = Duration::from_secs(config.transfer_timeout_secs);
    let token_gateway = Arc::new(
        HttpTokenGateway::new(
            &config.transfer_gateway_url,
            config.transfer_gateway_api_key.as_deref(),
            transfer_timeout,
        )
        .map_err(|e| anyhow::anyhow!("gateway client error: {e}"))?,
    );

    // Build domain and service layers
    let event_bus = EventBus::new(config.event_bus_capacity);
    let reward_service = Arc::new(RewardService::new(
        Arc::clone(&store),
        token_gateway,
        event_bus.clone(),
        config.reward_policy,
        transfer_timeout,
    ));
    let account_service = Arc::new(AccountService::new(store, event_bus.clone()));

    // Build application state
    let app_state = AppState {
        reward_service,
        account_service,
        event_bus,
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
