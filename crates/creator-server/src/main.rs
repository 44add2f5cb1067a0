//! creator-monetization HTTP Server
//!
//! Axum server exposing the pricing engine, Paystack checkout and webhook,
//! subscriber status and a transport-neutral chat endpoint.

mod config;
mod handlers;
mod routes;
mod state;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use creator_bot::{Bot, MemoryIntakeStore, MemorySessionStore};
use creator_payments::{MemorySubscriberStore, PaymentGateway, PaystackClient, SubscriberStore};
use pricing_core::{PricingEngine, RateTables};

use crate::config::ServerConfig;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let config = ServerConfig::from_env()?;

    // Rate tables (a loaded file is validated by from_path)
    let tables = match &config.rate_tables_path {
        Some(path) => RateTables::from_path(path)?,
        None => {
            tracing::info!("Using built-in rate tables");
            RateTables::default()
        }
    };
    let engine = Arc::new(PricingEngine::new(Arc::new(tables)));

    // Payments
    let subscribers: Arc<dyn SubscriberStore> = Arc::new(MemorySubscriberStore::new());
    let gateway: Option<Arc<dyn PaymentGateway>> = match &config.paystack_secret_key {
        Some(secret) => {
            let client = PaystackClient::with_base_url(secret.clone(), config.paystack_base_url.clone())?;
            tracing::info!(base_url = %client.base_url(), "✓ Paystack configured");
            Some(Arc::new(client))
        }
        None => {
            tracing::warn!("⚠ Paystack not configured - payments disabled");
            tracing::warn!("  Set PAYSTACK_SECRET_KEY in .env");
            None
        }
    };

    // Chat flow
    let bot = Bot::new(
        engine.clone(),
        subscribers.clone(),
        Arc::new(MemorySessionStore::new()),
        Arc::new(MemoryIntakeStore::new()),
    );

    let state = AppState {
        engine,
        subscribers,
        gateway,
        webhook_secret: config.paystack_secret_key.clone(),
        callback_url: config.callback_url(),
        bot: Arc::new(bot),
    };

    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 creator-monetization server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                  - Health check");
    tracing::info!("  POST /pricing/calculate       - Single quote");
    tracing::info!("  POST /pricing/range           - Range quote");
    tracing::info!("  GET  /subscribers/{{id}}/status - Entitlement status");
    tracing::info!("  POST /paystack/init           - Start checkout");
    tracing::info!("  POST /paystack/webhook        - Paystack events");
    tracing::info!("  POST /bot/updates             - Chat updates");

    axum::serve(listener, app).await?;

    Ok(())
}
