//! turnstile-checkout HTTP Server
//!
//! Axum-based server rendering the checkout page and creating Stripe
//! PaymentIntents behind a Cloudflare Turnstile challenge.

mod config;
mod handlers;
mod page;
mod routes;
mod state;

use std::sync::Arc;

use anyhow::Context;
use axum::{body::Bytes, http::HeaderName};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use checkout_payments::{StripeClient, TurnstileClient};

use crate::config::CheckoutConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CheckoutConfig::from_env();

    if config.stripe_configured() {
        tracing::info!("✓ Stripe configured");
    } else {
        tracing::warn!("⚠ Stripe not configured - payment form will not load");
        tracing::warn!("  Set STRIPE_SECRET_KEY and STRIPE_PUBLISHABLE_KEY in .env");
    }
    if config.turnstile_configured() {
        tracing::info!("✓ Turnstile configured");
    } else {
        tracing::warn!("⚠ Turnstile not configured - every challenge will fail");
        tracing::warn!("  Set TURNSTILE_SITE_KEY and TURNSTILE_SECRET_KEY in .env");
    }
    if config.enforce_verification {
        tracing::info!("✓ Failed verifications will block payment");
    } else {
        tracing::info!("Failed verifications are recorded on the PaymentIntent only");
    }

    let client_ip_header = HeaderName::try_from(config.client_ip_header.as_str())
        .with_context(|| format!("invalid CLIENT_IP_HEADER: {}", config.client_ip_header))?;

    let verifier = TurnstileClient::new(config.turnstile_secret_key.as_str())
        .with_verify_url(config.turnstile_verify_url.as_str());
    let payments = StripeClient::new(&config.stripe_secret_key);

    // Build application state
    let state = AppState {
        verifier: Arc::new(verifier),
        payments: Arc::new(payments),
        page: Bytes::from(page::render(&config)),
        enforce_verification: config.enforce_verification,
        client_ip_header,
        stripe_configured: config.stripe_configured(),
        turnstile_configured: config.turnstile_configured(),
    };

    let app = routes::router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 turnstile-checkout running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /               - Checkout page");
    tracing::info!("  POST /payment-intent - Verify challenge, create PaymentIntent");
    tracing::info!("  GET  /health         - Health check");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
