//! Application State

use std::sync::Arc;

use axum::{body::Bytes, http::HeaderName};
use checkout_payments::{ChallengeVerifier, PaymentProvider};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Turnstile siteverify client
    pub verifier: Arc<dyn ChallengeVerifier>,

    /// Stripe PaymentIntent creation
    pub payments: Arc<dyn PaymentProvider>,

    /// Checkout page, rendered at startup
    pub page: Bytes,

    /// Reject payments whose challenge failed verification
    pub enforce_verification: bool,

    /// Trusted proxy header carrying the caller's address
    pub client_ip_header: HeaderName,

    pub stripe_configured: bool,
    pub turnstile_configured: bool,
}
