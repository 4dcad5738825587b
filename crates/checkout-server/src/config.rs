//! Server Configuration

use checkout_payments::SITEVERIFY_URL;

const DEFAULT_CLIENT_IP_HEADER: &str = "CF-Connecting-IP";
const DEFAULT_RETURN_URL: &str = "http://localhost:8787";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8787";

/// Everything the checkout needs from the environment
#[derive(Clone, Debug)]
pub struct CheckoutConfig {
    pub turnstile_site_key: String,
    pub turnstile_secret_key: String,
    pub stripe_publishable_key: String,
    pub stripe_secret_key: String,

    /// Reject payments whose challenge failed verification
    pub enforce_verification: bool,

    /// Header carrying the caller's address, set by the fronting proxy
    pub client_ip_header: String,

    pub turnstile_verify_url: String,

    /// Where Stripe sends the browser after confirmation
    pub return_url: String,

    pub bind_addr: String,
}

impl CheckoutConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Missing keys become empty strings.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let key = |name: &str| {
            value(name).unwrap_or_else(|| {
                tracing::warn!("⚠ {} not set", name);
                String::new()
            })
        };

        let enforce_verification = value("TURNSTILE_ENFORCE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Self {
            turnstile_site_key: key("TURNSTILE_SITE_KEY"),
            turnstile_secret_key: key("TURNSTILE_SECRET_KEY"),
            stripe_publishable_key: key("STRIPE_PUBLISHABLE_KEY"),
            stripe_secret_key: key("STRIPE_SECRET_KEY"),
            enforce_verification,
            client_ip_header: value("CLIENT_IP_HEADER")
                .unwrap_or_else(|| DEFAULT_CLIENT_IP_HEADER.into()),
            turnstile_verify_url: value("TURNSTILE_VERIFY_URL")
                .unwrap_or_else(|| SITEVERIFY_URL.into()),
            return_url: value("CHECKOUT_RETURN_URL").unwrap_or_else(|| DEFAULT_RETURN_URL.into()),
            bind_addr: value("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into()),
        }
    }

    pub fn stripe_configured(&self) -> bool {
        !self.stripe_secret_key.is_empty() && !self.stripe_publishable_key.is_empty()
    }

    pub fn turnstile_configured(&self) -> bool {
        !self.turnstile_secret_key.is_empty() && !self.turnstile_site_key.is_empty()
    }
}
