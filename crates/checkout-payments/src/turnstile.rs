//! Cloudflare Turnstile Verification
//!
//! Redeems a challenge token produced by the browser widget against the
//! `siteverify` endpoint.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{PaymentError, Result};

/// Default siteverify endpoint
pub const SITEVERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";

/// Outcome of a siteverify call
///
/// On failure Cloudflare only guarantees `success` and `error-codes`, so every
/// other field is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnstileOutcome {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge_ts: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdata: Option<String>,
}

impl TurnstileOutcome {
    /// Tag recorded on the PaymentIntent
    pub fn result_tag(&self) -> &'static str {
        if self.success { "success" } else { "failed" }
    }

    /// PaymentIntent metadata describing this outcome
    ///
    /// Stripe drops metadata keys with empty values, so absent or empty
    /// fields are left out rather than sent blank.
    pub fn metadata(&self) -> HashMap<String, String> {
        let mut metadata = HashMap::new();
        metadata.insert("turnstile_result".to_string(), self.result_tag().to_string());

        let optional = [
            ("turnstile_challenge_ts", &self.challenge_ts),
            ("turnstile_hostname", &self.hostname),
            ("turnstile_action", &self.action),
        ];
        for (key, value) in optional {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                metadata.insert(key.to_string(), value.to_string());
            }
        }

        if !self.error_codes.is_empty() {
            metadata.insert("turnstile_error_codes".to_string(), self.error_codes.join(","));
        }

        metadata
    }
}

/// Redeems challenge tokens
#[async_trait]
pub trait ChallengeVerifier: Send + Sync {
    /// Verify `token`, optionally bound to the caller's address
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> Result<TurnstileOutcome>;
}

/// siteverify client
pub struct TurnstileClient {
    http: reqwest::Client,
    secret_key: String,
    verify_url: String,
}

impl TurnstileClient {
    /// Create a client against the public siteverify endpoint
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key: secret_key.into(),
            verify_url: SITEVERIFY_URL.to_string(),
        }
    }

    /// Point the client at a different siteverify endpoint
    pub fn with_verify_url(mut self, verify_url: impl Into<String>) -> Self {
        self.verify_url = verify_url.into();
        self
    }
}

#[async_trait]
impl ChallengeVerifier for TurnstileClient {
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> Result<TurnstileOutcome> {
        let form = [
            ("secret", self.secret_key.as_str()),
            ("response", token),
            ("remoteip", remote_ip.unwrap_or_default()),
        ];

        let response = self
            .http
            .post(&self.verify_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| PaymentError::Verification(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PaymentError::Verification(format!(
                "siteverify returned {status}"
            )));
        }

        let outcome: TurnstileOutcome = response
            .json()
            .await
            .map_err(|e| PaymentError::MalformedResponse(e.to_string()))?;

        tracing::debug!(
            success = outcome.success,
            hostname = ?outcome.hostname,
            error_codes = ?outcome.error_codes,
            "Turnstile siteverify completed"
        );

        Ok(outcome)
    }
}
