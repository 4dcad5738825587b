//! Stripe PaymentIntent Creation
//!
//! Implements the "Stripe Elements (Embedded)" approach: the server only
//! creates the PaymentIntent and hands its client secret to the browser,
//! which confirms the payment against Stripe directly.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stripe::{
    Client, CreatePaymentIntent, CreatePaymentIntentPaymentMethodOptions,
    CreatePaymentIntentPaymentMethodOptionsCard,
    CreatePaymentIntentPaymentMethodOptionsCardRequestThreeDSecure, Currency, PaymentIntent,
};

use crate::error::{PaymentError, Result};
use crate::turnstile::TurnstileOutcome;

/// Amount charged for every checkout, in the currency's smallest unit
pub const CHECKOUT_AMOUNT: i64 = 1000;

/// Currency charged for every checkout
pub const CHECKOUT_CURRENCY: Currency = Currency::JPY;

const APP_NAME: &str = "turnstile-checkout";

/// How hard Stripe should push cards into 3-D Secure
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreeDSecurePolicy {
    /// Let Stripe's own risk engine decide
    Automatic,
    /// Request 3-D Secure whenever the card supports it
    Any,
}

impl ThreeDSecurePolicy {
    /// Passing verification relaxes the policy, failing it tightens it
    pub fn for_verification(success: bool) -> Self {
        if success { Self::Automatic } else { Self::Any }
    }

    fn to_stripe(self) -> CreatePaymentIntentPaymentMethodOptionsCardRequestThreeDSecure {
        match self {
            Self::Automatic => CreatePaymentIntentPaymentMethodOptionsCardRequestThreeDSecure::Automatic,
            Self::Any => CreatePaymentIntentPaymentMethodOptionsCardRequestThreeDSecure::Any,
        }
    }
}

/// Parameters for a single checkout's PaymentIntent
#[derive(Clone, Debug, PartialEq)]
pub struct PaymentIntentRequest {
    pub amount: i64,
    pub currency: Currency,
    pub metadata: HashMap<String, String>,
    pub three_d_secure: ThreeDSecurePolicy,
}

impl PaymentIntentRequest {
    /// Build the request for a verified (or not) checkout
    ///
    /// Amount and currency are always the checkout constants.
    pub fn for_outcome(outcome: &TurnstileOutcome) -> Self {
        Self {
            amount: CHECKOUT_AMOUNT,
            currency: CHECKOUT_CURRENCY,
            metadata: outcome.metadata(),
            three_d_secure: ThreeDSecurePolicy::for_verification(outcome.success),
        }
    }

    fn to_params(&self) -> CreatePaymentIntent<'_> {
        let mut params = CreatePaymentIntent::new(self.amount, self.currency);
        params.metadata = Some(self.metadata.clone());
        params.payment_method_options = Some(CreatePaymentIntentPaymentMethodOptions {
            card: Some(CreatePaymentIntentPaymentMethodOptionsCard {
                request_three_d_secure: Some(self.three_d_secure.to_stripe()),
                ..Default::default()
            }),
            ..Default::default()
        });
        params
    }
}

/// What the browser needs to confirm a payment
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreatedIntent {
    /// Stripe PaymentIntent ID
    pub id: String,

    /// Secret handed to Stripe.js
    pub client_secret: String,
}

/// Creates PaymentIntents
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_payment_intent(&self, request: &PaymentIntentRequest) -> Result<CreatedIntent>;
}

/// Stripe client wrapper
pub struct StripeClient {
    client: Client,
}

impl StripeClient {
    /// Create a new Stripe client
    pub fn new(secret_key: &str) -> Self {
        Self::from_client(Client::new(secret_key))
    }

    fn from_client(client: Client) -> Self {
        let client = client.with_app_info(
            APP_NAME.to_string(),
            Some(env!("CARGO_PKG_VERSION").to_string()),
            None,
        );

        Self { client }
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_payment_intent(&self, request: &PaymentIntentRequest) -> Result<CreatedIntent> {
        let intent = PaymentIntent::create(&self.client, request.to_params()).await?;

        let client_secret = intent.client_secret.ok_or_else(|| {
            PaymentError::Stripe("No client secret returned".into())
        })?;

        tracing::info!(
            payment_intent = %intent.id,
            amount = request.amount,
            currency = %request.currency,
            three_d_secure = ?request.three_d_secure,
            "Created PaymentIntent"
        );

        Ok(CreatedIntent {
            id: intent.id.to_string(),
            client_secret,
        })
    }
}
