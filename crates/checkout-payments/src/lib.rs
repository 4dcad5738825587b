//! # checkout-payments
//!
//! Bot verification and payment creation for turnstile-checkout.
//!
//! ## Flow
//!
//! ```text
//! ┌─────────┐  token   ┌──────────────┐  siteverify  ┌──────────────┐
//! │ Browser │─────────▶│    Server    │─────────────▶│  Turnstile   │
//! │         │          │              │◀─────────────│              │
//! │         │          │              │ PaymentIntent┌──────────────┐
//! │         │          │              │─────────────▶│    Stripe    │
//! │         │◀─────────│              │◀─────────────│              │
//! └─────────┘  secret  └──────────────┘              └──────────────┘
//!      │                                                    ▲
//!      └────────────── confirmPayment(secret) ──────────────┘
//! ```
//!
//! The verification outcome never blocks the payment on its own. It is
//! recorded on the PaymentIntent as metadata and decides how aggressively
//! Stripe requests 3-D Secure for card payments.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use checkout_payments::{
//!     ChallengeVerifier, PaymentIntentRequest, PaymentProvider, StripeClient, TurnstileClient,
//! };
//!
//! let turnstile = TurnstileClient::new("0x4AAAAAAA...");
//! let stripe = StripeClient::new("sk_test_xxx");
//!
//! let outcome = turnstile.verify(&token, Some("203.0.113.7")).await?;
//! let intent = stripe
//!     .create_payment_intent(&PaymentIntentRequest::for_outcome(&outcome))
//!     .await?;
//!
//! // Hand intent.client_secret to Stripe.js
//! ```

mod error;
mod intent;
mod turnstile;

pub use error::{PaymentError, Result};
pub use intent::{
    CHECKOUT_AMOUNT, CHECKOUT_CURRENCY, CreatedIntent, PaymentIntentRequest, PaymentProvider,
    StripeClient, ThreeDSecurePolicy,
};
pub use stripe::Currency;
pub use turnstile::{ChallengeVerifier, SITEVERIFY_URL, TurnstileClient, TurnstileOutcome};
