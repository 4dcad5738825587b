//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Errors raised while verifying a challenge or creating a payment
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Stripe API error
    #[error("Stripe error: {0}")]
    Stripe(String),

    /// Turnstile siteverify unreachable or rejected the request
    #[error("Turnstile verification error: {0}")]
    Verification(String),

    /// Upstream returned a body we could not decode
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl PaymentError {
    /// Get user-friendly message
    pub fn user_message(&self) -> &str {
        match self {
            PaymentError::Stripe(_) => "Payment processing failed. Please try again.",
            PaymentError::Verification(_) | PaymentError::MalformedResponse(_) => {
                "Bot verification is currently unavailable. Please try again."
            }
        }
    }
}

impl From<stripe::StripeError> for PaymentError {
    fn from(err: stripe::StripeError) -> Self {
        PaymentError::Stripe(err.to_string())
    }
}
