//! HTTP Handlers

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Html,
};
use serde::{Deserialize, Serialize};

use checkout_payments::{PaymentIntentRequest, TurnstileOutcome};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub stripe_configured: bool,
    pub turnstile_configured: bool,
}

#[derive(Debug, Deserialize)]
pub struct PaymentIntentBody {
    #[serde(rename = "turnstileToken")]
    pub turnstile_token: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<TurnstileOutcome>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>, code: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
            outcome: None,
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        stripe_configured: state.stripe_configured,
        turnstile_configured: state.turnstile_configured,
    })
}

/// Checkout page
pub async fn checkout_page(State(state): State<AppState>) -> Html<Bytes> {
    Html(state.page.clone())
}

/// Verify the challenge token, then create a PaymentIntent
///
/// The body is parsed by hand so that malformed JSON gets the same error
/// shape as every other failure.
pub async fn create_payment_intent(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PaymentIntentResponse>, ApiError> {
    let payload: PaymentIntentBody = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!("Rejected payment-intent body: {}", e);
        api_error(
            StatusCode::BAD_REQUEST,
            format!("Invalid request body: {e}"),
            "INVALID_BODY",
        )
    })?;

    let remote_ip = headers
        .get(&state.client_ip_header)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let outcome = state
        .verifier
        .verify(&payload.turnstile_token, remote_ip)
        .await
        .map_err(|e| {
            tracing::error!("Turnstile verification error: {}", e);
            api_error(StatusCode::BAD_GATEWAY, e.user_message(), "VERIFICATION_ERROR")
        })?;

    tracing::info!(
        turnstile_result = outcome.result_tag(),
        hostname = ?outcome.hostname,
        error_codes = ?outcome.error_codes,
        "Turnstile verification completed"
    );

    if !outcome.success && state.enforce_verification {
        tracing::warn!(error_codes = ?outcome.error_codes, "Blocking payment after failed verification");
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Bot verification failed".into(),
                code: "VERIFICATION_FAILED".into(),
                outcome: Some(outcome),
            }),
        ));
    }

    let request = PaymentIntentRequest::for_outcome(&outcome);
    let intent = state
        .payments
        .create_payment_intent(&request)
        .await
        .map_err(|e| {
            tracing::error!("PaymentIntent error: {}", e);
            api_error(StatusCode::BAD_GATEWAY, e.user_message(), "PAYMENT_ERROR")
        })?;

    Ok(Json(PaymentIntentResponse {
        client_secret: intent.client_secret,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{HeaderName, Request},
    };
    use tower::ServiceExt;

    use checkout_payments::{
        ChallengeVerifier, CreatedIntent, Currency, PaymentError, PaymentProvider, Result,
        ThreeDSecurePolicy,
    };

    use super::*;
    use crate::routes::router;

    struct FakeVerifier {
        outcome: Option<TurnstileOutcome>,
        calls: Mutex<Vec<(String, Option<String>)>>,
    }

    #[async_trait]
    impl ChallengeVerifier for FakeVerifier {
        async fn verify(&self, token: &str, remote_ip: Option<&str>) -> Result<TurnstileOutcome> {
            self.calls
                .lock()
                .unwrap()
                .push((token.to_string(), remote_ip.map(str::to_string)));
            self.outcome
                .clone()
                .ok_or_else(|| PaymentError::Verification("connection refused".into()))
        }
    }

    #[derive(Default)]
    struct FakePayments {
        fail: bool,
        requests: Mutex<Vec<PaymentIntentRequest>>,
    }

    #[async_trait]
    impl PaymentProvider for FakePayments {
        async fn create_payment_intent(&self, request: &PaymentIntentRequest) -> Result<CreatedIntent> {
            if self.fail {
                return Err(PaymentError::Stripe("api_key_expired".into()));
            }
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            Ok(CreatedIntent {
                id: format!("pi_{}", requests.len()),
                client_secret: format!("pi_{}_secret_abc", requests.len()),
            })
        }
    }

    struct Harness {
        app: Router,
        verifier: Arc<FakeVerifier>,
        payments: Arc<FakePayments>,
    }

    fn harness(outcome: Option<TurnstileOutcome>, payments: FakePayments, enforce: bool) -> Harness {
        let verifier = Arc::new(FakeVerifier {
            outcome,
            calls: Mutex::new(Vec::new()),
        });
        let payments = Arc::new(payments);

        let state = AppState {
            verifier: verifier.clone(),
            payments: payments.clone(),
            page: Bytes::from_static(b"<html>checkout</html>"),
            enforce_verification: enforce,
            client_ip_header: HeaderName::from_static("cf-connecting-ip"),
            stripe_configured: true,
            turnstile_configured: true,
        };

        Harness {
            app: router(state),
            verifier,
            payments,
        }
    }

    fn passed() -> TurnstileOutcome {
        TurnstileOutcome {
            success: true,
            challenge_ts: Some("2024-05-01T12:00:00.000Z".into()),
            hostname: Some("localhost".into()),
            ..Default::default()
        }
    }

    fn failed() -> TurnstileOutcome {
        TurnstileOutcome {
            success: false,
            error_codes: vec!["invalid-input-response".into()],
            ..Default::default()
        }
    }

    fn intent_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/payment-intent")
            .header("content-type", "application/json")
            .header("CF-Connecting-IP", "203.0.113.7")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_passed_verification_returns_client_secret() {
        let h = harness(Some(passed()), FakePayments::default(), false);

        let response = h
            .app
            .oneshot(intent_request(r#"{"turnstileToken":"tok-1"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["client_secret"], "pi_1_secret_abc");

        let requests = h.payments.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].metadata["turnstile_result"], "success");
        assert_eq!(requests[0].three_d_secure, ThreeDSecurePolicy::Automatic);
    }

    #[tokio::test]
    async fn test_failed_verification_still_creates_intent() {
        let h = harness(Some(failed()), FakePayments::default(), false);

        let response = h
            .app
            .oneshot(intent_request(r#"{"turnstileToken":"tok-bad"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let requests = h.payments.requests.lock().unwrap();
        assert_eq!(requests[0].metadata["turnstile_result"], "failed");
        assert_eq!(requests[0].three_d_secure, ThreeDSecurePolicy::Any);
    }

    #[tokio::test]
    async fn test_failed_verification_blocked_when_enforced() {
        let h = harness(Some(failed()), FakePayments::default(), true);

        let response = h
            .app
            .oneshot(intent_request(r#"{"turnstileToken":"tok-bad"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["code"], "VERIFICATION_FAILED");
        assert_eq!(body["outcome"]["success"], false);
        assert_eq!(body["outcome"]["error-codes"][0], "invalid-input-response");
        assert!(h.payments.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_amount_and_currency_are_fixed() {
        let h = harness(Some(passed()), FakePayments::default(), false);

        for token in ["a", "tok-2", "a-much-longer-token-value"] {
            let body = serde_json::json!({ "turnstileToken": token }).to_string();
            let response = h.app.clone().oneshot(intent_request(&body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let requests = h.payments.requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        for request in requests.iter() {
            assert_eq!(request.amount, 1000);
            assert_eq!(request.currency, Currency::JPY);
        }
    }

    #[tokio::test]
    async fn test_forwards_token_and_client_ip() {
        let h = harness(Some(passed()), FakePayments::default(), false);

        h.app
            .oneshot(intent_request(r#"{"turnstileToken":"tok-ip"}"#))
            .await
            .unwrap();

        let calls = h.verifier.calls.lock().unwrap();
        assert_eq!(
            calls[0],
            ("tok-ip".to_string(), Some("203.0.113.7".to_string()))
        );
    }

    #[tokio::test]
    async fn test_missing_ip_header_forwards_none() {
        let h = harness(Some(passed()), FakePayments::default(), false);

        let request = Request::builder()
            .method("POST")
            .uri("/payment-intent")
            .body(Body::from(r#"{"turnstileToken":"tok"}"#))
            .unwrap();
        let response = h.app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(h.verifier.calls.lock().unwrap()[0].1, None);
    }

    #[tokio::test]
    async fn test_malformed_json_is_client_error() {
        let h = harness(Some(passed()), FakePayments::default(), false);

        let response = h
            .app
            .clone()
            .oneshot(intent_request("{not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "INVALID_BODY");

        let response = h.app.oneshot(intent_request(r#"{"token":"x"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(h.verifier.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_verifier_failure_surfaces_as_bad_gateway() {
        let h = harness(None, FakePayments::default(), false);

        let response = h
            .app
            .oneshot(intent_request(r#"{"turnstileToken":"tok"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(response).await["code"], "VERIFICATION_ERROR");
        assert!(h.payments.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_payment_failure_surfaces_as_bad_gateway() {
        let payments = FakePayments {
            fail: true,
            ..Default::default()
        };
        let h = harness(Some(passed()), payments, false);

        let response = h
            .app
            .oneshot(intent_request(r#"{"turnstileToken":"tok"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert_eq!(body["code"], "PAYMENT_ERROR");
        assert!(!body["error"].as_str().unwrap().contains("api_key_expired"));
    }

    #[tokio::test]
    async fn test_page_and_health_routes() {
        let h = harness(Some(passed()), FakePayments::default(), false);

        let response = h
            .app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"<html>checkout</html>");

        let response = h
            .app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["stripe_configured"], true);
    }
}
