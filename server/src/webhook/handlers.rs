//! Webhook Endpoint Handler
//!
//! Receives event callbacks, verifies the signature against the exact raw
//! body bytes, answers URL-verification handshakes, and hands actionable
//! membership events to the sync pipeline.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{info, instrument, warn};

use super::events::EventEnvelope;
use super::signing;
use crate::api::AppState;
use crate::sync::{self, SyncOutcome};

/// Header carrying the request timestamp (Unix seconds).
const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

/// Header carrying the `v0=` request signature.
const SIGNATURE_HEADER: &str = "x-slack-signature";

/// Webhook processing errors surfaced as HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Invalid or missing request signature")]
    InvalidSignature,

    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::InvalidSignature => (StatusCode::UNAUTHORIZED, "invalid_signature".to_string()),
            Self::Malformed(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        (
            status,
            Json(serde_json::json!({ "ok": false, "error": code })),
        )
            .into_response()
    }
}

/// POST `/slack/events`
///
/// Always answers 200 once the signature checks out, except for internal
/// failures; the event source treats anything else as a delivery failure and
/// redelivers.
#[instrument(skip_all)]
pub async fn receive_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, WebhookError> {
    let timestamp = headers
        .get(TIMESTAMP_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok());
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());

    let now = chrono::Utc::now().timestamp();
    let verified = match (timestamp, signature) {
        (Some(ts), Some(sig)) => verify(&state, ts, &body, sig, now),
        _ => false,
    };
    if !verified {
        warn!("Rejected webhook request with missing or invalid signature");
        return Err(WebhookError::InvalidSignature);
    }

    let envelope: EventEnvelope = serde_json::from_slice(&body)?;

    // Handshake: echo the challenge before any business logic.
    if envelope.is_handshake() {
        if let Some(challenge) = envelope.challenge {
            info!("Answering URL-verification handshake");
            return Ok(challenge.into_response());
        }
    }

    // No event field is a success, not an error (e.g., app_rate_limited
    // notices carry no event).
    let Some(event) = envelope.event else {
        return Ok(Json(SyncOutcome::skipped(None, "no_event")).into_response());
    };

    let Some(user) = event.actionable_user() else {
        info!(event_type = %event.kind, "Ignoring non-actionable event");
        return Ok(Json(SyncOutcome::skipped(None, "not_actionable")).into_response());
    };

    info!(event_type = %event.kind, user_id = %user.id, "Accepted membership event");
    let outcome = sync::process_user(&state, &user.id).await;
    Ok(Json(outcome).into_response())
}

fn verify(state: &AppState, timestamp: i64, body: &[u8], signature: &str, now: i64) -> bool {
    signing::verify_request(
        state.config.signing_secret.as_deref(),
        timestamp,
        body,
        signature,
        now,
    )
}
