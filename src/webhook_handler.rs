//! Payment gateway webhook intake.
//!
//! Receives `{event, data}` notifications from the gateway of record.
//! Only `charge.completed` is acted on: the charge is matched against
//! stored transaction references and the transaction completed
//! idempotently (at most one receipt email, however many times the event
//! is delivered). Every other event type is accepted and ignored.

use crate::errors::AppError;
use crate::handlers::AppState;
use crate::webhook_models::{ChargeData, WebhookPayload, WebhookResponse};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;

pub async fn payments_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<WebhookPayload>,
) -> Result<(StatusCode, Json<WebhookResponse>), AppError> {
    tracing::info!("Received gateway webhook: {}", payload.event);

    validate_webhook_signature(&state, &headers)?;

    if payload.event != "charge.completed" {
        tracing::debug!("Ignoring webhook event: {}", payload.event);
        return Ok((
            StatusCode::OK,
            Json(WebhookResponse {
                status: "ignored".to_string(),
                matched: None,
            }),
        ));
    }

    let charge: ChargeData = serde_json::from_value(payload.data)
        .map_err(|e| AppError::InvalidInput(format!("Malformed charge data: {}", e)))?;

    let Some(tx_ref) = charge.tx_ref.as_deref().filter(|r| !r.is_empty()) else {
        tracing::warn!("charge.completed event without tx_ref");
        return Ok((
            StatusCode::OK,
            Json(WebhookResponse {
                status: "processed".to_string(),
                matched: Some(false),
            }),
        ));
    };

    // The overlay session, if one is still open for this reference,
    // resolves to its completed variant.
    let status = charge.status.as_deref().unwrap_or("");
    if status == "successful" {
        if let Some(id) = charge.id {
            state
                .checkout
                .resolve_completed(tx_ref, &id.to_string(), status)
                .await;
        }
    }

    let matched = state
        .gateway
        .record_gateway_charge(
            tx_ref,
            status,
            charge.id.map(|id| id.to_string()).as_deref(),
            charge.payment_type.as_deref(),
            charge.charged_amount,
            charge.processor_response.as_deref(),
        )
        .await?;

    tracing::info!(
        "Webhook charge processed: tx_ref={}, status={}, matched={}",
        tx_ref,
        status,
        matched
    );

    Ok((
        StatusCode::OK,
        Json(WebhookResponse {
            status: "processed".to_string(),
            matched: Some(matched),
        }),
    ))
}

/// Validate the gateway signature header against the configured secret.
fn validate_webhook_signature(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    // If no secret is configured, skip validation (warn was already logged at startup)
    let Some(ref expected_secret) = state.config.webhook_secret else {
        return Ok(());
    };

    let signature = headers
        .get("verif-hash")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing verif-hash header".to_string()))?;

    // Constant-time comparison to prevent timing attacks
    if !constant_time_compare(signature, expected_secret) {
        tracing::warn!("Invalid webhook signature received");
        return Err(AppError::Unauthorized("Invalid webhook signature".to_string()));
    }

    Ok(())
}

/// Constant-time string comparison (basic implementation)
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes().iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
