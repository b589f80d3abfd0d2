use crate::analytics::Analytics;
use crate::checkout::{CheckoutOutcome, CheckoutSessions};
use crate::config::Config;
use crate::errors::AppError;
use crate::funnel::BookingFunnel;
use crate::gateway::PaymentGateway;
use crate::leads::{DownloadStats, LeadService};
use crate::models::*;
use crate::notifier::EmailNotifier;
use crate::store::TransactionStore;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Transaction repository (in-memory for now; the seam allows a durable
    /// store without handler changes).
    pub transactions: Arc<dyn TransactionStore>,
    /// Payment gateway adapter.
    pub gateway: Arc<PaymentGateway>,
    /// Transactional email notifier.
    pub notifier: Arc<EmailNotifier>,
    /// Lead capture and checklist funnel.
    pub leads: Arc<LeadService>,
    /// In-process analytics log.
    pub analytics: Arc<Analytics>,
    /// Checkout overlay session registry.
    pub checkout: Arc<CheckoutSessions>,
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-funnel-api",
            "version": "0.1.0"
        })),
    )
}

/// GET /api/v1/tiers
///
/// The consultation tier table.
pub async fn list_tiers(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({ "tiers": state.config.tiers.all() }))
}

/// POST /api/v1/leads
///
/// Checklist opt-in: creates the lead, records the download, and schedules
/// the checklist email.
pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateLeadRequest>,
) -> Result<(StatusCode, Json<LeadCreatedResponse>), AppError> {
    tracing::info!("POST /leads - source: {:?}", request.source);

    let lead = state
        .leads
        .checklist_signup(
            &request.full_name,
            &request.email,
            request.country.as_deref(),
            request.education_level.as_deref(),
            request.source.as_deref(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(LeadCreatedResponse {
            lead_id: lead.id,
            checklist_email_scheduled: true,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct SourceQuery {
    pub source: String,
}

/// GET /api/v1/leads?source=
pub async fn leads_by_source(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SourceQuery>,
) -> Result<Json<Vec<Lead>>, AppError> {
    Ok(Json(state.leads.leads_by_source(&query.source).await?))
}

/// POST /api/v1/leads/:id/convert
///
/// Flips `is_converted` exactly once; repeat calls are reported, not errors.
pub async fn convert_lead(
    State(state): State<Arc<AppState>>,
    Path(lead_id): Path<String>,
) -> Result<Json<ConvertLeadResponse>, AppError> {
    Ok(Json(state.leads.convert_lead(&lead_id).await?))
}

/// POST /api/v1/contact
///
/// Contact-form intake: captures the inquiry as a lead and acknowledges it
/// by email.
pub async fn contact(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ContactRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    tracing::info!("POST /contact - subject: {}", request.subject);

    let lead = state.leads.handle_inquiry(&request).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "lead_id": lead.id, "status": "received" })),
    ))
}

/// GET /api/v1/downloads/stats
pub async fn download_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DownloadStats>, AppError> {
    Ok(Json(state.leads.download_stats().await?))
}

/// POST /api/v1/payments/initialize
///
/// Runs the booking funnel up to payment initialization: tier selection,
/// contact validation, transaction creation. Returns the reference and the
/// parameters the checkout overlay needs. A watcher task follows the
/// overlay session so its single resolution lands in the analytics log.
pub async fn initialize_payment(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InitializePaymentRequest>,
) -> Result<Json<PaymentInit>, AppError> {
    tracing::info!(
        "POST /payments/initialize - consultation_type: {}",
        request.consultation_type
    );

    let mut funnel = BookingFunnel::new(
        state.gateway.clone(),
        state.config.tiers.clone(),
        state.config.scheduling.clone(),
        &state.config.payment_currency,
        request.source.as_deref().unwrap_or("consultation_page"),
    );
    funnel.select_tier(&request.consultation_type)?;
    funnel.submit_contact_info(&request.name, &request.email, request.phone.as_deref())?;
    let init = funnel.start_payment().await?;

    spawn_overlay_watcher(&state, &init);

    Ok(Json(init))
}

/// Queues an overlay session for the new payment and logs how it resolves.
/// The session's completion/dismissal arrives via the verify endpoint, the
/// close endpoint, or the gateway webhook.
fn spawn_overlay_watcher(state: &Arc<AppState>, init: &PaymentInit) {
    let sessions = state.checkout.clone();
    let analytics = state.analytics.clone();
    let reference = init.reference.clone();
    let params = init.checkout.clone();
    tokio::spawn(async move {
        let session = match sessions.open(&reference, params).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("Failed to open checkout session for {}: {}", reference, e);
                return;
            }
        };
        match session.outcome().await {
            Ok(CheckoutOutcome::Completed { .. }) => {
                analytics.track_event("payment", "popup_completed", &reference, None);
            }
            Ok(CheckoutOutcome::Dismissed) => {
                analytics.track_event("payment", "popup_closed", &reference, None);
            }
            Err(e) => {
                tracing::warn!("Checkout session for {} ended abnormally: {}", reference, e);
            }
        }
    });
}

/// POST /api/v1/payments/verify
///
/// Verifies a completed charge. The transaction must have been initialized
/// first; the gateway of record is consulted before anything is marked
/// successful. Responds with the verification snapshot and the scheduling
/// redirect for the purchased consultation type.
pub async fn verify_payment(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::info!("POST /payments/verify - reference: {}", request.reference);

    state
        .checkout
        .resolve_completed(&request.reference, &request.transaction_id, "successful")
        .await;

    let result = state
        .gateway
        .verify(&request.reference, &request.transaction_id)
        .await?;

    state
        .analytics
        .track_conversion("payment_complete", Some(result.amount));

    let consultation_type = result
        .metadata
        .get("consultation_type")
        .map(String::as_str)
        .unwrap_or("");
    let redirect_url = state
        .config
        .scheduling
        .for_consultation(consultation_type)
        .to_string();

    Ok(Json(json!({
        "status": "success",
        "message": "Payment verified",
        "data": result,
        "redirect_url": redirect_url,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ClosePaymentRequest {
    pub reference: String,
}

/// POST /api/v1/payments/close
///
/// The user dismissed the checkout overlay without completing a charge.
/// The transaction stays initialized so the payment can be retried.
pub async fn close_payment(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ClosePaymentRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::info!("POST /payments/close - reference: {}", request.reference);

    state.checkout.resolve_dismissed(&request.reference).await;
    Ok(Json(json!({ "status": "closed", "reference": request.reference })))
}

/// GET /api/v1/transactions/:id
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Transaction>, AppError> {
    let transaction = state
        .transactions
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Transaction {} not found", id)))?;
    Ok(Json(transaction))
}
