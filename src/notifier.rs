//! Transactional email delivery with multi-transport fallback.
//!
//! Delivery walks an ordered list of transports: the provider's API
//! endpoints first (Basic auth), then an unauthenticated fallback service.
//! Each attempt gets a short fixed timeout. What happens when every
//! transport fails is an explicit policy, not an environment sniff: either
//! report a simulated delivery or fail the call.
//!
//! Callers on a payment path must treat sends as fire-and-forget; a lost
//! receipt never invalidates a paid booking.

use crate::config::Config;
use crate::errors::AppError;
use crate::models::Customer;
use crate::templates::{self, TemplateId};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;

/// Policy for the moment every transport has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnAllFailed {
    /// Return a `DeliveryResult` tagged `simulated` instead of erroring.
    Simulate,
    /// Strict mode: surface `DeliveryFailed` to the caller.
    Throw,
}

#[derive(Debug, Clone)]
pub struct DeliveryResult {
    pub success: bool,
    pub simulated: bool,
    /// Which transport accepted the message, when one did.
    pub provider: Option<String>,
    pub error: Option<String>,
}

pub struct EmailNotifier {
    client: reqwest::Client,
    /// Primary transport endpoints, tried in order.
    endpoints: Vec<String>,
    fallback_url: String,
    api_key: String,
    api_secret: String,
    sender: String,
    attempt_timeout: Duration,
    on_all_failed: OnAllFailed,
}

impl EmailNotifier {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoints: vec![
                format!("{}/api/email", config.email_api_base_url),
                format!("{}/v1/messages", config.email_api_base_url),
            ],
            fallback_url: config.email_fallback_url.clone(),
            api_key: config.email_api_key.clone(),
            api_secret: config.email_api_secret.clone(),
            sender: config.email_sender.clone(),
            attempt_timeout: Duration::from_secs(config.email_timeout_secs),
            on_all_failed: config.email_on_all_failed,
        }
    }

    /// Sends a templated email.
    ///
    /// Fails with `UnknownTemplate` for ids outside the closed template set.
    /// Repeated calls with identical arguments send duplicate messages;
    /// idempotency is not provided here.
    pub async fn send(
        &self,
        template_id: &str,
        recipient: &Customer,
        data: &Map<String, Value>,
    ) -> Result<DeliveryResult, AppError> {
        let template = TemplateId::parse(template_id)?;
        if recipient.email.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Recipient email is required".to_string(),
            ));
        }

        let (subject, body) = templates::render(template, recipient, data);
        tracing::info!(
            "Sending '{}' email to {}",
            template.as_str(),
            recipient.email
        );
        self.deliver(recipient, &subject, &body).await
    }

    async fn deliver(
        &self,
        recipient: &Customer,
        subject: &str,
        body: &str,
    ) -> Result<DeliveryResult, AppError> {
        let to = recipient.email.trim().to_lowercase();
        let payload = json!({
            "from": self.sender,
            "to": to,
            "subject": subject,
            "html": body,
        });

        let mut last_error: Option<String> = None;

        for endpoint in &self.endpoints {
            tracing::debug!("Attempting email transport: {}", endpoint);
            let attempt = self
                .client
                .post(endpoint)
                .timeout(self.attempt_timeout)
                .basic_auth(&self.api_key, Some(&self.api_secret))
                .json(&payload)
                .send()
                .await;

            match attempt {
                Ok(response) if response.status().is_success() => {
                    tracing::info!("Email sent via {}", endpoint);
                    return Ok(DeliveryResult {
                        success: true,
                        simulated: false,
                        provider: Some(endpoint.clone()),
                        error: None,
                    });
                }
                Ok(response) => {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    tracing::warn!("Email transport {} returned {}: {}", endpoint, status, text);
                    last_error = Some(format!("{} returned {}", endpoint, status));
                }
                Err(e) => {
                    tracing::warn!("Email transport {} failed: {}", endpoint, e);
                    last_error = Some(e.to_string());
                }
            }
        }

        // Primary transports exhausted; try the fallback service.
        let fallback_payload = json!({
            "template_params": {
                "to_email": to,
                "to_name": recipient.name,
                "subject": subject,
                "message": body,
                "reply_to": self.sender,
            }
        });

        let fallback = self
            .client
            .post(&self.fallback_url)
            .timeout(self.attempt_timeout)
            .json(&fallback_payload)
            .send()
            .await;

        match fallback {
            Ok(response) if response.status().is_success() => {
                tracing::info!("Email sent via fallback transport");
                return Ok(DeliveryResult {
                    success: true,
                    simulated: false,
                    provider: Some("fallback".to_string()),
                    error: None,
                });
            }
            Ok(response) => {
                tracing::warn!("Fallback transport returned {}", response.status());
                last_error = Some(format!("fallback returned {}", response.status()));
            }
            Err(e) => {
                tracing::warn!("Fallback transport failed: {}", e);
                last_error = Some(e.to_string());
            }
        }

        let reason = last_error.unwrap_or_else(|| "all transports failed".to_string());
        match self.on_all_failed {
            OnAllFailed::Simulate => {
                tracing::warn!(
                    "All email transports failed; recording simulated delivery to {} ({})",
                    to,
                    reason
                );
                Ok(DeliveryResult {
                    success: false,
                    simulated: true,
                    provider: None,
                    error: Some(reason),
                })
            }
            OnAllFailed::Throw => Err(AppError::DeliveryFailed(reason)),
        }
    }
}
