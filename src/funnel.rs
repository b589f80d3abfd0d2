//! Booking funnel controller.
//!
//! Drives one user's path from tier selection to a confirmed, scheduled
//! consultation: select a tier, collect contact details, initialize the
//! payment, hand off to the checkout overlay, verify the charge, confirm.
//! Nothing here auto-retries; every retry is user-initiated by resubmitting
//! the form or reopening the popup.

use crate::config::SchedulingLinks;
use crate::errors::{AppError, ResultExt};
use crate::gateway::PaymentGateway;
use crate::models::{Customer, PaymentInit, VerificationResult};
use crate::tiers::{ConsultationTier, TierCatalog, TierId};
use regex::Regex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// RFC-lite email shape check: `local@domain.tld`.
pub fn is_valid_email(email: &str) -> bool {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    let re = EMAIL_RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
    re.is_match(email.trim())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunnelState {
    SelectingTier,
    CollectingContactInfo,
    AwaitingPayment,
    PaymentPopupOpen,
    Verifying,
    Confirmed,
    PaymentFailed,
    VerificationFailed,
}

#[derive(Debug, Clone)]
pub struct ContactInfo {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Result of a confirmed booking: the verification snapshot plus the
/// deterministic scheduling redirect for the purchased tier.
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub result: VerificationResult,
    pub redirect_url: String,
}

pub struct BookingFunnel {
    state: FunnelState,
    selected: Option<TierId>,
    contact: Option<ContactInfo>,
    pending: Option<PaymentInit>,
    currency: String,
    source: String,
    catalog: TierCatalog,
    scheduling: SchedulingLinks,
    gateway: Arc<PaymentGateway>,
}

impl BookingFunnel {
    pub fn new(
        gateway: Arc<PaymentGateway>,
        catalog: TierCatalog,
        scheduling: SchedulingLinks,
        currency: &str,
        source: &str,
    ) -> Self {
        Self {
            state: FunnelState::SelectingTier,
            selected: None,
            contact: None,
            pending: None,
            currency: currency.to_string(),
            source: source.to_string(),
            catalog,
            scheduling,
            gateway,
        }
    }

    pub fn state(&self) -> FunnelState {
        self.state
    }

    pub fn selected_tier(&self) -> Option<&ConsultationTier> {
        self.selected.map(|id| self.catalog.get(id))
    }

    /// The reference of the payment currently in flight, if any.
    pub fn pending_reference(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.reference.as_str())
    }

    /// Pure state update from the fixed tier table.
    pub fn select_tier(&mut self, tier_id: &str) -> Result<&ConsultationTier, AppError> {
        let id = TierId::parse(tier_id)?;
        self.selected = Some(id);
        if self.state == FunnelState::SelectingTier {
            self.state = FunnelState::CollectingContactInfo;
        }
        Ok(self.catalog.get(id))
    }

    /// Validates and records the contact details. A failure names the
    /// offending field and leaves the funnel exactly where it was; the user
    /// corrects in place and resubmits.
    pub fn submit_contact_info(
        &mut self,
        name: &str,
        email: &str,
        phone: Option<&str>,
    ) -> Result<(), AppError> {
        if name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Please enter your full name".to_string(),
            });
        }
        if !is_valid_email(email) {
            return Err(AppError::Validation {
                field: "email".to_string(),
                message: "Please enter a valid email address".to_string(),
            });
        }

        self.contact = Some(ContactInfo {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            phone: phone.map(str::to_string).filter(|p| !p.trim().is_empty()),
        });
        self.state = FunnelState::AwaitingPayment;
        Ok(())
    }

    /// Initializes a transaction for the selected tier and contact.
    ///
    /// Gateway failures surface as `GatewayInit` (retryable) and return
    /// control to tier selection.
    pub async fn start_payment(&mut self) -> Result<PaymentInit, AppError> {
        let tier = self
            .selected
            .map(|id| self.catalog.get(id).clone())
            .ok_or_else(|| AppError::InvalidInput("No consultation tier selected".to_string()))?;
        let contact = self
            .contact
            .clone()
            .ok_or_else(|| AppError::InvalidInput("Contact details not submitted".to_string()))?;

        self.state = FunnelState::AwaitingPayment;

        let mut metadata = HashMap::new();
        metadata.insert(
            "consultation_type".to_string(),
            tier.id.as_str().to_string(),
        );
        metadata.insert("source".to_string(), self.source.clone());
        if let Some(phone) = &contact.phone {
            metadata.insert("phone".to_string(), phone.clone());
        }

        let description = format!("DiasporaLink {} Consultation", tier.title);
        let init = self
            .gateway
            .initialize(
                tier.price,
                &self.currency,
                Customer {
                    email: contact.email,
                    name: contact.name,
                },
                metadata,
                &description,
            )
            .await
            .map_err(|e| {
                self.state = FunnelState::SelectingTier;
                match e {
                    AppError::InvalidInput(msg) => AppError::GatewayInit(msg),
                    other => AppError::GatewayInit(other.to_string()),
                }
            })?;

        self.pending = Some(init.clone());
        self.state = FunnelState::PaymentPopupOpen;
        Ok(init)
    }

    /// The user dismissed the checkout overlay without completing a charge.
    /// No side effects; the transaction stays initialized and the popup may
    /// be reopened.
    pub fn on_payment_closed(&mut self) {
        if self.state == FunnelState::PaymentPopupOpen {
            tracing::info!("Checkout overlay dismissed; awaiting retry");
            self.state = FunnelState::AwaitingPayment;
        }
    }

    /// The overlay delivered a charge event that was not successful. The
    /// transaction stays initialized; control returns to the payment step
    /// for a user-initiated retry.
    pub fn on_payment_failed(&mut self, status: &str) -> AppError {
        tracing::warn!("Charge event reported non-successful status: {}", status);
        self.state = FunnelState::PaymentFailed;
        AppError::GatewayInit(format!(
            "Payment was not successful. Status: {}. Please try again",
            status
        ))
    }

    /// Reopens the payment step after a failed or dismissed attempt.
    pub fn retry_payment(&mut self) {
        if matches!(
            self.state,
            FunnelState::PaymentFailed | FunnelState::VerificationFailed
        ) {
            self.state = FunnelState::AwaitingPayment;
        }
    }

    /// A completed charge event arrived from the checkout overlay. Verifies
    /// it against the gateway of record and confirms the booking.
    pub async fn on_payment_success(
        &mut self,
        gateway_transaction_id: &str,
    ) -> Result<Confirmation, AppError> {
        let reference = self
            .pending
            .as_ref()
            .map(|p| p.reference.clone())
            .ok_or_else(|| AppError::InvalidInput("No payment in flight".to_string()))?;

        self.state = FunnelState::Verifying;
        match self.gateway.verify(&reference, gateway_transaction_id).await {
            Ok(result) => {
                self.state = FunnelState::Confirmed;
                let consultation_type = result
                    .metadata
                    .get("consultation_type")
                    .map(String::as_str)
                    .unwrap_or("");
                let redirect_url = self.scheduling.for_consultation(consultation_type).to_string();
                Ok(Confirmation {
                    result,
                    redirect_url,
                })
            }
            Err(e) => {
                self.state = FunnelState::VerificationFailed;
                Err(e).context("Payment verification failed. Please try again")
            }
        }
    }
}

/// Countdown started on entering `Confirmed`: after the delay the redirect
/// fires exactly once, unless cancelled by user navigation first.
pub struct RedirectCountdown {
    handle: tokio::task::JoinHandle<()>,
    fired: Arc<AtomicBool>,
}

impl RedirectCountdown {
    pub fn start<F>(delay: Duration, on_fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let fired = Arc::new(AtomicBool::new(false));
        let fired_flag = fired.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if fired_flag
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                on_fire();
            }
        });
        Self { handle, fired }
    }

    /// Cancels the pending redirect. A countdown that already fired stays
    /// fired; one that has not will never fire.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

impl Drop for RedirectCountdown {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
