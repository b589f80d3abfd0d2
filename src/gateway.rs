//! Payment gateway adapter.
//!
//! Builds payment requests, persists the transaction record, and verifies
//! completed charges against the gateway of record. Verification never
//! trusts a client-reported completion alone: it performs a live status
//! lookup with the gateway before flipping a transaction to successful.

use crate::analytics::Analytics;
use crate::config::{Config, SchedulingLinks};
use crate::errors::AppError;
use crate::models::{
    CheckoutCustomer, CheckoutCustomizations, CheckoutParams, Customer, PaymentInit, Transaction,
    TransactionStatus, VerificationResult,
};
use crate::notifier::EmailNotifier;
use crate::store::{NewTransaction, TransactionStore};
use crate::templates::TemplateId;
use chrono::Utc;
use rand::Rng;
use serde_json::{json, Map};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub struct PaymentGateway {
    client: reqwest::Client,
    base_url: String,
    public_key: String,
    secret_key: String,
    reference_prefix: String,
    checkout_title: String,
    scheduling: SchedulingLinks,
    store: Arc<dyn TransactionStore>,
    notifier: Arc<EmailNotifier>,
    analytics: Arc<Analytics>,
}

impl PaymentGateway {
    pub fn new(
        config: &Config,
        store: Arc<dyn TransactionStore>,
        notifier: Arc<EmailNotifier>,
        analytics: Arc<Analytics>,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::GatewayInit(format!("Failed to create gateway client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.gateway_base_url.clone(),
            public_key: config.gateway_public_key.clone(),
            secret_key: config.gateway_secret_key.clone(),
            reference_prefix: config.reference_prefix.clone(),
            checkout_title: config.checkout_title.clone(),
            scheduling: config.scheduling.clone(),
            store,
            notifier,
            analytics,
        })
    }

    /// Generates a merchant-side reference: `<PREFIX>-<unix-millis>-<0..999>`.
    ///
    /// Uniqueness is probabilistic (timestamp plus random suffix); there is
    /// no collision detection.
    pub fn generate_reference(&self) -> String {
        let suffix: u32 = rand::thread_rng().gen_range(0..1000);
        format!(
            "{}-{}-{}",
            self.reference_prefix,
            Utc::now().timestamp_millis(),
            suffix
        )
    }

    /// Initializes a payment: persists a transaction in `Initialized` and
    /// returns the parameters the external checkout surface needs.
    pub async fn initialize(
        &self,
        amount: f64,
        currency: &str,
        customer: Customer,
        metadata: HashMap<String, String>,
        description: &str,
    ) -> Result<PaymentInit, AppError> {
        if amount <= 0.0 {
            return Err(AppError::InvalidInput(
                "Amount must be greater than zero".to_string(),
            ));
        }
        if currency.trim().is_empty() {
            return Err(AppError::InvalidInput("Currency is required".to_string()));
        }
        if customer.email.trim().is_empty() || customer.name.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Customer email and name are required".to_string(),
            ));
        }

        let reference = self.generate_reference();
        let phone_number = metadata
            .get("phone")
            .filter(|p| !p.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| "08000000000".to_string());

        let transaction = self
            .store
            .create(NewTransaction {
                reference: reference.clone(),
                amount,
                currency: currency.to_string(),
                customer: customer.clone(),
                metadata: metadata.clone(),
                description: description.to_string(),
            })
            .await?;

        self.analytics.track_event(
            "payment",
            "initialized",
            &format!("{} {}", currency, amount),
            None,
        );
        tracing::info!(
            "Payment initialized: reference={}, amount={} {}",
            reference,
            amount,
            currency
        );

        Ok(PaymentInit {
            reference: reference.clone(),
            transaction_id: transaction.id,
            checkout: CheckoutParams {
                public_key: self.public_key.clone(),
                tx_ref: reference,
                amount,
                currency: currency.to_string(),
                payment_options: "card".to_string(),
                customer: CheckoutCustomer {
                    email: customer.email,
                    name: customer.name,
                    phone_number,
                },
                customizations: CheckoutCustomizations {
                    title: self.checkout_title.clone(),
                    description: description.to_string(),
                },
                meta: metadata,
            },
        })
    }

    /// Verifies a transaction by reference.
    ///
    /// Unknown references fail with `NotFound`. Already-successful
    /// transactions return their snapshot without side effects, so repeated
    /// verification cannot duplicate the receipt email. Otherwise the
    /// gateway of record is consulted and must report a matching successful
    /// charge before the transaction is marked successful.
    pub async fn verify(
        &self,
        reference: &str,
        gateway_transaction_id: &str,
    ) -> Result<VerificationResult, AppError> {
        if reference.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Transaction reference is required".to_string(),
            ));
        }

        let mut transaction = self
            .store
            .find_by_reference(reference)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction {} not found", reference)))?;

        if transaction.status == TransactionStatus::Successful {
            tracing::info!("Verification repeated for {}; already successful", reference);
            return Ok(snapshot(&transaction));
        }

        self.confirm_with_gateway(&transaction, gateway_transaction_id)
            .await?;

        transaction.status = TransactionStatus::Successful;
        transaction.verified_at = Some(Utc::now());
        transaction.gateway_transaction_id = Some(gateway_transaction_id.to_string());
        self.store.update(transaction.clone()).await?;

        self.analytics
            .track_event("payment", "verified", &transaction.reference, None);
        tracing::info!("Payment verified: {}", transaction.reference);

        self.schedule_receipt(&transaction);

        Ok(snapshot(&transaction))
    }

    /// Marks a transaction successful from a gateway webhook charge.
    ///
    /// The webhook is the gateway of record speaking, so no further lookup
    /// is performed. Returns whether the charge matched a stored reference.
    /// Completion is idempotent: an already-successful transaction only has
    /// its webhook-reported fields refreshed and no receipt is resent.
    pub async fn record_gateway_charge(
        &self,
        tx_ref: &str,
        status: &str,
        gateway_transaction_id: Option<&str>,
        payment_type: Option<&str>,
        charged_amount: Option<f64>,
        processor_response: Option<&str>,
    ) -> Result<bool, AppError> {
        let Some(mut transaction) = self.store.find_by_reference(tx_ref).await? else {
            tracing::warn!("Transaction not found for webhook charge: {}", tx_ref);
            return Ok(false);
        };

        let newly_successful =
            status == "successful" && transaction.status != TransactionStatus::Successful;

        transaction.payment_type = payment_type.map(str::to_string);
        transaction.charged_amount = charged_amount;
        transaction.processor_response = processor_response.map(str::to_string);
        if let Some(id) = gateway_transaction_id {
            transaction.gateway_transaction_id = Some(id.to_string());
        }
        if newly_successful {
            transaction.status = TransactionStatus::Successful;
            transaction.verified_at = Some(Utc::now());
        }
        self.store.update(transaction.clone()).await?;

        if newly_successful {
            self.analytics.track_event(
                "payment",
                "completed",
                &format!("{} {}", transaction.currency, transaction.amount),
                Some(transaction.amount),
            );
            self.schedule_receipt(&transaction);
        }

        Ok(true)
    }

    /// Authoritative status check against the gateway of record.
    async fn confirm_with_gateway(
        &self,
        transaction: &Transaction,
        gateway_transaction_id: &str,
    ) -> Result<(), AppError> {
        let url = format!(
            "{}/transactions/{}/verify",
            self.base_url, gateway_transaction_id
        );
        tracing::debug!("Confirming charge with gateway: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.secret_key))
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Gateway verify request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApi(format!(
                "Gateway verify returned status {}: {}",
                status, error_text
            )));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse gateway verify response: {}", e))
        })?;

        let null = serde_json::Value::Null;
        let data = body.get("data").unwrap_or(&null);
        let charge_status = data.get("status").and_then(|v| v.as_str()).unwrap_or("");
        let charge_ref = data.get("tx_ref").and_then(|v| v.as_str()).unwrap_or("");
        let charge_amount = data.get("amount").and_then(|v| v.as_f64()).unwrap_or(0.0);
        let charge_currency = data.get("currency").and_then(|v| v.as_str()).unwrap_or("");

        if charge_status != "successful" {
            return Err(AppError::ExternalApi(format!(
                "Gateway reports charge status '{}' for {}",
                charge_status, transaction.reference
            )));
        }
        if charge_ref != transaction.reference {
            return Err(AppError::ExternalApi(format!(
                "Gateway charge reference mismatch: expected {}, got {}",
                transaction.reference, charge_ref
            )));
        }
        if charge_amount < transaction.amount || charge_currency != transaction.currency {
            return Err(AppError::ExternalApi(format!(
                "Gateway charge amount mismatch: expected {} {}, got {} {}",
                transaction.amount, transaction.currency, charge_amount, charge_currency
            )));
        }

        Ok(())
    }

    /// Fire-and-forget receipt email. A delivery failure is logged and must
    /// never invalidate the payment that triggered it.
    fn schedule_receipt(&self, transaction: &Transaction) {
        let notifier = self.notifier.clone();
        let recipient = transaction.customer.clone();
        let scheduling_link = self
            .scheduling
            .for_consultation(
                transaction
                    .metadata
                    .get("consultation_type")
                    .map(String::as_str)
                    .unwrap_or(""),
            )
            .to_string();

        let mut data = Map::new();
        data.insert("reference".to_string(), json!(transaction.reference));
        data.insert("date".to_string(), json!(Utc::now().to_rfc3339()));
        data.insert("amount".to_string(), json!(transaction.amount.to_string()));
        data.insert("currency".to_string(), json!(transaction.currency));
        data.insert("scheduling_link".to_string(), json!(scheduling_link));

        let reference = transaction.reference.clone();
        tokio::spawn(async move {
            match notifier
                .send(TemplateId::PaymentReceipt.as_str(), &recipient, &data)
                .await
            {
                Ok(result) if result.success => {
                    tracing::info!("Receipt email sent for {}", reference);
                }
                Ok(result) => {
                    tracing::warn!(
                        "Receipt email for {} not delivered (simulated={})",
                        reference,
                        result.simulated
                    );
                }
                Err(e) => {
                    tracing::error!("Failed to send receipt email for {}: {}", reference, e);
                }
            }
        });
    }
}

fn snapshot(transaction: &Transaction) -> VerificationResult {
    VerificationResult {
        amount: transaction.amount,
        currency: transaction.currency.clone(),
        status: transaction.status,
        transaction_id: transaction.id,
        reference: transaction.reference.clone(),
        metadata: transaction.metadata.clone(),
    }
}
