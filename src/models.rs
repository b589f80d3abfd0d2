use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============ Domain Models ============

/// Customer snapshot captured at payment initialization time.
///
/// Not re-validated later; the funnel controller validates before the
/// snapshot is taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub email: String,
    pub name: String,
}

/// Lifecycle status of a payment transaction.
///
/// There is deliberately no failed terminal state: a transaction that never
/// reaches `Successful` stays `Initialized` for the life of the process and
/// may be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Initialized,
    Successful,
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Initialized => write!(f, "initialized"),
            TransactionStatus::Successful => write!(f, "successful"),
        }
    }
}

/// A payment attempt tracked by its merchant-side reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Process-local sequential identifier, assigned by the store.
    pub id: u64,
    /// Merchant-side unique reference, the idempotency/lookup key.
    pub reference: String,
    pub amount: f64,
    pub currency: String,
    pub customer: Customer,
    /// Open mapping: consultation type, phone, source.
    pub metadata: HashMap<String, String>,
    pub description: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    /// Set once by verification.
    pub verified_at: Option<DateTime<Utc>>,
    /// The gateway's own transaction id, recorded at verification.
    pub gateway_transaction_id: Option<String>,
    /// Payment method reported by the gateway webhook.
    pub payment_type: Option<String>,
    /// Amount actually charged, as reported by the gateway webhook.
    pub charged_amount: Option<f64>,
    /// Processor response text from the gateway webhook.
    pub processor_response: Option<String>,
}

/// A prospective customer captured before any payment occurs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub country: String,
    pub education_level: String,
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub is_converted: bool,
    pub has_downloaded_checklist: bool,
    pub last_activity: Option<DateTime<Utc>>,
}

/// A recorded checklist download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub id: String,
    pub lead_id: Option<String>,
    pub downloaded_at: DateTime<Utc>,
    pub source: String,
}

// ============ Gateway DTOs ============

/// Parameters handed to the external checkout surface.
///
/// Everything the hosted overlay needs to collect card details outside this
/// system's trust boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutParams {
    pub public_key: String,
    pub tx_ref: String,
    pub amount: f64,
    pub currency: String,
    pub payment_options: String,
    pub customer: CheckoutCustomer,
    pub customizations: CheckoutCustomizations,
    pub meta: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutCustomer {
    pub email: String,
    pub name: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutCustomizations {
    pub title: String,
    pub description: String,
}

/// Result of initializing a payment with the gateway adapter.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentInit {
    pub reference: String,
    pub transaction_id: u64,
    pub checkout: CheckoutParams,
}

/// Snapshot returned by a successful verification.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationResult {
    pub amount: f64,
    pub currency: String,
    pub status: TransactionStatus,
    pub transaction_id: u64,
    pub reference: String,
    pub metadata: HashMap<String, String>,
}

// ============ HTTP Request/Response Models ============

#[derive(Debug, Clone, Deserialize)]
pub struct InitializePaymentRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub consultation_type: String,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyPaymentRequest {
    pub reference: String,
    pub transaction_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLeadRequest {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub education_level: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LeadCreatedResponse {
    pub lead_id: String,
    pub checklist_email_scheduled: bool,
}

#[derive(Debug, Serialize)]
pub struct ConvertLeadResponse {
    pub lead_id: String,
    pub converted: bool,
    /// False when the lead had already been converted before this call.
    pub newly_converted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&TransactionStatus::Initialized).unwrap(),
            "\"initialized\""
        );
        assert_eq!(
            serde_json::to_string(&TransactionStatus::Successful).unwrap(),
            "\"successful\""
        );
    }

    #[test]
    fn initialize_request_tolerates_missing_optionals() {
        let json = r#"{
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "consultation_type": "document_review"
        }"#;
        let req: InitializePaymentRequest = serde_json::from_str(json).unwrap();
        assert!(req.phone.is_none());
        assert!(req.source.is_none());
    }
}
