//! Payment gateway adapter tests with mocked external APIs.
//!
//! The gateway of record and the email transports are wiremock servers, so
//! the full initialize -> verify -> receipt path runs without touching real
//! services.

mod common;

use common::{build_gateway, test_config};
use regex::Regex;
use rust_funnel_api::errors::AppError;
use rust_funnel_api::models::{Customer, TransactionStatus};
use rust_funnel_api::store::TransactionStore;
use std::collections::HashMap;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ada() -> Customer {
    Customer {
        email: "ada@example.com".to_string(),
        name: "Ada Lovelace".to_string(),
    }
}

fn consultation_metadata(kind: &str) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    metadata.insert("consultation_type".to_string(), kind.to_string());
    metadata.insert("source".to_string(), "consultation_page".to_string());
    metadata
}

/// Mounts the authoritative verify endpoint reporting a successful charge.
async fn mount_successful_charge(server: &MockServer, gateway_tx_id: &str, reference: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/transactions/{}/verify", gateway_tx_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "data": {
                "status": "successful",
                "tx_ref": reference,
                "amount": 50,
                "currency": "USD"
            }
        })))
        .mount(server)
        .await;
}

async fn email_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/api/email")
        .count()
}

#[tokio::test]
async fn initialize_produces_reference_and_initialized_transaction() {
    let gateway_server = MockServer::start().await;
    let email_server = MockServer::start().await;
    let config = test_config(&gateway_server.uri(), &email_server.uri());
    let (gateway, store, _) = build_gateway(&config);

    let init = gateway
        .initialize(
            50.0,
            "USD",
            ada(),
            consultation_metadata("document_review"),
            "DiasporaLink Document Review Consultation",
        )
        .await
        .unwrap();

    let reference_format = Regex::new(r"^DIASPORA-\d{10,}-\d{1,3}$").unwrap();
    assert!(
        reference_format.is_match(&init.reference),
        "unexpected reference format: {}",
        init.reference
    );
    assert_eq!(init.checkout.tx_ref, init.reference);
    assert_eq!(init.checkout.amount, 50.0);
    assert_eq!(init.checkout.public_key, "pk_test");

    let stored = store
        .find_by_reference(&init.reference)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, TransactionStatus::Initialized);
    assert_eq!(stored.customer, ada());
    assert!(stored.verified_at.is_none());
}

#[tokio::test]
async fn initialize_rejects_missing_inputs() {
    let gateway_server = MockServer::start().await;
    let email_server = MockServer::start().await;
    let config = test_config(&gateway_server.uri(), &email_server.uri());
    let (gateway, store, _) = build_gateway(&config);

    let zero_amount = gateway
        .initialize(0.0, "USD", ada(), HashMap::new(), "Consultation")
        .await;
    assert!(matches!(zero_amount, Err(AppError::InvalidInput(_))));

    let no_currency = gateway
        .initialize(50.0, "  ", ada(), HashMap::new(), "Consultation")
        .await;
    assert!(matches!(no_currency, Err(AppError::InvalidInput(_))));

    let anonymous = Customer {
        email: "".to_string(),
        name: "Ada".to_string(),
    };
    let no_email = gateway
        .initialize(50.0, "USD", anonymous, HashMap::new(), "Consultation")
        .await;
    assert!(matches!(no_email, Err(AppError::InvalidInput(_))));

    // None of the rejected attempts persisted anything.
    assert!(store.get(1).await.unwrap().is_none());
}

#[tokio::test]
async fn generated_references_keep_the_required_format() {
    let gateway_server = MockServer::start().await;
    let email_server = MockServer::start().await;
    let config = test_config(&gateway_server.uri(), &email_server.uri());
    let (gateway, _, _) = build_gateway(&config);

    let reference_format = Regex::new(r"^DIASPORA-\d{10,}-\d{1,3}$").unwrap();
    for _ in 0..100 {
        let reference = gateway.generate_reference();
        assert!(
            reference_format.is_match(&reference),
            "bad reference: {}",
            reference
        );
    }
}

#[tokio::test]
async fn verify_unknown_reference_fails_with_not_found() {
    let gateway_server = MockServer::start().await;
    let email_server = MockServer::start().await;
    let config = test_config(&gateway_server.uri(), &email_server.uri());
    let (gateway, _, _) = build_gateway(&config);

    let result = gateway.verify("DIASPORA-0-0", "ext-123").await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn verify_confirms_with_the_gateway_of_record_and_sends_one_receipt() {
    let gateway_server = MockServer::start().await;
    let email_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/email"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"sent": true})))
        .mount(&email_server)
        .await;

    let config = test_config(&gateway_server.uri(), &email_server.uri());
    let (gateway, store, _) = build_gateway(&config);

    let init = gateway
        .initialize(
            50.0,
            "USD",
            ada(),
            consultation_metadata("document_review"),
            "DiasporaLink Document Review Consultation",
        )
        .await
        .unwrap();

    mount_successful_charge(&gateway_server, "ext-123", &init.reference).await;

    let result = gateway.verify(&init.reference, "ext-123").await.unwrap();
    assert_eq!(result.status, TransactionStatus::Successful);
    assert_eq!(result.amount, 50.0);
    assert_eq!(result.currency, "USD");
    assert_eq!(result.reference, init.reference);

    let stored = store
        .find_by_reference(&init.reference)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, TransactionStatus::Successful);
    assert!(stored.verified_at.is_some());
    assert_eq!(stored.gateway_transaction_id.as_deref(), Some("ext-123"));

    // The receipt send is fire-and-forget; give it a moment to land.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(email_requests(&email_server).await, 1);

    // Repeated verification is idempotent: same snapshot, no second receipt.
    let again = gateway.verify(&init.reference, "ext-123").await.unwrap();
    assert_eq!(again.status, TransactionStatus::Successful);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(email_requests(&email_server).await, 1);
}

#[tokio::test]
async fn verify_rejects_a_charge_the_gateway_reports_as_failed() {
    let gateway_server = MockServer::start().await;
    let email_server = MockServer::start().await;
    let config = test_config(&gateway_server.uri(), &email_server.uri());
    let (gateway, store, _) = build_gateway(&config);

    let init = gateway
        .initialize(
            50.0,
            "USD",
            ada(),
            consultation_metadata("document_review"),
            "Consultation",
        )
        .await
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/transactions/ext-999/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "data": {
                "status": "failed",
                "tx_ref": init.reference,
                "amount": 50,
                "currency": "USD"
            }
        })))
        .mount(&gateway_server)
        .await;

    let result = gateway.verify(&init.reference, "ext-999").await;
    assert!(matches!(result, Err(AppError::ExternalApi(_))));

    // A failed authoritative check leaves the transaction retryable.
    let stored = store
        .find_by_reference(&init.reference)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, TransactionStatus::Initialized);
}

#[tokio::test]
async fn verify_rejects_a_charge_for_a_different_reference() {
    let gateway_server = MockServer::start().await;
    let email_server = MockServer::start().await;
    let config = test_config(&gateway_server.uri(), &email_server.uri());
    let (gateway, store, _) = build_gateway(&config);

    let init = gateway
        .initialize(
            50.0,
            "USD",
            ada(),
            consultation_metadata("document_review"),
            "Consultation",
        )
        .await
        .unwrap();

    // The gateway reports a successful charge, but for someone else's
    // reference: a client replaying another transaction id.
    Mock::given(method("GET"))
        .and(path("/transactions/ext-777/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "data": {
                "status": "successful",
                "tx_ref": "DIASPORA-0-1",
                "amount": 50,
                "currency": "USD"
            }
        })))
        .mount(&gateway_server)
        .await;

    let result = gateway.verify(&init.reference, "ext-777").await;
    assert!(matches!(result, Err(AppError::ExternalApi(_))));

    let stored = store
        .find_by_reference(&init.reference)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, TransactionStatus::Initialized);
}

#[tokio::test]
async fn verify_surfaces_gateway_errors_as_external_api_failures() {
    let gateway_server = MockServer::start().await;
    let email_server = MockServer::start().await;
    let config = test_config(&gateway_server.uri(), &email_server.uri());
    let (gateway, _, _) = build_gateway(&config);

    let init = gateway
        .initialize(
            25.0,
            "USD",
            ada(),
            consultation_metadata("planning_preparation"),
            "Consultation",
        )
        .await
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/transactions/ext-500/verify"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&gateway_server)
        .await;

    let result = gateway.verify(&init.reference, "ext-500").await;
    assert!(matches!(result, Err(AppError::ExternalApi(_))));
}
