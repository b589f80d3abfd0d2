//! Handler-level tests for the payment endpoints.

mod common;

use axum::extract::{Json, Path, State};
use common::{build_app_state, test_config};
use rust_funnel_api::errors::AppError;
use rust_funnel_api::handlers::{
    close_payment, get_transaction, initialize_payment, list_tiers, verify_payment,
    ClosePaymentRequest,
};
use rust_funnel_api::models::{
    InitializePaymentRequest, TransactionStatus, VerifyPaymentRequest,
};
use rust_funnel_api::store::TransactionStore;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ada_request(consultation_type: &str) -> InitializePaymentRequest {
    InitializePaymentRequest {
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        phone: None,
        consultation_type: consultation_type.to_string(),
        source: None,
    }
}

#[tokio::test]
async fn tiers_endpoint_lists_the_fixed_table() {
    let gateway_server = MockServer::start().await;
    let email_server = MockServer::start().await;
    let config = test_config(&gateway_server.uri(), &email_server.uri());
    let (state, _) = build_app_state(config);

    let Json(body) = list_tiers(State(state)).await;
    let tiers = body["tiers"].as_array().unwrap();
    assert_eq!(tiers.len(), 3);
    assert_eq!(tiers[1]["id"], "document_review");
    assert_eq!(tiers[1]["price"], 50.0);
}

#[tokio::test]
async fn initialize_endpoint_creates_a_transaction_for_the_selected_tier() {
    let gateway_server = MockServer::start().await;
    let email_server = MockServer::start().await;
    let config = test_config(&gateway_server.uri(), &email_server.uri());
    let (state, store) = build_app_state(config);

    let Json(init) = initialize_payment(State(state.clone()), Json(ada_request("document_review")))
        .await
        .unwrap();

    assert!(init.reference.starts_with("DIASPORA-"));
    assert_eq!(init.checkout.amount, 50.0);
    assert_eq!(
        init.checkout.meta.get("consultation_type").map(String::as_str),
        Some("document_review")
    );

    let stored = store.get(init.transaction_id).await.unwrap().unwrap();
    assert_eq!(stored.status, TransactionStatus::Initialized);

    // Transaction details endpoint round-trip.
    let Json(fetched) = get_transaction(State(state.clone()), Path(init.transaction_id))
        .await
        .unwrap();
    assert_eq!(fetched.reference, init.reference);

    let missing = get_transaction(State(state), Path(9999)).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn initialize_endpoint_rejects_bad_input_without_persisting() {
    let gateway_server = MockServer::start().await;
    let email_server = MockServer::start().await;
    let config = test_config(&gateway_server.uri(), &email_server.uri());
    let (state, store) = build_app_state(config);

    let bad_tier = initialize_payment(State(state.clone()), Json(ada_request("vip"))).await;
    match bad_tier {
        Err(AppError::Validation { field, .. }) => assert_eq!(field, "consultationType"),
        other => panic!("expected Validation, got {:?}", other),
    }

    let mut bad_email = ada_request("document_review");
    bad_email.email = "not-an-email".to_string();
    let result = initialize_payment(State(state), Json(bad_email)).await;
    match result {
        Err(AppError::Validation { field, .. }) => assert_eq!(field, "email"),
        other => panic!("expected Validation, got {:?}", other),
    }

    assert!(store.get(1).await.unwrap().is_none());
}

#[tokio::test]
async fn verify_endpoint_confirms_and_returns_the_scheduling_redirect() {
    let gateway_server = MockServer::start().await;
    let email_server = MockServer::start().await;
    let config = test_config(&gateway_server.uri(), &email_server.uri());
    let (state, _) = build_app_state(config);

    let Json(init) = initialize_payment(State(state.clone()), Json(ada_request("document_review")))
        .await
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/transactions/ext-123/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "data": {
                "status": "successful",
                "tx_ref": init.reference,
                "amount": 50,
                "currency": "USD"
            }
        })))
        .mount(&gateway_server)
        .await;

    let Json(body) = verify_payment(
        State(state),
        Json(VerifyPaymentRequest {
            reference: init.reference.clone(),
            transaction_id: "ext-123".to_string(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["status"], "successful");
    assert_eq!(body["data"]["amount"], 50.0);
    assert_eq!(body["redirect_url"], "https://scheduling.example.com/document");
}

#[tokio::test]
async fn close_endpoint_leaves_the_transaction_retryable() {
    let gateway_server = MockServer::start().await;
    let email_server = MockServer::start().await;
    let config = test_config(&gateway_server.uri(), &email_server.uri());
    let (state, store) = build_app_state(config);

    let Json(init) = initialize_payment(State(state.clone()), Json(ada_request("full_support")))
        .await
        .unwrap();

    let Json(body) = close_payment(
        State(state),
        Json(ClosePaymentRequest {
            reference: init.reference.clone(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(body["status"], "closed");

    let stored = store
        .find_by_reference(&init.reference)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, TransactionStatus::Initialized);
}
