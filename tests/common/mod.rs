#![allow(dead_code)]

use rust_funnel_api::analytics::Analytics;
use rust_funnel_api::checkout::CheckoutSessions;
use rust_funnel_api::config::{Config, SchedulingLinks};
use rust_funnel_api::gateway::PaymentGateway;
use rust_funnel_api::handlers::AppState;
use rust_funnel_api::leads::LeadService;
use rust_funnel_api::notifier::{EmailNotifier, OnAllFailed};
use rust_funnel_api::store::{InMemoryLeadStore, InMemoryTransactionStore};
use rust_funnel_api::tiers::TierCatalog;
use std::sync::Arc;

/// Test config pointing the gateway and email transports at mock servers.
pub fn test_config(gateway_base_url: &str, email_base_url: &str) -> Config {
    Config {
        port: 8080,
        gateway_base_url: gateway_base_url.to_string(),
        gateway_public_key: "pk_test".to_string(),
        gateway_secret_key: "sk_test".to_string(),
        reference_prefix: "DIASPORA".to_string(),
        payment_currency: "USD".to_string(),
        checkout_title: "DiasporaLink".to_string(),
        email_api_base_url: email_base_url.to_string(),
        email_api_key: "test_key".to_string(),
        email_api_secret: "test_secret".to_string(),
        email_sender: "noreply@example.com".to_string(),
        email_fallback_url: format!("{}/fallback", email_base_url),
        email_timeout_secs: 2,
        email_on_all_failed: OnAllFailed::Simulate,
        scheduling: SchedulingLinks {
            planning_preparation: "https://scheduling.example.com/planning".to_string(),
            document_review: "https://scheduling.example.com/document".to_string(),
            full_support: "https://scheduling.example.com/full".to_string(),
            fallback: "https://scheduling.example.com/default".to_string(),
        },
        tiers: TierCatalog::default(),
        checklist_download_url: "https://files.example.com/checklist.pdf".to_string(),
        site_base_url: "https://www.example.com".to_string(),
        webhook_secret: None,
    }
}

/// Wires a gateway adapter over fresh in-memory stores.
pub fn build_gateway(
    config: &Config,
) -> (
    Arc<PaymentGateway>,
    Arc<InMemoryTransactionStore>,
    Arc<Analytics>,
) {
    let store = Arc::new(InMemoryTransactionStore::new());
    let analytics = Arc::new(Analytics::new());
    let notifier = Arc::new(EmailNotifier::new(config));
    let gateway = Arc::new(
        PaymentGateway::new(config, store.clone(), notifier, analytics.clone())
            .expect("gateway construction"),
    );
    (gateway, store, analytics)
}

/// Full handler state over in-memory stores, for handler-level tests.
pub fn build_app_state(config: Config) -> (Arc<AppState>, Arc<InMemoryTransactionStore>) {
    let store = Arc::new(InMemoryTransactionStore::new());
    let leads_store = Arc::new(InMemoryLeadStore::new());
    let analytics = Arc::new(Analytics::new());
    let notifier = Arc::new(EmailNotifier::new(&config));
    let gateway = Arc::new(
        PaymentGateway::new(&config, store.clone(), notifier.clone(), analytics.clone())
            .expect("gateway construction"),
    );
    let leads = Arc::new(LeadService::new(
        &config,
        leads_store,
        notifier.clone(),
        analytics.clone(),
    ));
    let state = Arc::new(AppState {
        config,
        transactions: store.clone(),
        gateway,
        notifier,
        leads,
        analytics,
        checkout: Arc::new(CheckoutSessions::new()),
    });
    (state, store)
}
