use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rust_funnel_api::analytics::Analytics;
use rust_funnel_api::checkout::CheckoutSessions;
use rust_funnel_api::config::Config;
use rust_funnel_api::gateway::PaymentGateway;
use rust_funnel_api::handlers::{self, AppState};
use rust_funnel_api::leads::LeadService;
use rust_funnel_api::notifier::EmailNotifier;
use rust_funnel_api::store::{InMemoryLeadStore, InMemoryTransactionStore};
use rust_funnel_api::webhook_handler;

/// Main entry point for the application.
///
/// Initializes logging, configuration, the in-memory stores, the payment
/// gateway adapter and email notifier, then serves the funnel API with the
/// usual middleware stack (request size limit, per-IP rate limiting,
/// tracing, CORS).
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_funnel_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // In-memory stores: process lifetime, no teardown. The store traits are
    // the seam where a durable implementation would plug in.
    let transactions = Arc::new(InMemoryTransactionStore::new());
    let leads_store = Arc::new(InMemoryLeadStore::new());

    let analytics = Arc::new(Analytics::new());
    let notifier = Arc::new(EmailNotifier::new(&config));
    let gateway = Arc::new(PaymentGateway::new(
        &config,
        transactions.clone(),
        notifier.clone(),
        analytics.clone(),
    )?);
    let leads = Arc::new(LeadService::new(
        &config,
        leads_store,
        notifier.clone(),
        analytics.clone(),
    ));
    let checkout = Arc::new(CheckoutSessions::new());
    tracing::info!("Gateway adapter and email notifier initialized");

    let port = config.port;
    let app_state = Arc::new(AppState {
        config,
        transactions,
        gateway,
        notifier,
        leads,
        analytics,
        checkout,
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    // Build protected routes with security layers
    let protected_routes = Router::new()
        .route("/api/v1/tiers", get(handlers::list_tiers))
        .route(
            "/api/v1/leads",
            post(handlers::create_lead).get(handlers::leads_by_source),
        )
        .route("/api/v1/leads/:id/convert", post(handlers::convert_lead))
        .route("/api/v1/contact", post(handlers::contact))
        .route("/api/v1/downloads/stats", get(handlers::download_stats))
        .route(
            "/api/v1/payments/initialize",
            post(handlers::initialize_payment),
        )
        .route("/api/v1/payments/verify", post(handlers::verify_payment))
        .route("/api/v1/payments/close", post(handlers::close_payment))
        .route("/api/v1/transactions/:id", get(handlers::get_transaction))
        .route(
            "/api/v1/webhooks/payments",
            post(webhook_handler::payments_webhook),
        )
        .layer(
            ServiceBuilder::new()
                // Request size limit: 5MB max payload (prevents memory exhaustion)
                .layer(RequestBodyLimitLayer::new(5 * 1024 * 1024))
                // Rate limiting: 10 req/sec per IP, burst of 20
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Build final app with health check (bypasses rate limiting)
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
