//! Checkout overlay session tracking.
//!
//! The external checkout surface collects card details outside this
//! system's trust boundary. A session resolves exactly once, to either a
//! completed charge or a dismissal — a tagged union rather than a pair of
//! independent callbacks, so the two can never both (or neither) fire.
//!
//! The overlay is a singleton resource per process: concurrent opens queue
//! on a single permit, and the surface handle itself is loaded at most once.

use crate::errors::AppError;
use crate::models::CheckoutParams;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex, OnceCell, OwnedSemaphorePermit, Semaphore};

const CHECKOUT_SCRIPT_URL: &str = "https://checkout.flutterwave.com/v3.js";

/// How an open checkout session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOutcome {
    /// The external surface delivered a completed charge event.
    Completed {
        gateway_transaction_id: String,
        status: String,
    },
    /// The user dismissed the overlay without completing a charge. The
    /// associated transaction stays `Initialized` and may be retried.
    Dismissed,
}

/// Handle to the loaded external surface, shared process-wide.
#[derive(Debug, Clone)]
pub struct SurfaceHandle {
    pub script_url: String,
}

/// Registry of open checkout sessions, keyed by transaction reference.
pub struct CheckoutSessions {
    surface: OnceCell<SurfaceHandle>,
    permit: Arc<Semaphore>,
    pending: Mutex<HashMap<String, oneshot::Sender<CheckoutOutcome>>>,
}

/// An open overlay session. Holds the singleton permit until resolved or
/// dropped, which is what serializes concurrent presentations.
pub struct CheckoutSession {
    pub reference: String,
    pub surface: SurfaceHandle,
    pub params: CheckoutParams,
    outcome: oneshot::Receiver<CheckoutOutcome>,
    _permit: OwnedSemaphorePermit,
}

impl Default for CheckoutSessions {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckoutSessions {
    pub fn new() -> Self {
        Self {
            surface: OnceCell::new(),
            permit: Arc::new(Semaphore::new(1)),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Load-or-reuse of the external surface. The handle is created at most
    /// once per process; later calls return the same handle.
    async fn ensure_surface(&self) -> SurfaceHandle {
        self.surface
            .get_or_init(|| async {
                tracing::info!("Loading checkout surface: {}", CHECKOUT_SCRIPT_URL);
                SurfaceHandle {
                    script_url: CHECKOUT_SCRIPT_URL.to_string(),
                }
            })
            .await
            .clone()
    }

    /// Opens a session for `reference`. Queues behind any session already
    /// open; the overlay never shows twice at once.
    pub async fn open(
        &self,
        reference: &str,
        params: CheckoutParams,
    ) -> Result<CheckoutSession, AppError> {
        let surface = self.ensure_surface().await;
        let permit = self
            .permit
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AppError::Internal("checkout overlay shut down".to_string()))?;

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(reference.to_string(), tx);
        }

        tracing::info!("Checkout overlay opened for {}", reference);
        Ok(CheckoutSession {
            reference: reference.to_string(),
            surface,
            params,
            outcome: rx,
            _permit: permit,
        })
    }

    /// Delivers the completed-charge event for `reference`. Returns whether
    /// a session was waiting; resolving twice is a logged no-op.
    pub async fn resolve_completed(
        &self,
        reference: &str,
        gateway_transaction_id: &str,
        status: &str,
    ) -> bool {
        self.resolve(
            reference,
            CheckoutOutcome::Completed {
                gateway_transaction_id: gateway_transaction_id.to_string(),
                status: status.to_string(),
            },
        )
        .await
    }

    /// Records that the user dismissed the overlay for `reference`.
    pub async fn resolve_dismissed(&self, reference: &str) -> bool {
        self.resolve(reference, CheckoutOutcome::Dismissed).await
    }

    async fn resolve(&self, reference: &str, outcome: CheckoutOutcome) -> bool {
        let sender = {
            let mut pending = self.pending.lock().await;
            pending.remove(reference)
        };
        match sender {
            Some(tx) => {
                if tx.send(outcome).is_err() {
                    tracing::warn!("Checkout session for {} was dropped before resolution", reference);
                    return false;
                }
                true
            }
            None => {
                tracing::warn!(
                    "Ignoring resolution for {}: no open checkout session",
                    reference
                );
                false
            }
        }
    }
}

impl CheckoutSession {
    /// Waits for the session's single resolution.
    pub async fn outcome(self) -> Result<CheckoutOutcome, AppError> {
        self.outcome
            .await
            .map_err(|_| AppError::Internal("checkout session abandoned".to_string()))
    }
}
