//! Repository seam for leads and payment transactions.
//!
//! The funnel controller and gateway adapter only see these traits, so they
//! can run against the in-memory stores here or a durable implementation
//! without code changes. The in-memory stores live for the process lifetime
//! and are never torn down.

use crate::models::{Customer, DownloadRecord, Lead, Transaction, TransactionStatus};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
}

/// Fields supplied by the gateway when creating a transaction; the store
/// assigns the sequential id and timestamps.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub reference: String,
    pub amount: f64,
    pub currency: String,
    pub customer: Customer,
    pub metadata: HashMap<String, String>,
    pub description: String,
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn create(&self, tx: NewTransaction) -> Result<Transaction, StoreError>;
    async fn get(&self, id: u64) -> Result<Option<Transaction>, StoreError>;
    async fn find_by_reference(&self, reference: &str) -> Result<Option<Transaction>, StoreError>;
    /// Replaces the stored record with the same id.
    async fn update(&self, tx: Transaction) -> Result<(), StoreError>;
}

#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn create(&self, lead: Lead) -> Result<(), StoreError>;
    async fn get(&self, id: &str) -> Result<Option<Lead>, StoreError>;
    /// Replaces the stored record with the same id.
    async fn update(&self, lead: Lead) -> Result<(), StoreError>;
    async fn find_by_source(&self, source: &str) -> Result<Vec<Lead>, StoreError>;
    async fn record_download(&self, record: DownloadRecord) -> Result<(), StoreError>;
    async fn downloads(&self) -> Result<Vec<DownloadRecord>, StoreError>;
}

/// A thread-safe in-memory store for payment transactions.
///
/// Uses `Arc<RwLock<HashMap<u64, Transaction>>>` for shared concurrent
/// access, with an atomic counter for the process-local sequential ids.
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    transactions: Arc<RwLock<HashMap<u64, Transaction>>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self {
            transactions: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn create(&self, tx: NewTransaction) -> Result<Transaction, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let transaction = Transaction {
            id,
            reference: tx.reference,
            amount: tx.amount,
            currency: tx.currency,
            customer: tx.customer,
            metadata: tx.metadata,
            description: tx.description,
            status: TransactionStatus::Initialized,
            created_at: Utc::now(),
            verified_at: None,
            gateway_transaction_id: None,
            payment_type: None,
            charged_amount: None,
            processor_response: None,
        };
        let mut transactions = self.transactions.write().await;
        transactions.insert(id, transaction.clone());
        Ok(transaction)
    }

    async fn get(&self, id: u64) -> Result<Option<Transaction>, StoreError> {
        let transactions = self.transactions.read().await;
        Ok(transactions.get(&id).cloned())
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<Transaction>, StoreError> {
        let transactions = self.transactions.read().await;
        Ok(transactions
            .values()
            .find(|t| t.reference == reference)
            .cloned())
    }

    async fn update(&self, tx: Transaction) -> Result<(), StoreError> {
        let mut transactions = self.transactions.write().await;
        if !transactions.contains_key(&tx.id) {
            return Err(StoreError::NotFound(format!("transaction {}", tx.id)));
        }
        transactions.insert(tx.id, tx);
        Ok(())
    }
}

/// A thread-safe in-memory store for leads and checklist downloads.
#[derive(Default, Clone)]
pub struct InMemoryLeadStore {
    leads: Arc<RwLock<HashMap<String, Lead>>>,
    downloads: Arc<RwLock<Vec<DownloadRecord>>>,
}

impl InMemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LeadStore for InMemoryLeadStore {
    async fn create(&self, lead: Lead) -> Result<(), StoreError> {
        let mut leads = self.leads.write().await;
        leads.insert(lead.id.clone(), lead);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Lead>, StoreError> {
        let leads = self.leads.read().await;
        Ok(leads.get(id).cloned())
    }

    async fn update(&self, lead: Lead) -> Result<(), StoreError> {
        let mut leads = self.leads.write().await;
        if !leads.contains_key(&lead.id) {
            return Err(StoreError::NotFound(format!("lead {}", lead.id)));
        }
        leads.insert(lead.id.clone(), lead);
        Ok(())
    }

    async fn find_by_source(&self, source: &str) -> Result<Vec<Lead>, StoreError> {
        let leads = self.leads.read().await;
        Ok(leads.values().filter(|l| l.source == source).cloned().collect())
    }

    async fn record_download(&self, record: DownloadRecord) -> Result<(), StoreError> {
        let mut downloads = self.downloads.write().await;
        downloads.push(record);
        Ok(())
    }

    async fn downloads(&self) -> Result<Vec<DownloadRecord>, StoreError> {
        let downloads = self.downloads.read().await;
        Ok(downloads.clone())
    }
}
