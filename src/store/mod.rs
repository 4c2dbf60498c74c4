//! Receipt persistence boundary

mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::receipt::ProcessedReceipt;

pub use memory::InMemoryReceiptRepository;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Fraud fields are written once; a second save is refused
    #[error("receipt {0} already exists")]
    AlreadyExists(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Storage capability for processed receipts. The scoring pipeline never
/// depends on a concrete backend.
#[async_trait]
pub trait ReceiptRepository: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    /// Persist a newly processed receipt
    async fn save(&self, receipt: ProcessedReceipt) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<ProcessedReceipt>, RepositoryError>;

    /// Flagged receipts awaiting review, newest upload first. With a
    /// supervisor, only that manager's team is returned.
    async fn list_flagged(
        &self,
        supervisor_id: Option<&str>,
    ) -> Result<Vec<ProcessedReceipt>, RepositoryError>;

    /// One employee's receipts, newest upload first
    async fn list_for_user(&self, uploaded_by: &str)
        -> Result<Vec<ProcessedReceipt>, RepositoryError>;
}
