use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{ReceiptRepository, RepositoryError};
use crate::types::receipt::ProcessedReceipt;

/// Process-local repository, suitable for tests and single-node workers.
#[derive(Default)]
pub struct InMemoryReceiptRepository {
    receipts: DashMap<String, ProcessedReceipt>,
}

impl InMemoryReceiptRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.receipts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receipts.is_empty()
    }

    fn collect_newest_first<F>(&self, keep: F) -> Vec<ProcessedReceipt>
    where
        F: Fn(&ProcessedReceipt) -> bool,
    {
        let mut receipts: Vec<ProcessedReceipt> = self
            .receipts
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        receipts.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at).then_with(|| a.id.cmp(&b.id)));
        receipts
    }
}

#[async_trait]
impl ReceiptRepository for InMemoryReceiptRepository {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn save(&self, receipt: ProcessedReceipt) -> Result<(), RepositoryError> {
        match self.receipts.entry(receipt.id.clone()) {
            Entry::Occupied(_) => Err(RepositoryError::AlreadyExists(receipt.id)),
            Entry::Vacant(slot) => {
                slot.insert(receipt);
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ProcessedReceipt>, RepositoryError> {
        Ok(self.receipts.get(id).map(|entry| entry.value().clone()))
    }

    async fn list_flagged(
        &self,
        supervisor_id: Option<&str>,
    ) -> Result<Vec<ProcessedReceipt>, RepositoryError> {
        Ok(self.collect_newest_first(|receipt| {
            receipt.awaits_review()
                && supervisor_id.map_or(true, |s| receipt.supervisor_id.as_deref() == Some(s))
        }))
    }

    async fn list_for_user(
        &self,
        uploaded_by: &str,
    ) -> Result<Vec<ProcessedReceipt>, RepositoryError> {
        Ok(self.collect_newest_first(|receipt| receipt.uploaded_by == uploaded_by))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::alert::OverallRisk;
    use crate::types::assessment::{FraudAnalysis, MlCheckResult};
    use crate::types::receipt::ReceiptStatus;
    use chrono::{Duration, TimeZone, Utc};

    fn receipt(id: &str, user: &str, supervisor: Option<&str>, flagged: bool, age_hours: i64) -> ProcessedReceipt {
        let uploaded_at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() - Duration::hours(age_hours);
        ProcessedReceipt {
            id: id.to_string(),
            file_name: format!("{id}.jpg"),
            image_reference: format!("receipts/{id}.jpg"),
            extracted_fields: Vec::new(),
            is_fraudulent: flagged,
            fraud_probability: if flagged { 0.8 } else { 0.1 },
            explanation: "Baseline check passed.".to_string(),
            fraud_analysis: FraudAnalysis {
                ml_check: MlCheckResult {
                    preliminary_risk_score: 0.1,
                    reason: "Baseline check passed.".to_string(),
                },
                ai_detection: None,
                overall_risk: if flagged { OverallRisk::High } else { OverallRisk::Low },
                analysis_timestamp: uploaded_at,
                degraded: false,
            },
            uploaded_at,
            uploaded_by: user.to_string(),
            supervisor_id: supervisor.map(str::to_string),
            status: ReceiptStatus::PendingApproval,
        }
    }

    #[tokio::test]
    async fn test_save_and_find() {
        let repo = InMemoryReceiptRepository::new();
        repo.save(receipt("r1", "a@example.com", None, false, 0)).await.unwrap();

        assert_eq!(repo.find_by_id("r1").await.unwrap().unwrap().file_name, "r1.jpg");
        assert!(repo.find_by_id("missing").await.unwrap().is_none());
        assert_eq!(repo.backend_tag(), "memory");
    }

    #[tokio::test]
    async fn test_save_is_write_once() {
        let repo = InMemoryReceiptRepository::new();
        repo.save(receipt("r1", "a@example.com", None, false, 0)).await.unwrap();

        assert_eq!(
            repo.save(receipt("r1", "a@example.com", None, true, 0)).await,
            Err(RepositoryError::AlreadyExists("r1".to_string()))
        );
        assert!(!repo.find_by_id("r1").await.unwrap().unwrap().is_fraudulent);
    }

    #[tokio::test]
    async fn test_list_flagged_filters_and_orders() {
        let repo = InMemoryReceiptRepository::new();
        repo.save(receipt("old", "a@example.com", Some("m1"), true, 5)).await.unwrap();
        repo.save(receipt("new", "b@example.com", Some("m1"), true, 1)).await.unwrap();
        repo.save(receipt("clean", "a@example.com", Some("m1"), false, 0)).await.unwrap();
        repo.save(receipt("other", "c@example.com", Some("m2"), true, 2)).await.unwrap();

        let mut approved = receipt("approved", "a@example.com", Some("m1"), true, 0);
        approved.status = ReceiptStatus::Approved;
        repo.save(approved).await.unwrap();

        let ids = |list: Vec<ProcessedReceipt>| list.into_iter().map(|r| r.id).collect::<Vec<_>>();

        assert_eq!(ids(repo.list_flagged(Some("m1")).await.unwrap()), vec!["new", "old"]);
        assert_eq!(ids(repo.list_flagged(None).await.unwrap()), vec!["new", "other", "old"]);
    }

    #[tokio::test]
    async fn test_list_for_user() {
        let repo = InMemoryReceiptRepository::new();
        repo.save(receipt("r1", "a@example.com", None, false, 3)).await.unwrap();
        repo.save(receipt("r2", "a@example.com", None, true, 1)).await.unwrap();
        repo.save(receipt("r3", "b@example.com", None, true, 0)).await.unwrap();

        let mine = repo.list_for_user("a@example.com").await.unwrap();
        assert_eq!(mine.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["r2", "r1"]);
        assert_eq!(repo.len(), 3);
    }
}
