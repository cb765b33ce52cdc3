//! In-memory template store for tests and local development.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::template::model::TemplateStatus;

use super::{ProviderRow, StoreError, TemplateRecord, TemplateStore};

/// DashMap-backed store. Record-level operations are atomic because the
/// whole record lives under one key.
#[derive(Default)]
pub struct MemoryTemplateStore {
    records: DashMap<Uuid, TemplateRecord>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }
}

#[async_trait]
impl TemplateStore for MemoryTemplateStore {
    async fn insert_template(&self, record: &TemplateRecord) -> Result<(), StoreError> {
        let row = &record.template;
        let duplicate = self.records.iter().any(|r| {
            let t = &r.template;
            t.business_id == row.business_id && t.name == row.name && t.language == row.language
        });
        if duplicate {
            return Err(StoreError::Duplicate(format!(
                "template {} ({}) already exists for this business",
                row.name, row.language
            )));
        }

        self.records.insert(row.id, record.clone());
        Ok(())
    }

    async fn fetch_template(&self, id: Uuid) -> Result<Option<TemplateRecord>, StoreError> {
        Ok(self.records.get(&id).map(|r| r.clone()))
    }

    async fn find_template_id(
        &self,
        business_id: Uuid,
        name: &str,
        language: &str,
    ) -> Result<Option<Uuid>, StoreError> {
        Ok(self
            .records
            .iter()
            .find(|r| {
                let t = &r.template;
                t.business_id == business_id && t.name == name && t.language == language
            })
            .map(|r| r.template.id))
    }

    async fn list_templates(&self, business_id: Uuid) -> Result<Vec<TemplateRecord>, StoreError> {
        let mut records: Vec<TemplateRecord> = self
            .records
            .iter()
            .filter(|r| r.template.business_id == business_id)
            .map(|r| r.clone())
            .collect();
        records.sort_by_key(|r| r.template.created_at);
        Ok(records)
    }

    async fn replace_content(&self, record: &TemplateRecord) -> Result<(), StoreError> {
        let id = record.template.id;
        let mut existing = self
            .records
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("template {}", id)))?;

        existing.template = record.template.clone();
        existing.components = record.components.clone();
        existing.buttons = record.buttons.clone();
        existing.media = record.media.clone();
        // Provider rows are managed separately.
        Ok(())
    }

    async fn delete_template(&self, id: Uuid) -> Result<(), StoreError> {
        self.records
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("template {}", id)))
    }

    async fn set_template_status(
        &self,
        id: Uuid,
        status: TemplateStatus,
    ) -> Result<(), StoreError> {
        let mut record = self
            .records
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("template {}", id)))?;
        record.template.status = status;
        record.template.updated_at = Utc::now();
        Ok(())
    }

    async fn upsert_provider_row(&self, row: &ProviderRow) -> Result<(), StoreError> {
        let mut record = self
            .records
            .get_mut(&row.template_id)
            .ok_or_else(|| StoreError::NotFound(format!("template {}", row.template_id)))?;

        match record.providers.iter_mut().find(|p| p.id == row.id) {
            Some(existing) => *existing = row.clone(),
            None => record.providers.push(row.clone()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::decompose;
    use crate::template::model::{
        Body, CanonicalTemplate, Category, ProviderApprovalStatus, TemplateContent,
    };

    fn sample_record(name: &str) -> TemplateRecord {
        let template = CanonicalTemplate {
            id: Uuid::new_v4(),
            business_id: Uuid::nil(),
            name: name.to_string(),
            category: Category::Utility,
            language: "en".to_string(),
            channel: "WhatsApp".to_string(),
            content: TemplateContent {
                header: None,
                body: Body {
                    text: "hello".to_string(),
                },
                footer: None,
                buttons: vec![],
                carousel: None,
            },
            placeholders: vec![],
            status: TemplateStatus::Draft,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        decompose(&template)
    }

    #[tokio::test]
    async fn test_insert_and_fetch() {
        let store = MemoryTemplateStore::new();
        let record = sample_record("greeting");

        store.insert_template(&record).await.unwrap();
        let fetched = store
            .fetch_template(record.template.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.template.name, "greeting");
    }

    #[tokio::test]
    async fn test_duplicate_rejected() {
        let store = MemoryTemplateStore::new();
        let record = sample_record("greeting");
        let mut duplicate = sample_record("greeting");
        duplicate.template.id = Uuid::new_v4();

        store.insert_template(&record).await.unwrap();
        let err = store.insert_template(&duplicate).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_delete_cascades_whole_record() {
        let store = MemoryTemplateStore::new();
        let record = sample_record("greeting");
        let id = record.template.id;

        store.insert_template(&record).await.unwrap();
        store.delete_template(id).await.unwrap();
        assert!(store.fetch_template(id).await.unwrap().is_none());
        assert!(matches!(
            store.delete_template(id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_upsert_provider_row() {
        let store = MemoryTemplateStore::new();
        let record = sample_record("greeting");
        let template_id = record.template.id;
        store.insert_template(&record).await.unwrap();

        let mut row = ProviderRow {
            id: Uuid::new_v4(),
            template_id,
            channel_id: "chan-1".to_string(),
            provider: "meta".to_string(),
            provider_template_id: Some("m-1".to_string()),
            provider_template_name: None,
            approval_status: ProviderApprovalStatus::Pending,
            approved_at: None,
            rejected_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        store.upsert_provider_row(&row).await.unwrap();

        row.approval_status = ProviderApprovalStatus::Approved;
        store.upsert_provider_row(&row).await.unwrap();

        let fetched = store.fetch_template(template_id).await.unwrap().unwrap();
        assert_eq!(fetched.providers.len(), 1);
        assert_eq!(
            fetched.providers[0].approval_status,
            ProviderApprovalStatus::Approved
        );
    }

    #[tokio::test]
    async fn test_find_template_id() {
        let store = MemoryTemplateStore::new();
        let record = sample_record("greeting");
        store.insert_template(&record).await.unwrap();

        let found = store
            .find_template_id(Uuid::nil(), "greeting", "en")
            .await
            .unwrap();
        assert_eq!(found, Some(record.template.id));

        let missing = store
            .find_template_id(Uuid::nil(), "greeting", "fr")
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
