//! Provider approval-status reconciliation.
//!
//! Polls each provider for the approval status of submitted templates
//! and folds the answers back into the store. Reconciliation is
//! idempotent (an unchanged status writes nothing) and serialized per
//! template, so concurrent runs cannot interleave writes for the same
//! template. Batch runs process a fixed number of templates at a time,
//! finishing each batch before starting the next.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::ReconcileConfig;
use crate::error::{AppError, Result};
use crate::metrics::{RECONCILE_FAILURES_TOTAL, STATUS_TRANSITIONS_TOTAL};
use crate::provider::{ProviderConfig, ProviderRegistry};
use crate::store::{ProviderRow, TemplateRecord, TemplateStore};
use crate::template::model::{ProviderApprovalStatus, TemplateStatus};

/// What happened to one provider row during a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusTransition {
    Unchanged,
    Updated {
        from: ProviderApprovalStatus,
        to: ProviderApprovalStatus,
    },
}

/// Per-provider outcome of reconciling one template.
#[derive(Debug, Clone)]
pub struct ProviderOutcome {
    pub provider: String,
    pub transition: Option<StatusTransition>,
    pub error: Option<String>,
}

pub struct ReconcileEngine {
    store: Arc<dyn TemplateStore>,
    registry: Arc<ProviderRegistry>,
    config: ReconcileConfig,
    /// Per-template locks serializing concurrent reconciliations.
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl ReconcileEngine {
    pub fn new(
        store: Arc<dyn TemplateStore>,
        registry: Arc<ProviderRegistry>,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            store,
            registry,
            config,
            locks: DashMap::new(),
        }
    }

    /// Reconcile one template against every provider it was submitted to.
    /// Provider failures are isolated: one unreachable provider does not
    /// stop the others from being checked.
    #[tracing::instrument(name = "reconcile.template", skip(self, provider_config))]
    pub async fn reconcile_template(
        &self,
        template_id: Uuid,
        provider_config: &ProviderConfig,
    ) -> Result<Vec<ProviderOutcome>> {
        let lock = self
            .locks
            .entry(template_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let record = self
            .store
            .fetch_template(template_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("template {}", template_id)))?;

        let mut outcomes = Vec::with_capacity(record.providers.len());
        for row in &record.providers {
            outcomes.push(self.reconcile_row(&record, row, provider_config).await);
        }

        Ok(outcomes)
    }

    /// Reconcile many templates in fixed-size batches. Each batch runs
    /// concurrently and completes before the next starts.
    pub async fn reconcile_batch(
        &self,
        template_ids: &[Uuid],
        provider_config: &ProviderConfig,
    ) -> Vec<(Uuid, Result<Vec<ProviderOutcome>>)> {
        let mut results = Vec::with_capacity(template_ids.len());
        for chunk in template_ids.chunks(self.config.batch_size.max(1)) {
            let futures = chunk
                .iter()
                .map(|id| async move { (*id, self.reconcile_template(*id, provider_config).await) });
            results.extend(futures::future::join_all(futures).await);
        }
        results
    }

    async fn reconcile_row(
        &self,
        record: &TemplateRecord,
        row: &ProviderRow,
        provider_config: &ProviderConfig,
    ) -> ProviderOutcome {
        let Some(provider_template_id) = &row.provider_template_id else {
            return ProviderOutcome {
                provider: row.provider.clone(),
                transition: None,
                error: Some("no provider template id recorded".to_string()),
            };
        };

        let kind = match self.registry.resolve_stored(
            &row.provider,
            &record.template.channel,
            provider_config,
        ) {
            Ok(kind) => kind,
            Err(e) => return self.failure(row, e.to_string()),
        };

        let client = match self.registry.client(kind) {
            Ok(client) => client,
            Err(e) => return self.failure(row, e.to_string()),
        };

        let raw = match client
            .get_template_status(provider_template_id, provider_config)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(
                    template_id = %row.template_id,
                    provider = kind.as_str(),
                    error = %e,
                    "Status poll failed"
                );
                return self.failure(row, e.human_message());
            }
        };

        let compiler = self.registry.compiler(kind);
        let (status, reason) = compiler.map_status(&raw);

        if status == row.approval_status && reason == row.rejected_reason {
            return ProviderOutcome {
                provider: row.provider.clone(),
                transition: Some(StatusTransition::Unchanged),
                error: None,
            };
        }

        let now = Utc::now();
        let updated = ProviderRow {
            approval_status: status,
            approved_at: match status {
                ProviderApprovalStatus::Approved => row.approved_at.or(Some(now)),
                _ => None,
            },
            rejected_reason: reason.clone(),
            updated_at: now,
            ..row.clone()
        };

        if let Err(e) = self.store.upsert_provider_row(&updated).await {
            return self.failure(row, e.to_string());
        }

        if let Err(e) = self.promote_template(record, status).await {
            return self.failure(row, e.to_string());
        }

        STATUS_TRANSITIONS_TOTAL
            .with_label_values(&[kind.as_str(), status.as_str()])
            .inc();
        tracing::info!(
            template_id = %row.template_id,
            provider = kind.as_str(),
            from = row.approval_status.as_str(),
            to = status.as_str(),
            "Provider approval status changed"
        );

        ProviderOutcome {
            provider: row.provider.clone(),
            transition: Some(StatusTransition::Updated {
                from: row.approval_status,
                to: status,
            }),
            error: None,
        }
    }

    /// Fold a provider approval change into the template's canonical
    /// status. Approval and rejection both end the pending phase.
    async fn promote_template(
        &self,
        record: &TemplateRecord,
        status: ProviderApprovalStatus,
    ) -> Result<()> {
        let target = match status {
            ProviderApprovalStatus::Approved => TemplateStatus::Approved,
            ProviderApprovalStatus::Rejected => TemplateStatus::Rejected,
            ProviderApprovalStatus::Pending => return Ok(()),
        };
        if record.template.status == target {
            return Ok(());
        }
        self.store
            .set_template_status(record.template.id, target)
            .await?;
        Ok(())
    }

    fn failure(&self, row: &ProviderRow, message: String) -> ProviderOutcome {
        RECONCILE_FAILURES_TOTAL
            .with_label_values(&[row.provider.as_str()])
            .inc();
        ProviderOutcome {
            provider: row.provider.clone(),
            transition: None,
            error: Some(message),
        }
    }
}
