//! Template lifecycle orchestration.
//!
//! Wires the validator, the decomposed store, the provider compilers and
//! the injected transports into the create/read/update/delete flows.
//! Creation is all-or-nothing: a failed provider submission aborts the
//! whole create and no rows are persisted. Update-resubmission and
//! delete-side provider cleanup are best-effort; their failures are
//! logged and never abort the local operation.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::metrics::{
    PROVIDER_SUBMISSIONS_TOTAL, TEMPLATES_CREATED_TOTAL, TEMPLATES_DELETED_TOTAL,
};
use crate::provider::{
    resolve_provider, ProviderCallError, ProviderConfig, ProviderKind, ProviderRegistry,
    ProviderSubmission,
};
use crate::store::{decompose, reconstruct, ProviderRow, TemplateRecord, TemplateStore};
use crate::template::model::{
    CanonicalTemplate, Category, CreateTemplateRequest, ProviderApprovalStatus,
    ProviderSubmissionView, TemplateResponse, TemplateStatus, UpdateTemplateRequest,
};
use crate::template::validate_request;

/// Business scope a request operates in: which business, which channel,
/// and the provider credentials for that channel.
#[derive(Debug, Clone)]
pub struct BusinessContext {
    pub business_id: Uuid,
    pub channel_id: String,
    pub provider_config: ProviderConfig,
    pub created_by: Option<String>,
}

pub struct TemplateService {
    store: Arc<dyn TemplateStore>,
    registry: Arc<ProviderRegistry>,
}

impl TemplateService {
    pub fn new(store: Arc<dyn TemplateStore>, registry: Arc<ProviderRegistry>) -> Self {
        Self { store, registry }
    }

    pub fn store(&self) -> Arc<dyn TemplateStore> {
        self.store.clone()
    }

    pub fn registry(&self) -> Arc<ProviderRegistry> {
        self.registry.clone()
    }

    /// Create one template per requested language, submitting each to the
    /// resolved provider. Rows are only persisted when the submission
    /// succeeds, so every stored pending_approval template has a valid
    /// provider attempt.
    #[tracing::instrument(name = "template.create", skip(self, ctx, request), fields(template_name = %request.template_name))]
    pub async fn create(
        &self,
        ctx: &BusinessContext,
        mut request: CreateTemplateRequest,
    ) -> Result<Vec<TemplateResponse>> {
        request.template_name = request.template_name.to_lowercase();
        validate_request(&request)?;

        let category = Category::parse(&request.category)
            .ok_or_else(|| AppError::Validation(format!("unknown category: {}", request.category)))?;
        let kind = resolve_provider(&request.business_channel, &ctx.provider_config)?;

        let mut responses = Vec::with_capacity(request.languages.len());

        for language in &request.languages {
            if self
                .store
                .find_template_id(ctx.business_id, &request.template_name, language)
                .await?
                .is_some()
            {
                return Err(AppError::Conflict(format!(
                    "template {} ({}) already exists for this business",
                    request.template_name, language
                )));
            }

            let now = Utc::now();
            let template = CanonicalTemplate {
                id: Uuid::new_v4(),
                business_id: ctx.business_id,
                name: request.template_name.clone(),
                category,
                language: language.clone(),
                channel: request.business_channel.clone(),
                content: request.content.clone(),
                placeholders: request.placeholders.clone(),
                status: TemplateStatus::Draft,
                created_by: ctx.created_by.clone(),
                created_at: now,
                updated_at: now,
            };

            // Submission comes first; a failure here aborts the create
            // with nothing persisted.
            let submission = self.submit(&template, &ctx.provider_config, kind).await?;

            let mut record = decompose(&template);
            record.template.status = TemplateStatus::PendingApproval;
            record.providers.push(ProviderRow {
                id: Uuid::new_v4(),
                template_id: template.id,
                channel_id: ctx.channel_id.clone(),
                provider: kind.as_str().to_string(),
                provider_template_id: Some(submission.template_id.clone()),
                provider_template_name: submission.template_name.clone(),
                approval_status: ProviderApprovalStatus::Pending,
                approved_at: None,
                rejected_reason: None,
                created_at: now,
                updated_at: now,
            });

            self.store.insert_template(&record).await?;
            TEMPLATES_CREATED_TOTAL.inc();

            tracing::info!(
                template_id = %template.id,
                provider = kind.as_str(),
                language = %language,
                "Template created and submitted"
            );

            responses.push(build_response(&record));
        }

        Ok(responses)
    }

    pub async fn get(&self, id: Uuid) -> Result<TemplateResponse> {
        let record = self.fetch(id).await?;
        Ok(build_response(&record))
    }

    pub async fn list(&self, business_id: Uuid) -> Result<Vec<TemplateResponse>> {
        let records = self.store.list_templates(business_id).await?;
        Ok(records.iter().map(build_response).collect())
    }

    /// Replace a template's content and resubmit it. Only permitted while
    /// the template is draft, rejected or pending_approval; approved
    /// content is immutable.
    #[tracing::instrument(name = "template.update", skip(self, ctx, request))]
    pub async fn update(
        &self,
        ctx: &BusinessContext,
        id: Uuid,
        request: UpdateTemplateRequest,
    ) -> Result<TemplateResponse> {
        let existing = self.fetch(id).await?;
        if !existing.template.status.is_editable() {
            return Err(AppError::Validation(
                "approved templates are immutable; create a new template instead".to_string(),
            ));
        }

        let category = match &request.category {
            Some(raw) => Category::parse(raw)
                .ok_or_else(|| AppError::Validation(format!("unknown category: {}", raw)))?,
            None => existing.template.category,
        };

        // Revalidate the replacement content under the stored identity.
        let check = CreateTemplateRequest {
            template_name: existing.template.name.clone(),
            category: category.as_str().to_string(),
            languages: vec![existing.template.language.clone()],
            business_channel: existing.template.channel.clone(),
            content: request.content.clone(),
            placeholders: request.placeholders.clone(),
        };
        validate_request(&check)?;

        let template = CanonicalTemplate {
            id,
            business_id: existing.template.business_id,
            name: existing.template.name.clone(),
            category,
            language: existing.template.language.clone(),
            channel: existing.template.channel.clone(),
            content: request.content,
            placeholders: request.placeholders,
            status: TemplateStatus::PendingApproval,
            created_by: existing.template.created_by.clone(),
            created_at: existing.template.created_at,
            updated_at: Utc::now(),
        };

        let mut record = decompose(&template);
        record.template.status = TemplateStatus::PendingApproval;
        self.store.replace_content(&record).await?;

        // Best-effort resubmission per provider row: the local state has
        // already changed, so remote failures are logged, not raised.
        for row in &existing.providers {
            self.resubmit_row(ctx, &template, row).await;
        }

        let updated = self.fetch(id).await?;
        Ok(build_response(&updated))
    }

    /// Delete a template. Only permitted pre-approval. Provider-side
    /// deletion is attempted first and tolerated to fail; the local
    /// cascade always runs.
    #[tracing::instrument(name = "template.delete", skip(self, ctx))]
    pub async fn delete(&self, ctx: &BusinessContext, id: Uuid) -> Result<()> {
        let record = self.fetch(id).await?;
        if record.template.status == TemplateStatus::Approved {
            return Err(AppError::Validation(
                "approved templates cannot be deleted".to_string(),
            ));
        }

        for row in &record.providers {
            let Some(provider_id) = &row.provider_template_id else {
                continue;
            };
            match self.client_for_row(ctx, &record.template.channel, row) {
                Ok((kind, client)) => {
                    if let Err(e) = client
                        .delete_template(provider_id, &ctx.provider_config)
                        .await
                    {
                        tracing::warn!(
                            template_id = %id,
                            provider = kind.as_str(),
                            error = %e,
                            "Provider-side template deletion failed, continuing with local delete"
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        template_id = %id,
                        provider = %row.provider,
                        error = %e,
                        "No usable client for provider-side deletion, continuing with local delete"
                    );
                }
            }
        }

        self.store.delete_template(id).await?;
        TEMPLATES_DELETED_TOTAL.inc();
        tracing::info!(template_id = %id, "Template deleted");
        Ok(())
    }

    async fn fetch(&self, id: Uuid) -> Result<TemplateRecord> {
        self.store
            .fetch_template(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("template {}", id)))
    }

    /// Compile and submit one template to one provider.
    async fn submit(
        &self,
        template: &CanonicalTemplate,
        config: &ProviderConfig,
        kind: ProviderKind,
    ) -> Result<ProviderSubmission> {
        let compiler = self.registry.compiler(kind);
        let client = self.registry.client(kind)?;

        let payload = compiler.compile(template, config, client.as_ref()).await?;

        match client.submit_template(&payload, config).await {
            Ok(submission) => {
                PROVIDER_SUBMISSIONS_TOTAL
                    .with_label_values(&[kind.as_str(), "ok"])
                    .inc();
                Ok(submission)
            }
            Err(e) => {
                PROVIDER_SUBMISSIONS_TOTAL
                    .with_label_values(&[kind.as_str(), "error"])
                    .inc();
                Err(provider_error(kind, e))
            }
        }
    }

    /// Delete the old provider submission (tolerating failure), submit the
    /// new content, and patch the provider row back to pending.
    async fn resubmit_row(
        &self,
        ctx: &BusinessContext,
        template: &CanonicalTemplate,
        row: &ProviderRow,
    ) {
        let kind = match self
            .registry
            .resolve_stored(&row.provider, &template.channel, &ctx.provider_config)
        {
            Ok(kind) => kind,
            Err(e) => {
                tracing::warn!(
                    template_id = %template.id,
                    provider = %row.provider,
                    error = %e,
                    "Cannot resolve provider for resubmission"
                );
                return;
            }
        };

        if let Some(old_id) = &row.provider_template_id {
            if let Ok(client) = self.registry.client(kind) {
                if let Err(e) = client.delete_template(old_id, &ctx.provider_config).await {
                    tracing::warn!(
                        template_id = %template.id,
                        provider = kind.as_str(),
                        error = %e,
                        "Deleting old provider submission failed, resubmitting anyway"
                    );
                }
            }
        }

        match self.submit(template, &ctx.provider_config, kind).await {
            Ok(submission) => {
                let patched = ProviderRow {
                    provider_template_id: Some(submission.template_id),
                    provider_template_name: submission.template_name,
                    approval_status: ProviderApprovalStatus::Pending,
                    approved_at: None,
                    rejected_reason: None,
                    updated_at: Utc::now(),
                    ..row.clone()
                };
                if let Err(e) = self.store.upsert_provider_row(&patched).await {
                    tracing::error!(
                        template_id = %template.id,
                        provider = kind.as_str(),
                        error = %e,
                        "Failed to persist resubmitted provider row"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    template_id = %template.id,
                    provider = kind.as_str(),
                    error = %e,
                    "Resubmission failed; local content updated without a new provider submission"
                );
            }
        }
    }

    fn client_for_row(
        &self,
        ctx: &BusinessContext,
        channel: &str,
        row: &ProviderRow,
    ) -> Result<(ProviderKind, Arc<dyn crate::provider::ProviderClient>)> {
        let kind = self
            .registry
            .resolve_stored(&row.provider, channel, &ctx.provider_config)?;
        let client = self.registry.client(kind)?;
        Ok((kind, client))
    }
}

fn provider_error(kind: ProviderKind, err: ProviderCallError) -> AppError {
    AppError::Provider {
        provider: kind.as_str().to_string(),
        message: err.human_message(),
    }
}

/// Project a record into the canonical read response.
pub fn build_response(record: &TemplateRecord) -> TemplateResponse {
    let canonical = reconstruct(record);

    let provider_submissions = record
        .providers
        .iter()
        .map(|row| ProviderSubmissionView {
            provider: row.provider.clone(),
            status: row.approval_status,
            submission_id: row.provider_template_id.clone(),
            approved_at: row.approved_at,
            rejected_reason: row.rejected_reason.clone(),
        })
        .collect();

    TemplateResponse {
        template_id: canonical.id,
        template_name: canonical.name,
        category: canonical.category,
        language: canonical.language,
        business_channel: canonical.channel,
        status: canonical.status,
        content: canonical.content,
        placeholders: canonical.placeholders,
        provider_submissions,
        created_at: canonical.created_at,
        updated_at: canonical.updated_at,
    }
}
