//! Template CRUD and status-refresh endpoints.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::reconcile::{ProviderOutcome, StatusTransition};
use crate::server::AppState;
use crate::service::BusinessContext;
use crate::template::model::{CreateTemplateRequest, TemplateResponse, UpdateTemplateRequest};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub business_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    pub templates: Vec<TemplateResponse>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusRefreshResponse {
    pub template: TemplateResponse,
    pub providers: Vec<ProviderOutcomeView>,
}

#[derive(Debug, Serialize)]
pub struct ProviderOutcomeView {
    pub provider: String,
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&ProviderOutcome> for ProviderOutcomeView {
    fn from(outcome: &ProviderOutcome) -> Self {
        let (changed, status) = match &outcome.transition {
            Some(StatusTransition::Updated { to, .. }) => (true, Some(to.as_str().to_string())),
            Some(StatusTransition::Unchanged) => (false, None),
            None => (false, None),
        };
        Self {
            provider: outcome.provider.clone(),
            changed,
            status,
            error: outcome.error.clone(),
        }
    }
}

/// Business scope of a request: business id and acting user come from
/// headers, the channel and provider credentials from configuration.
fn business_context(state: &AppState, headers: &HeaderMap) -> Result<BusinessContext, AppError> {
    let business_id = headers
        .get("x-business-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Validation("missing x-business-id header".to_string()))?
        .parse::<Uuid>()
        .map_err(|_| AppError::Validation("x-business-id must be a UUID".to_string()))?;

    let created_by = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    Ok(BusinessContext {
        business_id,
        channel_id: state.settings.provider.channel_id.clone(),
        provider_config: state.settings.provider.config.clone(),
        created_by,
    })
}

/// POST /api/v1/templates - Create a template per requested language
#[tracing::instrument(
    name = "http.create_template",
    skip(state, headers, request),
    fields(template_name = %request.template_name)
)]
pub async fn create_template(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateTemplateRequest>,
) -> Result<(StatusCode, Json<Vec<TemplateResponse>>), AppError> {
    let ctx = business_context(&state, &headers)?;
    let created = state.service.create(&ctx, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/templates?business_id= - List a business's templates
#[tracing::instrument(name = "http.list_templates", skip(state))]
pub async fn list_templates(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<TemplateListResponse>, AppError> {
    let templates = state.service.list(params.business_id).await?;
    let total = templates.len();
    Ok(Json(TemplateListResponse { templates, total }))
}

/// GET /api/v1/templates/{id} - Get a specific template
#[tracing::instrument(name = "http.get_template", skip(state))]
pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TemplateResponse>, AppError> {
    let template = state.service.get(id).await?;
    Ok(Json(template))
}

/// PUT /api/v1/templates/{id} - Replace a template's content and resubmit
#[tracing::instrument(name = "http.update_template", skip(state, headers, request))]
pub async fn update_template(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateTemplateRequest>,
) -> Result<Json<TemplateResponse>, AppError> {
    let ctx = business_context(&state, &headers)?;
    let updated = state.service.update(&ctx, id, request).await?;
    Ok(Json(updated))
}

/// DELETE /api/v1/templates/{id} - Delete a template
#[tracing::instrument(name = "http.delete_template", skip(state, headers))]
pub async fn delete_template(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let ctx = business_context(&state, &headers)?;
    state.service.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/templates/{id}/status/refresh - Reconcile provider statuses
#[tracing::instrument(name = "http.refresh_template_status", skip(state, headers))]
pub async fn refresh_template_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<StatusRefreshResponse>, AppError> {
    let ctx = business_context(&state, &headers)?;
    let outcomes = state
        .reconciler
        .reconcile_template(id, &ctx.provider_config)
        .await?;

    let template = state.service.get(id).await?;
    Ok(Json(StatusRefreshResponse {
        template,
        providers: outcomes.iter().map(ProviderOutcomeView::from).collect(),
    }))
}
