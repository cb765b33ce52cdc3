//! Decomposed template storage.
//!
//! Templates are persisted as normalized rows (template, components,
//! buttons, media, provider submissions). The write path decomposes the
//! canonical model into rows ([`mapper`]); the read path rebuilds the
//! canonical view from them ([`reconstruct`]). Two backends exist in the
//! usual backend/factory arrangement: in-memory for tests and local
//! development, PostgreSQL for production.

pub mod factory;
pub mod mapper;
pub mod memory;
pub mod postgres;
pub mod reconstruct;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::template::model::{ButtonKind, Category, ProviderApprovalStatus, TemplateStatus};

pub use factory::create_template_store;
pub use mapper::decompose;
pub use memory::MemoryTemplateStore;
pub use postgres::PostgresTemplateStore;
pub use reconstruct::reconstruct;

/// Storage-level error type.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Structural kind of a stored component row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Header,
    Body,
    Footer,
    Carousel,
    CarouselCard,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Body => "body",
            Self::Footer => "footer",
            Self::Carousel => "carousel",
            Self::CarouselCard => "carousel_card",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "header" => Some(Self::Header),
            "body" => Some(Self::Body),
            "footer" => Some(Self::Footer),
            "carousel" => Some(Self::Carousel),
            "carousel_card" => Some(Self::CarouselCard),
            _ => None,
        }
    }
}

/// The template row. `body_text` is a denormalized convenience copy of
/// the body component's text; `metadata` carries the `full_content`
/// snapshot and the placeholder declarations.
#[derive(Debug, Clone)]
pub struct TemplateRow {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub category: Category,
    pub language: String,
    pub body_text: String,
    pub status: TemplateStatus,
    pub channel: String,
    pub created_by: Option<String>,
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One structural component of a template. `parent_component_id` is only
/// set for carousel_card rows and points at the owning carousel row.
#[derive(Debug, Clone)]
pub struct ComponentRow {
    pub id: Uuid,
    pub template_id: Uuid,
    pub kind: ComponentKind,
    pub sequence: i32,
    pub content: Option<String>,
    pub metadata: Option<Value>,
    pub parent_component_id: Option<Uuid>,
}

/// A button owned by a body or carousel_card component. `payload` holds
/// the url/phone/copy value or the quick-reply id, depending on kind.
#[derive(Debug, Clone)]
pub struct ButtonRow {
    pub id: Uuid,
    pub component_id: Uuid,
    pub kind: ButtonKind,
    pub text: String,
    pub payload: Option<String>,
    pub sequence: i32,
}

/// A media asset. `component_id` ties the asset to a specific carousel
/// card; when absent the asset belongs to the template header.
#[derive(Debug, Clone)]
pub struct MediaRow {
    pub id: Uuid,
    pub template_id: Uuid,
    pub component_id: Option<Uuid>,
    pub media_type: String,
    pub url: String,
    pub caption: Option<String>,
    pub filename: Option<String>,
}

/// One submission of a template to one provider. Resubmission creates a
/// new row (or patches the existing one back to pending).
#[derive(Debug, Clone)]
pub struct ProviderRow {
    pub id: Uuid,
    pub template_id: Uuid,
    pub channel_id: String,
    pub provider: String,
    pub provider_template_id: Option<String>,
    pub provider_template_name: Option<String>,
    pub approval_status: ProviderApprovalStatus,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A template with all of its decomposed rows.
#[derive(Debug, Clone)]
pub struct TemplateRecord {
    pub template: TemplateRow,
    pub components: Vec<ComponentRow>,
    pub buttons: Vec<ButtonRow>,
    pub media: Vec<MediaRow>,
    pub providers: Vec<ProviderRow>,
}

/// Async storage backend for decomposed template rows.
///
/// `insert_template` and `replace_content` are atomic: either every row
/// of the record lands or none does.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Insert a full record atomically. Fails with [`StoreError::Duplicate`]
    /// when (business_id, name, language) already exists.
    async fn insert_template(&self, record: &TemplateRecord) -> Result<(), StoreError>;

    /// Fetch a full record by template id.
    async fn fetch_template(&self, id: Uuid) -> Result<Option<TemplateRecord>, StoreError>;

    /// Look up a template id by its unique (business_id, name, language) key.
    async fn find_template_id(
        &self,
        business_id: Uuid,
        name: &str,
        language: &str,
    ) -> Result<Option<Uuid>, StoreError>;

    /// All records for a business.
    async fn list_templates(&self, business_id: Uuid) -> Result<Vec<TemplateRecord>, StoreError>;

    /// Replace the template row and its content rows (components, buttons,
    /// media) atomically, leaving provider rows untouched.
    async fn replace_content(&self, record: &TemplateRecord) -> Result<(), StoreError>;

    /// Cascade-delete: provider rows, media, buttons, components, template.
    async fn delete_template(&self, id: Uuid) -> Result<(), StoreError>;

    /// Update the template's canonical status.
    async fn set_template_status(
        &self,
        id: Uuid,
        status: TemplateStatus,
    ) -> Result<(), StoreError>;

    /// Insert or update one provider submission row (matched by row id).
    async fn upsert_provider_row(&self, row: &ProviderRow) -> Result<(), StoreError>;
}
