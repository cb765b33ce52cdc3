//! PostgreSQL-backed template store.
//!
//! All writes for one record happen inside a single transaction.
//!
//! Table structure:
//! - `templates` - template rows, unique on (business_id, name, language)
//! - `template_components` - decomposed components with sequence and
//!   optional parent (carousel cards)
//! - `template_buttons` - buttons owned by body/carousel_card components
//! - `template_media` - media assets, optionally tied to a card component
//! - `template_providers` - one row per provider submission

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::template::model::{ButtonKind, Category, ProviderApprovalStatus, TemplateStatus};

use super::{
    ButtonRow, ComponentKind, ComponentRow, MediaRow, ProviderRow, StoreError, TemplateRecord,
    TemplateRow, TemplateStore,
};

pub struct PostgresTemplateStore {
    pool: PgPool,
}

impl PostgresTemplateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_rows(
        tx: &mut Transaction<'_, Postgres>,
        record: &TemplateRecord,
    ) -> Result<(), StoreError> {
        for component in &record.components {
            sqlx::query(
                r#"
                INSERT INTO template_components
                    (id, template_id, kind, sequence, content, metadata, parent_component_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(component.id)
            .bind(component.template_id)
            .bind(component.kind.as_str())
            .bind(component.sequence)
            .bind(&component.content)
            .bind(&component.metadata)
            .bind(component.parent_component_id)
            .execute(&mut **tx)
            .await?;
        }

        for button in &record.buttons {
            sqlx::query(
                r#"
                INSERT INTO template_buttons (id, component_id, kind, text, payload, sequence)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(button.id)
            .bind(button.component_id)
            .bind(button.kind.as_str())
            .bind(&button.text)
            .bind(&button.payload)
            .bind(button.sequence)
            .execute(&mut **tx)
            .await?;
        }

        for media in &record.media {
            sqlx::query(
                r#"
                INSERT INTO template_media
                    (id, template_id, component_id, media_type, url, caption, filename)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(media.id)
            .bind(media.template_id)
            .bind(media.component_id)
            .bind(&media.media_type)
            .bind(&media.url)
            .bind(&media.caption)
            .bind(&media.filename)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }

    async fn delete_content_rows(
        tx: &mut Transaction<'_, Postgres>,
        template_id: Uuid,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            DELETE FROM template_buttons
            WHERE component_id IN (SELECT id FROM template_components WHERE template_id = $1)
            "#,
        )
        .bind(template_id)
        .execute(&mut **tx)
        .await?;

        sqlx::query("DELETE FROM template_media WHERE template_id = $1")
            .bind(template_id)
            .execute(&mut **tx)
            .await?;

        sqlx::query("DELETE FROM template_components WHERE template_id = $1")
            .bind(template_id)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }
}

fn map_unique_violation(err: sqlx::Error, row: &TemplateRow) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::Duplicate(format!(
                "template {} ({}) already exists for this business",
                row.name, row.language
            ));
        }
    }
    StoreError::Postgres(err)
}

type TemplateTuple = (
    Uuid,
    Uuid,
    String,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    Option<Value>,
    DateTime<Utc>,
    DateTime<Utc>,
);

fn template_from_tuple(t: TemplateTuple) -> Result<TemplateRow, StoreError> {
    let (
        id,
        business_id,
        name,
        category,
        language,
        body_text,
        status,
        channel,
        created_by,
        metadata,
        created_at,
        updated_at,
    ) = t;

    Ok(TemplateRow {
        id,
        business_id,
        name,
        category: Category::parse(&category)
            .ok_or_else(|| StoreError::Corrupt(format!("category {}", category)))?,
        language,
        body_text,
        status: TemplateStatus::parse(&status)
            .ok_or_else(|| StoreError::Corrupt(format!("status {}", status)))?,
        channel,
        created_by,
        metadata,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl TemplateStore for PostgresTemplateStore {
    async fn insert_template(&self, record: &TemplateRecord) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let row = &record.template;

        sqlx::query(
            r#"
            INSERT INTO templates
                (id, business_id, name, category, language, body_text, status, channel,
                 created_by, metadata, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(row.id)
        .bind(row.business_id)
        .bind(&row.name)
        .bind(row.category.as_str())
        .bind(&row.language)
        .bind(&row.body_text)
        .bind(row.status.as_str())
        .bind(&row.channel)
        .bind(&row.created_by)
        .bind(&row.metadata)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, row))?;

        Self::insert_rows(&mut tx, record).await?;

        for provider in &record.providers {
            upsert_provider(&mut tx, provider).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn fetch_template(&self, id: Uuid) -> Result<Option<TemplateRecord>, StoreError> {
        let template: Option<TemplateTuple> = sqlx::query_as(
            r#"
            SELECT id, business_id, name, category, language, body_text, status, channel,
                   created_by, metadata, created_at, updated_at
            FROM templates WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let template = match template {
            Some(t) => template_from_tuple(t)?,
            None => return Ok(None),
        };

        let components: Vec<(Uuid, Uuid, String, i32, Option<String>, Option<Value>, Option<Uuid>)> =
            sqlx::query_as(
                r#"
                SELECT id, template_id, kind, sequence, content, metadata, parent_component_id
                FROM template_components WHERE template_id = $1
                ORDER BY sequence
                "#,
            )
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

        let components = components
            .into_iter()
            .map(
                |(id, template_id, kind, sequence, content, metadata, parent)| {
                    Ok(ComponentRow {
                        id,
                        template_id,
                        kind: ComponentKind::parse(&kind)
                            .ok_or_else(|| StoreError::Corrupt(format!("component kind {}", kind)))?,
                        sequence,
                        content,
                        metadata,
                        parent_component_id: parent,
                    })
                },
            )
            .collect::<Result<Vec<_>, StoreError>>()?;

        let buttons: Vec<(Uuid, Uuid, String, String, Option<String>, i32)> = sqlx::query_as(
            r#"
            SELECT b.id, b.component_id, b.kind, b.text, b.payload, b.sequence
            FROM template_buttons b
            JOIN template_components c ON b.component_id = c.id
            WHERE c.template_id = $1
            ORDER BY b.sequence
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let buttons = buttons
            .into_iter()
            .map(|(id, component_id, kind, text, payload, sequence)| {
                Ok(ButtonRow {
                    id,
                    component_id,
                    kind: ButtonKind::parse(&kind)
                        .ok_or_else(|| StoreError::Corrupt(format!("button kind {}", kind)))?,
                    text,
                    payload,
                    sequence,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        let media: Vec<(Uuid, Uuid, Option<Uuid>, String, String, Option<String>, Option<String>)> =
            sqlx::query_as(
                r#"
                SELECT id, template_id, component_id, media_type, url, caption, filename
                FROM template_media WHERE template_id = $1
                "#,
            )
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

        let media = media
            .into_iter()
            .map(
                |(id, template_id, component_id, media_type, url, caption, filename)| MediaRow {
                    id,
                    template_id,
                    component_id,
                    media_type,
                    url,
                    caption,
                    filename,
                },
            )
            .collect();

        let providers: Vec<(
            Uuid,
            Uuid,
            String,
            String,
            Option<String>,
            Option<String>,
            String,
            Option<DateTime<Utc>>,
            Option<String>,
            DateTime<Utc>,
            DateTime<Utc>,
        )> = sqlx::query_as(
            r#"
            SELECT id, template_id, channel_id, provider, provider_template_id,
                   provider_template_name, approval_status, approved_at, rejected_reason,
                   created_at, updated_at
            FROM template_providers WHERE template_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let providers = providers
            .into_iter()
            .map(
                |(
                    id,
                    template_id,
                    channel_id,
                    provider,
                    provider_template_id,
                    provider_template_name,
                    approval_status,
                    approved_at,
                    rejected_reason,
                    created_at,
                    updated_at,
                )| {
                    Ok(ProviderRow {
                        id,
                        template_id,
                        channel_id,
                        provider,
                        provider_template_id,
                        provider_template_name,
                        approval_status: ProviderApprovalStatus::parse(&approval_status)
                            .ok_or_else(|| {
                                StoreError::Corrupt(format!("approval status {}", approval_status))
                            })?,
                        approved_at,
                        rejected_reason,
                        created_at,
                        updated_at,
                    })
                },
            )
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok(Some(TemplateRecord {
            template,
            components,
            buttons,
            media,
            providers,
        }))
    }

    async fn find_template_id(
        &self,
        business_id: Uuid,
        name: &str,
        language: &str,
    ) -> Result<Option<Uuid>, StoreError> {
        let id: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM templates WHERE business_id = $1 AND name = $2 AND language = $3",
        )
        .bind(business_id)
        .bind(name)
        .bind(language)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn list_templates(&self, business_id: Uuid) -> Result<Vec<TemplateRecord>, StoreError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM templates WHERE business_id = $1 ORDER BY created_at",
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.fetch_template(id).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn replace_content(&self, record: &TemplateRecord) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let row = &record.template;

        let result = sqlx::query(
            r#"
            UPDATE templates
            SET category = $2, body_text = $3, status = $4, metadata = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(row.id)
        .bind(row.category.as_str())
        .bind(&row.body_text)
        .bind(row.status.as_str())
        .bind(&row.metadata)
        .bind(row.updated_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("template {}", row.id)));
        }

        Self::delete_content_rows(&mut tx, row.id).await?;
        Self::insert_rows(&mut tx, record).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_template(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM template_providers WHERE template_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        Self::delete_content_rows(&mut tx, id).await?;

        let result = sqlx::query("DELETE FROM templates WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("template {}", id)));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn set_template_status(
        &self,
        id: Uuid,
        status: TemplateStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE templates SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("template {}", id)));
        }
        Ok(())
    }

    async fn upsert_provider_row(&self, row: &ProviderRow) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        upsert_provider(&mut tx, row).await?;
        tx.commit().await?;
        Ok(())
    }
}

async fn upsert_provider(
    tx: &mut Transaction<'_, Postgres>,
    row: &ProviderRow,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO template_providers
            (id, template_id, channel_id, provider, provider_template_id,
             provider_template_name, approval_status, approved_at, rejected_reason,
             created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (id) DO UPDATE SET
            provider_template_id = EXCLUDED.provider_template_id,
            provider_template_name = EXCLUDED.provider_template_name,
            approval_status = EXCLUDED.approval_status,
            approved_at = EXCLUDED.approved_at,
            rejected_reason = EXCLUDED.rejected_reason,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(row.id)
    .bind(row.template_id)
    .bind(&row.channel_id)
    .bind(&row.provider)
    .bind(&row.provider_template_id)
    .bind(&row.provider_template_name)
    .bind(row.approval_status.as_str())
    .bind(row.approved_at)
    .bind(&row.rejected_reason)
    .bind(row.created_at)
    .bind(row.updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
