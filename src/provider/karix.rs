//! Karix template dialect.
//!
//! Karix fronts the WhatsApp Business API, so the component shape stays
//! WhatsApp-like, but every non-text header asset must first be pushed
//! through the media-upload side channel: the resulting `media_handle`
//! is referenced as `example.header_handle`. An upload failure is a hard
//! compile error, never a soft fallback.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::template::model::{
    Button, ButtonKind, CanonicalTemplate, Header, HeaderKind, Placeholder,
    ProviderApprovalStatus,
};

use super::example::example_values;
use super::{ProviderClient, ProviderCompiler, ProviderConfig, RawTemplateStatus};

pub struct KarixCompiler;

#[async_trait]
impl ProviderCompiler for KarixCompiler {
    fn name(&self) -> &'static str {
        "karix"
    }

    async fn compile(
        &self,
        template: &CanonicalTemplate,
        config: &ProviderConfig,
        client: &dyn ProviderClient,
    ) -> Result<Value, AppError> {
        if config.api_key.as_deref().map(str::trim).unwrap_or("").is_empty() {
            return Err(AppError::MissingConfig("api_key".to_string()));
        }

        // Account id falls back from the WABA id to the sender id.
        let account_id = config
            .whatsapp_business_account_id
            .as_deref()
            .or(config.sender_id.as_deref())
            .ok_or_else(|| AppError::MissingConfig("whatsapp_business_account_id".to_string()))?;

        let mut components = Vec::new();

        if let Some(header) = &template.content.header {
            components.push(header_component(header, config, client).await?);
        }

        components.push(body_component(
            &template.content.body.text,
            &template.placeholders,
        ));

        if let Some(footer) = &template.content.footer {
            components.push(json!({ "type": "FOOTER", "text": footer.text }));
        }

        if !template.content.buttons.is_empty() {
            components.push(buttons_component(&template.content.buttons));
        }

        if let Some(carousel) = &template.content.carousel {
            let mut cards = Vec::new();
            for card in &carousel.cards {
                let mut card_components = Vec::new();
                if let Some(header) = &card.header {
                    card_components.push(header_component(header, config, client).await?);
                }
                card_components.push(body_component(&card.body.text, &template.placeholders));
                if !card.buttons.is_empty() {
                    card_components.push(buttons_component(&card.buttons));
                }
                cards.push(json!({ "components": card_components }));
            }
            components.push(json!({ "type": "CAROUSEL", "cards": cards }));
        }

        let mut payload = json!({
            "template_name": template.name,
            "category": template.category.as_str().to_uppercase(),
            "language": template.language,
            "whatsapp_business_account_id": account_id,
            "components": components,
        });

        if let Some(namespace) = &config.namespace {
            payload["namespace"] = json!(namespace);
        }

        Ok(payload)
    }

    fn map_status(&self, raw: &RawTemplateStatus) -> (ProviderApprovalStatus, Option<String>) {
        match raw.status.to_uppercase().as_str() {
            "APPROVED" => (ProviderApprovalStatus::Approved, None),
            "REJECTED" => (ProviderApprovalStatus::Rejected, raw.reason.clone()),
            // PENDING, IN_REVIEW and anything unknown stay pending.
            _ => (ProviderApprovalStatus::Pending, None),
        }
    }
}

async fn header_component(
    header: &Header,
    config: &ProviderConfig,
    client: &dyn ProviderClient,
) -> Result<Value, AppError> {
    match header.kind {
        HeaderKind::Text => Ok(json!({
            "type": "HEADER",
            "format": "TEXT",
            "text": header.text.clone().unwrap_or_default(),
        })),
        HeaderKind::Location => Ok(json!({
            "type": "HEADER",
            "format": "LOCATION",
            "example": { "header_handle": ["LOCATION"] },
        })),
        _ => {
            let url = header.media_url.clone().unwrap_or_default();
            let handle = client
                .upload_media(&url, header.kind.as_str(), config)
                .await
                .map_err(|e| AppError::Provider {
                    provider: "karix".to_string(),
                    message: format!("media upload failed: {}", e.message),
                })?;

            Ok(json!({
                "type": "HEADER",
                "format": header.kind.as_str().to_uppercase(),
                "example": { "header_handle": [handle] },
            }))
        }
    }
}

fn body_component(text: &str, placeholders: &[Placeholder]) -> Value {
    let values = example_values(text, placeholders);
    let mut component = json!({ "type": "BODY", "text": text });
    if !values.is_empty() {
        component["example"] = json!({ "body_text": [values] });
    }
    component
}

fn buttons_component(buttons: &[Button]) -> Value {
    let mapped: Vec<Value> = buttons
        .iter()
        .map(|button| match button.kind {
            ButtonKind::Url => json!({
                "type": "URL",
                "text": button.text,
                "url": button.value.clone().unwrap_or_default(),
            }),
            ButtonKind::Phone => json!({
                "type": "PHONE_NUMBER",
                "text": button.text,
                "phone_number": button.value.clone().unwrap_or_default(),
            }),
            _ => json!({
                "type": "QUICK_REPLY",
                "text": button.text,
            }),
        })
        .collect();
    json!({ "type": "BUTTONS", "buttons": mapped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ProviderCallError, ProviderSubmission};
    use crate::template::model::{Body, Category, TemplateContent, TemplateStatus};
    use chrono::Utc;
    use uuid::Uuid;

    /// Upload side-channel stub: hands out deterministic handles or fails.
    struct UploadClient {
        fail: bool,
    }

    #[async_trait]
    impl ProviderClient for UploadClient {
        async fn submit_template(
            &self,
            _payload: &Value,
            _config: &ProviderConfig,
        ) -> Result<ProviderSubmission, ProviderCallError> {
            unimplemented!()
        }

        async fn get_template_status(
            &self,
            _id: &str,
            _config: &ProviderConfig,
        ) -> Result<RawTemplateStatus, ProviderCallError> {
            unimplemented!()
        }

        async fn delete_template(
            &self,
            _id: &str,
            _config: &ProviderConfig,
        ) -> Result<(), ProviderCallError> {
            unimplemented!()
        }

        async fn upload_media(
            &self,
            url: &str,
            _media_type: &str,
            _config: &ProviderConfig,
        ) -> Result<String, ProviderCallError> {
            if self.fail {
                Err(ProviderCallError::new("upstream 500"))
            } else {
                Ok(format!("handle:{}", url))
            }
        }
    }

    fn karix_config() -> ProviderConfig {
        ProviderConfig {
            api_key: Some("key".to_string()),
            whatsapp_business_account_id: Some("waba-1".to_string()),
            namespace: Some("ns-1".to_string()),
            ..Default::default()
        }
    }

    fn template_with_image_header() -> CanonicalTemplate {
        CanonicalTemplate {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            name: "promo".to_string(),
            category: Category::Marketing,
            language: "en".to_string(),
            channel: "WhatsApp".to_string(),
            content: TemplateContent {
                header: Some(Header {
                    kind: HeaderKind::Image,
                    text: None,
                    media_url: Some("https://cdn.example.com/p.jpg".to_string()),
                    filename: None,
                    location: None,
                }),
                body: Body {
                    text: "Sale on {{1}}".to_string(),
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
        }
    }

    #[tokio::test]
    async fn test_media_header_uploaded_to_handle() {
        let payload = KarixCompiler
            .compile(
                &template_with_image_header(),
                &karix_config(),
                &UploadClient { fail: false },
            )
            .await
            .unwrap();

        assert_eq!(payload["template_name"], "promo");
        assert_eq!(payload["category"], "MARKETING");
        assert_eq!(payload["namespace"], "ns-1");
        assert_eq!(payload["whatsapp_business_account_id"], "waba-1");
        assert_eq!(
            payload["components"][0]["example"]["header_handle"][0],
            "handle:https://cdn.example.com/p.jpg"
        );
    }

    #[tokio::test]
    async fn test_upload_failure_is_hard_error() {
        let err = KarixCompiler
            .compile(
                &template_with_image_header(),
                &karix_config(),
                &UploadClient { fail: true },
            )
            .await
            .unwrap_err();

        match err {
            AppError::Provider { provider, message } => {
                assert_eq!(provider, "karix");
                assert!(message.contains("media upload failed"));
            }
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_account_id_falls_back_to_sender_id() {
        let config = ProviderConfig {
            api_key: Some("key".to_string()),
            sender_id: Some("sender-7".to_string()),
            ..Default::default()
        };
        let mut template = template_with_image_header();
        template.content.header = None;

        let payload = KarixCompiler
            .compile(&template, &config, &UploadClient { fail: false })
            .await
            .unwrap();
        assert_eq!(payload["whatsapp_business_account_id"], "sender-7");
        // No namespace configured, so the key is absent.
        assert!(payload.get("namespace").is_none());
    }

    #[tokio::test]
    async fn test_missing_api_key_named() {
        let config = ProviderConfig {
            whatsapp_business_account_id: Some("waba".to_string()),
            ..Default::default()
        };
        let err = KarixCompiler
            .compile(
                &template_with_image_header(),
                &config,
                &UploadClient { fail: false },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingConfig(ref f) if f == "api_key"));
    }

    #[test]
    fn test_status_mapping_in_review_is_pending() {
        let compiler = KarixCompiler;
        let raw = RawTemplateStatus {
            status: "IN_REVIEW".to_string(),
            reason: None,
        };
        assert_eq!(compiler.map_status(&raw).0, ProviderApprovalStatus::Pending);
    }

    #[test]
    fn test_status_mapping_rejected_keeps_reason() {
        let compiler = KarixCompiler;
        let raw = RawTemplateStatus {
            status: "REJECTED".to_string(),
            reason: Some("Policy violation".to_string()),
        };
        let (status, reason) = compiler.map_status(&raw);
        assert_eq!(status, ProviderApprovalStatus::Rejected);
        assert_eq!(reason.as_deref(), Some("Policy violation"));
    }
}
