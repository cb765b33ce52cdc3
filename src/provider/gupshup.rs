//! Gupshup template dialect.
//!
//! Gupshup takes a flat payload instead of a nested component list:
//! header shape is carried as metadata fields (`headerType`, `mediaUrl`,
//! `locationExample`), `example` is one flat value array across the body
//! and every carousel card, and a carousel is expressed through the
//! `isCarousel`/`carouselCards` side structure.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::template::model::{
    Button, ButtonKind, CanonicalTemplate, HeaderKind, ProviderApprovalStatus,
};

use super::example::example_values;
use super::{
    map_status_standard, ProviderClient, ProviderCompiler, ProviderConfig, RawTemplateStatus,
};

pub struct GupshupCompiler;

#[async_trait]
impl ProviderCompiler for GupshupCompiler {
    fn name(&self) -> &'static str {
        "gupshup"
    }

    async fn compile(
        &self,
        template: &CanonicalTemplate,
        config: &ProviderConfig,
        _client: &dyn ProviderClient,
    ) -> Result<Value, AppError> {
        if config.api_key.as_deref().map(str::trim).unwrap_or("").is_empty() {
            return Err(AppError::MissingConfig("api_key".to_string()));
        }

        let mut example = example_values(&template.content.body.text, &template.placeholders);
        if let Some(carousel) = &template.content.carousel {
            for card in &carousel.cards {
                example.extend(example_values(&card.body.text, &template.placeholders));
            }
        }

        let mut payload = json!({
            "template": template.name,
            "category": template.category.as_str().to_uppercase(),
            "languageCode": template.language,
            "content": template.content.body.text,
            "example": example,
        });

        if let Some(header) = &template.content.header {
            payload["headerType"] = json!(header.kind.as_str());
            match header.kind {
                HeaderKind::Text => {
                    payload["header"] = json!(header.text.clone().unwrap_or_default());
                }
                HeaderKind::Location => {
                    if let Some(location) = &header.location {
                        payload["locationExample"] = json!(location);
                    }
                }
                _ => {
                    payload["mediaUrl"] = json!(header.media_url.clone().unwrap_or_default());
                }
            }
        }

        if let Some(footer) = &template.content.footer {
            payload["footer"] = json!(footer.text);
        }

        if !template.content.buttons.is_empty() {
            payload["buttons"] = json!(template
                .content
                .buttons
                .iter()
                .map(map_button)
                .collect::<Vec<_>>());
        }

        if let Some(carousel) = &template.content.carousel {
            payload["isCarousel"] = json!(true);
            payload["carouselCards"] = json!(carousel
                .cards
                .iter()
                .map(|card| {
                    let mut entry = json!({ "body": card.body.text });
                    if let Some(header) = &card.header {
                        entry["headerType"] = json!(header.kind.as_str());
                        if header.kind.is_media() {
                            entry["mediaUrl"] =
                                json!(header.media_url.clone().unwrap_or_default());
                        }
                    }
                    if !card.buttons.is_empty() {
                        entry["buttons"] =
                            json!(card.buttons.iter().map(map_button).collect::<Vec<_>>());
                    }
                    entry
                })
                .collect::<Vec<_>>());
        }

        Ok(payload)
    }

    fn map_status(&self, raw: &RawTemplateStatus) -> (ProviderApprovalStatus, Option<String>) {
        map_status_standard(raw)
    }
}

fn map_button(button: &Button) -> Value {
    match button.kind {
        ButtonKind::QuickReply => json!({
            "type": "quick_reply",
            "text": button.text,
            "id": button.id.clone().unwrap_or_default(),
        }),
        _ => json!({
            "type": button.kind.as_str(),
            "text": button.text,
            "value": button.value.clone().unwrap_or_default(),
        }),
    }
}
