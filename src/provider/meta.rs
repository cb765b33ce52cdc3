//! Meta (WhatsApp Cloud API) template dialect.
//!
//! Categories and component type/format fields are upper-cased. Header
//! media is declared through `example.header_url`, location headers
//! through `example.header_handle: ["LOCATION"]`, and a carousel is one
//! `CAROUSEL` component whose cards each carry their own component list
//! mirroring the top-level shape.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::template::model::{
    Button, ButtonKind, CanonicalTemplate, CarouselCard, Header, HeaderKind, Placeholder,
    ProviderApprovalStatus,
};

use super::example::example_values;
use super::{
    map_status_standard, ProviderClient, ProviderCompiler, ProviderConfig, RawTemplateStatus,
};

/// Fallback literals used when a button value is missing.
const FALLBACK_URL: &str = "https://example.com";
const FALLBACK_PHONE: &str = "+1234567890";

pub struct MetaCompiler;

#[async_trait]
impl ProviderCompiler for MetaCompiler {
    fn name(&self) -> &'static str {
        "meta"
    }

    async fn compile(
        &self,
        template: &CanonicalTemplate,
        config: &ProviderConfig,
        _client: &dyn ProviderClient,
    ) -> Result<Value, AppError> {
        require(config.access_token.as_deref(), "access_token")?;
        require(config.business_account_id.as_deref(), "business_account_id")?;

        let mut components = Vec::new();

        if let Some(header) = &template.content.header {
            components.push(header_component(header));
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
            let cards: Vec<Value> = carousel
                .cards
                .iter()
                .map(|card| card_component(card, &template.placeholders))
                .collect();
            components.push(json!({ "type": "CAROUSEL", "cards": cards }));
        }

        Ok(json!({
            "name": template.name,
            "category": template.category.as_str().to_uppercase(),
            "language": template.language,
            "components": components,
        }))
    }

    fn map_status(&self, raw: &RawTemplateStatus) -> (ProviderApprovalStatus, Option<String>) {
        map_status_standard(raw)
    }
}

fn require<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, AppError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::MissingConfig(field.to_string()))
}

fn header_component(header: &Header) -> Value {
    match header.kind {
        HeaderKind::Text => json!({
            "type": "HEADER",
            "format": "TEXT",
            "text": header.text.clone().unwrap_or_default(),
        }),
        HeaderKind::Location => json!({
            "type": "HEADER",
            "format": "LOCATION",
            "example": { "header_handle": ["LOCATION"] },
        }),
        _ => json!({
            "type": "HEADER",
            "format": header.kind.as_str().to_uppercase(),
            "example": {
                "header_url": [header.media_url.clone().unwrap_or_default()],
            },
        }),
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
    let mapped: Vec<Value> = buttons.iter().map(map_button).collect();
    json!({ "type": "BUTTONS", "buttons": mapped })
}

fn map_button(button: &Button) -> Value {
    match button.kind {
        ButtonKind::Url => json!({
            "type": "URL",
            "text": button.text,
            "url": button.value.clone().unwrap_or_else(|| FALLBACK_URL.to_string()),
        }),
        ButtonKind::Phone => json!({
            "type": "PHONE_NUMBER",
            "text": button.text,
            "phone_number": button.value.clone().unwrap_or_else(|| FALLBACK_PHONE.to_string()),
        }),
        _ => json!({
            "type": "QUICK_REPLY",
            "text": button.text,
        }),
    }
}

fn card_component(card: &CarouselCard, placeholders: &[Placeholder]) -> Value {
    let mut components = Vec::new();

    if let Some(header) = &card.header {
        components.push(header_component(header));
    }

    components.push(body_component(&card.body.text, placeholders));

    if !card.buttons.is_empty() {
        components.push(buttons_component(&card.buttons));
    }

    json!({ "components": components })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::model::{
        Body, Carousel, Category, Footer, TemplateContent, TemplateStatus,
    };
    use chrono::Utc;
    use uuid::Uuid;

    struct NoopClient;

    #[async_trait]
    impl ProviderClient for NoopClient {
        async fn submit_template(
            &self,
            _payload: &Value,
            _config: &ProviderConfig,
        ) -> Result<super::super::ProviderSubmission, super::super::ProviderCallError> {
            unimplemented!("not used by the Meta compiler")
        }

        async fn get_template_status(
            &self,
            _id: &str,
            _config: &ProviderConfig,
        ) -> Result<RawTemplateStatus, super::super::ProviderCallError> {
            unimplemented!()
        }

        async fn delete_template(
            &self,
            _id: &str,
            _config: &ProviderConfig,
        ) -> Result<(), super::super::ProviderCallError> {
            unimplemented!()
        }

        async fn upload_media(
            &self,
            _url: &str,
            _media_type: &str,
            _config: &ProviderConfig,
        ) -> Result<String, super::super::ProviderCallError> {
            unimplemented!()
        }
    }

    fn meta_config() -> ProviderConfig {
        ProviderConfig {
            access_token: Some("token".to_string()),
            business_account_id: Some("waba".to_string()),
            ..Default::default()
        }
    }

    fn base_template() -> CanonicalTemplate {
        CanonicalTemplate {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            name: "order_update".to_string(),
            category: Category::Utility,
            language: "en".to_string(),
            channel: "WhatsApp".to_string(),
            content: TemplateContent {
                header: Some(Header {
                    kind: HeaderKind::Text,
                    text: Some("Order Update".to_string()),
                    media_url: None,
                    filename: None,
                    location: None,
                }),
                body: Body {
                    text: "Your order {{1}} has shipped".to_string(),
                },
                footer: Some(Footer {
                    text: "Thanks!".to_string(),
                }),
                buttons: vec![Button {
                    kind: ButtonKind::QuickReply,
                    text: "Track".to_string(),
                    value: None,
                    id: Some("track_btn".to_string()),
                }],
                carousel: None,
            },
            placeholders: vec![Placeholder {
                index: "1".to_string(),
                name: "order_id".to_string(),
                example: "A123".to_string(),
                component: "body".to_string(),
            }],
            status: TemplateStatus::Draft,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn compile(template: &CanonicalTemplate) -> Value {
        MetaCompiler
            .compile(template, &meta_config(), &NoopClient)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_category_and_types_upper_cased() {
        let payload = compile(&base_template()).await;

        assert_eq!(payload["category"], "UTILITY");
        assert_eq!(payload["components"][0]["type"], "HEADER");
        assert_eq!(payload["components"][0]["format"], "TEXT");
        assert_eq!(payload["components"][1]["type"], "BODY");
        assert_eq!(payload["components"][2]["type"], "FOOTER");
        assert_eq!(payload["components"][3]["type"], "BUTTONS");
    }

    #[tokio::test]
    async fn test_body_example_from_placeholder() {
        let payload = compile(&base_template()).await;
        assert_eq!(
            payload["components"][1]["example"]["body_text"][0][0],
            "A123"
        );
    }

    #[tokio::test]
    async fn test_media_header_uses_header_url() {
        let mut template = base_template();
        template.content.header = Some(Header {
            kind: HeaderKind::Image,
            text: None,
            media_url: Some("https://cdn.example.com/h.jpg".to_string()),
            filename: None,
            location: None,
        });

        let payload = compile(&template).await;
        assert_eq!(payload["components"][0]["format"], "IMAGE");
        assert_eq!(
            payload["components"][0]["example"]["header_url"][0],
            "https://cdn.example.com/h.jpg"
        );
    }

    #[tokio::test]
    async fn test_location_header_uses_header_handle() {
        let mut template = base_template();
        template.content.header = Some(Header {
            kind: HeaderKind::Location,
            text: None,
            media_url: None,
            filename: None,
            location: Some(crate::template::model::LocationExample {
                latitude: 1.0,
                longitude: 2.0,
                name: "HQ".to_string(),
                address: "1 Main St".to_string(),
            }),
        });

        let payload = compile(&template).await;
        assert_eq!(payload["components"][0]["format"], "LOCATION");
        assert_eq!(
            payload["components"][0]["example"]["header_handle"][0],
            "LOCATION"
        );
    }

    #[tokio::test]
    async fn test_button_mapping_and_fallbacks() {
        let mut template = base_template();
        template.content.buttons = vec![
            Button {
                kind: ButtonKind::Url,
                text: "Shop".to_string(),
                value: None,
                id: None,
            },
            Button {
                kind: ButtonKind::Phone,
                text: "Call".to_string(),
                value: None,
                id: None,
            },
            Button {
                kind: ButtonKind::Copy,
                text: "Copy".to_string(),
                value: Some("CODE".to_string()),
                id: None,
            },
        ];

        let payload = compile(&template).await;
        let buttons = &payload["components"][3]["buttons"];
        assert_eq!(buttons[0]["type"], "URL");
        assert_eq!(buttons[0]["url"], FALLBACK_URL);
        assert_eq!(buttons[1]["type"], "PHONE_NUMBER");
        assert_eq!(buttons[1]["phone_number"], FALLBACK_PHONE);
        assert_eq!(buttons[2]["type"], "QUICK_REPLY");
    }

    #[tokio::test]
    async fn test_carousel_cards_carry_their_own_examples() {
        let mut template = base_template();
        template.content.body.text = "Pick one".to_string();
        template.content.carousel = Some(Carousel {
            cards: vec![
                CarouselCard {
                    header: None,
                    body: Body {
                        text: "First card {{1}}".to_string(),
                    },
                    buttons: vec![],
                },
                CarouselCard {
                    header: None,
                    body: Body {
                        text: "Second card {{2}}".to_string(),
                    },
                    buttons: vec![],
                },
            ],
        });
        template.placeholders = vec![
            Placeholder {
                index: "1".to_string(),
                name: "first".to_string(),
                example: "Alpha".to_string(),
                component: "carousel_card".to_string(),
            },
            Placeholder {
                index: "2".to_string(),
                name: "second".to_string(),
                example: "Beta".to_string(),
                component: "carousel_card".to_string(),
            },
        ];

        let payload = compile(&template).await;
        let carousel = payload["components"]
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["type"] == "CAROUSEL")
            .unwrap();

        // Each card's body example matches that card's own placeholder,
        // not a shared array.
        let card0_body = &carousel["cards"][0]["components"][0];
        let card1_body = &carousel["cards"][1]["components"][0];
        assert_eq!(card0_body["example"]["body_text"][0], json!(["Alpha"]));
        assert_eq!(card1_body["example"]["body_text"][0], json!(["Beta"]));
    }

    #[tokio::test]
    async fn test_missing_config_names_field() {
        let template = base_template();
        let config = ProviderConfig {
            access_token: Some("token".to_string()),
            ..Default::default()
        };
        let err = MetaCompiler
            .compile(&template, &config, &NoopClient)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingConfig(ref f) if f == "business_account_id"));
    }
}
