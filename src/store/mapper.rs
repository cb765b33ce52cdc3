//! Write-path decomposition of the canonical model into storage rows.

use serde_json::json;
use uuid::Uuid;

use crate::template::model::{Button, CanonicalTemplate, Header};

use super::{ButtonRow, ComponentKind, ComponentRow, MediaRow, TemplateRecord, TemplateRow};

/// Decompose a canonical template into its normalized rows.
///
/// Component sequence follows the canonical order header, body, footer,
/// carousel; carousel cards are sequenced within their parent. The whole
/// carousel JSON is additionally kept as the carousel component's
/// `content`, and the full content tree is snapshotted into the template
/// row's metadata as a reconstruction fallback (decomposed rows stay
/// authoritative).
pub fn decompose(template: &CanonicalTemplate) -> TemplateRecord {
    let template_id = template.id;
    let mut components = Vec::new();
    let mut buttons = Vec::new();
    let mut media = Vec::new();
    let mut sequence = 0;

    if let Some(header) = &template.content.header {
        let component_id = Uuid::new_v4();
        components.push(ComponentRow {
            id: component_id,
            template_id,
            kind: ComponentKind::Header,
            sequence,
            content: header.text.clone(),
            metadata: Some(header_metadata(header)),
            parent_component_id: None,
        });
        // Header media belongs to the template, so no component_id.
        if let Some(url) = &header.media_url {
            media.push(MediaRow {
                id: Uuid::new_v4(),
                template_id,
                component_id: None,
                media_type: header.kind.as_str().to_string(),
                url: url.clone(),
                caption: None,
                filename: header.filename.clone(),
            });
        }
        sequence += 1;
    }

    let body_component_id = Uuid::new_v4();
    components.push(ComponentRow {
        id: body_component_id,
        template_id,
        kind: ComponentKind::Body,
        sequence,
        content: Some(template.content.body.text.clone()),
        metadata: None,
        parent_component_id: None,
    });
    push_buttons(&mut buttons, body_component_id, &template.content.buttons);
    sequence += 1;

    if let Some(footer) = &template.content.footer {
        components.push(ComponentRow {
            id: Uuid::new_v4(),
            template_id,
            kind: ComponentKind::Footer,
            sequence,
            content: Some(footer.text.clone()),
            metadata: None,
            parent_component_id: None,
        });
        sequence += 1;
    }

    if let Some(carousel) = &template.content.carousel {
        let carousel_id = Uuid::new_v4();
        components.push(ComponentRow {
            id: carousel_id,
            template_id,
            kind: ComponentKind::Carousel,
            sequence,
            content: serde_json::to_string(carousel).ok(),
            metadata: None,
            parent_component_id: None,
        });

        for (card_index, card) in carousel.cards.iter().enumerate() {
            let card_id = Uuid::new_v4();
            let mut card_meta = json!({ "card_index": card_index });
            if let Some(header) = &card.header {
                card_meta["header_type"] = json!(header.kind.as_str());
                if let Some(text) = &header.text {
                    card_meta["header_text"] = json!(text);
                }
                if let Some(url) = &header.media_url {
                    media.push(MediaRow {
                        id: Uuid::new_v4(),
                        template_id,
                        component_id: Some(card_id),
                        media_type: header.kind.as_str().to_string(),
                        url: url.clone(),
                        caption: None,
                        filename: header.filename.clone(),
                    });
                }
            }
            components.push(ComponentRow {
                id: card_id,
                template_id,
                kind: ComponentKind::CarouselCard,
                sequence: card_index as i32,
                content: Some(card.body.text.clone()),
                metadata: Some(card_meta),
                parent_component_id: Some(carousel_id),
            });
            push_buttons(&mut buttons, card_id, &card.buttons);
        }
    }

    let metadata = json!({
        "full_content": template.content,
        "placeholders": template.placeholders,
    });

    TemplateRecord {
        template: TemplateRow {
            id: template_id,
            business_id: template.business_id,
            name: template.name.clone(),
            category: template.category,
            language: template.language.clone(),
            body_text: template.content.body.text.clone(),
            status: template.status,
            channel: template.channel.clone(),
            created_by: template.created_by.clone(),
            metadata: Some(metadata),
            created_at: template.created_at,
            updated_at: template.updated_at,
        },
        components,
        buttons,
        media,
        providers: Vec::new(),
    }
}

fn header_metadata(header: &Header) -> serde_json::Value {
    let mut meta = json!({ "header_type": header.kind.as_str() });
    if let Some(location) = &header.location {
        meta["location"] = json!(location);
    }
    meta
}

fn push_buttons(rows: &mut Vec<ButtonRow>, component_id: Uuid, buttons: &[Button]) {
    for (sequence, button) in buttons.iter().enumerate() {
        rows.push(ButtonRow {
            id: Uuid::new_v4(),
            component_id,
            kind: button.kind,
            text: button.text.clone(),
            payload: button.value.clone().or_else(|| button.id.clone()),
            sequence: sequence as i32,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::model::{
        Body, Button, ButtonKind, Carousel, CarouselCard, Category, Footer, HeaderKind,
        Placeholder, TemplateContent, TemplateStatus,
    };
    use chrono::Utc;

    fn sample_template() -> CanonicalTemplate {
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

    #[test]
    fn test_decompose_sequences_components() {
        let record = decompose(&sample_template());

        assert_eq!(record.components.len(), 3);
        let header = &record.components[0];
        assert_eq!(header.kind, ComponentKind::Header);
        assert_eq!(header.sequence, 0);
        let body = &record.components[1];
        assert_eq!(body.kind, ComponentKind::Body);
        assert_eq!(body.sequence, 1);
        let footer = &record.components[2];
        assert_eq!(footer.kind, ComponentKind::Footer);
        assert_eq!(footer.sequence, 2);
    }

    #[test]
    fn test_decompose_attaches_buttons_to_body() {
        let record = decompose(&sample_template());
        let body = record
            .components
            .iter()
            .find(|c| c.kind == ComponentKind::Body)
            .unwrap();

        assert_eq!(record.buttons.len(), 1);
        assert_eq!(record.buttons[0].component_id, body.id);
        assert_eq!(record.buttons[0].payload.as_deref(), Some("track_btn"));
    }

    #[test]
    fn test_decompose_keeps_full_content_snapshot() {
        let template = sample_template();
        let record = decompose(&template);
        let metadata = record.template.metadata.unwrap();

        assert_eq!(
            metadata["full_content"]["body"]["text"],
            "Your order {{1}} has shipped"
        );
        assert_eq!(metadata["placeholders"][0]["example"], "A123");
    }

    #[test]
    fn test_decompose_carousel_cards() {
        let mut template = sample_template();
        template.content.carousel = Some(Carousel {
            cards: vec![
                CarouselCard {
                    header: Some(Header {
                        kind: HeaderKind::Image,
                        text: None,
                        media_url: Some("https://cdn.example.com/a.jpg".to_string()),
                        filename: None,
                        location: None,
                    }),
                    body: Body {
                        text: "First {{1}}".to_string(),
                    },
                    buttons: vec![],
                },
                CarouselCard {
                    header: None,
                    body: Body {
                        text: "Second {{2}}".to_string(),
                    },
                    buttons: vec![],
                },
            ],
        });

        let record = decompose(&template);
        let carousel = record
            .components
            .iter()
            .find(|c| c.kind == ComponentKind::Carousel)
            .unwrap();
        let cards: Vec<_> = record
            .components
            .iter()
            .filter(|c| c.kind == ComponentKind::CarouselCard)
            .collect();

        assert_eq!(cards.len(), 2);
        assert!(cards
            .iter()
            .all(|c| c.parent_component_id == Some(carousel.id)));
        assert_eq!(cards[0].metadata.as_ref().unwrap()["card_index"], 0);
        assert_eq!(cards[1].sequence, 1);

        // Card media is tied to its card component.
        assert_eq!(record.media.len(), 1);
        assert_eq!(record.media[0].component_id, Some(cards[0].id));
        assert_eq!(record.media[0].media_type, "image");
    }

    #[test]
    fn test_decompose_header_media_has_no_component_id() {
        let mut template = sample_template();
        template.content.header = Some(Header {
            kind: HeaderKind::Image,
            text: None,
            media_url: Some("https://cdn.example.com/h.jpg".to_string()),
            filename: Some("h.jpg".to_string()),
            location: None,
        });

        let record = decompose(&template);
        assert_eq!(record.media.len(), 1);
        assert_eq!(record.media[0].component_id, None);
        assert_eq!(record.media[0].filename.as_deref(), Some("h.jpg"));
    }
}
