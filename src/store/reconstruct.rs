//! Read-path reconstruction of the canonical model from decomposed rows.
//!
//! Rows are authoritative. The `full_content` snapshot in the template
//! row's metadata is only consulted when decomposition is incomplete,
//! e.g. a carousel component with no card rows and unparseable content.

use uuid::Uuid;

use crate::template::model::{
    Body, Button, ButtonKind, CanonicalTemplate, Carousel, CarouselCard, Footer, Header,
    HeaderKind, Placeholder, TemplateContent,
};

use super::{ButtonRow, ComponentKind, ComponentRow, MediaRow, TemplateRecord};

/// Rebuild the canonical template from its stored rows.
pub fn reconstruct(record: &TemplateRecord) -> CanonicalTemplate {
    let row = &record.template;

    let header = record
        .components
        .iter()
        .find(|c| c.kind == ComponentKind::Header)
        .map(|c| rebuild_header(c, header_media(record)));

    let body_component = record
        .components
        .iter()
        .find(|c| c.kind == ComponentKind::Body);

    let body = Body {
        text: body_component
            .and_then(|c| c.content.clone())
            .unwrap_or_else(|| row.body_text.clone()),
    };

    let buttons = body_component
        .map(|c| component_buttons(&record.buttons, c.id))
        .unwrap_or_default();

    let footer = record
        .components
        .iter()
        .find(|c| c.kind == ComponentKind::Footer)
        .and_then(|c| c.content.clone())
        .map(|text| Footer { text });

    let carousel = record
        .components
        .iter()
        .find(|c| c.kind == ComponentKind::Carousel)
        .and_then(|c| rebuild_carousel(record, c));

    let placeholders: Vec<Placeholder> = row
        .metadata
        .as_ref()
        .and_then(|m| m.get("placeholders"))
        .and_then(|p| serde_json::from_value(p.clone()).ok())
        .unwrap_or_default();

    CanonicalTemplate {
        id: row.id,
        business_id: row.business_id,
        name: row.name.clone(),
        category: row.category,
        language: row.language.clone(),
        channel: row.channel.clone(),
        content: TemplateContent {
            header,
            body,
            footer,
            buttons,
            carousel,
        },
        placeholders,
        status: row.status,
        created_by: row.created_by.clone(),
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

/// The first media row that belongs to the template itself (no
/// component_id) is the header asset.
fn header_media(record: &TemplateRecord) -> Option<&MediaRow> {
    record.media.iter().find(|m| m.component_id.is_none())
}

fn rebuild_header(component: &ComponentRow, media: Option<&MediaRow>) -> Header {
    let kind = component
        .metadata
        .as_ref()
        .and_then(|m| m.get("header_type"))
        .and_then(|v| v.as_str())
        .and_then(HeaderKind::parse)
        .unwrap_or(HeaderKind::Text);

    // Only accept the asset when its type matches the declared header type.
    let media = media.filter(|m| m.media_type == kind.as_str());

    Header {
        kind,
        text: component.content.clone(),
        media_url: media.map(|m| m.url.clone()),
        filename: media.and_then(|m| m.filename.clone()),
        location: component
            .metadata
            .as_ref()
            .and_then(|m| m.get("location"))
            .and_then(|v| serde_json::from_value(v.clone()).ok()),
    }
}

fn component_buttons(rows: &[ButtonRow], component_id: Uuid) -> Vec<Button> {
    let mut owned: Vec<&ButtonRow> = rows
        .iter()
        .filter(|b| b.component_id == component_id)
        .collect();
    owned.sort_by_key(|b| b.sequence);

    owned
        .into_iter()
        .map(|b| {
            let (value, id) = match b.kind {
                ButtonKind::QuickReply => (None, b.payload.clone()),
                _ => (b.payload.clone(), None),
            };
            Button {
                kind: b.kind,
                text: b.text.clone(),
                value,
                id,
            }
        })
        .collect()
}

fn rebuild_carousel(record: &TemplateRecord, carousel: &ComponentRow) -> Option<Carousel> {
    let parsed: Option<Carousel> = carousel
        .content
        .as_deref()
        .and_then(|c| serde_json::from_str(c).ok());

    let mut card_components: Vec<&ComponentRow> = record
        .components
        .iter()
        .filter(|c| {
            c.kind == ComponentKind::CarouselCard && c.parent_component_id == Some(carousel.id)
        })
        .collect();
    card_components.sort_by_key(|c| c.sequence);

    if card_components.is_empty() {
        // No decomposed cards: fall back to the stored carousel JSON, then
        // to the full_content snapshot.
        return parsed.or_else(|| {
            record
                .template
                .metadata
                .as_ref()
                .and_then(|m| m.get("full_content"))
                .and_then(|c| m_carousel(c))
        });
    }

    let cards = card_components
        .into_iter()
        .map(|c| rebuild_card(record, c))
        .collect();

    Some(Carousel { cards })
}

fn m_carousel(full_content: &serde_json::Value) -> Option<Carousel> {
    full_content
        .get("carousel")
        .and_then(|c| serde_json::from_value(c.clone()).ok())
}

fn rebuild_card(record: &TemplateRecord, component: &ComponentRow) -> CarouselCard {
    let media = record
        .media
        .iter()
        .find(|m| m.component_id == Some(component.id));

    let header_kind = component
        .metadata
        .as_ref()
        .and_then(|m| m.get("header_type"))
        .and_then(|v| v.as_str())
        .and_then(HeaderKind::parse);

    let header = header_kind.map(|kind| Header {
        kind,
        text: component
            .metadata
            .as_ref()
            .and_then(|m| m.get("header_text"))
            .and_then(|v| v.as_str())
            .map(str::to_string),
        media_url: media.map(|m| m.url.clone()),
        filename: media.and_then(|m| m.filename.clone()),
        location: None,
    });

    CarouselCard {
        header,
        body: Body {
            text: component.content.clone().unwrap_or_default(),
        },
        buttons: component_buttons(&record.buttons, component.id),
    }
}
