//! Structural validation of canonical template content.
//!
//! Pure checks only: nothing is persisted and no provider is contacted
//! when validation fails. Rules run in a fixed order and short-circuit
//! with a specific human-readable reason.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;

use super::model::{Button, ButtonKind, Category, CreateTemplateRequest, Header, HeaderKind};

lazy_static! {
    static ref TEMPLATE_NAME_RE: Regex = Regex::new(r"^[a-z0-9_]+$").unwrap();
    static ref LANGUAGE_CODE_RE: Regex = Regex::new(r"^[a-z]{2}(_[A-Z]{2})?$").unwrap();
}

/// Validate a create request against the canonical structural rules.
///
/// `template_name` is expected to be case-normalized by the caller
/// before validation.
pub fn validate_request(req: &CreateTemplateRequest) -> Result<(), AppError> {
    // 1. Required fields
    if req.template_name.trim().is_empty() {
        return Err(invalid("template_name is required"));
    }
    if req.category.trim().is_empty() {
        return Err(invalid("category is required"));
    }
    if req.languages.is_empty() {
        return Err(invalid("at least one language is required"));
    }
    if req.business_channel.trim().is_empty() {
        return Err(invalid("business_channel is required"));
    }
    if req.content.body.text.trim().is_empty() {
        return Err(invalid("body text is required"));
    }

    // 2. Carousel shape
    if let Some(carousel) = &req.content.carousel {
        if carousel.cards.is_empty() || carousel.cards.len() > 10 {
            return Err(invalid("carousel must contain between 1 and 10 cards"));
        }
        for (idx, card) in carousel.cards.iter().enumerate() {
            if card.body.text.trim().is_empty() {
                return Err(invalid(&format!(
                    "carousel card {} is missing body text",
                    idx + 1
                )));
            }
            if let Some(header) = &card.header {
                if header.kind == HeaderKind::Location {
                    return Err(invalid(&format!(
                        "carousel card {} header must be one of text, image, video, document",
                        idx + 1
                    )));
                }
                validate_header_media(header)?;
            }
            if card.buttons.len() > 3 {
                return Err(invalid(&format!(
                    "carousel card {} allows at most 3 buttons",
                    idx + 1
                )));
            }
            for button in &card.buttons {
                validate_button(button)?;
            }
        }
    }

    // 3. Location header example
    if let Some(header) = &req.content.header {
        if header.kind == HeaderKind::Location {
            let location = header
                .location
                .as_ref()
                .ok_or_else(|| invalid("location header requires an example location"))?;
            if !location.latitude.is_finite() || !location.longitude.is_finite() {
                return Err(invalid(
                    "location header requires numeric example latitude and longitude",
                ));
            }
            if location.name.trim().is_empty() || location.address.trim().is_empty() {
                return Err(invalid(
                    "location header requires an example name and address",
                ));
            }
        }
    }

    // 4. Header media
    if let Some(header) = &req.content.header {
        validate_header_media(header)?;
    }

    // 5. Top-level buttons
    if req.content.buttons.len() > 3 {
        return Err(invalid("a template allows at most 3 buttons"));
    }
    for button in &req.content.buttons {
        validate_button(button)?;
    }

    // 6. Placeholder closure: every declared placeholder must be used
    for placeholder in &req.placeholders {
        if placeholder.index.trim().is_empty()
            || placeholder.name.trim().is_empty()
            || placeholder.example.trim().is_empty()
            || placeholder.component.trim().is_empty()
        {
            return Err(invalid(
                "placeholders require index, name, example and component",
            ));
        }

        let token = format!("{{{{{}}}}}", placeholder.index);
        let in_body = req.content.body.text.contains(&token);
        let in_cards = req
            .content
            .carousel
            .as_ref()
            .map(|c| c.cards.iter().any(|card| card.body.text.contains(&token)))
            .unwrap_or(false);

        if !in_body && !in_cards {
            return Err(invalid(&format!(
                "placeholder {} declared but not used in any body text",
                token
            )));
        }
    }

    // 7. Name, category and language formats
    if !TEMPLATE_NAME_RE.is_match(&req.template_name.to_lowercase()) {
        return Err(invalid(
            "template_name may only contain lowercase letters, digits and underscores",
        ));
    }
    if Category::parse(&req.category).is_none() {
        return Err(invalid(&format!("unknown category: {}", req.category)));
    }
    for language in &req.languages {
        if !LANGUAGE_CODE_RE.is_match(language) {
            return Err(invalid(&format!("invalid language code: {}", language)));
        }
    }

    Ok(())
}

fn validate_header_media(header: &Header) -> Result<(), AppError> {
    if header.kind.is_media()
        && header
            .media_url
            .as_deref()
            .map(str::trim)
            .unwrap_or("")
            .is_empty()
    {
        return Err(invalid(&format!(
            "{} header requires a media_url",
            header.kind.as_str()
        )));
    }
    Ok(())
}

fn validate_button(button: &Button) -> Result<(), AppError> {
    match button.kind {
        ButtonKind::Url | ButtonKind::Phone | ButtonKind::Copy => {
            if button.value.as_deref().map(str::trim).unwrap_or("").is_empty() {
                return Err(invalid(&format!(
                    "{} button '{}' requires a value",
                    button.kind.as_str(),
                    button.text
                )));
            }
        }
        ButtonKind::QuickReply => {
            if button.id.as_deref().map(str::trim).unwrap_or("").is_empty() {
                return Err(invalid(&format!(
                    "quick_reply button '{}' requires an id",
                    button.text
                )));
            }
        }
    }
    Ok(())
}

fn invalid(reason: &str) -> AppError {
    AppError::Validation(reason.to_string())
}
