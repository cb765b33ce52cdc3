//! Canonical template types and request/response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Template category accepted by every supported provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Utility,
    Marketing,
    Authentication,
}

impl Category {
    /// Parse a category from its lowercase wire form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "utility" => Some(Self::Utility),
            "marketing" => Some(Self::Marketing),
            "authentication" => Some(Self::Authentication),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Utility => "utility",
            Self::Marketing => "marketing",
            Self::Authentication => "authentication",
        }
    }
}

/// Canonical lifecycle state of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateStatus {
    Draft,
    PendingApproval,
    Approved,
    Rejected,
}

impl TemplateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "pending_approval" => Some(Self::PendingApproval),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Content edits and deletion are only allowed before approval.
    pub fn is_editable(&self) -> bool {
        !matches!(self, Self::Approved)
    }
}

/// Canonical approval state of one provider submission.
///
/// `pending` transitions to `approved` or `rejected`; both are terminal
/// for that submission (resubmission creates a new one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ProviderApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Header variant of a template or carousel card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderKind {
    Text,
    Image,
    Video,
    Document,
    Location,
}

impl HeaderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::Document => "document",
            Self::Location => "location",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            "document" => Some(Self::Document),
            "location" => Some(Self::Location),
            _ => None,
        }
    }

    /// Non-text, non-location headers carry a media asset.
    pub fn is_media(&self) -> bool {
        matches!(self, Self::Image | Self::Video | Self::Document)
    }
}

/// Button variant. The kind dictates which payload field is mandatory:
/// `url`/`phone`/`copy` require `value`, `quick_reply` requires `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonKind {
    QuickReply,
    Url,
    Phone,
    Copy,
}

impl ButtonKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuickReply => "quick_reply",
            Self::Url => "url",
            Self::Phone => "phone",
            Self::Copy => "copy",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "quick_reply" => Some(Self::QuickReply),
            "url" => Some(Self::Url),
            "phone" => Some(Self::Phone),
            "copy" => Some(Self::Copy),
            _ => None,
        }
    }
}

/// Example coordinates for a location header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationExample {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    pub address: String,
}

/// Template or card header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    #[serde(rename = "type")]
    pub kind: HeaderKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Location headers carry example coordinates for provider review.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationExample>,
}

/// Body component; the only mandatory part of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footer {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Button {
    #[serde(rename = "type")]
    pub kind: ButtonKind,

    pub text: String,

    /// URL, phone number or copy payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Quick-reply identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// One card of a carousel. Cards are ordered; each carries its own
/// body text, optional header and up to three buttons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarouselCard {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<Header>,

    pub body: Body,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Carousel {
    pub cards: Vec<CarouselCard>,
}

/// The canonical content tree of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<Header>,

    pub body: Body,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<Footer>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carousel: Option<Carousel>,
}

/// Declared `{{index}}` placeholder with its sample value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placeholder {
    /// Matches the `{{index}}` token in body text.
    pub index: String,

    pub name: String,

    /// Sample value submitted to providers that require example content.
    pub example: String,

    /// Component type the placeholder belongs to (body, carousel_card, ...).
    pub component: String,
}

/// Provider-independent representation of one template in one language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTemplate {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub category: Category,
    pub language: String,
    pub channel: String,
    pub content: TemplateContent,
    pub placeholders: Vec<Placeholder>,
    pub status: TemplateStatus,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a template across one or more languages.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTemplateRequest {
    pub template_name: String,

    /// Raw category; validated against the fixed allow-list.
    pub category: String,

    pub languages: Vec<String>,

    pub business_channel: String,

    pub content: TemplateContent,

    #[serde(default)]
    pub placeholders: Vec<Placeholder>,
}

/// Request to update a template's content. Only permitted while the
/// template is in draft, rejected or pending_approval state.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTemplateRequest {
    #[serde(default)]
    pub category: Option<String>,

    pub content: TemplateContent,

    #[serde(default)]
    pub placeholders: Vec<Placeholder>,
}

/// One provider submission as exposed on the read API.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSubmissionView {
    pub provider: String,
    pub status: ProviderApprovalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_reason: Option<String>,
}

/// Canonical read response: the content tree plus lifecycle metadata.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateResponse {
    pub template_id: Uuid,
    pub template_name: String,
    pub category: Category,
    pub language: String,
    pub business_channel: String,
    pub status: TemplateStatus,
    pub content: TemplateContent,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub placeholders: Vec<Placeholder>,
    pub provider_submissions: Vec<ProviderSubmissionView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_roundtrip() {
        assert_eq!(Category::parse("utility"), Some(Category::Utility));
        assert_eq!(Category::Marketing.as_str(), "marketing");
        assert_eq!(Category::parse("invalid_cat"), None);
    }

    #[test]
    fn test_status_editable() {
        assert!(TemplateStatus::Draft.is_editable());
        assert!(TemplateStatus::Rejected.is_editable());
        assert!(TemplateStatus::PendingApproval.is_editable());
        assert!(!TemplateStatus::Approved.is_editable());
    }

    #[test]
    fn test_content_tree_deserialization() {
        let content: TemplateContent = serde_json::from_value(json!({
            "header": {"type": "text", "text": "Order Update"},
            "body": {"text": "Your order {{1}} has shipped"},
            "footer": {"text": "Thanks!"},
            "buttons": [{"type": "quick_reply", "text": "Track", "id": "track_btn"}]
        }))
        .unwrap();

        assert_eq!(content.header.as_ref().unwrap().kind, HeaderKind::Text);
        assert_eq!(content.body.text, "Your order {{1}} has shipped");
        assert_eq!(content.buttons.len(), 1);
        assert_eq!(content.buttons[0].kind, ButtonKind::QuickReply);
        assert!(content.carousel.is_none());
    }

    #[test]
    fn test_content_tree_serialization_omits_empty() {
        let content = TemplateContent {
            header: None,
            body: Body {
                text: "hello".to_string(),
            },
            footer: None,
            buttons: vec![],
            carousel: None,
        };

        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(value, json!({"body": {"text": "hello"}}));
    }
}
