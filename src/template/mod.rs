//! Canonical template model and structural validation.
//!
//! A template is represented provider-independently: a content tree of
//! typed components (header/body/footer/buttons/carousel) plus declared
//! `{{N}}` placeholders. Provider dialects are produced from this model
//! by the compilers in [`crate::provider`].

pub mod model;
pub mod validator;

pub use model::{
    Body, Button, ButtonKind, CanonicalTemplate, Carousel, CarouselCard, Category,
    CreateTemplateRequest, Footer, Header, HeaderKind, LocationExample, Placeholder,
    ProviderApprovalStatus, ProviderSubmissionView, TemplateContent, TemplateResponse,
    TemplateStatus, UpdateTemplateRequest,
};
pub use validator::validate_request;
