//! API layer - HTTP endpoint handlers organized by domain.

mod health;
mod metrics;
mod routes;
mod templates;

pub use health::health;
pub use metrics::prometheus_metrics;
pub use routes::api_routes;
pub use templates::{
    create_template, delete_template, get_template, list_templates, refresh_template_status,
    update_template,
};
