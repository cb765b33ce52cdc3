use axum::{
    routing::{get, post},
    Router,
};

use crate::server::AppState;

use super::health::health;
use super::metrics::prometheus_metrics;
use super::templates::{
    create_template, delete_template, get_template, list_templates, refresh_template_status,
    update_template,
};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health & metrics
        .route("/health", get(health))
        .route("/metrics", get(prometheus_metrics))
        // Template endpoints
        .nest(
            "/api/v1",
            Router::new()
                .route("/templates", post(create_template).get(list_templates))
                .route(
                    "/templates/{id}",
                    get(get_template)
                        .put(update_template)
                        .delete(delete_template),
                )
                .route(
                    "/templates/{id}/status/refresh",
                    post(refresh_template_status),
                ),
        )
}
