// Infrastructure layer (shared components)
pub mod config;
pub mod error;
pub mod metrics;

// Domain layer (business logic)
pub mod provider;
pub mod reconcile;
pub mod service;
pub mod store;
pub mod template;

// Application layer
pub mod api;
pub mod server;
