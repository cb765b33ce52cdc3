mod settings;

pub use settings::{
    DatabaseConfig, ProviderSettings, ReconcileConfig, ServerConfig, Settings,
};
