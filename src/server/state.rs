use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::provider::ProviderRegistry;
use crate::reconcile::ReconcileEngine;
use crate::service::TemplateService;
use crate::store::TemplateStore;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub service: Arc<TemplateService>,
    pub reconciler: Arc<ReconcileEngine>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        settings: Settings,
        store: Arc<dyn TemplateStore>,
        registry: Arc<ProviderRegistry>,
    ) -> Self {
        let service = Arc::new(TemplateService::new(store.clone(), registry.clone()));
        let reconciler = Arc::new(ReconcileEngine::new(
            store,
            registry,
            settings.reconcile.clone(),
        ));

        Self {
            settings: Arc::new(settings),
            service,
            reconciler,
            start_time: Instant::now(),
        }
    }
}
