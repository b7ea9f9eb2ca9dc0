use std::sync::Arc;

use services::services::{
    catalog::CatalogProvisioner, progress_store::ProgressStore, reconciler::Reconciler,
    sandbox::CodeSandbox, session_registry::SessionRegistry,
};

/// Shared handles passed to every route
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProgressStore>,
    pub sessions: SessionRegistry,
    pub sandbox: Arc<dyn CodeSandbox>,
}

impl AppState {
    pub fn new(store: Arc<dyn ProgressStore>, sandbox: Arc<dyn CodeSandbox>) -> Self {
        Self {
            store,
            sessions: SessionRegistry::new(),
            sandbox,
        }
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.store.clone())
    }

    pub fn provisioner(&self) -> CatalogProvisioner {
        CatalogProvisioner::new(self.store.clone())
    }
}
