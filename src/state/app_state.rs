//! Shared application state handed to every request handler.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::registry::TableRegistry;

#[derive(Clone)]
pub struct AppState {
    registry: Arc<TableRegistry>,
    config: AppConfig,
}

impl AppState {
    pub fn new(registry: Arc<TableRegistry>, config: AppConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> Arc<TableRegistry> {
        self.registry.clone()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
