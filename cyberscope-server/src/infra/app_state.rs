use std::{fmt, sync::Arc};

use cyberscope_core::ScanEngine;

use crate::infra::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub engine: ScanEngine,
    pub config: Arc<Config>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(engine: ScanEngine, config: Config) -> Self {
        Self {
            engine,
            config: Arc::new(config),
        }
    }

    pub fn engine(&self) -> &ScanEngine {
        &self.engine
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
