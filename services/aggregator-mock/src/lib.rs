pub mod api;
pub mod catalog;
pub mod config;
pub mod transport;
#[cfg(feature = "async-transport")]
pub mod transport_axum;

use std::{path::Path, sync::Arc};

use chrono::{DateTime, Utc};
use resolver::{Clock, ResolutionEngine, SystemClock};
use store::{FixtureStore, StoreError};
use thiserror::Error;

use crate::{
    catalog::{CatalogBuildError, builtin_catalog, builtin_rotation_table, fixture_clusters},
    config::{MockConfig, normalize_api_prefix},
};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("built-in tables are invalid: {0}")]
    Catalog(#[from] CatalogBuildError),
    #[error("fixture store failed to load: {0}")]
    Store(#[from] StoreError),
}

/// Everything a request handler needs: the resolution engine, the clock that
/// drives rotation and the API prefix routes are mounted under. Immutable
/// once built, so transports share it behind an `Arc` without locking.
#[derive(Debug)]
pub struct MockRuntime {
    engine: ResolutionEngine,
    clock: Arc<dyn Clock>,
    api_prefix: String,
}

impl MockRuntime {
    pub fn new(engine: ResolutionEngine, clock: Arc<dyn Clock>, api_prefix: &str) -> Self {
        Self {
            engine,
            clock,
            api_prefix: normalize_api_prefix(api_prefix),
        }
    }

    /// Built-in organizations and rotation entries over the fixtures in
    /// `data_dir`. Fails on the first missing or unreadable report.
    pub fn with_builtin_tables(
        data_dir: &Path,
        clock: Arc<dyn Clock>,
        api_prefix: &str,
    ) -> Result<Self, StartupError> {
        let catalog = builtin_catalog()?;
        let rotation = builtin_rotation_table()?;
        let store = FixtureStore::load_from_dir(data_dir, &fixture_clusters()?)?;
        Ok(Self::new(
            ResolutionEngine::new(catalog, rotation, store),
            clock,
            api_prefix,
        ))
    }

    pub fn from_config(config: &MockConfig) -> Result<Self, StartupError> {
        Self::with_builtin_tables(&config.data_dir, Arc::new(SystemClock), &config.api_prefix)
    }

    pub fn engine(&self) -> &ResolutionEngine {
        &self.engine
    }

    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

pub type SharedRuntime = Arc<MockRuntime>;
