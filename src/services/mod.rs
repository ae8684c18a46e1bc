//! Business logic services

pub mod cover;
pub mod metadata;
pub mod query;
pub mod sru;

use std::sync::Arc;

use crate::{config::AppConfig, error::AppResult};

/// Container for all services
pub struct Services {
    pub metadata: metadata::MetadataService,
}

impl Services {
    /// Create all services with the given configuration
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let transport: Arc<dyn sru::SruTransport> =
            Arc::new(sru::HttpTransport::new(config.sru.timeout_seconds)?);
        Ok(Self {
            metadata: metadata::MetadataService::new(config, transport),
        })
    }
}
