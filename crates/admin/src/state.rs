//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ReturnsConfig;
use crate::db::{PrincipalStore, ReturnStore};
use crate::services::{ImageStore, ReturnService};

/// Application state shared across all handlers.
///
/// This is cheaply cloneable via `Arc` and contains all shared resources.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ReturnsConfig,
    store: Arc<dyn ReturnStore>,
    principals: Arc<dyn PrincipalStore>,
    returns: ReturnService,
    images: ImageStore,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        config: ReturnsConfig,
        store: Arc<dyn ReturnStore>,
        principals: Arc<dyn PrincipalStore>,
    ) -> Self {
        let returns = ReturnService::new(
            Arc::clone(&store),
            config.refund_policy(),
            config.max_images,
            config.image_base_url.clone(),
        );
        let images = ImageStore::new(config.upload_dir.clone(), config.max_image_bytes);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                principals,
                returns,
                images,
            }),
        }
    }

    /// Get a reference to the returns configuration.
    #[must_use]
    pub fn config(&self) -> &ReturnsConfig {
        &self.inner.config
    }

    /// Get the return storage backend.
    #[must_use]
    pub fn store(&self) -> &dyn ReturnStore {
        self.inner.store.as_ref()
    }

    /// Get the bearer-token resolver.
    #[must_use]
    pub fn principals(&self) -> &dyn PrincipalStore {
        self.inner.principals.as_ref()
    }

    /// Get the return-request service.
    #[must_use]
    pub fn returns(&self) -> &ReturnService {
        &self.inner.returns
    }

    /// Get the evidence image store.
    #[must_use]
    pub fn images(&self) -> &ImageStore {
        &self.inner.images
    }
}
