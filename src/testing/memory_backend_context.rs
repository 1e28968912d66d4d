use crate::services::backends::memory::InMemoryBackingStore;
use crate::services::base::types::ResourceKindSpec;
use crate::services::resources::factory::{FactoryConfig, ServiceFactory};
use crate::services::resources::service::CachedResourceService;
use crate::testing::project_kind;
use std::sync::Arc;
use std::time::Duration;

/// Shared fixture: an in-memory backing store with a factory over it.
pub struct MemoryBackendContext {
    pub store: Arc<InMemoryBackingStore>,
    pub factory: Arc<ServiceFactory>,
}

impl MemoryBackendContext {
    pub async fn start() -> Self {
        let store = Arc::new(InMemoryBackingStore::new());
        let factory = Arc::new(ServiceFactory::new(
            store.clone(),
            FactoryConfig {
                ready_timeout: Duration::from_secs(5),
            },
        ));
        MemoryBackendContext { store, factory }
    }

    pub async fn project_service(&self) -> Arc<CachedResourceService> {
        self.factory
            .resource_service(&ResourceKindSpec::new(project_kind()))
            .await
            .expect("Failed to build the project service")
    }
}

#[cfg(test)]
impl test_context::AsyncTestContext for MemoryBackendContext {
    async fn setup() -> MemoryBackendContext {
        MemoryBackendContext::start().await
    }

    async fn teardown(self) {
        // do nothing
    }
}
