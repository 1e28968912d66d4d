
use crate::services::backends::{BackingStoreClient, WatchStream};
use crate::services::base::resource_service::ResourceService;
use crate::services::base::status::Status;
use crate::services::base::types::{NamedIndex, ObjectKey, ResourceKind, ResourceKindSpec};
use crate::services::resources::cache::ResourceCache;
use crate::services::resources::notifier::ChangeNotifier;
use crate::services::resources::service::CachedResourceService;
use futures::StreamExt;
use kube::runtime::watcher;
use log::{debug, warn};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;

#[derive(Debug, Clone)]
pub struct FactoryConfig {
    /// Bound on waiting for a newly built service's first complete sync.
    pub ready_timeout: Duration,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        FactoryConfig {
            ready_timeout: Duration::from_secs(30),
        }
    }
}

/// A constructed service together with its running watch pump.
pub struct ServiceHandle {
    service: Arc<CachedResourceService>,
    pump: tokio::task::JoinHandle<()>,
}

impl ServiceHandle {
    pub fn service(&self) -> Arc<CachedResourceService> {
        self.service.clone()
    }

    pub fn stop(&self) {
        self.pump.abort();
        debug!("Watch pump for {} stopped", self.service.kind());
    }
}

impl Drop for ServiceHandle {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

/// Builds resource services on demand, wiring cache, notifier and backing
/// store together and synchronizing the underlying watch before handing the
/// service out. The map of installed services lives for the process lifetime
/// unless a module disables it.
pub struct ServiceFactory {
    store: Arc<dyn BackingStoreClient>,
    config: FactoryConfig,
    services: Mutex<HashMap<ResourceKind, ServiceHandle>>,
}

impl ServiceFactory {
    pub fn new(store: Arc<dyn BackingStoreClient>, config: FactoryConfig) -> Self {
        ServiceFactory {
            store,
            config,
            services: Mutex::new(HashMap::new()),
        }
    }

    /// Constructs a service without publishing it. The returned handle is
    /// fully synchronized; on any failure the watch pump is aborted.
    pub async fn build(&self, spec: &ResourceKindSpec) -> Result<ServiceHandle, Status> {
        let notifier = Arc::new(ChangeNotifier::new());
        let cache = Arc::new(ResourceCache::new(notifier.clone()));
        cache.register_index(NamedIndex::namespace());
        for index in &spec.indexes {
            cache.register_index(index.clone());
        }

        let stream = self.store.watch(&spec.kind);
        let (ready_tx, mut ready_rx) = watch::channel(false);
        let pump = tokio::spawn(run_watch(spec.kind.clone(), cache.clone(), stream, ready_tx));

        match timeout(self.config.ready_timeout, ready_rx.wait_for(|ready| *ready)).await {
            Ok(Ok(_)) => {
                let service = Arc::new(CachedResourceService::new(
                    spec.kind.clone(),
                    cache,
                    notifier,
                    self.store.clone(),
                ));
                Ok(ServiceHandle { service, pump })
            }
            Ok(Err(_)) => {
                pump.abort();
                Err(Status::Internal(anyhow::anyhow!(
                    "watch for {} ended before the initial sync",
                    spec.kind
                )))
            }
            Err(_) => {
                pump.abort();
                Err(Status::Timeout(format!(
                    "waited {:?} for the initial sync of {}",
                    self.config.ready_timeout, spec.kind
                )))
            }
        }
    }

    /// Publishes a built handle, stopping any previous service for the kind.
    pub fn install(&self, handle: ServiceHandle) -> Arc<CachedResourceService> {
        let service = handle.service();
        let kind = service.kind().clone();
        let mut services = self.services.lock();
        if let Some(previous) = services.insert(kind, handle) {
            previous.stop();
        }
        service
    }

    pub fn remove(&self, kind: &ResourceKind) {
        if let Some(handle) = self.services.lock().remove(kind) {
            handle.stop();
        }
    }

    pub fn service(&self, kind: &ResourceKind) -> Option<Arc<CachedResourceService>> {
        self.services.lock().get(kind).map(ServiceHandle::service)
    }

    /// Get-or-build convenience for callers outside the module lifecycle.
    /// Two concurrent first callers may both build; the map is re-checked
    /// before publishing, so the loser's handle is discarded (aborting its
    /// pump) and every caller ends up with the one installed service.
    pub async fn resource_service(
        &self,
        spec: &ResourceKindSpec,
    ) -> Result<Arc<CachedResourceService>, Status> {
        if let Some(service) = self.service(&spec.kind) {
            return Ok(service);
        }
        let handle = self.build(spec).await?;
        let mut services = self.services.lock();
        if let Some(existing) = services.get(&spec.kind) {
            return Ok(existing.service());
        }
        let service = handle.service();
        services.insert(spec.kind.clone(), handle);
        Ok(service)
    }
}

/// Drives one kind's cache from its watch stream. Stream errors and malformed
/// records are logged and skipped; nothing aborts the loop.
async fn run_watch(
    kind: ResourceKind,
    cache: Arc<ResourceCache>,
    mut stream: WatchStream,
    ready: watch::Sender<bool>,
) {
    let mut resync: Option<HashSet<ObjectKey>> = None;
    while let Some(event) = stream.next().await {
        match event {
            Ok(watcher::Event::Init) => {
                resync = Some(HashSet::new());
            }
            Ok(watcher::Event::InitApply(object)) => {
                if let (Some(live), Some(key)) = (resync.as_mut(), ObjectKey::of(&object)) {
                    live.insert(key);
                }
                cache.apply(object);
            }
            Ok(watcher::Event::InitDone) => {
                if let Some(live) = resync.take() {
                    cache.retain(&live);
                }
                let _ = ready.send(true);
            }
            Ok(watcher::Event::Apply(object)) => cache.apply(object),
            Ok(watcher::Event::Delete(object)) => cache.delete(object),
            Err(error) => warn!("Watch error for {}: {}", kind, error),
        }
    }
    debug!("Watch stream for {} ended", kind);
}
