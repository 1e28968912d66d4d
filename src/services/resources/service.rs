
use crate::services::backends::BackingStoreClient;
use crate::services::base::resource_service::{ChangeListener, MutateFn, ResourceService, Unsubscribe};
use crate::services::base::status::Status;
use crate::services::base::types::{NAMESPACE_INDEX, ObjectKey, ResourceKind};
use crate::services::resources::cache::ResourceCache;
use crate::services::resources::notifier::ChangeNotifier;
use async_trait::async_trait;
use kube::api::DynamicObject;
use std::sync::Arc;

/// Live resource service for one kind: reads come from the cache, writes go
/// to the backing store, subscriptions register with the kind's notifier.
pub struct CachedResourceService {
    kind: ResourceKind,
    cache: Arc<ResourceCache>,
    notifier: Arc<ChangeNotifier>,
    store: Arc<dyn BackingStoreClient>,
}

impl CachedResourceService {
    pub fn new(
        kind: ResourceKind,
        cache: Arc<ResourceCache>,
        notifier: Arc<ChangeNotifier>,
        store: Arc<dyn BackingStoreClient>,
    ) -> Self {
        CachedResourceService {
            kind,
            cache,
            notifier,
            store,
        }
    }

    pub fn cache(&self) -> &Arc<ResourceCache> {
        &self.cache
    }
}

#[async_trait]
impl ResourceService for CachedResourceService {
    fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    async fn list(&self, namespace: Option<&str>) -> Result<Vec<DynamicObject>, Status> {
        let objects = match namespace {
            Some(namespace) => self.cache.list_by_index(NAMESPACE_INDEX, namespace)?,
            None => self.cache.list_all(),
        };
        Ok(objects.iter().map(|object| (**object).clone()).collect())
    }

    async fn get(&self, name: &str, namespace: Option<&str>) -> Result<DynamicObject, Status> {
        let key = ObjectKey::new(name, namespace);
        let object = self.cache.get_by_key(&key)?;
        Ok((*object).clone())
    }

    async fn create(&self, object: DynamicObject) -> Result<DynamicObject, Status> {
        self.store.create(&self.kind, object).await
    }

    async fn update(
        &self,
        name: &str,
        namespace: Option<&str>,
        expected_generation: i64,
        mutate: MutateFn,
    ) -> Result<DynamicObject, Status> {
        let mut current = self.store.get(&self.kind, name, namespace).await?;
        let stored_generation = current.metadata.generation.unwrap_or(0);
        if stored_generation > expected_generation {
            return Err(Status::Conflict);
        }
        // Between here and the write another update can slip through; the
        // backing store's own concurrency token rejects the loser.
        mutate(&mut current);
        self.store.update(&self.kind, current).await
    }

    async fn delete(&self, name: &str, namespace: Option<&str>) -> Result<DynamicObject, Status> {
        let existing = self.store.get(&self.kind, name, namespace).await?;
        self.store.delete(&self.kind, name, namespace).await?;
        Ok(existing)
    }

    fn subscribe(&self, listener: Arc<dyn ChangeListener>) -> Result<Unsubscribe, Status> {
        self.notifier.add_listener(listener.clone());
        let notifier = self.notifier.clone();
        Ok(Unsubscribe::new(move || notifier.remove_listener(&listener)))
    }
}
