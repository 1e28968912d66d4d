
use crate::services::backends::{BackingStoreClient, WatchStream};
use crate::services::base::status::Status;
use crate::services::base::status::object_details::ObjectDetails;
use crate::services::base::types::{ObjectKey, ResourceKind};
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use kube::api::DynamicObject;
use kube::runtime::watcher;
use log::warn;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

const EVENT_BUFFER: usize = 256;

struct Collection {
    objects: BTreeMap<ObjectKey, DynamicObject>,
    events: broadcast::Sender<watcher::Event<DynamicObject>>,
}

impl Default for Collection {
    fn default() -> Self {
        Collection {
            objects: BTreeMap::new(),
            events: broadcast::channel(EVENT_BUFFER).0,
        }
    }
}

impl Collection {
    fn publish(&self, event: watcher::Event<DynamicObject>) {
        // Nobody watching is fine.
        let _ = self.events.send(event);
    }
}

/// Backing store over process memory, mirroring the remote store contract:
/// generation starts at zero on create, bumps on every successful update, and
/// a stale incoming generation is rejected with a conflict. Watch
/// subscriptions replay the current snapshot before live events.
pub struct InMemoryBackingStore {
    collections: RwLock<HashMap<ResourceKind, Collection>>,
    unavailable: RwLock<HashSet<ResourceKind>>,
    resource_version: AtomicU64,
}

impl InMemoryBackingStore {
    pub fn new() -> Self {
        InMemoryBackingStore {
            collections: RwLock::new(HashMap::new()),
            unavailable: RwLock::new(HashSet::new()),
            resource_version: AtomicU64::new(1),
        }
    }

    /// Marks a kind as not installed: its watch ends immediately without ever
    /// syncing, the way a missing CRD behaves.
    pub fn make_unavailable(&self, kind: &ResourceKind) {
        self.unavailable.write().insert(kind.clone());
    }

    fn next_resource_version(&self) -> String {
        self.resource_version.fetch_add(1, Ordering::SeqCst).to_string()
    }

    fn key_of(object: &DynamicObject) -> Result<ObjectKey, Status> {
        ObjectKey::of(object)
            .ok_or_else(|| Status::ConversionError(anyhow::anyhow!("object name is required")))
    }
}

impl Default for InMemoryBackingStore {
    fn default() -> Self {
        InMemoryBackingStore::new()
    }
}

#[async_trait]
impl BackingStoreClient for InMemoryBackingStore {
    async fn list(
        &self,
        kind: &ResourceKind,
        namespace: Option<&str>,
    ) -> Result<Vec<DynamicObject>, Status> {
        let collections = self.collections.read();
        let objects = match collections.get(kind) {
            Some(collection) => collection
                .objects
                .values()
                .filter(|object| namespace.is_none() || object.metadata.namespace.as_deref() == namespace)
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        Ok(objects)
    }

    async fn get(
        &self,
        kind: &ResourceKind,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<DynamicObject, Status> {
        let key = ObjectKey::new(name, namespace);
        let collections = self.collections.read();
        collections
            .get(kind)
            .and_then(|collection| collection.objects.get(&key))
            .cloned()
            .ok_or_else(|| Status::NotFound(ObjectDetails::from(&key)))
    }

    async fn create(
        &self,
        kind: &ResourceKind,
        mut object: DynamicObject,
    ) -> Result<DynamicObject, Status> {
        let key = Self::key_of(&object)?;
        let mut collections = self.collections.write();
        let collection = collections.entry(kind.clone()).or_default();
        if collection.objects.contains_key(&key) {
            return Err(Status::AlreadyExists(ObjectDetails::from(&key)));
        }
        object.metadata.generation = Some(0);
        object.metadata.resource_version = Some(self.next_resource_version());
        collection.objects.insert(key, object.clone());
        collection.publish(watcher::Event::Apply(object.clone()));
        Ok(object)
    }

    async fn update(
        &self,
        kind: &ResourceKind,
        mut object: DynamicObject,
    ) -> Result<DynamicObject, Status> {
        let key = Self::key_of(&object)?;
        let mut collections = self.collections.write();
        let collection = collections.entry(kind.clone()).or_default();
        let stored = collection
            .objects
            .get(&key)
            .ok_or_else(|| Status::NotFound(ObjectDetails::from(&key)))?;
        // The store's own concurrency token: a write carrying a generation
        // other than the stored one lost a race and is rejected.
        if stored.metadata.generation != object.metadata.generation {
            return Err(Status::Conflict);
        }
        object.metadata.generation = Some(object.metadata.generation.unwrap_or(0) + 1);
        object.metadata.resource_version = Some(self.next_resource_version());
        collection.objects.insert(key, object.clone());
        collection.publish(watcher::Event::Apply(object.clone()));
        Ok(object)
    }

    async fn delete(
        &self,
        kind: &ResourceKind,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<(), Status> {
        let key = ObjectKey::new(name, namespace);
        let mut collections = self.collections.write();
        let collection = collections.entry(kind.clone()).or_default();
        match collection.objects.remove(&key) {
            Some(removed) => {
                collection.publish(watcher::Event::Delete(removed));
                Ok(())
            }
            None => Err(Status::NotFound(ObjectDetails::from(&key))),
        }
    }

    fn watch(&self, kind: &ResourceKind) -> WatchStream {
        if self.unavailable.read().contains(kind) {
            return stream::empty().boxed();
        }
        let mut collections = self.collections.write();
        let collection = collections.entry(kind.clone()).or_default();
        // Subscribe under the lock so no event falls between snapshot and feed.
        let receiver = collection.events.subscribe();
        let mut snapshot = vec![Ok(watcher::Event::Init)];
        snapshot.extend(
            collection
                .objects
                .values()
                .cloned()
                .map(|object| Ok(watcher::Event::InitApply(object))),
        );
        snapshot.push(Ok(watcher::Event::InitDone));
        drop(collections);

        let live = BroadcastStream::new(receiver).filter_map(|event| async move {
            match event {
                Ok(event) => Some(Ok(event)),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!("In-memory watch lagged, skipped {} events", skipped);
                    None
                }
            }
        });
        stream::iter(snapshot).chain(live).boxed()
    }
}
