#[cfg(test)]
mod tests;

use crate::services::base::status::Status;
use crate::services::base::status::object_details::ObjectDetails;
use crate::services::base::types::{IndexFn, NamedIndex, ObjectKey};
use crate::services::resources::notifier::ChangeNotifier;
use kube::api::DynamicObject;
use log::warn;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

struct CacheState {
    objects: HashMap<ObjectKey, Arc<DynamicObject>>,
    index_fns: HashMap<String, IndexFn>,
    index_data: HashMap<String, HashMap<String, HashSet<ObjectKey>>>,
    started: bool,
}

impl CacheState {
    fn index(&mut self, key: &ObjectKey, object: &DynamicObject) {
        for (name, function) in &self.index_fns {
            let buckets = self.index_data.entry(name.clone()).or_default();
            for index_key in function(object) {
                buckets.entry(index_key).or_default().insert(key.clone());
            }
        }
    }

    fn unindex(&mut self, key: &ObjectKey, object: &DynamicObject) {
        for (name, function) in &self.index_fns {
            let Some(buckets) = self.index_data.get_mut(name) else {
                continue;
            };
            for index_key in function(object) {
                if let Some(members) = buckets.get_mut(&index_key) {
                    members.remove(key);
                    if members.is_empty() {
                        buckets.remove(&index_key);
                    }
                }
            }
        }
    }
}

/// Local, continuously updated mirror of one resource kind's collection,
/// queryable by primary key and by named secondary indexes.
///
/// Watch callbacks mutate the store first and fan out to the notifier only
/// after the lock is released, so the cache state is always visible to any
/// read that happens-after the corresponding notification.
pub struct ResourceCache {
    notifier: Arc<ChangeNotifier>,
    state: RwLock<CacheState>,
}

impl ResourceCache {
    pub fn new(notifier: Arc<ChangeNotifier>) -> Self {
        ResourceCache {
            notifier,
            state: RwLock::new(CacheState {
                objects: HashMap::new(),
                index_fns: HashMap::new(),
                index_data: HashMap::new(),
                started: false,
            }),
        }
    }

    /// Idempotent. Registration after the watch has started delivering events
    /// is silently ignored: a late index would miss already-applied records.
    pub fn register_index(&self, index: NamedIndex) {
        let mut state = self.state.write();
        if state.started {
            warn!("Ignoring index '{}' registered after the watch started", index.name);
            return;
        }
        if state.index_fns.contains_key(&index.name) {
            return;
        }
        state.index_fns.insert(index.name, index.function);
    }

    pub fn get_by_key(&self, key: &ObjectKey) -> Result<Arc<DynamicObject>, Status> {
        let state = self.state.read();
        state
            .objects
            .get(key)
            .cloned()
            .ok_or_else(|| Status::NotFound(ObjectDetails::from(key)))
    }

    pub fn list_all(&self) -> Vec<Arc<DynamicObject>> {
        self.state.read().objects.values().cloned().collect()
    }

    pub fn list_by_index(&self, index_name: &str, key: &str) -> Result<Vec<Arc<DynamicObject>>, Status> {
        let state = self.state.read();
        if !state.index_fns.contains_key(index_name) {
            return Err(Status::Internal(anyhow::anyhow!(
                "unknown index '{}'",
                index_name
            )));
        }
        let members = state
            .index_data
            .get(index_name)
            .and_then(|buckets| buckets.get(key));
        let objects = match members {
            Some(members) => members
                .iter()
                .filter_map(|member| state.objects.get(member).cloned())
                .collect(),
            None => Vec::new(),
        };
        Ok(objects)
    }

    /// Applies an add-or-update watch event.
    pub fn apply(&self, object: DynamicObject) {
        let Some(key) = ObjectKey::of(&object) else {
            warn!("Dropping watch event for an object without a name");
            return;
        };
        let object = Arc::new(object);
        let old = {
            let mut state = self.state.write();
            state.started = true;
            let old = state.objects.remove(&key);
            if let Some(old) = &old {
                state.unindex(&key, old);
            }
            state.index(&key, &object);
            state.objects.insert(key, object.clone());
            old
        };
        match old {
            // A resync replays every record unchanged; re-announcing one with
            // the same version token would flood subscribers on reconnect.
            Some(old)
                if old.metadata.resource_version.is_some()
                    && old.metadata.resource_version == object.metadata.resource_version => {}
            Some(old) => self.notifier.notify_update(&old, &object),
            None => self.notifier.notify_add(&object),
        }
    }

    /// Applies a delete watch event.
    pub fn delete(&self, object: DynamicObject) {
        let Some(key) = ObjectKey::of(&object) else {
            warn!("Dropping watch event for an object without a name");
            return;
        };
        let removed = {
            let mut state = self.state.write();
            state.started = true;
            let removed = state.objects.remove(&key);
            if let Some(removed) = &removed {
                state.unindex(&key, removed);
            }
            removed
        };
        let old = removed.unwrap_or_else(|| Arc::new(object));
        self.notifier.notify_delete(&old);
    }

    /// Prunes records that did not reappear in a resync snapshot, emitting a
    /// delete notification for each.
    pub fn retain(&self, live: &HashSet<ObjectKey>) {
        let removed: Vec<Arc<DynamicObject>> = {
            let mut state = self.state.write();
            let dead: Vec<ObjectKey> = state
                .objects
                .keys()
                .filter(|key| !live.contains(key))
                .cloned()
                .collect();
            let mut removed = Vec::with_capacity(dead.len());
            for key in dead {
                if let Some(object) = state.objects.remove(&key) {
                    state.unindex(&key, &object);
                    removed.push(object);
                }
            }
            removed
        };
        for object in removed {
            self.notifier.notify_delete(&object);
        }
    }

    pub fn len(&self) -> usize {
        self.state.read().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().objects.is_empty()
    }
}
