use crate::services::base::status::Status;
use crate::services::base::types::{ResourceEventType, ResourceKind};
use async_trait::async_trait;
use kube::api::DynamicObject;
use parking_lot::Mutex;
use std::sync::Arc;

/// Receives raw change records fanned out by a notifier. Implementations must
/// return quickly: delivery happens on the watch path of the owning cache.
pub trait ChangeListener: Send + Sync {
    fn notify(&self, event_type: ResourceEventType, object: &DynamicObject);
}

/// Mutation applied to a freshly read object during an optimistic-concurrency update.
pub type MutateFn = Box<dyn FnOnce(&mut DynamicObject) + Send>;

#[async_trait]
/// The public CRUD and subscription facade over one resource kind.
///
/// Reads (`list`, `get`) are served from the local mirror; writes go to the
/// backing store. `update` is a read-then-conditional-write: a stale
/// generation fails with [`Status::Conflict`] before the mutation runs, and a
/// true write race is resolved by the backing store's own concurrency token.
pub trait ResourceService: Send + Sync {
    fn kind(&self) -> &ResourceKind;

    /// A missing namespace means cluster scope. Never fails for "no matches".
    async fn list(&self, namespace: Option<&str>) -> Result<Vec<DynamicObject>, Status>;

    async fn get(&self, name: &str, namespace: Option<&str>) -> Result<DynamicObject, Status>;

    async fn create(&self, object: DynamicObject) -> Result<DynamicObject, Status>;

    async fn update(
        &self,
        name: &str,
        namespace: Option<&str>,
        expected_generation: i64,
        mutate: MutateFn,
    ) -> Result<DynamicObject, Status>;

    /// Returns the object as it was just before deletion.
    async fn delete(&self, name: &str, namespace: Option<&str>) -> Result<DynamicObject, Status>;

    fn subscribe(&self, listener: Arc<dyn ChangeListener>) -> Result<Unsubscribe, Status>;
}

/// Handle detaching one listener registration. Cancelling more than once is a
/// no-op, and dropping the handle cancels it so a lost subscription cannot
/// leak its registration.
pub struct Unsubscribe {
    cancel: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Unsubscribe {
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Unsubscribe {
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    pub fn cancel(&self) {
        if let Some(cancel) = self.cancel.lock().take() {
            cancel();
        }
    }
}

impl Drop for Unsubscribe {
    fn drop(&mut self) {
        self.cancel();
    }
}
