pub mod kubernetes;
pub mod memory;

use crate::services::base::status::Status;
use crate::services::base::types::ResourceKind;
use async_trait::async_trait;
use futures::stream::BoxStream;
use kube::api::DynamicObject;
use kube::runtime::watcher;

/// Change feed for one resource kind. Subscribing replays the current
/// collection (`Init`, `InitApply`*, `InitDone`) before live events, and the
/// same triple marks every resync after a reconnect.
pub type WatchStream = BoxStream<'static, Result<watcher::Event<DynamicObject>, Status>>;

#[async_trait]
/// Per-resource-kind operations against the remote store. Calls are blocking
/// network calls without internal timeout or retry; a caller-supplied
/// deadline governs them.
pub trait BackingStoreClient: Send + Sync {
    async fn list(
        &self,
        kind: &ResourceKind,
        namespace: Option<&str>,
    ) -> Result<Vec<DynamicObject>, Status>;

    async fn get(
        &self,
        kind: &ResourceKind,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<DynamicObject, Status>;

    async fn create(
        &self,
        kind: &ResourceKind,
        object: DynamicObject,
    ) -> Result<DynamicObject, Status>;

    async fn update(
        &self,
        kind: &ResourceKind,
        object: DynamicObject,
    ) -> Result<DynamicObject, Status>;

    async fn delete(
        &self,
        kind: &ResourceKind,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<(), Status>;

    fn watch(&self, kind: &ResourceKind) -> WatchStream;
}
