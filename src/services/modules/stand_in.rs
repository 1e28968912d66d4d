use crate::services::base::resource_service::{ChangeListener, MutateFn, ResourceService, Unsubscribe};
use crate::services::base::status::Status;
use crate::services::base::types::ResourceKind;
use async_trait::async_trait;
use kube::api::DynamicObject;
use std::sync::Arc;

/// Degraded stand-in published while a module is disabled. Every operation,
/// subscribe included, fails with the same fixed error so callers can detect
/// "feature not available" without inspecting the operation attempted.
pub struct DisabledResourceService {
    kind: ResourceKind,
    message: String,
}

impl DisabledResourceService {
    pub fn new(kind: ResourceKind, message: &str) -> Self {
        DisabledResourceService {
            kind,
            message: message.to_string(),
        }
    }

    fn disabled(&self) -> Status {
        Status::Disabled(self.message.clone())
    }
}

#[async_trait]
impl ResourceService for DisabledResourceService {
    fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    async fn list(&self, _namespace: Option<&str>) -> Result<Vec<DynamicObject>, Status> {
        Err(self.disabled())
    }

    async fn get(&self, _name: &str, _namespace: Option<&str>) -> Result<DynamicObject, Status> {
        Err(self.disabled())
    }

    async fn create(&self, _object: DynamicObject) -> Result<DynamicObject, Status> {
        Err(self.disabled())
    }

    async fn update(
        &self,
        _name: &str,
        _namespace: Option<&str>,
        _expected_generation: i64,
        _mutate: MutateFn,
    ) -> Result<DynamicObject, Status> {
        Err(self.disabled())
    }

    async fn delete(&self, _name: &str, _namespace: Option<&str>) -> Result<DynamicObject, Status> {
        Err(self.disabled())
    }

    fn subscribe(&self, _listener: Arc<dyn ChangeListener>) -> Result<Unsubscribe, Status> {
        Err(self.disabled())
    }
}
