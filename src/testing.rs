pub mod memory_backend_context;

use crate::services::base::types::{NamedIndex, ResourceEvent, ResourceKind};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::DynamicObject;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;

pub fn project_kind() -> ResourceKind {
    ResourceKind::new("gateway.dev", "v1", "Project", "projects")
}

pub fn task_kind() -> ResourceKind {
    ResourceKind::new("gateway.dev", "v1", "Task", "tasks")
}

pub fn project_object(name: &str, namespace: &str) -> DynamicObject {
    let mut object = DynamicObject::new(name, &project_kind().api_resource()).within(namespace);
    object.data = json!({ "spec": { "displayName": name } });
    object
}

pub fn project_object_with_owner(name: &str, namespace: &str, owner: &str) -> DynamicObject {
    let mut object = project_object(name, namespace);
    object.data = json!({ "spec": { "displayName": name, "owner": owner } });
    object
}

/// Secondary index over `spec.owner`, used to exercise caller-defined indexes.
pub fn owner_index() -> NamedIndex {
    NamedIndex::new("owner", |object| {
        object.data["spec"]["owner"]
            .as_str()
            .map(str::to_string)
            .into_iter()
            .collect()
    })
}

/// Typed view of a project object, the way a resolver layer would see it.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectView {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ProjectViewSpec,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectViewSpec {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
}

impl ProjectView {
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata.namespace.as_deref()
    }
}

pub async fn next_event<T>(receiver: &mut mpsc::Receiver<ResourceEvent<T>>) -> ResourceEvent<T> {
    tokio::time::timeout(Duration::from_secs(5), receiver.recv())
        .await
        .expect("Timed out waiting for a resource event")
        .expect("Event channel closed while waiting for an event")
}

/// Asserts that no event shows up within a short grace period.
pub async fn expect_no_event<T>(receiver: &mut mpsc::Receiver<ResourceEvent<T>>) {
    let outcome = tokio::time::timeout(Duration::from_millis(200), receiver.recv()).await;
    assert!(outcome.is_err(), "Expected no event to be delivered");
}
