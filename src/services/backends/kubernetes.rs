use crate::services::backends::{BackingStoreClient, WatchStream};
use crate::services::base::status::Status;
use crate::services::base::status::object_details::ObjectDetails;
use crate::services::base::types::ResourceKind;
use async_trait::async_trait;
use futures::StreamExt;
use kube::api::{DeleteParams, DynamicObject, ListParams, PostParams};
use kube::core::ErrorResponse;
use kube::runtime::{WatchStreamExt, watcher};
use kube::{Api, Client};
use log::debug;

/// Backing store client over a live Kubernetes API server, using the dynamic
/// object API so one client serves every resource kind.
pub struct KubernetesBackingStore {
    client: Client,
}

impl KubernetesBackingStore {
    pub fn new(client: Client) -> Self {
        KubernetesBackingStore { client }
    }

    pub fn from_config(config: kube::Config) -> anyhow::Result<Self> {
        let client = Client::try_from(config)?;
        Ok(KubernetesBackingStore { client })
    }

    fn api(&self, kind: &ResourceKind, namespace: Option<&str>) -> Api<DynamicObject> {
        let resource = kind.api_resource();
        match namespace {
            Some(namespace) => Api::namespaced_with(self.client.clone(), namespace, &resource),
            None => Api::all_with(self.client.clone(), &resource),
        }
    }
}

fn status_for(error: kube::Error, details: ObjectDetails) -> Status {
    match error {
        kube::Error::Api(ErrorResponse { code: 404, .. }) => Status::NotFound(details),
        kube::Error::Api(ref response @ ErrorResponse { code: 409, .. })
            if response.reason == "AlreadyExists" =>
        {
            Status::AlreadyExists(details)
        }
        kube::Error::Api(ErrorResponse { code: 409, .. }) => Status::Conflict,
        other => Status::Internal(other.into()),
    }
}

fn name_of(object: &DynamicObject) -> Result<String, Status> {
    object
        .metadata
        .name
        .clone()
        .ok_or_else(|| Status::ConversionError(anyhow::anyhow!("object name is required")))
}

#[async_trait]
impl BackingStoreClient for KubernetesBackingStore {
    async fn list(
        &self,
        kind: &ResourceKind,
        namespace: Option<&str>,
    ) -> Result<Vec<DynamicObject>, Status> {
        let api = self.api(kind, namespace);
        let objects = api
            .list(&ListParams::default())
            .await
            .map_err(|e| Status::Internal(e.into()))?;
        Ok(objects.items)
    }

    async fn get(
        &self,
        kind: &ResourceKind,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<DynamicObject, Status> {
        let api = self.api(kind, namespace);
        api.get(name)
            .await
            .map_err(|e| status_for(e, ObjectDetails::new(name.to_string(), namespace.map(str::to_string))))
    }

    async fn create(
        &self,
        kind: &ResourceKind,
        object: DynamicObject,
    ) -> Result<DynamicObject, Status> {
        let name = name_of(&object)?;
        let namespace = object.metadata.namespace.clone();
        let api = self.api(kind, namespace.as_deref());
        debug!("Creating {} resource: {}", kind, name);
        api.create(&PostParams::default(), &object)
            .await
            .map_err(|e| status_for(e, ObjectDetails::new(name, namespace)))
    }

    async fn update(
        &self,
        kind: &ResourceKind,
        object: DynamicObject,
    ) -> Result<DynamicObject, Status> {
        let name = name_of(&object)?;
        let namespace = object.metadata.namespace.clone();
        let api = self.api(kind, namespace.as_deref());
        debug!("Replacing {} resource: {}", kind, name);
        api.replace(&name, &PostParams::default(), &object)
            .await
            .map_err(|e| status_for(e, ObjectDetails::new(name, namespace)))
    }

    async fn delete(
        &self,
        kind: &ResourceKind,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<(), Status> {
        let api = self.api(kind, namespace);
        debug!("Deleting {} resource: {}", kind, name);
        let _ = api.delete(name, &DeleteParams::default()).await.map_err(|e| {
            status_for(e, ObjectDetails::new(name.to_string(), namespace.map(str::to_string)))
        })?;
        Ok(())
    }

    fn watch(&self, kind: &ResourceKind) -> WatchStream {
        let api = self.api(kind, None);
        watcher(api, watcher::Config::default())
            .default_backoff()
            .map(|event| event.map_err(|e| Status::Internal(e.into())))
            .boxed()
    }
}
