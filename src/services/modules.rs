pub mod stand_in;
#[cfg(test)]
mod tests;

use crate::services::base::resource_service::ResourceService;
use crate::services::base::status::Status;
use crate::services::base::types::{ResourceKind, ResourceKindSpec};
use crate::services::modules::stand_in::DisabledResourceService;
use crate::services::resources::factory::{ServiceFactory, ServiceHandle};
use log::info;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

type ServiceMap = HashMap<ResourceKind, Arc<dyn ResourceService>>;

enum ModuleState {
    Disabled,
    Enabled,
}

/// Called after a disable with the error the stand-ins now return.
pub type OnDisable = Box<dyn Fn(&Status) + Send + Sync>;

/// A named, independently toggleable bundle of resource services.
///
/// The current service map sits behind a single atomically swapped `Arc`, so
/// a caller never observes a torn mix of live and stand-in services. Service
/// references already held by in-flight callers are not retracted by a
/// disable; they keep working against their captured implementation.
pub struct Module {
    name: String,
    kinds: Vec<ResourceKindSpec>,
    factory: Arc<ServiceFactory>,
    disabled_message: String,
    lifecycle: tokio::sync::Mutex<ModuleState>,
    services: RwLock<Arc<ServiceMap>>,
    on_disable: Option<OnDisable>,
}

impl Module {
    /// A new module starts disabled: every declared kind answers with the
    /// fixed disabled error until the first successful enable.
    pub fn new(
        name: &str,
        kinds: Vec<ResourceKindSpec>,
        factory: Arc<ServiceFactory>,
        disabled_message: &str,
    ) -> Self {
        let stand_ins = Self::stand_ins(&kinds, disabled_message);
        Module {
            name: name.to_string(),
            kinds,
            factory,
            disabled_message: disabled_message.to_string(),
            lifecycle: tokio::sync::Mutex::new(ModuleState::Disabled),
            services: RwLock::new(Arc::new(stand_ins)),
            on_disable: None,
        }
    }

    pub fn with_on_disable(mut self, on_disable: OnDisable) -> Self {
        self.on_disable = Some(on_disable);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn is_enabled(&self) -> bool {
        matches!(*self.lifecycle.lock().await, ModuleState::Enabled)
    }

    /// Builds every declared service before publishing anything: if any
    /// construction fails the module keeps its previous state untouched.
    /// Enabling an already enabled module re-runs construction and replaces
    /// the service set.
    pub async fn enable(&self) -> Result<(), Status> {
        let mut state = self.lifecycle.lock().await;

        let mut built: Vec<ServiceHandle> = Vec::with_capacity(self.kinds.len());
        for spec in &self.kinds {
            built.push(self.factory.build(spec).await?);
        }

        let mut services: ServiceMap = HashMap::with_capacity(built.len());
        for handle in built {
            let service = self.factory.install(handle);
            services.insert(service.kind().clone(), service);
        }
        *self.services.write() = Arc::new(services);
        *state = ModuleState::Enabled;
        info!("Module {} enabled", self.name);
        Ok(())
    }

    /// Publishes the stand-in map, stops the declared kinds' watches and runs
    /// the cleanup callback. Disabling a disabled module is a no-op.
    pub async fn disable(&self) -> Result<(), Status> {
        let mut state = self.lifecycle.lock().await;
        if matches!(*state, ModuleState::Disabled) {
            return Ok(());
        }

        *self.services.write() = Arc::new(Self::stand_ins(&self.kinds, &self.disabled_message));
        for spec in &self.kinds {
            self.factory.remove(&spec.kind);
        }
        if let Some(on_disable) = &self.on_disable {
            on_disable(&Status::Disabled(self.disabled_message.clone()));
        }
        *state = ModuleState::Disabled;
        info!("Module {} disabled", self.name);
        Ok(())
    }

    /// Returns the stand-in when disabled; an undeclared kind is an error.
    pub fn service(&self, kind: &ResourceKind) -> Result<Arc<dyn ResourceService>, Status> {
        self.services.read().get(kind).cloned().ok_or_else(|| {
            Status::Internal(anyhow::anyhow!(
                "kind {} is not declared by module {}",
                kind,
                self.name
            ))
        })
    }

    fn stand_ins(kinds: &[ResourceKindSpec], message: &str) -> ServiceMap {
        kinds
            .iter()
            .map(|spec| {
                let stand_in: Arc<dyn ResourceService> =
                    Arc::new(DisabledResourceService::new(spec.kind.clone(), message));
                (spec.kind.clone(), stand_in)
            })
            .collect()
    }
}
