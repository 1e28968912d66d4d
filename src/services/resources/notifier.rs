
use crate::services::base::resource_service::ChangeListener;
use crate::services::base::types::ResourceEventType;
use kube::api::DynamicObject;
use parking_lot::RwLock;
use std::sync::Arc;

/// Registry of listeners for one resource kind. Delivery holds the read lock,
/// so concurrent deliveries proceed in parallel while a registry mutation is
/// exclusive and waits for in-flight deliveries, and vice versa.
pub struct ChangeNotifier {
    listeners: RwLock<Vec<Arc<dyn ChangeListener>>>,
}

fn same_listener(a: &Arc<dyn ChangeListener>, b: &Arc<dyn ChangeListener>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

impl ChangeNotifier {
    pub fn new() -> Self {
        ChangeNotifier {
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Duplicate registrations are permitted and independent.
    pub fn add_listener(&self, listener: Arc<dyn ChangeListener>) {
        self.listeners.write().push(listener);
    }

    /// Removes exactly one registration matching the listener's identity;
    /// removing a listener that is not registered is a no-op.
    pub fn remove_listener(&self, listener: &Arc<dyn ChangeListener>) {
        let mut listeners = self.listeners.write();
        if let Some(position) = listeners.iter().position(|l| same_listener(l, listener)) {
            listeners.remove(position);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    pub fn notify_add(&self, object: &DynamicObject) {
        self.deliver(ResourceEventType::Added, object);
    }

    pub fn notify_update(&self, _old: &DynamicObject, new: &DynamicObject) {
        self.deliver(ResourceEventType::Modified, new);
    }

    pub fn notify_delete(&self, old: &DynamicObject) {
        self.deliver(ResourceEventType::Deleted, old);
    }

    fn deliver(&self, event_type: ResourceEventType, object: &DynamicObject) {
        let listeners = self.listeners.read();
        for listener in listeners.iter() {
            listener.notify(event_type, object);
        }
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        ChangeNotifier::new()
    }
}
