
use crate::services::base::resource_service::{ChangeListener, ResourceService, Unsubscribe};
use crate::services::base::status::Status;
use crate::services::base::types::{ResourceEvent, ResourceEventType};
use crate::services::resources::convert::to_typed;
use kube::api::DynamicObject;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Adapts raw change records into typed events for a single subscriber.
///
/// Every delivered event gets a freshly converted value, so two deliveries in
/// flight can never alias each other's data. A record that fails conversion is
/// logged and dropped rather than aborting the watch path. The channel is
/// bounded and never blocks the notifier: when the subscriber falls behind the
/// newest event is dropped and counted.
pub struct TypedListener<T> {
    predicate: Box<dyn Fn(&T) -> bool + Send + Sync>,
    sender: mpsc::Sender<ResourceEvent<T>>,
    dropped: AtomicU64,
}

impl<T> TypedListener<T>
where
    T: DeserializeOwned + Send + 'static,
{
    pub fn channel<P>(capacity: usize, predicate: P) -> (Arc<Self>, mpsc::Receiver<ResourceEvent<T>>)
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let (sender, receiver) = mpsc::channel(capacity);
        let listener = Arc::new(TypedListener {
            predicate: Box::new(predicate),
            sender,
            dropped: AtomicU64::new(0),
        });
        (listener, receiver)
    }

    /// Number of events dropped because the subscriber stopped draining.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<T> ChangeListener for TypedListener<T>
where
    T: DeserializeOwned + Send + 'static,
{
    fn notify(&self, event_type: ResourceEventType, object: &DynamicObject) {
        let typed: T = match to_typed(object) {
            Ok(typed) => typed,
            Err(error) => {
                warn!("Dropping {} event that failed conversion: {}", event_type, error);
                return;
            }
        };
        if !(self.predicate)(&typed) {
            return;
        }
        match self.sender.try_send(ResourceEvent { event_type, object: typed }) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Subscriber channel full, dropping {} event", event_type);
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Subscriber channel closed, ignoring {} event", event_type);
            }
        }
    }
}

/// Typed convenience over the object-safe subscribe operation.
pub trait SubscribeExt {
    fn subscribe_filtered<T, P>(
        &self,
        capacity: usize,
        predicate: P,
    ) -> Result<(mpsc::Receiver<ResourceEvent<T>>, Unsubscribe), Status>
    where
        T: DeserializeOwned + Send + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static;
}

impl<S> SubscribeExt for S
where
    S: ResourceService + ?Sized,
{
    fn subscribe_filtered<T, P>(
        &self,
        capacity: usize,
        predicate: P,
    ) -> Result<(mpsc::Receiver<ResourceEvent<T>>, Unsubscribe), Status>
    where
        T: DeserializeOwned + Send + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let (listener, receiver) = TypedListener::channel(capacity, predicate);
        let unsubscribe = self.subscribe(listener)?;
        Ok((receiver, unsubscribe))
    }
}
