use super::*;
use crate::services::base::resource_service::ChangeListener;
use crate::services::base::types::{NAMESPACE_INDEX, ResourceEventType};
use crate::testing::{owner_index, project_object, project_object_with_owner};
use parking_lot::Mutex;

fn cache_with_namespace_index() -> (Arc<ResourceCache>, Arc<ChangeNotifier>) {
    let notifier = Arc::new(ChangeNotifier::new());
    let cache = Arc::new(ResourceCache::new(notifier.clone()));
    cache.register_index(NamedIndex::namespace());
    (cache, notifier)
}

#[test]
fn test_apply_then_get() {
    let (cache, _) = cache_with_namespace_index();

    cache.apply(project_object("alpha", "default"));

    let key = ObjectKey::new("alpha", Some("default"));
    let object = cache.get_by_key(&key).expect("Object should be cached");
    assert_eq!(object.metadata.name.as_deref(), Some("alpha"));
}

#[test]
fn test_get_missing_is_not_found() {
    let (cache, _) = cache_with_namespace_index();

    let result = cache.get_by_key(&ObjectKey::new("missing", Some("default")));

    assert!(result.err().expect("Expected an error").is_not_found());
}

#[test]
fn test_list_by_namespace_index() {
    let (cache, _) = cache_with_namespace_index();
    cache.apply(project_object("alpha", "default"));
    cache.apply(project_object("beta", "default"));
    cache.apply(project_object("gamma", "other"));

    let default_members = cache
        .list_by_index(NAMESPACE_INDEX, "default")
        .expect("Index lookup should succeed");
    let other_members = cache
        .list_by_index(NAMESPACE_INDEX, "other")
        .expect("Index lookup should succeed");
    let empty = cache
        .list_by_index(NAMESPACE_INDEX, "nowhere")
        .expect("Index lookup should succeed");

    assert_eq!(default_members.len(), 2);
    assert_eq!(other_members.len(), 1);
    assert!(empty.is_empty());
}

#[test]
fn test_secondary_index_tracks_updates() {
    let (cache, _) = cache_with_namespace_index();
    cache.register_index(owner_index());

    cache.apply(project_object_with_owner("alpha", "default", "alice"));
    cache.apply(project_object_with_owner("alpha", "default", "bob"));

    let alice = cache.list_by_index("owner", "alice").expect("Index lookup should succeed");
    let bob = cache.list_by_index("owner", "bob").expect("Index lookup should succeed");
    assert!(alice.is_empty());
    assert_eq!(bob.len(), 1);
}

#[test]
fn test_delete_removes_object_and_index_entries() {
    let (cache, _) = cache_with_namespace_index();
    cache.apply(project_object("alpha", "default"));

    cache.delete(project_object("alpha", "default"));

    let key = ObjectKey::new("alpha", Some("default"));
    assert!(cache.get_by_key(&key).is_err());
    let members = cache
        .list_by_index(NAMESPACE_INDEX, "default")
        .expect("Index lookup should succeed");
    assert!(members.is_empty());
}

#[test]
fn test_retain_prunes_missing_objects() {
    let (cache, _) = cache_with_namespace_index();
    cache.apply(project_object("alpha", "default"));
    cache.apply(project_object("beta", "default"));

    let mut live = HashSet::new();
    live.insert(ObjectKey::new("alpha", Some("default")));
    cache.retain(&live);

    assert_eq!(cache.len(), 1);
    assert!(cache.get_by_key(&ObjectKey::new("alpha", Some("default"))).is_ok());
    assert!(cache.get_by_key(&ObjectKey::new("beta", Some("default"))).is_err());
}

#[test]
fn test_register_index_is_idempotent() {
    let (cache, _) = cache_with_namespace_index();
    cache.register_index(NamedIndex::namespace());
    cache.register_index(NamedIndex::namespace());

    cache.apply(project_object("alpha", "default"));

    let members = cache
        .list_by_index(NAMESPACE_INDEX, "default")
        .expect("Index lookup should succeed");
    assert_eq!(members.len(), 1);
}

#[test]
fn test_index_registered_after_start_is_ignored() {
    let (cache, _) = cache_with_namespace_index();
    cache.apply(project_object("alpha", "default"));

    cache.register_index(owner_index());

    let result = cache.list_by_index("owner", "alice");
    assert!(result.is_err());
}

#[test]
fn test_unknown_index_is_an_error() {
    let (cache, _) = cache_with_namespace_index();

    let result = cache.list_by_index("no-such-index", "key");

    assert!(result.is_err());
}

struct EventCounter {
    deliveries: std::sync::atomic::AtomicUsize,
}

impl ChangeListener for EventCounter {
    fn notify(&self, _event_type: ResourceEventType, _object: &DynamicObject) {
        self.deliveries.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

#[test]
fn test_resync_replay_of_unchanged_object_is_silent() {
    let (cache, notifier) = cache_with_namespace_index();
    let counter = Arc::new(EventCounter {
        deliveries: std::sync::atomic::AtomicUsize::new(0),
    });
    notifier.add_listener(counter.clone());

    let mut object = project_object("alpha", "default");
    object.metadata.resource_version = Some("7".to_string());
    cache.apply(object.clone());
    cache.apply(object.clone());
    assert_eq!(counter.deliveries.load(std::sync::atomic::Ordering::SeqCst), 1);

    // A record carrying a new version token is a real change.
    object.metadata.resource_version = Some("8".to_string());
    cache.apply(object);
    assert_eq!(counter.deliveries.load(std::sync::atomic::Ordering::SeqCst), 2);
}

/// Observes the cache from inside a notification callback.
struct CacheProbeListener {
    cache: Arc<ResourceCache>,
    observations: Mutex<Vec<bool>>,
}

impl ChangeListener for CacheProbeListener {
    fn notify(&self, event_type: ResourceEventType, object: &DynamicObject) {
        let key = ObjectKey::of(object).expect("Test objects always carry a name");
        let visible = self.cache.get_by_key(&key).is_ok();
        let consistent = match event_type {
            ResourceEventType::Added | ResourceEventType::Modified => visible,
            ResourceEventType::Deleted => !visible,
        };
        self.observations.lock().push(consistent);
    }
}

#[test]
fn test_cache_is_updated_before_notification() {
    let (cache, notifier) = cache_with_namespace_index();
    let probe = Arc::new(CacheProbeListener {
        cache: cache.clone(),
        observations: Mutex::new(Vec::new()),
    });
    notifier.add_listener(probe.clone());

    cache.apply(project_object("alpha", "default"));
    cache.apply(project_object("alpha", "default"));
    cache.delete(project_object("alpha", "default"));

    let observations = probe.observations.lock();
    assert_eq!(observations.len(), 3);
    assert!(observations.iter().all(|consistent| *consistent));
}
