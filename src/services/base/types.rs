use kube::api::{ApiResource, DynamicObject, GroupVersionKind};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Identifies one category of objects in the backing store, e.g. a single CRD type.
/// Unique per factory instance; used as the map key for factory and module maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKind {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub plural: String,
}

impl ResourceKind {
    pub fn new(group: &str, version: &str, kind: &str, plural: &str) -> Self {
        ResourceKind {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
            plural: plural.to_string(),
        }
    }

    pub fn api_resource(&self) -> ApiResource {
        let gvk = GroupVersionKind::gvk(&self.group, &self.version, &self.kind);
        ApiResource::from_gvk_with_plural(&gvk, &self.plural)
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.group, self.version, self.plural)
    }
}

/// Primary cache key for a single object: namespace plus name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectKey {
    pub fn new(name: &str, namespace: Option<&str>) -> Self {
        ObjectKey {
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
        }
    }

    /// Objects without a name cannot be keyed and are treated as malformed.
    pub fn of(object: &DynamicObject) -> Option<Self> {
        let name = object.metadata.name.clone()?;
        Some(ObjectKey {
            namespace: object.metadata.namespace.clone(),
            name,
        })
    }
}

impl Display for ObjectKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let namespace = self.namespace.as_deref().unwrap_or("-");
        write!(f, "{}/{}", namespace, self.name)
    }
}

/// Derives the set of secondary lookup keys an object belongs to.
pub type IndexFn = Arc<dyn Fn(&DynamicObject) -> Vec<String> + Send + Sync>;

/// Name of the built-in index every cache maintains.
pub static NAMESPACE_INDEX: &str = "namespace";

#[derive(Clone)]
pub struct NamedIndex {
    pub name: String,
    pub function: IndexFn,
}

impl NamedIndex {
    pub fn new<F>(name: &str, function: F) -> Self
    where
        F: Fn(&DynamicObject) -> Vec<String> + Send + Sync + 'static,
    {
        NamedIndex {
            name: name.to_string(),
            function: Arc::new(function),
        }
    }

    pub fn namespace() -> Self {
        NamedIndex::new(NAMESPACE_INDEX, |object| {
            object.metadata.namespace.clone().into_iter().collect()
        })
    }
}

/// A resource kind together with the secondary indexes its cache should maintain.
#[derive(Clone)]
pub struct ResourceKindSpec {
    pub kind: ResourceKind,
    pub indexes: Vec<NamedIndex>,
}

impl ResourceKindSpec {
    pub fn new(kind: ResourceKind) -> Self {
        ResourceKindSpec {
            kind,
            indexes: Vec::new(),
        }
    }

    pub fn with_index(mut self, index: NamedIndex) -> Self {
        self.indexes.push(index);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceEventType {
    Added,
    Modified,
    Deleted,
}

impl Display for ResourceEventType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceEventType::Added => write!(f, "added"),
            ResourceEventType::Modified => write!(f, "modified"),
            ResourceEventType::Deleted => write!(f, "deleted"),
        }
    }
}

/// A typed change event delivered to one subscriber.
#[derive(Debug, Clone)]
pub struct ResourceEvent<T> {
    pub event_type: ResourceEventType,
    pub object: T,
}
