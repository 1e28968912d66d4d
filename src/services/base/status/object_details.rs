use crate::services::base::types::ObjectKey;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub struct ObjectDetails {
    pub name: String,
    pub namespace: Option<String>,
}

impl ObjectDetails {
    pub fn new(name: String, namespace: Option<String>) -> Self {
        ObjectDetails { name, namespace }
    }
}

impl Display for ObjectDetails {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let namespace = self.namespace.as_deref().unwrap_or("unknown");
        write!(f, "name: '{}', namespace: '{}'", self.name, namespace)
    }
}

impl From<&ObjectKey> for ObjectDetails {
    fn from(key: &ObjectKey) -> Self {
        ObjectDetails {
            name: key.name.clone(),
            namespace: key.namespace.clone(),
        }
    }
}
