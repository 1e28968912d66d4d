#[cfg(test)]
mod tests;

use crate::services::base::status::Status;
use kube::api::DynamicObject;
use serde::de::DeserializeOwned;

/// Maps a raw cached record onto the caller's typed view of it.
pub fn to_typed<T: DeserializeOwned>(object: &DynamicObject) -> Result<T, Status> {
    let value = serde_json::to_value(object)
        .map_err(|e| Status::ConversionError(anyhow::Error::from(e)))?;
    serde_json::from_value(value).map_err(|e| Status::ConversionError(anyhow::Error::from(e)))
}

/// Converts a whole snapshot, failing on the first record that does not fit
/// the requested type.
pub fn to_typed_list<'a, T, I>(objects: I) -> Result<Vec<T>, Status>
where
    T: DeserializeOwned,
    I: IntoIterator<Item = &'a DynamicObject>,
{
    objects.into_iter().map(to_typed).collect()
}
