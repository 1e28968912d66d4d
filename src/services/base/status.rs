pub mod object_details;

use crate::services::base::status::object_details::ObjectDetails;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// The error type shared by every resource service operation.
/// Variants map one-to-one onto the failure modes the query layer can act on.
#[derive(Debug)]
pub enum Status {
    NotFound(ObjectDetails),
    AlreadyExists(ObjectDetails),
    Conflict,
    ConversionError(anyhow::Error),
    Internal(anyhow::Error),
    Disabled(String),
    Timeout(String),
}

impl Status {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Status::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Status::AlreadyExists(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Status::Conflict)
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Status::Disabled(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Status::Timeout(_))
    }
}

impl From<anyhow::Error> for Status {
    fn from(error: anyhow::Error) -> Self {
        Status::ConversionError(error)
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::NotFound(details) => write!(f, "Resource not found: {}", details),
            Status::AlreadyExists(details) => write!(f, "Resource already exists: {}", details),
            Status::Conflict => write!(f, "Resource already modified"),
            Status::ConversionError(cause) => write!(f, "Conversion error occurred: {}", cause),
            Status::Internal(cause) => write!(f, "An error occurred: {}", cause),
            Status::Disabled(message) => write!(f, "{}", message),
            Status::Timeout(message) => write!(f, "Operation timed out: {}", message),
        }
    }
}

impl Error for Status {}
