pub mod resource_service;
pub mod status;
pub mod types;
