pub mod cache;
pub mod convert;
pub mod factory;
pub mod listener;
pub mod notifier;
pub mod service;
