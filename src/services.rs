pub mod backends;
pub mod base;
pub mod modules;
pub mod resources;
