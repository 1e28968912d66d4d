pub mod factory_settings;
