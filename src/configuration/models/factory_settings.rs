use crate::services::resources::factory::FactoryConfig;
use duration_string::DurationString;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct FactorySettings {
    pub ready_timeout: DurationString,
}

impl Into<FactoryConfig> for &FactorySettings {
    fn into(self) -> FactoryConfig {
        FactoryConfig {
            ready_timeout: self.ready_timeout.into(),
        }
    }
}
