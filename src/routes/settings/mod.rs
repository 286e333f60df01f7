mod handler;
mod model;
mod repository;
mod service;

pub use handler::{get_settings, update_settings};
pub use model::{FeatureSettings, SettingsPatch};
pub use repository::{PgSettingsRepository, SettingsRepository};
pub use service::SettingsService;

#[cfg(test)]
pub(crate) use repository::testing::MemorySettingsRepository;
