use crate::error::SiteError;
use crate::models::settings::{Settings, SettingsPatch};

/// The shared settings record, wherever it lives.
///
/// `get_settings` returns `Ok(None)` when no record exists yet. Failures of
/// the read are `FetchFailure`, failures of the writes `PersistenceFailure`.
pub trait SettingsRemote: Send + Sync {
    fn get_settings(&self) -> Result<Option<Settings>, SiteError>;
    fn create_settings(&self, patch: &SettingsPatch) -> Result<Settings, SiteError>;
    fn update_settings(&self, id: i64, patch: &SettingsPatch) -> Result<Settings, SiteError>;
}

impl SettingsRemote for crate::db::DbPool {
    fn get_settings(&self) -> Result<Option<Settings>, SiteError> {
        Settings::current(self).map_err(SiteError::FetchFailure)
    }

    fn create_settings(&self, patch: &SettingsPatch) -> Result<Settings, SiteError> {
        Settings::create(self, patch).map_err(SiteError::PersistenceFailure)
    }

    fn update_settings(&self, id: i64, patch: &SettingsPatch) -> Result<Settings, SiteError> {
        Settings::update(self, id, patch)
            .map_err(SiteError::PersistenceFailure)?
            .ok_or(SiteError::NotFound)
    }
}
