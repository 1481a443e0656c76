//! Label-filtered access to a loaded configuration snapshot.

use crate::assembler::{Configs, assemble};
use crate::closure::close;
use crate::error::{ConfigIntegrityError, ContentError};
use crate::labels::LabelSelection;
use crate::loader::{LoadReport, load_configs};
use crate::settings::Settings;
use crate::store::EntityStore;
use tracing::info;

/// Owns a snapshot and answers label-filtered config queries against it.
///
/// The snapshot never changes after construction, so repeated calls with
/// the same selection return identical configs.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    settings: Settings,
    store: EntityStore,
    report: LoadReport,
}

impl ConfigManager {
    /// Load the configs directory named by the settings.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Settings` for invalid settings and
    /// `ContentError::Load` if the directory cannot be loaded.
    pub fn new(settings: Settings) -> Result<Self, ContentError> {
        settings.validate()?;
        let loaded = load_configs(&settings)?;
        Ok(Self {
            settings,
            store: loaded.store,
            report: loaded.report,
        })
    }

    /// Wrap an already built snapshot.
    #[must_use]
    pub fn from_store(settings: Settings, store: EntityStore) -> Self {
        Self {
            settings,
            store,
            report: LoadReport::default(),
        }
    }

    /// Settings the configs were loaded with.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The loaded snapshot.
    #[must_use]
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// What loading skipped or warned about.
    #[must_use]
    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    /// Configs for the label selection in the settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigIntegrityError` if a retained entity references an id
    /// missing from the snapshot.
    pub fn get_configs(&self) -> Result<Configs, ConfigIntegrityError> {
        self.get_configs_for(&self.settings.label_selection())
    }

    /// Configs for an explicit label selection.
    ///
    /// # Errors
    ///
    /// Returns `ConfigIntegrityError` if a retained entity references an id
    /// missing from the snapshot.
    pub fn get_configs_for(&self, selection: &LabelSelection) -> Result<Configs, ConfigIntegrityError> {
        let retained = close(&self.store, selection)?;
        let configs = assemble(&retained, &self.store);
        info!("Configs for labels {}: {}", selection, configs.summary());
        Ok(configs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityKind, Label, Repo, View};

    #[test]
    fn test_from_store_uses_settings_labels() {
        let mut repo = Repo::new("repo");
        let _ = repo.labels.insert("eln".to_string());
        let store = EntityStore::builder()
            .repo(repo)
            .repo(Repo::new("other"))
            .label(Label::new("eln"))
            .build();

        let manager = ConfigManager::from_store(Settings::new("unused").with_labels("eln"), store);
        let configs = manager.get_configs().unwrap();

        assert_eq!(configs.ids(EntityKind::Repo), vec!["repo"]);
        assert_eq!(configs.ids(EntityKind::Label), vec!["eln"]);

        let all = manager.get_configs_for(&LabelSelection::All).unwrap();
        assert_eq!(all.count(EntityKind::Repo), 2);
    }

    #[test]
    fn test_integrity_error_surfaces() {
        let store = EntityStore::builder()
            .view(View::compose("view", "missing"))
            .build();
        let manager = ConfigManager::from_store(Settings::default(), store);

        assert!(manager.get_configs().is_err());
    }

    #[test]
    fn test_invalid_settings() {
        let settings = Settings::new("configs").with_allowed_arches(Vec::<String>::new());
        assert!(matches!(
            ConfigManager::new(settings),
            Err(ContentError::Settings(_))
        ));
    }
}
