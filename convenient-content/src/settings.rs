//! Runtime settings of the content resolver.

use crate::error::SettingsError;
use crate::labels::LabelSelection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Label filter as written in a settings file: a comma-separated string or
/// a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectedLabels {
    /// `"eln,eln-extras"`
    Joined(String),
    /// `["eln", "eln-extras"]`
    List(Vec<String>),
}

impl SelectedLabels {
    /// Turn the raw filter into a selection.
    #[must_use]
    pub fn to_selection(&self) -> LabelSelection {
        match self {
            Self::Joined(joined) => LabelSelection::parse(Some(joined)),
            Self::List(labels) => LabelSelection::from_labels(labels),
        }
    }
}

/// Settings consumed by the loader and the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory of configuration documents
    pub configs: PathBuf,
    /// Directory for generated output
    pub output: PathBuf,
    /// Reuse cached repository data between runs
    pub use_cache: bool,
    /// Development mode: smaller buildroots, faster runs
    pub dev_buildroot: bool,
    /// DNF cache directory to use instead of the default
    pub dnf_cache_dir_override: Option<PathBuf>,
    /// Maximum parallel resolutions
    pub parallel_max: usize,
    /// Maximum concurrent subprocesses
    pub max_subprocesses: usize,
    /// Cache file for dependencies recovered from root logs
    pub root_log_deps_cache_path: PathBuf,
    /// Label filter, absent for no filtering
    pub selected_labels: Option<SelectedLabels>,
    /// Architectures documents may use
    pub allowed_arches: BTreeSet<String>,
    /// Packages never attempted during resolution
    pub weird_packages_that_can_not_be_installed: BTreeSet<String>,
    /// Reject the whole load on any invalid document
    pub strict: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            configs: PathBuf::from("configs"),
            output: PathBuf::from("output"),
            use_cache: false,
            dev_buildroot: false,
            dnf_cache_dir_override: None,
            parallel_max: 1,
            max_subprocesses: 10,
            root_log_deps_cache_path: PathBuf::from("cache_root_log_deps.json"),
            selected_labels: None,
            allowed_arches: ["aarch64", "ppc64le", "s390x", "x86_64"]
                .into_iter()
                .map(String::from)
                .collect(),
            weird_packages_that_can_not_be_installed: BTreeSet::from(["glibc32".to_string()]),
            strict: false,
        }
    }
}

impl Settings {
    /// Default settings reading documents from `configs`.
    #[must_use]
    pub fn new(configs: impl Into<PathBuf>) -> Self {
        Self {
            configs: configs.into(),
            ..Self::default()
        }
    }

    /// Set the label filter from a comma-separated string.
    #[must_use]
    pub fn with_labels(mut self, labels: impl Into<String>) -> Self {
        self.selected_labels = Some(SelectedLabels::Joined(labels.into()));
        self
    }

    /// Restrict the allowed architectures.
    #[must_use]
    pub fn with_allowed_arches<I, S>(mut self, arches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_arches = arches.into_iter().map(Into::into).collect();
        self
    }

    /// Toggle strict loading.
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Read settings from a YAML file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Unreadable` if the file cannot be read or
    /// parsed, or any validation error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SettingsError::Unreadable(path.to_path_buf(), e.to_string()))?;
        let settings: Self = serde_yaml::from_str(&content)
            .map_err(|e| SettingsError::Unreadable(path.to_path_buf(), e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if no architecture is allowed or the configs
    /// directory is empty.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.allowed_arches.is_empty() {
            return Err(SettingsError::NoAllowedArches);
        }
        if self.configs.as_os_str().is_empty() {
            return Err(SettingsError::NoConfigsDirectory);
        }
        Ok(())
    }

    /// The label selection these settings ask for.
    #[must_use]
    pub fn label_selection(&self) -> LabelSelection {
        self.selected_labels
            .as_ref()
            .map_or(LabelSelection::All, SelectedLabels::to_selection)
    }

    /// Whether documents may use this architecture.
    #[must_use]
    pub fn is_allowed_arch(&self, arch: &str) -> bool {
        self.allowed_arches.contains(arch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert!(settings.is_allowed_arch("s390x"));
        assert!(!settings.is_allowed_arch("i686"));
        assert_eq!(settings.label_selection(), LabelSelection::All);
    }

    #[test]
    fn test_empty_arches_rejected() {
        let settings = Settings::new("configs").with_allowed_arches(Vec::<String>::new());
        assert_eq!(settings.validate(), Err(SettingsError::NoAllowedArches));
    }

    #[test]
    fn test_selected_labels_forms() {
        let joined = Settings::new("c").with_labels("eln, eln-extras");
        let mut listed = Settings::new("c");
        listed.selected_labels = Some(SelectedLabels::List(vec![
            "eln".to_string(),
            "eln-extras".to_string(),
        ]));
        assert_eq!(joined.label_selection(), listed.label_selection());
    }

    #[test]
    fn test_load_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "configs: test_configs\nselected_labels: eln\nallowed_arches: [x86_64]\nstrict: true"
        )
        .unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.configs, PathBuf::from("test_configs"));
        assert!(settings.strict);
        assert_eq!(settings.allowed_arches.len(), 1);
        assert_eq!(settings.max_subprocesses, 10);
        assert_eq!(
            settings.label_selection(),
            LabelSelection::parse(Some("eln"))
        );
    }

    #[test]
    fn test_load_rejects_empty_arches() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "allowed_arches: []").unwrap();
        assert_eq!(
            Settings::load(file.path()),
            Err(SettingsError::NoAllowedArches)
        );
    }
}
