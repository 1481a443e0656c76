//! Label-filtered configuration resolver for package content definitions.
//!
//! A configs directory describes repositories, environments, workloads,
//! views and their supporting documents. Entities are tagged with labels;
//! resolving a label selection returns the entities carrying one of the
//! labels together with everything they depend on.
//!
//! # Features
//!
//! - YAML and JSON document loading with per-document error isolation
//! - Immutable snapshot with a precomputed retention graph
//! - Dependency closure over id references, label documents, unwanted
//!   lists and buildroot data
//! - Deterministic, fixed-shape output
//!
//! # Example
//!
//! ```
//! use convenient_content::{ConfigManager, EntityStore, LabelSelection, Settings};
//! use convenient_content::entity::{Env, Repo, View};
//!
//! let mut repo = Repo::new("repo-eln");
//! repo.labels.insert("eln".to_string());
//! let mut env = Env::new("env-eln");
//! env.repositories.push("repo-eln".to_string());
//! let mut view = View::compose("view-eln", "repo-eln");
//! view.envs.push("env-eln".to_string());
//! view.labels.insert("eln".to_string());
//!
//! let store = EntityStore::builder().repo(repo).env(env).view(view).build();
//! let manager = ConfigManager::from_store(Settings::default(), store);
//!
//! let configs = manager.get_configs_for(&LabelSelection::parse(Some("eln"))).unwrap();
//! assert_eq!(configs.envs.len(), 1);
//! assert!(manager.get_configs_for(&LabelSelection::parse(Some("other"))).unwrap().is_empty());
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(unused_results)]

pub mod assembler;
pub mod closure;
pub mod config_manager;
pub mod documents;
pub mod entity;
pub mod error;
pub mod graph;
pub mod labels;
pub mod loader;
pub mod relations;
pub mod settings;
pub mod store;

pub use assembler::{Configs, ConfigsSummary, assemble};
pub use closure::{RetainedIds, close};
pub use config_manager::ConfigManager;
pub use entity::{EntityKind, EntityRef};
pub use error::{ConfigError, ConfigIntegrityError, ContentError, LoadError, SettingsError};
pub use labels::LabelSelection;
pub use loader::{ConfigLoader, LoadReport, LoadedConfigs, load_configs};
pub use settings::{SelectedLabels, Settings};
pub use store::{EntityStore, EntityStoreBuilder};
