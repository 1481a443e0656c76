//! Loading a configs directory into an [`EntityStore`].
//!
//! Every `.yaml` file is one configuration document and every `.json` file
//! one data document; the file name without extension is the entity id.
//! Loading runs in three passes:
//!
//! 1. parse each document on its own, skipping (or in strict mode
//!    collecting) the ones that fail
//! 2. cross-check explicit references, drop entities that point at missing
//!    ones and narrow view architectures to what their repository provides
//! 3. derive env and workload links from shared labels where a document
//!    does not list them, among the entities that survived
//!
//! The resulting store has no dangling references. A broken entity never
//! takes down the entities that are only linked to it through a label.

use crate::documents::{DocumentContext, DocumentType, parse_body};
use crate::entity::{
    Buildroot, BuildrootPkgRelation, Entity, EntityKind, EntityRef, Env, Label, Repo, Unwanted,
    View, Workload,
};
use crate::error::{ConfigError, LoadError};
use crate::settings::Settings;
use crate::store::EntityStore;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What happened while loading, besides the loaded entities.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Documents loaded into the snapshot
    pub documents: usize,
    /// Documents of a type the loader does not handle
    pub ignored: Vec<PathBuf>,
    /// Documents and entities that were excluded
    pub errors: Vec<ConfigError>,
    /// Non-fatal problems, such as unsupported architectures
    pub warnings: Vec<ConfigError>,
    /// SHA-256 of every loaded document, by file name
    pub checksums: BTreeMap<String, String>,
}

impl LoadReport {
    /// Whether loading excluded anything.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// A loaded snapshot and its load report.
#[derive(Debug, Clone)]
pub struct LoadedConfigs {
    /// Entities that passed validation
    pub store: EntityStore,
    /// What was excluded or warned about
    pub report: LoadReport,
}

/// Loads configuration documents according to [`Settings`].
#[derive(Debug, Clone, Copy)]
pub struct ConfigLoader<'a> {
    settings: &'a Settings,
}

impl<'a> ConfigLoader<'a> {
    /// Loader for the directory and rules in `settings`.
    #[must_use]
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Load the configs directory named by the settings.
    ///
    /// # Errors
    ///
    /// - `LoadError::Settings` if the settings are invalid
    /// - `LoadError::Directory` if the directory cannot be listed
    /// - `LoadError::Rejected` in strict mode, if any document or entity
    ///   had to be excluded
    pub fn load(&self) -> Result<LoadedConfigs, LoadError> {
        self.settings.validate()?;
        let directory = &self.settings.configs;
        info!("Loading configs from {}", directory.display());

        let mut pending = PendingConfigs::default();
        let mut report = LoadReport::default();

        for path in document_paths(directory)? {
            match self.load_document(&path, &mut pending, &mut report) {
                Ok(true) => report.documents += 1,
                Ok(false) => {
                    debug!("Ignoring {}: not a known document type", path.display());
                    report.ignored.push(path);
                }
                Err(error) => {
                    warn!("Excluding {}: {}", path.display(), error);
                    report.errors.push(error);
                }
            }
        }

        pending.validate(&self.settings.allowed_arches, &mut report);
        pending.link_by_labels();

        if self.settings.strict && report.has_errors() {
            return Err(LoadError::Rejected(report.errors));
        }

        let store = pending.into_store();
        info!(
            "Loaded {} repos, {} envs, {} workloads, {} views, {} unwanteds, {} buildroots, {} buildroot pkg relations",
            store.count(EntityKind::Repo),
            store.count(EntityKind::Env),
            store.count(EntityKind::Workload),
            store.count(EntityKind::View),
            store.count(EntityKind::Unwanted),
            store.count(EntityKind::Buildroot),
            store.count(EntityKind::BuildrootPkgRelation),
        );
        if report.has_errors() {
            warn!("{} config problems, affected files were excluded", report.errors.len());
        }

        Ok(LoadedConfigs { store, report })
    }

    /// Load one file. Returns `false` for documents of an unknown type.
    fn load_document(
        &self,
        path: &Path,
        pending: &mut PendingConfigs,
        report: &mut LoadReport,
    ) -> Result<bool, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e.to_string()))?;
        let document_id = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| ConfigError::IoError(path.to_path_buf(), "invalid file name".to_string()))?;

        let mut context = DocumentContext::new(document_id, &self.settings.allowed_arches);
        let loaded = if is_json(path) {
            load_json(path, &content, &mut context, pending)?
        } else {
            load_yaml(path, &content, &mut context, pending)?
        };

        report.warnings.append(&mut context.warnings);
        if loaded {
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let _ = report.checksums.insert(file_name, calculate_checksum(&content));
        }
        Ok(loaded)
    }
}

/// Load a configs directory with the given settings.
///
/// # Errors
///
/// See [`ConfigLoader::load`].
pub fn load_configs(settings: &Settings) -> Result<LoadedConfigs, LoadError> {
    ConfigLoader::new(settings).load()
}

/// Calculate SHA256 checksum of content
fn calculate_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("json")
}

/// All `.yaml` and `.json` files directly in the directory, sorted by name.
fn document_paths(directory: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let metadata = std::fs::metadata(directory)
        .map_err(|e| LoadError::Directory(directory.to_path_buf(), e.to_string()))?;
    if !metadata.is_dir() {
        return Err(LoadError::Directory(
            directory.to_path_buf(),
            "not a directory".to_string(),
        ));
    }

    let mut paths = Vec::new();
    for entry in walkdir::WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry =
            entry.map_err(|e| LoadError::Directory(directory.to_path_buf(), e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let extension = entry.path().extension().and_then(|s| s.to_str());
        if matches!(extension, Some("yaml" | "json")) {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

fn load_yaml(
    path: &Path,
    content: &str,
    context: &mut DocumentContext<'_>,
    pending: &mut PendingConfigs,
) -> Result<bool, ConfigError> {
    let document: serde_yaml::Value = serde_yaml::from_str(content)
        .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;

    let kind = document.get("document").and_then(serde_yaml::Value::as_str);
    let version = document.get("version").and_then(serde_yaml::Value::as_u64);
    let (Some(kind), Some(version)) = (kind, version) else {
        return Err(ConfigError::MissingHeader(path.to_path_buf()));
    };
    let Some(document_type) = DocumentType::from_yaml(kind) else {
        return Ok(false);
    };
    if !document_type.supports_version(version) {
        return Err(ConfigError::UnsupportedVersion {
            path: path.to_path_buf(),
            document: kind.to_string(),
            version,
        });
    }

    let body = document
        .get("data")
        .cloned()
        .unwrap_or(serde_yaml::Value::Null);

    match document_type {
        DocumentType::Repository => {
            let repo = context.repo(path, parse_body(path, body)?)?;
            pending.insert_repo(repo);
        }
        DocumentType::Environment => {
            let env = context.env(parse_body(path, body)?);
            pending.insert_env(env);
        }
        DocumentType::Workload => {
            let (workload, explicit_envs) = context.workload(parse_body(path, body)?);
            pending.insert_workload(workload, explicit_envs);
        }
        DocumentType::Label => {
            let label = context.label(parse_body(path, body)?);
            pending.insert_label(label);
        }
        DocumentType::ComposeView => {
            let (view, explicit) = context.compose_view(parse_body(path, body)?);
            pending.insert_view(view, explicit);
        }
        DocumentType::AddonView => {
            let (view, explicit) = context.addon_view(parse_body(path, body)?);
            pending.insert_view(view, explicit);
        }
        DocumentType::Unwanted => {
            let unwanted = context.unwanted(parse_body(path, body)?);
            pending.insert_unwanted(unwanted);
        }
        DocumentType::Buildroot => {
            let buildroot = context.buildroot(parse_body(path, body)?);
            pending.insert_buildroot(buildroot);
        }
        DocumentType::BuildrootBinaryRelations => return Ok(false),
    }
    Ok(true)
}

fn load_json(
    path: &Path,
    content: &str,
    context: &mut DocumentContext<'_>,
    pending: &mut PendingConfigs,
) -> Result<bool, ConfigError> {
    let document: serde_json::Value = serde_json::from_str(content)
        .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;

    let kind = document.get("document_type").and_then(serde_json::Value::as_str);
    let has_version = document.get("version").is_some();
    let (Some(kind), true) = (kind, has_version) else {
        return Err(ConfigError::MissingHeader(path.to_path_buf()));
    };
    if DocumentType::from_json(kind) != Some(DocumentType::BuildrootBinaryRelations) {
        return Ok(false);
    }

    let body = document
        .get("data")
        .cloned()
        .unwrap_or(serde_json::Value::Null);
    let relation = context.relations(parse_body(path, body)?)?;
    pending.insert_relation(relation);
    Ok(true)
}

/// Entities parsed so far, before cross-document validation.
#[derive(Debug, Default)]
struct PendingConfigs {
    repos: BTreeMap<String, Repo>,
    envs: BTreeMap<String, Env>,
    workloads: BTreeMap<String, Workload>,
    views: BTreeMap<String, View>,
    labels: BTreeMap<String, Label>,
    unwanteds: BTreeMap<String, Unwanted>,
    buildroots: BTreeMap<String, Buildroot>,
    buildroot_pkg_relations: BTreeMap<String, BuildrootPkgRelation>,
    /// Workloads whose target envs come from shared labels
    label_linked_workloads: BTreeSet<String>,
    /// Views whose envs and workloads come from shared labels
    label_linked_views: BTreeSet<String>,
}

impl PendingConfigs {
    fn insert_repo(&mut self, repo: Repo) {
        let _ = self.repos.insert(repo.id.clone(), repo);
    }

    fn insert_env(&mut self, env: Env) {
        let _ = self.envs.insert(env.id.clone(), env);
    }

    fn insert_workload(&mut self, workload: Workload, explicit_envs: bool) {
        if !explicit_envs {
            let _ = self.label_linked_workloads.insert(workload.id.clone());
        }
        let _ = self.workloads.insert(workload.id.clone(), workload);
    }

    fn insert_label(&mut self, label: Label) {
        let _ = self.labels.insert(label.id.clone(), label);
    }

    fn insert_view(&mut self, view: View, explicit: bool) {
        if !explicit {
            let _ = self.label_linked_views.insert(view.id.clone());
        }
        let _ = self.views.insert(view.id.clone(), view);
    }

    fn insert_unwanted(&mut self, unwanted: Unwanted) {
        let _ = self.unwanteds.insert(unwanted.id.clone(), unwanted);
    }

    fn insert_buildroot(&mut self, buildroot: Buildroot) {
        let _ = self.buildroots.insert(buildroot.id.clone(), buildroot);
    }

    fn insert_relation(&mut self, relation: BuildrootPkgRelation) {
        let _ = self
            .buildroot_pkg_relations
            .insert(relation.id.clone(), relation);
    }

    /// Fill in links that documents leave to shared labels: a workload goes
    /// into every env sharing a label, a view gets every env and workload
    /// sharing a label. Runs after pruning, so every derived link resolves.
    fn link_by_labels(&mut self) {
        for workload_id in &self.label_linked_workloads {
            if let Some(workload) = self.workloads.get_mut(workload_id) {
                workload.envs = sharing_labels(&self.envs, &workload.labels);
            }
        }
        for view_id in &self.label_linked_views {
            if let Some(view) = self.views.get_mut(view_id) {
                view.envs = sharing_labels(&self.envs, &view.labels);
                view.workloads = sharing_labels(&self.workloads, &view.labels);
            }
        }
    }

    fn validate(&mut self, allowed_arches: &BTreeSet<String>, report: &mut LoadReport) {
        // Compose views first: an addon on a dropped compose view is dropped too
        let missing_repo: Vec<(String, String)> = self
            .views
            .values()
            .filter(|view| !view.is_addon())
            .filter_map(|view| {
                let repo_id = view.repository.clone().unwrap_or_default();
                (!self.repos.contains_key(&repo_id)).then(|| (view.id.clone(), repo_id))
            })
            .collect();
        for (view_id, repo_id) in missing_repo {
            self.remove_view(&view_id, EntityRef::new(EntityKind::Repo, repo_id), report);
        }

        for view in self.views.values_mut().filter(|view| !view.is_addon()) {
            let repo_arches = view
                .repository
                .as_ref()
                .and_then(|repo_id| self.repos.get(repo_id))
                .map(|repo| &repo.architectures);
            let wanted = if view.architectures.is_empty() {
                allowed_arches.clone()
            } else {
                std::mem::take(&mut view.architectures)
            };
            view.architectures = match repo_arches {
                Some(repo_arches) => wanted.intersection(repo_arches).cloned().collect(),
                None => BTreeSet::new(),
            };
        }

        let addon_ids: Vec<String> = self
            .views
            .values()
            .filter(|view| view.is_addon())
            .map(|view| view.id.clone())
            .collect();
        for addon_id in addon_ids {
            let Some(base_id) = self
                .views
                .get(&addon_id)
                .and_then(View::base_view_id)
                .map(str::to_string)
            else {
                continue;
            };
            let base = self
                .views
                .get(&base_id)
                .map(|base| (base.is_addon(), base.repository.clone(), base.architectures.clone()));
            match base {
                None => {
                    self.remove_view(&addon_id, EntityRef::new(EntityKind::View, base_id), report);
                }
                Some((true, _, _)) => {
                    let error = ConfigError::AddonOfAddon {
                        view: EntityRef::new(EntityKind::View, &addon_id),
                        base: EntityRef::new(EntityKind::View, base_id),
                    };
                    warn!("Removing view: {}", error);
                    report.errors.push(error);
                    let _ = self.views.remove(&addon_id);
                }
                Some((false, repository, architectures)) => {
                    if let Some(addon) = self.views.get_mut(&addon_id) {
                        addon.repository = repository;
                        addon.architectures = architectures;
                    }
                }
            }
        }

        self.prune_dangling(report);
    }

    /// Drop envs, workloads and views referencing missing entities until
    /// nothing changes. Dropping one entity can strand others.
    fn prune_dangling(&mut self, report: &mut LoadReport) {
        loop {
            let mut dangling: Vec<(EntityRef, EntityRef)> = Vec::new();
            dangling.extend(self.dangling_of(&self.envs));
            dangling.extend(self.dangling_of(&self.workloads));
            dangling.extend(self.dangling_of(&self.views));
            if dangling.is_empty() {
                break;
            }

            for (from, to) in dangling {
                let removed = match from.kind {
                    EntityKind::Env => self.envs.remove(&from.id).is_some(),
                    EntityKind::Workload => self.workloads.remove(&from.id).is_some(),
                    EntityKind::View => self.views.remove(&from.id).is_some(),
                    _ => false,
                };
                if removed {
                    let error = ConfigError::MissingReference { from, to };
                    warn!("Removing {}", error);
                    report.errors.push(error);
                }
            }
        }
    }

    /// First missing reference of each entity in the map.
    fn dangling_of<E: Entity>(&self, entities: &BTreeMap<String, E>) -> Vec<(EntityRef, EntityRef)> {
        entities
            .values()
            .filter_map(|entity| {
                entity
                    .references()
                    .into_iter()
                    .find(|target| !self.contains(target))
                    .map(|target| (entity.entity_ref(), target))
            })
            .collect()
    }

    fn contains(&self, entity: &EntityRef) -> bool {
        match entity.kind {
            EntityKind::Repo => self.repos.contains_key(&entity.id),
            EntityKind::Env => self.envs.contains_key(&entity.id),
            EntityKind::Workload => self.workloads.contains_key(&entity.id),
            EntityKind::View => self.views.contains_key(&entity.id),
            EntityKind::Label => self.labels.contains_key(&entity.id),
            EntityKind::Unwanted => self.unwanteds.contains_key(&entity.id),
            EntityKind::Buildroot => self.buildroots.contains_key(&entity.id),
            EntityKind::BuildrootPkgRelation => {
                self.buildroot_pkg_relations.contains_key(&entity.id)
            }
        }
    }

    fn remove_view(&mut self, view_id: &str, missing: EntityRef, report: &mut LoadReport) {
        if self.views.remove(view_id).is_some() {
            let error = ConfigError::MissingReference {
                from: EntityRef::new(EntityKind::View, view_id),
                to: missing,
            };
            warn!("Removing {}", error);
            report.errors.push(error);
        }
    }

    fn into_store(self) -> EntityStore {
        let mut builder = EntityStore::builder();
        for repo in self.repos.into_values() {
            builder = builder.repo(repo);
        }
        for env in self.envs.into_values() {
            builder = builder.env(env);
        }
        for workload in self.workloads.into_values() {
            builder = builder.workload(workload);
        }
        for view in self.views.into_values() {
            builder = builder.view(view);
        }
        for label in self.labels.into_values() {
            builder = builder.label(label);
        }
        for unwanted in self.unwanteds.into_values() {
            builder = builder.unwanted(unwanted);
        }
        for buildroot in self.buildroots.into_values() {
            builder = builder.buildroot(buildroot);
        }
        for relation in self.buildroot_pkg_relations.into_values() {
            builder = builder.buildroot_pkg_relation(relation);
        }
        builder.build()
    }
}

/// Ids of entities sharing at least one label, sorted.
fn sharing_labels<E: Entity>(entities: &BTreeMap<String, E>, labels: &BTreeSet<String>) -> Vec<String> {
    entities
        .values()
        .filter(|entity| !entity.labels().is_disjoint(labels))
        .map(|entity| entity.id().to_string())
        .collect()
}
