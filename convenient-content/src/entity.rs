// Configuration entities with flat structure and id-based references
// Every record is immutable once it is in an EntityStore

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

static NO_LABELS: BTreeSet<String> = BTreeSet::new();

// === Kinds and references ===

/// The eight kinds of configuration entity
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A package repository
    Repo,
    /// A base environment
    Env,
    /// A package set on an env
    Workload,
    /// A composition of envs and workloads
    View,
    /// An organizational tag
    Label,
    /// An exclusion list
    Unwanted,
    /// A view buildroot
    Buildroot,
    /// Buildroot package relations of a view and architecture
    BuildrootPkgRelation,
}

impl EntityKind {
    /// All kinds, in output order
    pub const ALL: [EntityKind; 8] = [
        EntityKind::Repo,
        EntityKind::Env,
        EntityKind::Workload,
        EntityKind::View,
        EntityKind::Label,
        EntityKind::Unwanted,
        EntityKind::Buildroot,
        EntityKind::BuildrootPkgRelation,
    ];

    /// Key of this kind in the assembled configs
    pub fn key(self) -> &'static str {
        match self {
            Self::Repo => "repos",
            Self::Env => "envs",
            Self::Workload => "workloads",
            Self::View => "views",
            Self::Label => "labels",
            Self::Unwanted => "unwanteds",
            Self::Buildroot => "buildroots",
            Self::BuildrootPkgRelation => "buildroot_pkg_relations",
        }
    }

    /// Whether a label filter selects entities of this kind directly
    pub fn is_label_selectable(self) -> bool {
        matches!(self, Self::Repo | Self::Env | Self::Workload | Self::View)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Repo => "repo",
            Self::Env => "env",
            Self::Workload => "workload",
            Self::View => "view",
            Self::Label => "label",
            Self::Unwanted => "unwanted",
            Self::Buildroot => "buildroot",
            Self::BuildrootPkgRelation => "buildroot pkg relation",
        };
        f.write_str(name)
    }
}

/// Reference to an entity by kind and id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    /// Kind of the referenced entity
    pub kind: EntityKind,
    /// Id of the referenced entity
    pub id: String,
}

impl EntityRef {
    /// Reference `id` of the given kind.
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind, self.id)
    }
}

/// Common view over every entity record
pub trait Entity {
    /// Kind of every entity of this type.
    const KIND: EntityKind;

    /// Unique id within the kind.
    fn id(&self) -> &str;

    /// Labels attached to this entity
    fn labels(&self) -> &BTreeSet<String> {
        &NO_LABELS
    }

    /// Entities that must be retained whenever this one is
    fn references(&self) -> Vec<EntityRef> {
        Vec::new()
    }

    /// Entity this one rides along with (retained when that one is)
    fn attached_to(&self) -> Option<EntityRef> {
        None
    }

    /// Reference to this entity.
    fn entity_ref(&self) -> EntityRef {
        EntityRef::new(Self::KIND, self.id())
    }
}

// === Shared value types ===

/// Extra installation options for envs and workloads
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallOption {
    /// Include documentation packages
    IncludeDocs,
    /// Pull in "recommends" weak dependencies
    IncludeWeakDeps,
}

impl InstallOption {
    /// Parse the kebab-case spelling used in documents.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "include-docs" => Some(Self::IncludeDocs),
            "include-weak-deps" => Some(Self::IncludeWeakDeps),
            _ => None,
        }
    }
}

/// Packages per architecture
pub type ArchPackages = BTreeMap<String, Vec<String>>;

// === Repo ===

/// A package repository definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repo {
    /// Document id (the file name without extension)
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Maintainer contact
    pub maintainer: String,
    /// Release the repositories are pinned to
    pub releasever: String,
    /// Architectures the repository is built for
    pub architectures: BTreeSet<String>,
    /// Individual package repositories, by id
    pub source_repos: BTreeMap<String, SourceRepo>,
    /// Compose metadata URL, if the repo tracks a compose
    pub composeinfo: Option<String>,
    /// Replaces the default base buildroot package set
    pub base_buildroot_override: Vec<String>,
    /// Labels this entity carries
    pub labels: BTreeSet<String>,
}

impl Repo {
    /// Empty record with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            maintainer: String::new(),
            releasever: String::new(),
            architectures: BTreeSet::new(),
            source_repos: BTreeMap::new(),
            composeinfo: None,
            base_buildroot_override: Vec::new(),
            labels: BTreeSet::new(),
        }
    }
}

impl Entity for Repo {
    const KIND: EntityKind = EntityKind::Repo;

    fn id(&self) -> &str {
        &self.id
    }

    fn labels(&self) -> &BTreeSet<String> {
        &self.labels
    }
}

/// One package repository inside a Repo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRepo {
    /// Repository id within its Repo
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Base URL, may contain `$basearch`
    pub baseurl: String,
    /// DNF priority, lower wins
    pub priority: u32,
    /// Only use this repository on these architectures
    pub limit_arches: Option<BTreeSet<String>>,
    /// Koji hub used for root log lookups
    pub koji_api_url: Option<String>,
    /// Koji file server used for root log downloads
    pub koji_files_url: Option<String>,
}

// === Env ===

/// A base installable environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Env {
    /// Document id (the file name without extension)
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Maintainer contact
    pub maintainer: String,
    /// Backing repo ids
    pub repositories: Vec<String>,
    /// Packages installed on every architecture
    pub packages: Vec<String>,
    /// Packages installed on one architecture only
    pub arch_packages: ArchPackages,
    /// Installation options
    pub options: BTreeSet<InstallOption>,
    /// Comps groups to install
    pub groups: Vec<String>,
    /// Labels this entity carries
    pub labels: BTreeSet<String>,
}

impl Env {
    /// Empty record with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            maintainer: String::new(),
            repositories: Vec::new(),
            packages: Vec::new(),
            arch_packages: ArchPackages::new(),
            options: BTreeSet::new(),
            groups: Vec::new(),
            labels: BTreeSet::new(),
        }
    }
}

impl Entity for Env {
    const KIND: EntityKind = EntityKind::Env;

    fn id(&self) -> &str {
        &self.id
    }

    fn labels(&self) -> &BTreeSet<String> {
        &self.labels
    }

    fn references(&self) -> Vec<EntityRef> {
        self.repositories
            .iter()
            .map(|repo_id| EntityRef::new(EntityKind::Repo, repo_id))
            .collect()
    }
}

// === Workload ===

/// A package that does not exist (yet) in the repositories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagePlaceholder {
    /// Binary package name
    pub name: String,
    /// What the package will contain
    pub description: String,
    /// Runtime requirements
    pub requires: Vec<String>,
    /// Build requirements
    pub buildrequires: Vec<String>,
    /// Only exists on these architectures
    pub limit_arches: Option<BTreeSet<String>>,
    /// Source package it will be built from
    pub srpm: String,
}

/// A package set layered onto an env
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    /// Document id (the file name without extension)
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Maintainer contact
    pub maintainer: String,
    /// Target env ids
    pub envs: Vec<String>,
    /// Packages installed on every architecture
    pub packages: Vec<String>,
    /// Packages installed on one architecture only
    pub arch_packages: ArchPackages,
    /// Installation options
    pub options: BTreeSet<InstallOption>,
    /// Modules to enable before installing
    pub modules_enable: Vec<String>,
    /// Modules to disable before installing
    pub modules_disable: Vec<String>,
    /// Comps groups to install
    pub groups: Vec<String>,
    /// Placeholder packages, by name
    pub package_placeholders: BTreeMap<String, PackagePlaceholder>,
    /// Labels this entity carries
    pub labels: BTreeSet<String>,
}

impl Workload {
    /// Empty record with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            maintainer: String::new(),
            envs: Vec::new(),
            packages: Vec::new(),
            arch_packages: ArchPackages::new(),
            options: BTreeSet::new(),
            modules_enable: Vec::new(),
            modules_disable: Vec::new(),
            groups: Vec::new(),
            package_placeholders: BTreeMap::new(),
            labels: BTreeSet::new(),
        }
    }
}

impl Entity for Workload {
    const KIND: EntityKind = EntityKind::Workload;

    fn id(&self) -> &str {
        &self.id
    }

    fn labels(&self) -> &BTreeSet<String> {
        &self.labels
    }

    fn references(&self) -> Vec<EntityRef> {
        self.envs
            .iter()
            .map(|env_id| EntityRef::new(EntityKind::Env, env_id))
            .collect()
    }
}

// === View ===

/// Compose views stand alone, addon views extend a compose view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewType {
    /// Standalone view on a repository
    Compose,
    /// Extends a compose view
    Addon {
        /// Id of the compose view it extends
        base_view_id: String,
    },
}

/// How the buildroot of a view is resolved
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildrootStrategy {
    /// Build dependencies from repository metadata
    #[default]
    DepTracker,
    /// Build dependencies recovered from koji root logs
    RootLogs,
}

impl BuildrootStrategy {
    /// Parse the snake_case spelling used in documents.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "dep_tracker" => Some(Self::DepTracker),
            "root_logs" => Some(Self::RootLogs),
            _ => None,
        }
    }
}

/// A user-facing composition of envs and workloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    /// Document id (the file name without extension)
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Maintainer contact
    pub maintainer: String,
    /// Compose or addon
    pub view_type: ViewType,
    /// Source repo id (inherited from the base view for addons)
    pub repository: Option<String>,
    /// Env ids in the view
    pub envs: Vec<String>,
    /// Workload ids in the view
    pub workloads: Vec<String>,
    /// Architectures the view is resolved for
    pub architectures: BTreeSet<String>,
    /// Where buildroot dependencies come from
    pub buildroot_strategy: BuildrootStrategy,
    /// Binary packages excluded from the view
    pub unwanted_packages: Vec<String>,
    /// Binary packages excluded on one architecture
    pub unwanted_arch_packages: ArchPackages,
    /// Source packages excluded from the view
    pub unwanted_source_packages: Vec<String>,
    /// Labels this entity carries
    pub labels: BTreeSet<String>,
}

impl View {
    /// A compose view on a repository.
    pub fn compose(id: impl Into<String>, repository: impl Into<String>) -> Self {
        Self::with_type(id, ViewType::Compose, Some(repository.into()))
    }

    /// An addon view on a base view. The repository is inherited at load time.
    pub fn addon(id: impl Into<String>, base_view_id: impl Into<String>) -> Self {
        Self::with_type(
            id,
            ViewType::Addon {
                base_view_id: base_view_id.into(),
            },
            None,
        )
    }

    fn with_type(id: impl Into<String>, view_type: ViewType, repository: Option<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            maintainer: String::new(),
            view_type,
            repository,
            envs: Vec::new(),
            workloads: Vec::new(),
            architectures: BTreeSet::new(),
            buildroot_strategy: BuildrootStrategy::default(),
            unwanted_packages: Vec::new(),
            unwanted_arch_packages: ArchPackages::new(),
            unwanted_source_packages: Vec::new(),
            labels: BTreeSet::new(),
        }
    }

    /// Base view of an addon view.
    pub fn base_view_id(&self) -> Option<&str> {
        match &self.view_type {
            ViewType::Compose => None,
            ViewType::Addon { base_view_id } => Some(base_view_id),
        }
    }

    /// Whether this is an addon view.
    pub fn is_addon(&self) -> bool {
        matches!(self.view_type, ViewType::Addon { .. })
    }
}

impl Entity for View {
    const KIND: EntityKind = EntityKind::View;

    fn id(&self) -> &str {
        &self.id
    }

    fn labels(&self) -> &BTreeSet<String> {
        &self.labels
    }

    fn references(&self) -> Vec<EntityRef> {
        let mut refs = Vec::new();
        if let Some(base_view_id) = self.base_view_id() {
            refs.push(EntityRef::new(EntityKind::View, base_view_id));
        }
        if let Some(repository) = &self.repository {
            refs.push(EntityRef::new(EntityKind::Repo, repository));
        }
        refs.extend(self.envs.iter().map(|id| EntityRef::new(EntityKind::Env, id)));
        refs.extend(
            self.workloads
                .iter()
                .map(|id| EntityRef::new(EntityKind::Workload, id)),
        );
        refs
    }
}

// === Label ===

/// An organizational tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Document id (the file name without extension)
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Maintainer contact
    pub maintainer: String,
}

impl Label {
    /// Empty record with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            maintainer: String::new(),
        }
    }
}

impl Entity for Label {
    const KIND: EntityKind = EntityKind::Label;

    fn id(&self) -> &str {
        &self.id
    }
}

// === Unwanted ===

/// A named exclusion list, applied to views sharing one of its labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unwanted {
    /// Document id (the file name without extension)
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Maintainer contact
    pub maintainer: String,
    /// Binary packages to exclude
    pub unwanted_packages: Vec<String>,
    /// Binary packages to exclude on one architecture
    pub unwanted_arch_packages: ArchPackages,
    /// Source packages to exclude
    pub unwanted_source_packages: Vec<String>,
    /// Source packages to exclude on one architecture
    pub unwanted_arch_source_packages: ArchPackages,
    /// Labels this entity carries
    pub labels: BTreeSet<String>,
}

impl Unwanted {
    /// Empty record with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            maintainer: String::new(),
            unwanted_packages: Vec::new(),
            unwanted_arch_packages: ArchPackages::new(),
            unwanted_source_packages: Vec::new(),
            unwanted_arch_source_packages: ArchPackages::new(),
            labels: BTreeSet::new(),
        }
    }
}

impl Entity for Unwanted {
    const KIND: EntityKind = EntityKind::Unwanted;

    fn id(&self) -> &str {
        &self.id
    }

    fn labels(&self) -> &BTreeSet<String> {
        &self.labels
    }
}

// === Buildroot ===

/// Explicit build requirements of one source package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePackage {
    /// Required binary packages
    pub requires: Vec<String>,
}

/// The build-time environment of a view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buildroot {
    /// Document id (the file name without extension)
    pub id: String,
    /// Maintainer contact
    pub maintainer: String,
    /// View this buildroot belongs to
    pub view_id: String,
    /// Base buildroot packages per architecture
    pub base_buildroot: ArchPackages,
    /// Source packages per architecture
    pub source_packages: BTreeMap<String, BTreeMap<String, SourcePackage>>,
}

impl Buildroot {
    /// Empty buildroot of a view.
    pub fn new(id: impl Into<String>, view_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            maintainer: String::new(),
            view_id: view_id.into(),
            base_buildroot: ArchPackages::new(),
            source_packages: BTreeMap::new(),
        }
    }
}

impl Entity for Buildroot {
    const KIND: EntityKind = EntityKind::Buildroot;

    fn id(&self) -> &str {
        &self.id
    }

    fn attached_to(&self) -> Option<EntityRef> {
        Some(EntityRef::new(EntityKind::View, &self.view_id))
    }
}

// === BuildrootPkgRelation ===

/// Reverse dependencies of one binary package in a buildroot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkgRelation {
    /// Source packages requiring it
    #[serde(default)]
    pub required_by: BTreeSet<String>,
    /// Source packages recommending it
    #[serde(default)]
    pub recommended_by: BTreeSet<String>,
    /// Source packages suggesting it
    #[serde(default)]
    pub suggested_by: BTreeSet<String>,
    /// Source package it is built from
    #[serde(default)]
    pub source_name: Option<String>,
    /// Repository it was found in
    #[serde(default)]
    pub reponame: Option<String>,
}

/// Recorded build dependency facts for one view and architecture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildrootPkgRelation {
    /// Document id (the file name without extension)
    pub id: String,
    /// View the relations were recorded for
    pub view_id: String,
    /// Architecture the relations were recorded for
    pub arch: String,
    /// Binary package name to relation
    pub pkg_relations: BTreeMap<String, PkgRelation>,
}

impl Entity for BuildrootPkgRelation {
    const KIND: EntityKind = EntityKind::BuildrootPkgRelation;

    fn id(&self) -> &str {
        &self.id
    }

    fn attached_to(&self) -> Option<EntityRef> {
        Some(EntityRef::new(EntityKind::View, &self.view_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_keys_are_unique() {
        let keys: BTreeSet<_> = EntityKind::ALL.iter().map(|kind| kind.key()).collect();
        assert_eq!(keys.len(), 8);
    }

    #[test]
    fn test_label_selectable_kinds() {
        let selectable: Vec<_> = EntityKind::ALL
            .into_iter()
            .filter(|kind| kind.is_label_selectable())
            .collect();
        assert_eq!(
            selectable,
            vec![EntityKind::Repo, EntityKind::Env, EntityKind::Workload, EntityKind::View]
        );
    }

    #[test]
    fn test_view_references() {
        let mut view = View::addon("eln-devel", "eln");
        view.repository = Some("repo-eln".to_string());
        view.envs.push("env-base".to_string());
        view.workloads.push("wl-1".to_string());

        let refs = view.references();
        assert_eq!(
            refs,
            vec![
                EntityRef::new(EntityKind::View, "eln"),
                EntityRef::new(EntityKind::Repo, "repo-eln"),
                EntityRef::new(EntityKind::Env, "env-base"),
                EntityRef::new(EntityKind::Workload, "wl-1"),
            ]
        );
    }

    #[test]
    fn test_entity_ref_display() {
        let entity = EntityRef::new(EntityKind::Workload, "bash");
        assert_eq!(entity.to_string(), "workload 'bash'");
    }

    #[test]
    fn test_attachments() {
        let buildroot = Buildroot::new("br", "view-eln");
        assert_eq!(
            buildroot.attached_to(),
            Some(EntityRef::new(EntityKind::View, "view-eln"))
        );
        assert_eq!(Label::new("eln").attached_to(), None);
    }
}
