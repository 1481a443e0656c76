//! On-disk document formats and their conversion into entities.
//!
//! YAML documents carry a `document` type, a `version` and a `data` body.
//! JSON data files carry a `document_type`, a `version` and a `data` body.
//! Unknown keys in a body are ignored.

use crate::entity::{
    ArchPackages, Buildroot, BuildrootPkgRelation, BuildrootStrategy, Env, InstallOption, Label,
    PackagePlaceholder, PkgRelation, Repo, SourcePackage, SourceRepo, Unwanted, View, Workload,
};
use crate::error::ConfigError;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use tracing::warn;

/// Default priority of a package repository.
pub const DEFAULT_REPO_PRIORITY: u32 = 100;

/// Document types understood by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentType {
    /// `feedback-pipeline-repository`
    Repository,
    /// `feedback-pipeline-environment`
    Environment,
    /// `feedback-pipeline-workload`
    Workload,
    /// `feedback-pipeline-label`
    Label,
    /// `feedback-pipeline-view` (or the legacy compose-view spelling)
    ComposeView,
    /// `feedback-pipeline-view-addon`
    AddonView,
    /// `feedback-pipeline-unwanted`
    Unwanted,
    /// `feedback-pipeline-buildroot`
    Buildroot,
    /// `buildroot-binary-relations` (JSON)
    BuildrootBinaryRelations,
}

impl DocumentType {
    /// Match a YAML `document` field.
    #[must_use]
    pub fn from_yaml(document: &str) -> Option<Self> {
        match document {
            "feedback-pipeline-repository" => Some(Self::Repository),
            "feedback-pipeline-environment" => Some(Self::Environment),
            "feedback-pipeline-workload" => Some(Self::Workload),
            "feedback-pipeline-label" => Some(Self::Label),
            // "compose-view" is the legacy spelling
            "feedback-pipeline-view" | "feedback-pipeline-compose-view" => Some(Self::ComposeView),
            "feedback-pipeline-view-addon" => Some(Self::AddonView),
            "feedback-pipeline-unwanted" => Some(Self::Unwanted),
            "feedback-pipeline-buildroot" => Some(Self::Buildroot),
            _ => None,
        }
    }

    /// Match a JSON `document_type` field.
    #[must_use]
    pub fn from_json(document_type: &str) -> Option<Self> {
        match document_type {
            "buildroot-binary-relations" => Some(Self::BuildrootBinaryRelations),
            _ => None,
        }
    }

    /// Whether this version of the document type can be loaded.
    #[must_use]
    pub fn supports_version(self, version: u64) -> bool {
        match self {
            Self::Repository => version == 2,
            _ => true,
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Repository => "feedback-pipeline-repository",
            Self::Environment => "feedback-pipeline-environment",
            Self::Workload => "feedback-pipeline-workload",
            Self::Label => "feedback-pipeline-label",
            Self::ComposeView => "feedback-pipeline-view",
            Self::AddonView => "feedback-pipeline-view-addon",
            Self::Unwanted => "feedback-pipeline-unwanted",
            Self::Buildroot => "feedback-pipeline-buildroot",
            Self::BuildrootBinaryRelations => "buildroot-binary-relations",
        };
        f.write_str(name)
    }
}

/// A YAML scalar read as text (`releasever: 39` and `releasever: "39"`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Quoted or plain text
    Text(String),
    /// Integer literal
    Integer(i64),
    /// Float literal
    Float(f64),
    /// `true` or `false`
    Bool(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
        }
    }
}

/// Per-architecture package lists as written, where a list may be empty.
type RawArchPackages = BTreeMap<String, Option<Vec<String>>>;

// === Document bodies ===

#[derive(Debug, Deserialize)]
pub(crate) struct RepoData {
    name: String,
    description: String,
    maintainer: String,
    source: RepoSourceData,
    #[serde(default)]
    labels: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RepoSourceData {
    releasever: Scalar,
    architectures: Vec<String>,
    #[serde(default)]
    repos: BTreeMap<String, SourceRepoData>,
    composeinfo: Option<String>,
    #[serde(default)]
    base_buildroot_override: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SourceRepoData {
    name: Option<String>,
    baseurl: Option<String>,
    priority: Option<u32>,
    limit_arches: Option<BTreeSet<String>>,
    koji_api_url: Option<String>,
    koji_files_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnvData {
    name: String,
    description: String,
    maintainer: String,
    repositories: Vec<String>,
    packages: Vec<String>,
    labels: Vec<String>,
    #[serde(default)]
    arch_packages: RawArchPackages,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    groups: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkloadData {
    name: String,
    description: String,
    maintainer: String,
    labels: Vec<String>,
    #[serde(default)]
    packages: Option<Vec<String>>,
    #[serde(default)]
    arch_packages: RawArchPackages,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    modules_enable: Vec<String>,
    #[serde(default)]
    modules_disable: Vec<String>,
    #[serde(default)]
    groups: Vec<String>,
    #[serde(default)]
    package_placeholders: BTreeMap<String, PlaceholderData>,
    /// Explicit target envs, derived from shared labels when absent
    environments: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct PlaceholderData {
    description: Option<String>,
    #[serde(default)]
    requires: Vec<String>,
    #[serde(default)]
    buildrequires: Vec<String>,
    limit_arches: Option<BTreeSet<String>>,
    #[serde(default)]
    srpm: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LabelData {
    name: String,
    description: String,
    maintainer: String,
}

#[derive(Debug, Default, Deserialize)]
struct UnwantedLists {
    #[serde(default)]
    unwanted_packages: Vec<String>,
    #[serde(default)]
    unwanted_arch_packages: RawArchPackages,
    #[serde(default)]
    unwanted_source_packages: Vec<String>,
    #[serde(default)]
    unwanted_arch_source_packages: RawArchPackages,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ComposeViewData {
    name: String,
    description: String,
    maintainer: String,
    labels: Vec<String>,
    repository: String,
    buildroot_strategy: Option<String>,
    #[serde(default)]
    architectures: Vec<String>,
    #[serde(flatten)]
    unwanted: UnwantedLists,
    environments: Option<Vec<String>>,
    workloads: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddonViewData {
    name: String,
    description: String,
    maintainer: String,
    labels: Vec<String>,
    base_view_id: String,
    #[serde(flatten)]
    unwanted: UnwantedLists,
    environments: Option<Vec<String>>,
    workloads: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UnwantedData {
    name: String,
    description: String,
    maintainer: String,
    labels: Vec<String>,
    #[serde(flatten)]
    unwanted: UnwantedLists,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BuildrootData {
    maintainer: String,
    view_id: String,
    #[serde(default)]
    base_buildroot: RawArchPackages,
    #[serde(default)]
    source_packages: BTreeMap<String, Option<BTreeMap<String, Option<SourcePackageData>>>>,
}

#[derive(Debug, Deserialize)]
struct SourcePackageData {
    #[serde(default)]
    requires: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RelationsData {
    view_id: String,
    arch: String,
    pkgs: BTreeMap<String, PkgRelation>,
}

/// Deserialize a document body, mapping failures to `InvalidDocument`.
pub(crate) fn parse_body<T, V>(path: &Path, body: V) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
    V: serde::Deserializer<'static>,
    V::Error: fmt::Display,
{
    T::deserialize(body).map_err(|e| ConfigError::InvalidDocument(path.to_path_buf(), e.to_string()))
}

// === Conversion ===

/// Conversion context of one document: its id and the allowed arches.
///
/// Unsupported architectures are skipped with a warning, never fatal.
pub(crate) struct DocumentContext<'a> {
    pub(crate) document_id: &'a str,
    allowed_arches: &'a BTreeSet<String>,
    pub(crate) warnings: Vec<ConfigError>,
}

impl<'a> DocumentContext<'a> {
    pub(crate) fn new(document_id: &'a str, allowed_arches: &'a BTreeSet<String>) -> Self {
        Self {
            document_id,
            allowed_arches,
            warnings: Vec::new(),
        }
    }

    fn allows(&mut self, arch: &str) -> bool {
        if self.allowed_arches.contains(arch) {
            return true;
        }
        warn!(
            "{} lists an unsupported architecture: {}. Moving on...",
            self.document_id, arch
        );
        self.warnings.push(ConfigError::UnsupportedArch {
            document_id: self.document_id.to_string(),
            arch: arch.to_string(),
        });
        false
    }

    fn arches(&mut self, arches: Vec<String>) -> BTreeSet<String> {
        arches.into_iter().filter(|arch| self.allows(arch)).collect()
    }

    fn arch_packages(&mut self, raw: RawArchPackages) -> ArchPackages {
        raw.into_iter()
            .filter(|(arch, _)| self.allows(arch))
            .map(|(arch, packages)| (arch, packages.unwrap_or_default()))
            .collect()
    }

    fn options(&self, options: &[String]) -> BTreeSet<InstallOption> {
        options
            .iter()
            .filter_map(|option| InstallOption::parse(option))
            .collect()
    }

    pub(crate) fn repo(&mut self, path: &Path, data: RepoData) -> Result<Repo, ConfigError> {
        let source_repos = data
            .source
            .repos
            .into_iter()
            .map(|(id, repo)| {
                let baseurl = repo.baseurl.ok_or_else(|| {
                    ConfigError::InvalidDocument(
                        path.to_path_buf(),
                        format!("repo {id} doesn't list baseurl"),
                    )
                })?;
                let source = SourceRepo {
                    name: repo.name.unwrap_or_else(|| id.clone()),
                    id: id.clone(),
                    baseurl,
                    priority: repo.priority.unwrap_or(DEFAULT_REPO_PRIORITY),
                    limit_arches: repo.limit_arches,
                    koji_api_url: repo.koji_api_url,
                    koji_files_url: repo.koji_files_url,
                };
                Ok((id, source))
            })
            .collect::<Result<_, ConfigError>>()?;

        Ok(Repo {
            id: self.document_id.to_string(),
            name: data.name,
            description: data.description,
            maintainer: data.maintainer,
            releasever: data.source.releasever.to_string(),
            architectures: self.arches(data.source.architectures),
            source_repos,
            composeinfo: data.source.composeinfo,
            base_buildroot_override: data.source.base_buildroot_override,
            labels: data.labels.into_iter().collect(),
        })
    }

    pub(crate) fn env(&mut self, data: EnvData) -> Env {
        Env {
            id: self.document_id.to_string(),
            name: data.name,
            description: data.description,
            maintainer: data.maintainer,
            repositories: data.repositories,
            packages: data.packages,
            arch_packages: self.arch_packages(data.arch_packages),
            options: self.options(&data.options),
            groups: data.groups,
            labels: data.labels.into_iter().collect(),
        }
    }

    /// Convert a workload body. Also returns whether its envs were explicit.
    pub(crate) fn workload(&mut self, data: WorkloadData) -> (Workload, bool) {
        let explicit_envs = data.environments.is_some();
        let package_placeholders = data
            .package_placeholders
            .into_iter()
            .map(|(name, placeholder)| {
                let placeholder = PackagePlaceholder {
                    name: name.clone(),
                    description: placeholder
                        .description
                        .unwrap_or_else(|| "Description not provided.".to_string()),
                    requires: placeholder.requires,
                    buildrequires: placeholder.buildrequires,
                    limit_arches: placeholder.limit_arches,
                    srpm: placeholder.srpm,
                };
                (name, placeholder)
            })
            .collect();

        let workload = Workload {
            id: self.document_id.to_string(),
            name: data.name,
            description: data.description,
            maintainer: data.maintainer,
            envs: data.environments.unwrap_or_default(),
            packages: data.packages.unwrap_or_default(),
            arch_packages: self.arch_packages(data.arch_packages),
            options: self.options(&data.options),
            modules_enable: data.modules_enable,
            modules_disable: data.modules_disable,
            groups: data.groups,
            package_placeholders,
            labels: data.labels.into_iter().collect(),
        };
        (workload, explicit_envs)
    }

    pub(crate) fn label(&self, data: LabelData) -> Label {
        Label {
            id: self.document_id.to_string(),
            name: data.name,
            description: data.description,
            maintainer: data.maintainer,
        }
    }

    /// Convert a compose view body. Also returns whether its envs and
    /// workloads were listed explicitly.
    pub(crate) fn compose_view(&mut self, data: ComposeViewData) -> (View, bool) {
        let explicit = data.environments.is_some() || data.workloads.is_some();
        let mut view = View::compose(self.document_id, data.repository);
        view.name = data.name;
        view.description = data.description;
        view.maintainer = data.maintainer;
        view.labels = data.labels.into_iter().collect();
        view.buildroot_strategy = data
            .buildroot_strategy
            .as_deref()
            .and_then(BuildrootStrategy::parse)
            .unwrap_or_default();
        view.architectures = self.arches(data.architectures);
        view.envs = data.environments.unwrap_or_default();
        view.workloads = data.workloads.unwrap_or_default();
        self.apply_view_unwanted(&mut view, data.unwanted);
        (view, explicit)
    }

    /// Convert an addon view body, see [`Self::compose_view`].
    pub(crate) fn addon_view(&mut self, data: AddonViewData) -> (View, bool) {
        let explicit = data.environments.is_some() || data.workloads.is_some();
        let mut view = View::addon(self.document_id, data.base_view_id);
        view.name = data.name;
        view.description = data.description;
        view.maintainer = data.maintainer;
        view.labels = data.labels.into_iter().collect();
        view.envs = data.environments.unwrap_or_default();
        view.workloads = data.workloads.unwrap_or_default();
        self.apply_view_unwanted(&mut view, data.unwanted);
        (view, explicit)
    }

    fn apply_view_unwanted(&mut self, view: &mut View, lists: UnwantedLists) {
        view.unwanted_packages = lists.unwanted_packages;
        view.unwanted_arch_packages = self.arch_packages(lists.unwanted_arch_packages);
        view.unwanted_source_packages = lists.unwanted_source_packages;
    }

    pub(crate) fn unwanted(&mut self, data: UnwantedData) -> Unwanted {
        Unwanted {
            id: self.document_id.to_string(),
            name: data.name,
            description: data.description,
            maintainer: data.maintainer,
            unwanted_packages: data.unwanted.unwanted_packages,
            unwanted_arch_packages: self.arch_packages(data.unwanted.unwanted_arch_packages),
            unwanted_source_packages: data.unwanted.unwanted_source_packages,
            unwanted_arch_source_packages: self
                .arch_packages(data.unwanted.unwanted_arch_source_packages),
            labels: data.labels.into_iter().collect(),
        }
    }

    pub(crate) fn buildroot(&mut self, data: BuildrootData) -> Buildroot {
        let mut source_packages = BTreeMap::new();
        for (arch, srpms) in data.source_packages {
            if !self.allows(&arch) {
                continue;
            }
            let srpms: BTreeMap<String, SourcePackage> = srpms
                .unwrap_or_default()
                .into_iter()
                .map(|(srpm, package)| {
                    let requires = package.and_then(|p| p.requires).unwrap_or_default();
                    (srpm, SourcePackage { requires })
                })
                .collect();
            let _ = source_packages.insert(arch, srpms);
        }

        Buildroot {
            id: self.document_id.to_string(),
            maintainer: data.maintainer,
            view_id: data.view_id,
            base_buildroot: self.arch_packages(data.base_buildroot),
            source_packages,
        }
    }

    /// Relations for an unsupported architecture are rejected outright.
    pub(crate) fn relations(&self, data: RelationsData) -> Result<BuildrootPkgRelation, ConfigError> {
        if !self.allowed_arches.contains(&data.arch) {
            return Err(ConfigError::UnsupportedArch {
                document_id: self.document_id.to_string(),
                arch: data.arch,
            });
        }
        Ok(BuildrootPkgRelation {
            id: self.document_id.to_string(),
            view_id: data.view_id,
            arch: data.arch,
            pkg_relations: data.pkgs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn arches() -> BTreeSet<String> {
        ["aarch64", "x86_64"].into_iter().map(String::from).collect()
    }

    fn yaml<T: DeserializeOwned>(text: &str) -> T {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_document_types() {
        assert_eq!(
            DocumentType::from_yaml("feedback-pipeline-compose-view"),
            Some(DocumentType::ComposeView)
        );
        assert_eq!(DocumentType::from_yaml("something-else"), None);
        assert!(!DocumentType::Repository.supports_version(1));
        assert!(DocumentType::Repository.supports_version(2));
        assert_eq!(
            DocumentType::from_json("buildroot-binary-relations"),
            Some(DocumentType::BuildrootBinaryRelations)
        );
    }

    #[test]
    fn test_repo_conversion() {
        let data: RepoData = yaml(
            r"
name: ELN
description: Fedora ELN
maintainer: asamalik
source:
  releasever: 41
  architectures: [aarch64, x86_64, riscv64]
  repos:
    BaseOS:
      baseurl: https://example.org/BaseOS/$basearch/os/
      priority: 1
    AppStream:
      baseurl: https://example.org/AppStream/$basearch/os/
",
        );
        let allowed = arches();
        let mut context = DocumentContext::new("repo-eln", &allowed);
        let repo = context.repo(&PathBuf::from("repo-eln.yaml"), data).unwrap();

        assert_eq!(repo.id, "repo-eln");
        assert_eq!(repo.releasever, "41");
        assert_eq!(repo.architectures, arches());
        assert_eq!(repo.source_repos["BaseOS"].priority, 1);
        assert_eq!(repo.source_repos["AppStream"].priority, DEFAULT_REPO_PRIORITY);
        assert_eq!(repo.source_repos["AppStream"].name, "AppStream");
        assert_eq!(context.warnings.len(), 1);
    }

    #[test]
    fn test_repo_without_baseurl_is_invalid() {
        let data: RepoData = yaml(
            r"
name: ELN
description: Fedora ELN
maintainer: asamalik
source:
  releasever: eln
  architectures: [x86_64]
  repos:
    BaseOS:
      priority: 1
",
        );
        let allowed = arches();
        let mut context = DocumentContext::new("repo-eln", &allowed);
        let result = context.repo(&PathBuf::from("repo-eln.yaml"), data);
        assert!(matches!(result, Err(ConfigError::InvalidDocument(_, reason)) if reason.contains("baseurl")));
    }

    #[test]
    fn test_workload_conversion() {
        let data: WorkloadData = yaml(
            r"
name: Tools
description: Everyday tools
maintainer: someone
labels: [eln]
packages:
arch_packages:
  x86_64: [efibootmgr]
  ppc64le: [powerpc-utils]
  aarch64:
options: [include-docs, nonsense]
package_placeholders:
  new-thing:
    requires: [bash]
",
        );
        let allowed = arches();
        let mut context = DocumentContext::new("wl-tools", &allowed);
        let (workload, explicit_envs) = context.workload(data);

        assert!(!explicit_envs);
        assert!(workload.packages.is_empty());
        assert_eq!(workload.arch_packages["x86_64"], vec!["efibootmgr"]);
        assert!(workload.arch_packages["aarch64"].is_empty());
        assert!(!workload.arch_packages.contains_key("ppc64le"));
        assert_eq!(
            workload.options,
            BTreeSet::from([InstallOption::IncludeDocs])
        );
        let placeholder = &workload.package_placeholders["new-thing"];
        assert_eq!(placeholder.description, "Description not provided.");
        assert_eq!(placeholder.requires, vec!["bash"]);
    }

    #[test]
    fn test_compose_view_strategy() {
        let data: ComposeViewData = yaml(
            r"
name: ELN
description: ELN view
maintainer: someone
labels: [eln]
repository: repo-eln
buildroot_strategy: root_logs
unwanted_packages: [kernel-debug]
workloads: [wl-1]
",
        );
        let allowed = arches();
        let mut context = DocumentContext::new("view-eln", &allowed);
        let (view, explicit) = context.compose_view(data);

        assert!(explicit);
        assert_eq!(view.buildroot_strategy, BuildrootStrategy::RootLogs);
        assert_eq!(view.repository.as_deref(), Some("repo-eln"));
        assert_eq!(view.unwanted_packages, vec!["kernel-debug"]);
        assert!(view.envs.is_empty());
    }

    #[test]
    fn test_relations_reject_unsupported_arch() {
        let data: RelationsData = serde_json::from_str(
            r#"{"view_id": "view-eln", "arch": "s390x", "pkgs": {}}"#,
        )
        .unwrap();
        let allowed = arches();
        let context = DocumentContext::new("rel", &allowed);
        assert!(matches!(
            context.relations(data),
            Err(ConfigError::UnsupportedArch { .. })
        ));
    }

    #[test]
    fn test_buildroot_source_packages() {
        let data: BuildrootData = yaml(
            r"
maintainer: someone
view_id: view-eln
base_buildroot:
  x86_64: [bash, rpm-build]
source_packages:
  x86_64:
    pitivi:
      requires: [meson, gcc]
    empty:
  aarch64:
",
        );
        let allowed = arches();
        let mut context = DocumentContext::new("br", &allowed);
        let buildroot = context.buildroot(data);

        assert_eq!(buildroot.base_buildroot["x86_64"], vec!["bash", "rpm-build"]);
        assert_eq!(
            buildroot.source_packages["x86_64"]["pitivi"].requires,
            vec!["meson", "gcc"]
        );
        assert!(buildroot.source_packages["x86_64"]["empty"].requires.is_empty());
        assert!(buildroot.source_packages["aarch64"].is_empty());
    }
}
