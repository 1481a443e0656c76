//! Buildroot package relations built from root log extraction.
//!
//! A relation document records, for one view and architecture, which source
//! packages directly required each binary package in the buildroot. The
//! build dependencies of a source package come from its mock root log.

use crate::entity::{BuildrootPkgRelation, PkgRelation};
use convenient_rootlog::BuildDeps;
use serde_json::json;
use std::collections::BTreeMap;

/// `document_type` of relation data files.
pub const RELATIONS_DOCUMENT_TYPE: &str = "buildroot-binary-relations";

/// Conventional id of the relation document for a view and architecture.
#[must_use]
pub fn relation_id(view_id: &str, arch: &str) -> String {
    format!("buildroot-pkg-relations--{view_id}--{arch}")
}

impl BuildrootPkgRelation {
    /// Create an empty relation document.
    pub fn new(view_id: impl Into<String>, arch: impl Into<String>) -> Self {
        let view_id = view_id.into();
        let arch = arch.into();
        Self {
            id: relation_id(&view_id, &arch),
            view_id,
            arch,
            pkg_relations: BTreeMap::new(),
        }
    }

    /// Relations of a single source package's extracted build dependencies.
    pub fn from_build_deps(
        view_id: impl Into<String>,
        arch: impl Into<String>,
        srpm_name: &str,
        deps: &BuildDeps,
    ) -> Self {
        let mut relation = Self::new(view_id, arch);
        relation.add_build_deps(srpm_name, deps);
        relation
    }

    /// Record that `srpm_name` requires every package in `deps`.
    pub fn add_build_deps<I, S>(&mut self, srpm_name: &str, deps: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for dep in deps {
            let _ = self
                .pkg_relations
                .entry(dep.as_ref().to_string())
                .or_default()
                .required_by
                .insert(srpm_name.to_string());
        }
    }

    /// Merge another relation document of the same view and architecture.
    pub fn merge(&mut self, other: &BuildrootPkgRelation) {
        for (pkg, relation) in &other.pkg_relations {
            let entry = self.pkg_relations.entry(pkg.clone()).or_default();
            merge_relation(entry, relation);
        }
    }

    /// Source packages directly requiring a binary package.
    pub fn required_by(&self, pkg: &str) -> impl Iterator<Item = &str> {
        self.pkg_relations
            .get(pkg)
            .into_iter()
            .flat_map(|relation| relation.required_by.iter().map(String::as_str))
    }

    /// The relation as a data document, ready to be written as JSON.
    #[must_use]
    pub fn to_document(&self) -> serde_json::Value {
        json!({
            "document_type": RELATIONS_DOCUMENT_TYPE,
            "version": 1,
            "data": {
                "view_id": self.view_id,
                "arch": self.arch,
                "pkgs": self.pkg_relations,
            }
        })
    }
}

fn merge_relation(into: &mut PkgRelation, from: &PkgRelation) {
    into.required_by.extend(from.required_by.iter().cloned());
    into.recommended_by.extend(from.recommended_by.iter().cloned());
    into.suggested_by.extend(from.suggested_by.iter().cloned());
    if into.source_name.is_none() {
        into.source_name.clone_from(&from.source_name);
    }
    if into.reponame.is_none() {
        into.reponame.clone_from(&from.reponame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(names: &[&str]) -> BuildDeps {
        names.iter().copied().collect()
    }

    #[test]
    fn test_from_build_deps() {
        let relation =
            BuildrootPkgRelation::from_build_deps("view-eln", "x86_64", "pitivi", &deps(&["gcc", "meson"]));

        assert_eq!(relation.id, "buildroot-pkg-relations--view-eln--x86_64");
        assert_eq!(relation.pkg_relations.len(), 2);
        assert_eq!(relation.required_by("gcc").collect::<Vec<_>>(), vec!["pitivi"]);
        assert_eq!(relation.required_by("bash").count(), 0);
    }

    #[test]
    fn test_merge_unions_sources() {
        let mut first =
            BuildrootPkgRelation::from_build_deps("v", "x86_64", "pitivi", &deps(&["gcc", "meson"]));
        let second =
            BuildrootPkgRelation::from_build_deps("v", "x86_64", "zstd", &deps(&["gcc", "lz4-devel"]));
        first.merge(&second);

        assert_eq!(first.pkg_relations.len(), 3);
        assert_eq!(
            first.required_by("gcc").collect::<Vec<_>>(),
            vec!["pitivi", "zstd"]
        );
    }

    #[test]
    fn test_document_shape() {
        let relation = BuildrootPkgRelation::from_build_deps("v", "aarch64", "pitivi", &deps(&["gcc"]));
        let document = relation.to_document();

        assert_eq!(document["document_type"], RELATIONS_DOCUMENT_TYPE);
        assert_eq!(document["data"]["arch"], "aarch64");
        assert_eq!(document["data"]["pkgs"]["gcc"]["required_by"][0], "pitivi");
    }

    #[test]
    fn test_document_loads_back() {
        let mut relation = BuildrootPkgRelation::from_build_deps(
            "view-eln",
            "x86_64",
            "pitivi",
            &deps(&["gcc", "meson", "gstreamer1-vaapi"]),
        );
        relation.add_build_deps("zstd", ["gcc", "lz4-devel"]);
        let gcc = relation.pkg_relations.get_mut("gcc").unwrap();
        let _ = gcc.recommended_by.insert("annobin".to_string());
        gcc.source_name = Some("gcc".to_string());
        gcc.reponame = Some("BaseOS".to_string());

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(format!("{}.json", relation.id));
        let text = serde_json::to_string_pretty(&relation.to_document()).unwrap();
        std::fs::write(path, text).unwrap();

        let loaded = crate::loader::load_configs(&crate::settings::Settings::new(dir.path())).unwrap();
        assert!(loaded.report.errors.is_empty());
        assert_eq!(
            loaded.store.buildroot_pkg_relations()[&relation.id],
            relation
        );
    }
}
