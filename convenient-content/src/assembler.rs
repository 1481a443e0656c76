//! Projection of retained ids onto full records.

use crate::closure::RetainedIds;
use crate::entity::{
    Buildroot, BuildrootPkgRelation, EntityKind, Env, Label, Repo, Unwanted, View, Workload,
};
use crate::store::EntityStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Resolved configuration, keyed by kind then id.
///
/// Serializes with the eight keys always present, in a fixed order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configs {
    /// Retained repos
    pub repos: BTreeMap<String, Repo>,
    /// Retained envs
    pub envs: BTreeMap<String, Env>,
    /// Retained workloads
    pub workloads: BTreeMap<String, Workload>,
    /// Retained views
    pub views: BTreeMap<String, View>,
    /// Labels carried by retained entities
    pub labels: BTreeMap<String, Label>,
    /// Unwanted lists of retained views
    pub unwanteds: BTreeMap<String, Unwanted>,
    /// Buildroots of retained views
    pub buildroots: BTreeMap<String, Buildroot>,
    /// Buildroot package relations of retained views
    pub buildroot_pkg_relations: BTreeMap<String, BuildrootPkgRelation>,
}

impl Configs {
    /// Number of records of a kind.
    #[must_use]
    pub fn count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Repo => self.repos.len(),
            EntityKind::Env => self.envs.len(),
            EntityKind::Workload => self.workloads.len(),
            EntityKind::View => self.views.len(),
            EntityKind::Label => self.labels.len(),
            EntityKind::Unwanted => self.unwanteds.len(),
            EntityKind::Buildroot => self.buildroots.len(),
            EntityKind::BuildrootPkgRelation => self.buildroot_pkg_relations.len(),
        }
    }

    /// Ids of a kind, sorted.
    #[must_use]
    pub fn ids(&self, kind: EntityKind) -> Vec<&str> {
        fn keys<T>(map: &BTreeMap<String, T>) -> Vec<&str> {
            map.keys().map(String::as_str).collect()
        }
        match kind {
            EntityKind::Repo => keys(&self.repos),
            EntityKind::Env => keys(&self.envs),
            EntityKind::Workload => keys(&self.workloads),
            EntityKind::View => keys(&self.views),
            EntityKind::Label => keys(&self.labels),
            EntityKind::Unwanted => keys(&self.unwanteds),
            EntityKind::Buildroot => keys(&self.buildroots),
            EntityKind::BuildrootPkgRelation => keys(&self.buildroot_pkg_relations),
        }
    }

    /// Whether no kind holds any record.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        EntityKind::ALL.iter().all(|kind| self.count(*kind) == 0)
    }

    /// Record counts per kind.
    #[must_use]
    pub fn summary(&self) -> ConfigsSummary {
        ConfigsSummary {
            counts: EntityKind::ALL.map(|kind| (kind, self.count(kind))),
        }
    }
}

/// Per-kind record counts, printable as one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigsSummary {
    counts: [(EntityKind, usize); 8],
}

impl ConfigsSummary {
    /// Count of one kind.
    #[must_use]
    pub fn count(&self, kind: EntityKind) -> usize {
        self.counts
            .iter()
            .find(|(k, _)| *k == kind)
            .map_or(0, |(_, count)| *count)
    }
}

impl fmt::Display for ConfigsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .counts
            .iter()
            .map(|(kind, count)| format!("{}={count}", kind.key()))
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// Build the output by looking up every retained id in the snapshot.
///
/// # Panics
///
/// Panics if a retained id is missing from the snapshot. Retained ids only
/// come from the snapshot's own graph, so this is an internal invariant.
#[must_use]
pub fn assemble(retained: &RetainedIds, store: &EntityStore) -> Configs {
    Configs {
        repos: project(EntityKind::Repo, retained, store.repos()),
        envs: project(EntityKind::Env, retained, store.envs()),
        workloads: project(EntityKind::Workload, retained, store.workloads()),
        views: project(EntityKind::View, retained, store.views()),
        labels: project(EntityKind::Label, retained, store.labels()),
        unwanteds: project(EntityKind::Unwanted, retained, store.unwanteds()),
        buildroots: project(EntityKind::Buildroot, retained, store.buildroots()),
        buildroot_pkg_relations: project(
            EntityKind::BuildrootPkgRelation,
            retained,
            store.buildroot_pkg_relations(),
        ),
    }
}

#[allow(clippy::panic)]
fn project<T: Clone>(
    kind: EntityKind,
    retained: &RetainedIds,
    source: &BTreeMap<String, T>,
) -> BTreeMap<String, T> {
    retained
        .ids(kind)
        .iter()
        .map(|id| match source.get(id) {
            Some(record) => (id.clone(), record.clone()),
            None => panic!("retained {kind} '{id}' is not in the snapshot"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityRef;

    fn store() -> EntityStore {
        EntityStore::builder()
            .repo(Repo::new("repo-a"))
            .repo(Repo::new("repo-b"))
            .label(Label::new("eln"))
            .build()
    }

    #[test]
    fn test_assemble_projects_records() {
        let store = store();
        let mut retained = RetainedIds::default();
        let _ = retained.insert(EntityRef::new(EntityKind::Repo, "repo-b"));

        let configs = assemble(&retained, &store);
        assert_eq!(configs.ids(EntityKind::Repo), vec!["repo-b"]);
        assert_eq!(configs.repos["repo-b"], store.repos()["repo-b"]);
        assert_eq!(configs.count(EntityKind::Label), 0);
    }

    #[test]
    #[should_panic(expected = "is not in the snapshot")]
    fn test_assemble_panics_on_unknown_id() {
        let store = store();
        let mut retained = RetainedIds::default();
        let _ = retained.insert(EntityRef::new(EntityKind::Repo, "ghost"));
        let _ = assemble(&retained, &store);
    }

    #[test]
    fn test_empty_output_has_all_keys() {
        let json = serde_json::to_value(Configs::default()).unwrap();
        let keys: Vec<&str> = json
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        let mut expected: Vec<&str> = EntityKind::ALL.iter().map(|kind| kind.key()).collect();
        expected.sort_unstable();
        assert_eq!(keys, expected);
    }

    #[test]
    fn test_serialized_key_order() {
        let json = serde_json::to_string(&Configs::default()).unwrap();
        assert_eq!(
            json,
            r#"{"repos":{},"envs":{},"workloads":{},"views":{},"labels":{},"unwanteds":{},"buildroots":{},"buildroot_pkg_relations":{}}"#
        );
    }

    #[test]
    fn test_summary_display() {
        let store = store();
        let mut retained = RetainedIds::default();
        let _ = retained.insert(EntityRef::new(EntityKind::Repo, "repo-a"));
        let summary = assemble(&retained, &store).summary();

        assert_eq!(summary.count(EntityKind::Repo), 1);
        assert!(summary.to_string().starts_with("repos=1 envs=0"));
    }
}
