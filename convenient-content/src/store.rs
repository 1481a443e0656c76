//! Immutable snapshot of all loaded configuration entities.
//!
//! The store owns one map per entity kind, keyed by id. The retention graph
//! and the label index are derived once when the store is built and never
//! change afterwards, so a store can be shared freely between readers.

use crate::entity::{
    Buildroot, BuildrootPkgRelation, Entity, EntityKind, EntityRef, Env, Label, Repo, Unwanted,
    View, Workload,
};
use crate::graph::{EdgeKind, EntityGraph, NodeId};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Builder collecting entities before the snapshot is frozen.
#[derive(Debug, Clone, Default)]
pub struct EntityStoreBuilder {
    repos: BTreeMap<String, Repo>,
    envs: BTreeMap<String, Env>,
    workloads: BTreeMap<String, Workload>,
    views: BTreeMap<String, View>,
    labels: BTreeMap<String, Label>,
    unwanteds: BTreeMap<String, Unwanted>,
    buildroots: BTreeMap<String, Buildroot>,
    buildroot_pkg_relations: BTreeMap<String, BuildrootPkgRelation>,
}

impl EntityStoreBuilder {
    /// Add a repo, replacing any repo with the same id
    #[must_use]
    pub fn repo(mut self, repo: Repo) -> Self {
        let _ = self.repos.insert(repo.id.clone(), repo);
        self
    }

    /// Add an env
    #[must_use]
    pub fn env(mut self, env: Env) -> Self {
        let _ = self.envs.insert(env.id.clone(), env);
        self
    }

    /// Add a workload
    #[must_use]
    pub fn workload(mut self, workload: Workload) -> Self {
        let _ = self.workloads.insert(workload.id.clone(), workload);
        self
    }

    /// Add a view
    #[must_use]
    pub fn view(mut self, view: View) -> Self {
        let _ = self.views.insert(view.id.clone(), view);
        self
    }

    /// Add a label
    #[must_use]
    pub fn label(mut self, label: Label) -> Self {
        let _ = self.labels.insert(label.id.clone(), label);
        self
    }

    /// Add an unwanted list
    #[must_use]
    pub fn unwanted(mut self, unwanted: Unwanted) -> Self {
        let _ = self.unwanteds.insert(unwanted.id.clone(), unwanted);
        self
    }

    /// Add a buildroot
    #[must_use]
    pub fn buildroot(mut self, buildroot: Buildroot) -> Self {
        let _ = self.buildroots.insert(buildroot.id.clone(), buildroot);
        self
    }

    /// Add a buildroot package relation
    #[must_use]
    pub fn buildroot_pkg_relation(mut self, relation: BuildrootPkgRelation) -> Self {
        let _ = self
            .buildroot_pkg_relations
            .insert(relation.id.clone(), relation);
        self
    }

    /// Freeze the snapshot and derive its indices.
    #[must_use]
    pub fn build(self) -> EntityStore {
        let mut graph = EntityGraph::new();
        add_nodes(&mut graph, &self.repos);
        add_nodes(&mut graph, &self.envs);
        add_nodes(&mut graph, &self.workloads);
        add_nodes(&mut graph, &self.views);
        add_nodes(&mut graph, &self.labels);
        add_nodes(&mut graph, &self.unwanteds);
        add_nodes(&mut graph, &self.buildroots);
        add_nodes(&mut graph, &self.buildroot_pkg_relations);

        link_references(&mut graph, &self.envs);
        link_references(&mut graph, &self.workloads);
        link_references(&mut graph, &self.views);

        link_attachments(&mut graph, &self.buildroots);
        link_attachments(&mut graph, &self.buildroot_pkg_relations);
        link_unwanteds(&mut graph, &self.views, &self.unwanteds);

        link_labels(&mut graph, &self.repos);
        link_labels(&mut graph, &self.envs);
        link_labels(&mut graph, &self.workloads);
        link_labels(&mut graph, &self.views);
        link_labels(&mut graph, &self.unwanteds);

        let mut label_index = HashMap::new();
        index_labels(&mut label_index, &graph, &self.repos);
        index_labels(&mut label_index, &graph, &self.envs);
        index_labels(&mut label_index, &graph, &self.workloads);
        index_labels(&mut label_index, &graph, &self.views);

        let fingerprint = self.fingerprint();

        debug!(
            "Built entity store: {} nodes, {} edges ({} references, {} carried, {} tags), {} labels indexed",
            graph.node_count(),
            graph.edge_count(),
            graph.edge_count_of(EdgeKind::References),
            graph.edge_count_of(EdgeKind::Carries),
            graph.edge_count_of(EdgeKind::Tags),
            label_index.len()
        );

        EntityStore {
            repos: self.repos,
            envs: self.envs,
            workloads: self.workloads,
            views: self.views,
            labels: self.labels,
            unwanteds: self.unwanteds,
            buildroots: self.buildroots,
            buildroot_pkg_relations: self.buildroot_pkg_relations,
            graph,
            label_index,
            fingerprint,
        }
    }

    /// SHA-256 over the canonical JSON of every kind, in output order.
    fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hash_kind(&mut hasher, EntityKind::Repo, &self.repos);
        hash_kind(&mut hasher, EntityKind::Env, &self.envs);
        hash_kind(&mut hasher, EntityKind::Workload, &self.workloads);
        hash_kind(&mut hasher, EntityKind::View, &self.views);
        hash_kind(&mut hasher, EntityKind::Label, &self.labels);
        hash_kind(&mut hasher, EntityKind::Unwanted, &self.unwanteds);
        hash_kind(&mut hasher, EntityKind::Buildroot, &self.buildroots);
        hash_kind(
            &mut hasher,
            EntityKind::BuildrootPkgRelation,
            &self.buildroot_pkg_relations,
        );
        format!("{:x}", hasher.finalize())
    }
}

fn hash_kind<T: Serialize>(hasher: &mut Sha256, kind: EntityKind, entities: &BTreeMap<String, T>) {
    hasher.update(kind.key().as_bytes());
    // String-keyed maps of plain records always serialize
    if let Ok(bytes) = serde_json::to_vec(entities) {
        hasher.update(&bytes);
    }
}

fn add_nodes<E: Entity>(graph: &mut EntityGraph, entities: &BTreeMap<String, E>) {
    for entity in entities.values() {
        let _ = graph.add_node(entity.entity_ref());
    }
}

fn node_of<E: Entity>(graph: &EntityGraph, entity: &E) -> Option<NodeId> {
    graph.find(&entity.entity_ref())
}

fn link_references<E: Entity>(graph: &mut EntityGraph, entities: &BTreeMap<String, E>) {
    for entity in entities.values() {
        let Some(from) = node_of(graph, entity) else {
            continue;
        };
        for target in entity.references() {
            match graph.find(&target) {
                Some(to) => {
                    let _ = graph.add_edge(from, to, EdgeKind::References);
                }
                None => graph.add_dangling(from, target),
            }
        }
    }
}

fn link_attachments<E: Entity>(graph: &mut EntityGraph, entities: &BTreeMap<String, E>) {
    for entity in entities.values() {
        let owner = entity.attached_to().and_then(|owner| graph.find(&owner));
        if let (Some(owner), Some(attached)) = (owner, node_of(graph, entity)) {
            let _ = graph.add_edge(owner, attached, EdgeKind::Carries);
        }
    }
}

fn link_unwanteds(
    graph: &mut EntityGraph,
    views: &BTreeMap<String, View>,
    unwanteds: &BTreeMap<String, Unwanted>,
) {
    for view in views.values() {
        let Some(from) = node_of(graph, view) else {
            continue;
        };
        for unwanted in unwanteds.values() {
            if view.labels.is_disjoint(&unwanted.labels) {
                continue;
            }
            if let Some(to) = node_of(graph, unwanted) {
                let _ = graph.add_edge(from, to, EdgeKind::Carries);
            }
        }
    }
}

fn link_labels<E: Entity>(graph: &mut EntityGraph, entities: &BTreeMap<String, E>) {
    for entity in entities.values() {
        let Some(from) = node_of(graph, entity) else {
            continue;
        };
        for label in entity.labels() {
            if let Some(to) = graph.find(&EntityRef::new(EntityKind::Label, label)) {
                let _ = graph.add_edge(from, to, EdgeKind::Tags);
            }
        }
    }
}

fn index_labels<E: Entity>(
    index: &mut HashMap<String, BTreeSet<NodeId>>,
    graph: &EntityGraph,
    entities: &BTreeMap<String, E>,
) {
    for entity in entities.values() {
        let Some(node) = node_of(graph, entity) else {
            continue;
        };
        for label in entity.labels() {
            let _ = index.entry(label.clone()).or_default().insert(node);
        }
    }
}

/// Loaded configuration snapshot.
#[derive(Debug, Clone)]
pub struct EntityStore {
    repos: BTreeMap<String, Repo>,
    envs: BTreeMap<String, Env>,
    workloads: BTreeMap<String, Workload>,
    views: BTreeMap<String, View>,
    labels: BTreeMap<String, Label>,
    unwanteds: BTreeMap<String, Unwanted>,
    buildroots: BTreeMap<String, Buildroot>,
    buildroot_pkg_relations: BTreeMap<String, BuildrootPkgRelation>,
    graph: EntityGraph,
    label_index: HashMap<String, BTreeSet<NodeId>>,
    fingerprint: String,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl EntityStore {
    /// Start building a snapshot.
    #[must_use]
    pub fn builder() -> EntityStoreBuilder {
        EntityStoreBuilder::default()
    }

    /// Repos by id.
    #[must_use]
    pub fn repos(&self) -> &BTreeMap<String, Repo> {
        &self.repos
    }

    /// Envs by id.
    #[must_use]
    pub fn envs(&self) -> &BTreeMap<String, Env> {
        &self.envs
    }

    /// Workloads by id.
    #[must_use]
    pub fn workloads(&self) -> &BTreeMap<String, Workload> {
        &self.workloads
    }

    /// Views by id.
    #[must_use]
    pub fn views(&self) -> &BTreeMap<String, View> {
        &self.views
    }

    /// Label documents by id.
    #[must_use]
    pub fn labels(&self) -> &BTreeMap<String, Label> {
        &self.labels
    }

    /// Unwanted lists by id.
    #[must_use]
    pub fn unwanteds(&self) -> &BTreeMap<String, Unwanted> {
        &self.unwanteds
    }

    /// Buildroots by id.
    #[must_use]
    pub fn buildroots(&self) -> &BTreeMap<String, Buildroot> {
        &self.buildroots
    }

    /// Buildroot package relations by id.
    #[must_use]
    pub fn buildroot_pkg_relations(&self) -> &BTreeMap<String, BuildrootPkgRelation> {
        &self.buildroot_pkg_relations
    }

    /// Number of entities of a kind.
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

    /// Whether the snapshot holds the entity.
    #[must_use]
    pub fn contains(&self, entity: &EntityRef) -> bool {
        self.graph.find(entity).is_some()
    }

    /// Retention graph of the snapshot.
    #[must_use]
    pub fn graph(&self) -> &EntityGraph {
        &self.graph
    }

    /// Nodes of label-selectable entities carrying the label.
    pub fn labelled(&self, label: &str) -> impl Iterator<Item = NodeId> + '_ {
        self.label_index.get(label).into_iter().flatten().copied()
    }

    /// Content hash identifying this snapshot.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}
