//! Dependency closure of a label selection.
//!
//! Without a filter every entity is retained. With a filter the directly
//! selected entities are retained together with everything they reach in
//! the retention graph:
//!
//! - a view retains its repo, envs, workloads and base view
//! - a workload retains its target envs, an env its repos
//! - a view retains its buildroots, package relations and the unwanted
//!   lists sharing one of its labels
//! - any retained entity retains the label documents of its labels

use crate::entity::{EntityKind, EntityRef};
use crate::error::ConfigIntegrityError;
use crate::graph::NodeId;
use crate::labels::{self, LabelSelection};
use crate::store::EntityStore;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Ids retained per entity kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetainedIds {
    ids: BTreeMap<EntityKind, BTreeSet<String>>,
}

impl RetainedIds {
    /// Retained ids of one kind.
    #[must_use]
    pub fn ids(&self, kind: EntityKind) -> &BTreeSet<String> {
        static NONE: BTreeSet<String> = BTreeSet::new();
        self.ids.get(&kind).unwrap_or(&NONE)
    }

    /// Whether the entity is retained.
    #[must_use]
    pub fn contains(&self, entity: &EntityRef) -> bool {
        self.ids(entity.kind).contains(&entity.id)
    }

    /// Total number of retained entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.values().map(BTreeSet::len).sum()
    }

    /// Whether nothing was retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mark an entity retained.
    pub fn insert(&mut self, entity: EntityRef) -> bool {
        self.ids.entry(entity.kind).or_default().insert(entity.id)
    }

    /// Whether every id retained here is retained by `other` too.
    #[must_use]
    pub fn is_subset(&self, other: &RetainedIds) -> bool {
        self.ids
            .iter()
            .all(|(kind, ids)| ids.is_subset(other.ids(*kind)))
    }

    fn from_nodes(store: &EntityStore, nodes: impl IntoIterator<Item = NodeId>) -> Self {
        let mut retained = Self::default();
        for node in nodes {
            if let Some(entity) = store.graph().entity(node) {
                let _ = retained.insert(entity.clone());
            }
        }
        retained
    }
}

/// Compute the retained ids of every kind for a selection.
///
/// # Errors
///
/// Returns `ConfigIntegrityError` if a retained entity references an id
/// missing from the snapshot.
pub fn close(
    store: &EntityStore,
    selection: &LabelSelection,
) -> Result<RetainedIds, ConfigIntegrityError> {
    let graph = store.graph();
    match selection {
        LabelSelection::All => {
            graph.check_integrity()?;
            Ok(RetainedIds::from_nodes(store, graph.node_ids()))
        }
        LabelSelection::Only(labels) => {
            let seeds = labels::select(store, labels);
            debug!(
                "{} entities selected directly by labels {}",
                seeds.len(),
                selection
            );
            let reached = graph.reachable(&seeds)?;
            Ok(RetainedIds::from_nodes(store, reached))
        }
    }
}
