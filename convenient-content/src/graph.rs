//! Retention graph over configuration entities.
//!
//! Every entity is a node. An edge `a -> b` means "retaining `a` retains
//! `b`". Resolving a label selection is reachability from the selected
//! nodes; no filtering at all is the full node set.
//!
//! References whose target is not in the snapshot are kept per node. They
//! only become an error once the node holding them is retained.

use crate::entity::EntityRef;
use crate::error::ConfigIntegrityError;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

/// Node identifier in the entity graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

/// Why retaining one entity retains another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Explicit id reference (view to repo, workload to env, ...)
    References,
    /// Entity attached to a view (buildroots, relations, unwanted lists)
    Carries,
    /// Entity carries a label that has a label document
    Tags,
}

#[derive(Debug, Clone)]
struct Node {
    entity: EntityRef,
    outgoing: Vec<(NodeId, EdgeKind)>,
    dangling: Vec<EntityRef>,
}

/// Directed graph of retention edges between entities.
#[derive(Debug, Clone, Default)]
pub struct EntityGraph {
    nodes: Vec<Node>,
    index: HashMap<EntityRef, NodeId>,
}

impl EntityGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node for the entity, returning the existing one if present.
    pub fn add_node(&mut self, entity: EntityRef) -> NodeId {
        if let Some(&id) = self.index.get(&entity) {
            return id;
        }
        let id = NodeId(self.nodes.len());
        let _ = self.index.insert(entity.clone(), id);
        self.nodes.push(Node {
            entity,
            outgoing: Vec::new(),
            dangling: Vec::new(),
        });
        id
    }

    /// Look up the node of an entity.
    #[must_use]
    pub fn find(&self, entity: &EntityRef) -> Option<NodeId> {
        self.index.get(entity).copied()
    }

    /// Add a retention edge. Duplicate edges are ignored.
    ///
    /// Returns `false` if the edge already existed or either id is unknown.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, kind: EdgeKind) -> bool {
        if to.0 >= self.nodes.len() {
            return false;
        }
        let Some(node) = self.nodes.get_mut(from.0) else {
            return false;
        };
        if node.outgoing.iter().any(|&(target, _)| target == to) {
            return false;
        }
        node.outgoing.push((to, kind));
        true
    }

    /// Record a reference from `from` to an entity that is not in the graph.
    pub fn add_dangling(&mut self, from: NodeId, target: EntityRef) {
        if let Some(node) = self.nodes.get_mut(from.0) {
            node.dangling.push(target);
        }
    }

    /// Entity of a node.
    #[must_use]
    pub fn entity(&self, id: NodeId) -> Option<&EntityRef> {
        self.nodes.get(id.0).map(|node| &node.entity)
    }

    /// Direct retention targets of a node.
    #[must_use]
    pub fn targets(&self, id: NodeId) -> Vec<(NodeId, EdgeKind)> {
        self.nodes
            .get(id.0)
            .map(|node| node.outgoing.clone())
            .unwrap_or_default()
    }

    /// Get the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get the number of edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|node| node.outgoing.len()).sum()
    }

    /// Number of edges of one kind.
    #[must_use]
    pub fn edge_count_of(&self, kind: EdgeKind) -> usize {
        self.nodes
            .iter()
            .flat_map(|node| &node.outgoing)
            .filter(|(_, edge_kind)| *edge_kind == kind)
            .count()
    }

    /// All node ids, in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Every recorded dangling reference, in node order.
    #[must_use]
    pub fn dangling_references(&self) -> Vec<(EntityRef, EntityRef)> {
        self.nodes
            .iter()
            .flat_map(|node| {
                node.dangling
                    .iter()
                    .map(|target| (node.entity.clone(), target.clone()))
            })
            .collect()
    }

    /// Fail on the first dangling reference of the whole graph.
    ///
    /// # Errors
    ///
    /// Returns `ConfigIntegrityError::DanglingReference` for the first node
    /// (in insertion order) holding a reference to a missing entity.
    pub fn check_integrity(&self) -> Result<(), ConfigIntegrityError> {
        self.nodes.iter().try_for_each(Self::check_node)
    }

    /// Collect every node reachable from the seeds, seeds included.
    ///
    /// Traversal is breadth first in seed order, so the reported error is
    /// stable for a given snapshot and selection.
    ///
    /// # Errors
    ///
    /// Returns `ConfigIntegrityError::DanglingReference` when a reached node
    /// references a missing entity.
    pub fn reachable(
        &self,
        seeds: &BTreeSet<NodeId>,
    ) -> Result<HashSet<NodeId>, ConfigIntegrityError> {
        let mut visited = HashSet::new();
        let mut queue: VecDeque<NodeId> = seeds.iter().copied().collect();

        while let Some(current) = queue.pop_front() {
            if visited.contains(&current) {
                continue;
            }
            let Some(node) = self.nodes.get(current.0) else {
                continue;
            };
            Self::check_node(node)?;
            let _ = visited.insert(current);

            for &(neighbor, _) in &node.outgoing {
                if !visited.contains(&neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }

        Ok(visited)
    }

    fn check_node(node: &Node) -> Result<(), ConfigIntegrityError> {
        match node.dangling.first() {
            Some(target) => Err(ConfigIntegrityError::DanglingReference {
                from: node.entity.clone(),
                to: target.clone(),
            }),
            None => Ok(()),
        }
    }
}
