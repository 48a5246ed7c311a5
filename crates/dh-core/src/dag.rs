//! Patch dependency graph and ordered traversal

use crate::error::{CoreError, CoreResult};
use crate::patch::SqlPatch;
use crate::patch_name::PatchName;
use chrono::NaiveDateTime;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction as EdgeDirection;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// Traversal direction of a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Dependencies first, ties by ascending timestamp
    Forward,
    /// Dependents first, ties by descending timestamp
    Reverse,
}

#[derive(Debug, Clone)]
struct PatchNode {
    name: PatchName,
    timestamp: NaiveDateTime,
}

/// Sort key for tie-breaking: timestamp, then name for determinism.
type NodeKey = (NaiveDateTime, PatchName);

/// Patches whose prerequisites are done, oldest or newest first.
enum ReadySet {
    Oldest(BinaryHeap<Reverse<(NodeKey, NodeIndex)>>),
    Newest(BinaryHeap<(NodeKey, NodeIndex)>),
}

impl ReadySet {
    fn new(direction: Direction) -> Self {
        match direction {
            Direction::Forward => ReadySet::Oldest(BinaryHeap::new()),
            Direction::Reverse => ReadySet::Newest(BinaryHeap::new()),
        }
    }

    fn push(&mut self, key: NodeKey, idx: NodeIndex) {
        match self {
            ReadySet::Oldest(heap) => heap.push(Reverse((key, idx))),
            ReadySet::Newest(heap) => heap.push((key, idx)),
        }
    }

    fn pop(&mut self) -> Option<NodeIndex> {
        match self {
            ReadySet::Oldest(heap) => heap.pop().map(|Reverse((_, idx))| idx),
            ReadySet::Newest(heap) => heap.pop().map(|(_, idx)| idx),
        }
    }
}

/// A directed acyclic graph of patch dependencies
#[derive(Debug)]
pub struct PatchDag {
    /// Edges point from a dependency to its dependent
    graph: DiGraph<PatchNode, ()>,
}

impl PatchDag {
    /// Build the graph over `patches`.
    ///
    /// Only dependencies between members become edges; the caller decides
    /// what an outside dependency means. If the bootstrap patch is a member
    /// it becomes the root every other member depends on.
    pub fn build(patches: &[&SqlPatch]) -> CoreResult<Self> {
        let mut graph = DiGraph::new();
        let mut node_map = HashMap::new();

        for patch in patches {
            let idx = graph.add_node(PatchNode {
                name: patch.name.clone(),
                timestamp: patch.timestamp,
            });
            node_map.insert(patch.name.clone(), idx);
        }

        let root = patches
            .iter()
            .find(|p| p.is_bootstrap())
            .and_then(|p| node_map.get(&p.name).copied());

        for patch in patches {
            let to = node_map[&patch.name];
            if let Some(root) = root {
                if root != to {
                    graph.update_edge(root, to, ());
                }
            }
            for dep in &patch.dependencies {
                if let Some(&from) = node_map.get(dep) {
                    graph.update_edge(from, to, ());
                }
            }
        }

        let dag = Self { graph };
        dag.validate()?;
        Ok(dag)
    }

    /// Validate the graph has no cycles
    pub fn validate(&self) -> CoreResult<()> {
        let cyclic = tarjan_scc(&self.graph)
            .into_iter()
            .find(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]));
        match cyclic {
            None => Ok(()),
            Some(component) => Err(CoreError::DependencyCycle {
                cycle: self.find_cycle_path(&component),
            }),
        }
    }

    /// Render one closed loop through a strongly connected component.
    ///
    /// Every member of the component has a successor inside it, so walking
    /// only in-component edges must revisit a node.
    fn find_cycle_path(&self, component: &[NodeIndex]) -> String {
        let members: HashSet<NodeIndex> = component.iter().copied().collect();
        let mut path: Vec<NodeIndex> = Vec::with_capacity(component.len() + 1);
        let mut current = component.iter().copied().min_by_key(|&idx| self.key(idx));

        while let Some(idx) = current {
            if let Some(pos) = path.iter().position(|&seen| seen == idx) {
                path.drain(..pos);
                path.push(idx);
                break;
            }
            path.push(idx);
            current = self
                .graph
                .edges(idx)
                .map(|edge| edge.target())
                .filter(|target| members.contains(target))
                .min_by_key(|&target| self.key(target));
        }

        path.iter()
            .map(|&idx| self.graph[idx].name.to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// Stable topological order.
    ///
    /// Kahn's algorithm where the ready set is a priority queue, so among the
    /// patches whose prerequisites are satisfied the oldest (forward) or the
    /// newest (reverse) goes next.
    pub fn ordered(&self, direction: Direction) -> Vec<PatchName> {
        // In reverse, a node becomes ready once all its dependents are done
        let blocked_by = match direction {
            Direction::Forward => EdgeDirection::Incoming,
            Direction::Reverse => EdgeDirection::Outgoing,
        };
        let unlocks = blocked_by.opposite();

        let mut pending: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|idx| (idx, self.graph.edges_directed(idx, blocked_by).count()))
            .collect();

        let mut ready = ReadySet::new(direction);
        for (&idx, &count) in &pending {
            if count == 0 {
                ready.push(self.key(idx), idx);
            }
        }

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(idx) = ready.pop() {
            order.push(self.graph[idx].name.clone());

            for edge in self.graph.edges_directed(idx, unlocks) {
                let neighbor = match unlocks {
                    EdgeDirection::Outgoing => edge.target(),
                    EdgeDirection::Incoming => edge.source(),
                };
                if let Some(count) = pending.get_mut(&neighbor) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(self.key(neighbor), neighbor);
                    }
                }
            }
        }

        order
    }

    fn key(&self, idx: NodeIndex) -> NodeKey {
        let node = &self.graph[idx];
        (node.timestamp, node.name.clone())
    }
}

#[cfg(test)]
#[path = "dag_test.rs"]
mod tests;
