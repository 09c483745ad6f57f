use petgraph::Direction;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::{EdgeRef, IntoEdgeReferences, NodeIndexable};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Topology-level view of one relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// Relation id; unique per edge, parallel edges have different keys
    pub key: String,
    pub source: String,
    pub target: String,
    pub relation_type: String,
}

/// Directed multigraph primitives the knowledge graph is built on.
///
/// Nodes are identified by entity id and edges by relation id. Implementations
/// must create missing endpoint nodes when an edge is added.
pub trait GraphStore: Default + Send + Sync {
    /// Returns `true` if the node was new.
    fn add_node(&mut self, id: &str) -> bool;

    fn contains_node(&self, id: &str) -> bool;

    /// Insert or replace the edge with `edge.key`.
    fn add_edge(&mut self, edge: EdgeRecord);

    fn edge(&self, key: &str) -> Option<&EdgeRecord>;

    /// Node ids in insertion order.
    fn node_ids(&self) -> Vec<&str>;

    fn edges(&self) -> Vec<&EdgeRecord>;

    fn node_count(&self) -> usize;

    fn edge_count(&self) -> usize;

    fn out_edges(&self, id: &str) -> Vec<&EdgeRecord>;

    fn in_edges(&self, id: &str) -> Vec<&EdgeRecord>;

    fn successors(&self, id: &str) -> Vec<&str> {
        let mut out: Vec<&str> = self.out_edges(id).into_iter().map(|e| e.target.as_str()).collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    fn predecessors(&self, id: &str) -> Vec<&str> {
        let mut out: Vec<&str> = self.in_edges(id).into_iter().map(|e| e.source.as_str()).collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Total degree, parallel edges counted individually.
    fn degree(&self, id: &str) -> usize {
        self.out_edges(id).len() + self.in_edges(id).len()
    }

    /// Fewest-hop directed path with at most `max_len` edges.
    fn shortest_path(&self, source: &str, target: &str, max_len: usize) -> Option<Vec<String>> {
        if !self.contains_node(source) || !self.contains_node(target) {
            return None;
        }
        if source == target {
            return Some(vec![source.to_string()]);
        }

        let mut parent: HashMap<&str, &str> = HashMap::new();
        let mut visited: HashSet<&str> = HashSet::from([source]);
        let mut queue: VecDeque<(&str, usize)> = VecDeque::from([(source, 0)]);

        while let Some((node, depth)) = queue.pop_front() {
            if depth == max_len {
                continue;
            }
            for next in self.successors(node) {
                if !visited.insert(next) {
                    continue;
                }
                parent.insert(next, node);
                if next == target {
                    let mut path = vec![target.to_string()];
                    let mut cursor = target;
                    while let Some(&prev) = parent.get(cursor) {
                        path.push(prev.to_string());
                        cursor = prev;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back((next, depth + 1));
            }
        }

        None
    }

    /// Weakly connected components, each sorted, largest first.
    fn connected_components(&self) -> Vec<Vec<String>>;
}

/// `GraphStore` backed by a petgraph `StableDiGraph`.
#[derive(Debug, Clone, Default)]
pub struct PetgraphStore {
    graph: StableDiGraph<String, EdgeRecord>,
    nodes: HashMap<String, NodeIndex>,
    edges: HashMap<String, EdgeIndex>,
}

impl PetgraphStore {
    fn ensure_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(id.to_string());
        self.nodes.insert(id.to_string(), idx);
        idx
    }

    fn directed_edges(&self, id: &str, direction: Direction) -> Vec<&EdgeRecord> {
        match self.nodes.get(id) {
            Some(&idx) => {
                let mut edges: Vec<(EdgeIndex, &EdgeRecord)> = self
                    .graph
                    .edges_directed(idx, direction)
                    .map(|e| (e.id(), e.weight()))
                    .collect();
                edges.sort_by_key(|(idx, _)| *idx);
                edges.into_iter().map(|(_, e)| e).collect()
            }
            None => Vec::new(),
        }
    }
}

impl GraphStore for PetgraphStore {
    fn add_node(&mut self, id: &str) -> bool {
        let before = self.nodes.len();
        self.ensure_node(id);
        self.nodes.len() > before
    }

    fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    fn add_edge(&mut self, edge: EdgeRecord) {
        if let Some(old) = self.edges.remove(&edge.key) {
            self.graph.remove_edge(old);
        }
        let source = self.ensure_node(&edge.source);
        let target = self.ensure_node(&edge.target);
        let key = edge.key.clone();
        let idx = self.graph.add_edge(source, target, edge);
        self.edges.insert(key, idx);
    }

    fn edge(&self, key: &str) -> Option<&EdgeRecord> {
        self.edges.get(key).and_then(|&idx| self.graph.edge_weight(idx))
    }

    fn node_ids(&self) -> Vec<&str> {
        self.graph
            .node_indices()
            .filter_map(|idx| self.graph.node_weight(idx).map(String::as_str))
            .collect()
    }

    fn edges(&self) -> Vec<&EdgeRecord> {
        self.graph.edge_references().map(|e| e.weight()).collect()
    }

    fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn out_edges(&self, id: &str) -> Vec<&EdgeRecord> {
        self.directed_edges(id, Direction::Outgoing)
    }

    fn in_edges(&self, id: &str) -> Vec<&EdgeRecord> {
        self.directed_edges(id, Direction::Incoming)
    }

    fn connected_components(&self) -> Vec<Vec<String>> {
        let mut sets = UnionFind::<usize>::new(self.graph.node_bound());
        for edge in self.graph.edge_references() {
            sets.union(edge.source().index(), edge.target().index());
        }

        let mut groups: HashMap<usize, Vec<String>> = HashMap::new();
        for idx in self.graph.node_indices() {
            if let Some(id) = self.graph.node_weight(idx) {
                groups.entry(sets.find(idx.index())).or_default().push(id.clone());
            }
        }

        let mut components: Vec<Vec<String>> = groups
            .into_values()
            .map(|mut members| {
                members.sort();
                members
            })
            .collect();
        components.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        components
    }
}
