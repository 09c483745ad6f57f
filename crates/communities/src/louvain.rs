use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::graph_export::GraphData;

const MAX_LEVELS: usize = 10;
const MAX_SWEEPS: usize = 100;
const MIN_GAIN: f64 = 1e-12;

/// Weighted undirected graph used between aggregation levels.
struct LevelGraph {
    adj: Vec<BTreeMap<usize, f64>>,
    loops: Vec<f64>,
}

impl LevelGraph {
    fn from_data(data: &GraphData) -> Self {
        let n = data.node_count();
        let mut adj = vec![BTreeMap::new(); n];
        for &(a, b) in &data.edges {
            *adj[a].entry(b).or_insert(0.0) += 1.0;
            *adj[b].entry(a).or_insert(0.0) += 1.0;
        }
        Self {
            adj,
            loops: vec![0.0; n],
        }
    }

    fn len(&self) -> usize {
        self.adj.len()
    }

    fn degree(&self, node: usize) -> f64 {
        self.adj[node].values().sum::<f64>() + 2.0 * self.loops[node]
    }

    fn total_weight(&self) -> f64 {
        let between: f64 = self.adj.iter().map(|n| n.values().sum::<f64>()).sum::<f64>() / 2.0;
        between + self.loops.iter().sum::<f64>()
    }

    /// Move nodes between communities until no single move raises modularity.
    /// Returns the community of every node, renumbered from 0.
    fn local_moves(&self) -> (Vec<usize>, bool) {
        let n = self.len();
        let two_m = 2.0 * self.total_weight();
        let mut community: Vec<usize> = (0..n).collect();
        if two_m == 0.0 {
            return (community, false);
        }

        let degrees: Vec<f64> = (0..n).map(|i| self.degree(i)).collect();
        let mut sigma = degrees.clone();
        let mut moved_any = false;

        for _ in 0..MAX_SWEEPS {
            let mut moved = false;
            for node in 0..n {
                let current = community[node];
                let k_i = degrees[node];

                let mut links: BTreeMap<usize, f64> = BTreeMap::new();
                for (&other, &weight) in &self.adj[node] {
                    *links.entry(community[other]).or_insert(0.0) += weight;
                }

                sigma[current] -= k_i;
                let mut best = current;
                let mut best_gain = links.get(&current).copied().unwrap_or(0.0) - sigma[current] * k_i / two_m;
                for (&candidate, &weight) in &links {
                    let gain = weight - sigma[candidate] * k_i / two_m;
                    if gain > best_gain + MIN_GAIN {
                        best = candidate;
                        best_gain = gain;
                    }
                }
                sigma[best] += k_i;

                if best != current {
                    community[node] = best;
                    moved = true;
                    moved_any = true;
                }
            }
            if !moved {
                break;
            }
        }

        (renumber(&community), moved_any)
    }

    fn aggregate(&self, community: &[usize]) -> Self {
        let size = community.iter().max().map_or(0, |&c| c + 1);
        let mut adj = vec![BTreeMap::new(); size];
        let mut loops = vec![0.0; size];

        for (node, neighbours) in self.adj.iter().enumerate() {
            let from = community[node];
            loops[from] += self.loops[node];
            for (&other, &weight) in neighbours {
                if other < node {
                    continue;
                }
                let to = community[other];
                if from == to {
                    loops[from] += weight;
                } else {
                    *adj[from].entry(to).or_insert(0.0) += weight;
                    *adj[to].entry(from).or_insert(0.0) += weight;
                }
            }
        }

        Self { adj, loops }
    }
}

/// Renumber labels in order of first appearance.
pub(crate) fn renumber(labels: &[usize]) -> Vec<usize> {
    let mut mapping: HashMap<usize, usize> = HashMap::new();
    labels
        .iter()
        .map(|&label| {
            let next = mapping.len();
            *mapping.entry(label).or_insert(next)
        })
        .collect()
}

/// Multi-level Louvain modularity optimisation.
///
/// Nodes are visited in index order, so the result is deterministic for a
/// given graph.
pub struct LouvainDetector {
    graph: GraphData,
}

impl LouvainDetector {
    pub fn new(graph: GraphData) -> Self {
        Self { graph }
    }

    /// Returns community index per node, numbered from 0.
    pub fn detect(&self) -> Vec<usize> {
        let n = self.graph.node_count();
        let mut membership: Vec<usize> = (0..n).collect();
        let mut level = LevelGraph::from_data(&self.graph);
        let mut levels = 0;

        while levels < MAX_LEVELS {
            let (community, moved) = level.local_moves();
            if !moved {
                break;
            }
            for slot in membership.iter_mut() {
                *slot = community[*slot];
            }
            level = level.aggregate(&community);
            levels += 1;
        }

        debug!(nodes = n, levels, "louvain finished");
        renumber(&membership)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_triangles() -> GraphData {
        let mut graph = GraphData::new();
        let ids: Vec<usize> = ["A", "B", "C", "D", "E", "F"]
            .into_iter()
            .map(|id| graph.add_entity(id.to_string()))
            .collect();

        // Community 1: A-B-C
        graph.add_edge(ids[0], ids[1]);
        graph.add_edge(ids[1], ids[2]);
        graph.add_edge(ids[0], ids[2]);

        // Community 2: D-E-F
        graph.add_edge(ids[3], ids[4]);
        graph.add_edge(ids[4], ids[5]);
        graph.add_edge(ids[3], ids[5]);

        // Weak bridge
        graph.add_edge(ids[2], ids[3]);
        graph
    }

    #[test]
    fn test_two_triangles() {
        let labels = LouvainDetector::new(two_triangles()).detect();
        assert_eq!(labels, vec![0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn test_isolated_nodes_stay_alone() {
        let mut graph = GraphData::new();
        graph.add_entity("A".to_string());
        graph.add_entity("B".to_string());

        assert_eq!(LouvainDetector::new(graph).detect(), vec![0, 1]);
    }

    #[test]
    fn test_deterministic() {
        let first = LouvainDetector::new(two_triangles()).detect();
        let second = LouvainDetector::new(two_triangles()).detect();
        assert_eq!(first, second);
    }
}
