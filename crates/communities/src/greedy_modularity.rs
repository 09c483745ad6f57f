use std::collections::BTreeMap;
use tracing::debug;

use crate::graph_export::GraphData;
use crate::louvain::renumber;

/// Clauset-Newman-Moore agglomeration: repeatedly join the pair of adjacent
/// communities with the largest modularity gain until no join improves it.
pub struct GreedyModularityDetector {
    graph: GraphData,
}

impl GreedyModularityDetector {
    pub fn new(graph: GraphData) -> Self {
        Self { graph }
    }

    /// Returns community index per node, numbered from 0.
    pub fn detect(&self) -> Vec<usize> {
        let n = self.graph.node_count();
        let mut owner: Vec<usize> = (0..n).collect();
        let m = self.graph.edge_count() as f64;
        if m == 0.0 {
            return owner;
        }

        // e[i][j]: fraction of edge ends joining community i to j
        let mut e: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); n];
        let mut a: Vec<f64> = vec![0.0; n];
        for &(x, y) in &self.graph.edges {
            let w = 1.0 / (2.0 * m);
            *e[x].entry(y).or_insert(0.0) += w;
            *e[y].entry(x).or_insert(0.0) += w;
            a[x] += w;
            a[y] += w;
        }

        let mut merges = 0;
        loop {
            let mut best: Option<(usize, usize, f64)> = None;
            for (i, links) in e.iter().enumerate() {
                for (&j, &e_ij) in links.range(i + 1..) {
                    let gain = 2.0 * (e_ij - a[i] * a[j]);
                    if best.is_none_or(|(_, _, g)| gain > g) {
                        best = Some((i, j, gain));
                    }
                }
            }

            let Some((keep, gone, gain)) = best else { break };
            if gain <= 0.0 {
                break;
            }

            let moved = std::mem::take(&mut e[gone]);
            for (other, weight) in moved {
                if other == keep {
                    continue;
                }
                if let Some(w) = e[other].remove(&gone) {
                    *e[other].entry(keep).or_insert(0.0) += w;
                }
                *e[keep].entry(other).or_insert(0.0) += weight;
            }
            e[keep].remove(&gone);
            a[keep] += a[gone];
            a[gone] = 0.0;

            for slot in owner.iter_mut() {
                if *slot == gone {
                    *slot = keep;
                }
            }
            merges += 1;
        }

        debug!(nodes = n, merges, "greedy modularity finished");
        renumber(&owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_triangles() {
        let mut graph = GraphData::new();
        let ids: Vec<usize> = (0..6).map(|i| graph.add_entity(format!("n{i}"))).collect();
        for (x, y) in [(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5), (2, 3)] {
            graph.add_edge(ids[x], ids[y]);
        }

        let labels = GreedyModularityDetector::new(graph).detect();
        assert_eq!(labels, vec![0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn test_no_edges() {
        let mut graph = GraphData::new();
        graph.add_entity("a".to_string());
        graph.add_entity("b".to_string());
        assert_eq!(GreedyModularityDetector::new(graph).detect(), vec![0, 1]);
    }
}
