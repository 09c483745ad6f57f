use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use tracing::debug;

use crate::graph_export::GraphData;
use crate::louvain::renumber;

const MAX_ROUNDS: usize = 100;

/// Asynchronous label propagation with a seeded visiting order.
pub struct LabelPropagationDetector {
    graph: GraphData,
    seed: u64,
}

impl LabelPropagationDetector {
    pub fn new(graph: GraphData, seed: u64) -> Self {
        Self { graph, seed }
    }

    /// Returns community index per node, numbered from 0.
    pub fn detect(&self) -> Vec<usize> {
        let n = self.graph.node_count();
        let adj = self.graph.adjacency();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut labels: Vec<usize> = (0..n).collect();
        let mut order: Vec<usize> = (0..n).collect();
        let mut rounds = 0;

        while rounds < MAX_ROUNDS {
            rounds += 1;
            order.shuffle(&mut rng);
            let mut changed = false;

            for &node in &order {
                if adj[node].is_empty() {
                    continue;
                }
                let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
                for &other in &adj[node] {
                    *counts.entry(labels[other]).or_insert(0) += 1;
                }
                let top = counts.values().copied().max().unwrap_or(0);
                let best: Vec<usize> = counts
                    .into_iter()
                    .filter(|&(_, count)| count == top)
                    .map(|(label, _)| label)
                    .collect();

                if best.contains(&labels[node]) {
                    continue;
                }
                if let Some(&label) = best.choose(&mut rng) {
                    labels[node] = label;
                    changed = true;
                }
            }

            if !changed {
                break;
            }
        }

        debug!(nodes = n, rounds, "label propagation finished");
        renumber(&labels)
    }
}
