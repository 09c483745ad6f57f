use std::collections::HashMap;

use index::{GraphStore, KnowledgeGraph};

/// Index-based snapshot of the directed topology.
pub(crate) struct DirectedView {
    pub ids: Vec<String>,
    pub index: HashMap<String, usize>,
    /// Distinct successors, self-loops dropped
    pub succ: Vec<Vec<usize>>,
    pub pred: Vec<Vec<usize>>,
    /// Successors weighted by the number of parallel edges
    pub out_weight: Vec<Vec<(usize, f64)>>,
}

impl DirectedView {
    pub fn from_graph<S: GraphStore>(graph: &KnowledgeGraph<S>) -> Self {
        let ids: Vec<String> = graph.nodes().into_iter().map(str::to_string).collect();
        let index: HashMap<String, usize> = ids.iter().enumerate().map(|(i, id)| (id.clone(), i)).collect();
        let n = ids.len();

        let mut succ = vec![Vec::new(); n];
        let mut pred = vec![Vec::new(); n];
        let mut weights: Vec<HashMap<usize, f64>> = vec![HashMap::new(); n];
        for edge in graph.edges() {
            let (Some(&s), Some(&t)) = (index.get(&edge.source), index.get(&edge.target)) else {
                continue;
            };
            *weights[s].entry(t).or_insert(0.0) += 1.0;
            if s != t {
                succ[s].push(t);
                pred[t].push(s);
            }
        }
        for list in succ.iter_mut().chain(pred.iter_mut()) {
            list.sort_unstable();
            list.dedup();
        }
        let out_weight = weights
            .into_iter()
            .map(|w| {
                let mut list: Vec<(usize, f64)> = w.into_iter().collect();
                list.sort_by_key(|(t, _)| *t);
                list
            })
            .collect();

        Self {
            ids,
            index,
            succ,
            pred,
            out_weight,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether `source` has at least one edge to `target`.
    pub fn has_edge(&self, source: usize, target: usize) -> bool {
        self.out_weight[source].binary_search_by_key(&target, |(t, _)| *t).is_ok()
    }
}
