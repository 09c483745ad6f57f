use serde::Serialize;
use std::collections::BTreeSet;
use tracing::warn;

use communities::GraphData;
use index::GraphStore;

use crate::GraphAnalytics;
use crate::view::DirectedView;

const UNVISITED: usize = usize::MAX;

/// Bridges and articulation points of an undirected simple graph, both found
/// in one iterative lowlink pass.
pub(crate) struct Connectivity {
    pub bridges: Vec<(usize, usize)>,
    pub cut_vertices: Vec<usize>,
}

pub(crate) fn connectivity(graph: &GraphData) -> Connectivity {
    let adj = graph.adjacency();
    let n = adj.len();
    let mut disc = vec![UNVISITED; n];
    let mut low = vec![0; n];
    let mut is_cut = vec![false; n];
    let mut bridges = Vec::new();
    let mut time = 0;

    for root in 0..n {
        if disc[root] != UNVISITED {
            continue;
        }
        disc[root] = time;
        low[root] = time;
        time += 1;
        let mut root_children = 0;
        // (node, parent, next neighbour position)
        let mut stack: Vec<(usize, usize, usize)> = vec![(root, UNVISITED, 0)];

        while let Some(top) = stack.len().checked_sub(1) {
            let (v, parent, pos) = stack[top];
            if pos < adj[v].len() {
                stack[top].2 += 1;
                let w = adj[v][pos];
                if disc[w] == UNVISITED {
                    disc[w] = time;
                    low[w] = time;
                    time += 1;
                    if v == root {
                        root_children += 1;
                    }
                    stack.push((w, v, 0));
                } else if w != parent {
                    low[v] = low[v].min(disc[w]);
                }
                continue;
            }

            stack.pop();
            if let Some(&(u, _, _)) = stack.last() {
                low[u] = low[u].min(low[v]);
                if low[v] > disc[u] {
                    bridges.push((u.min(v), u.max(v)));
                }
                if u != root && low[v] >= disc[u] {
                    is_cut[u] = true;
                }
            }
        }

        if root_children > 1 {
            is_cut[root] = true;
        }
    }

    Connectivity {
        bridges,
        cut_vertices: (0..n).filter(|&v| is_cut[v]).collect(),
    }
}

/// Maximal cliques of the undirected projection (Bron-Kerbosch with pivot).
pub(crate) fn maximal_cliques(graph: &GraphData) -> Vec<Vec<usize>> {
    let adj: Vec<BTreeSet<usize>> = graph
        .adjacency()
        .into_iter()
        .map(|neighbours| neighbours.into_iter().collect())
        .collect();
    let mut cliques = Vec::new();
    let candidates: BTreeSet<usize> = (0..adj.len()).collect();
    bron_kerbosch(&adj, &mut Vec::new(), candidates, BTreeSet::new(), &mut cliques);
    cliques
}

fn bron_kerbosch(
    adj: &[BTreeSet<usize>],
    clique: &mut Vec<usize>,
    mut candidates: BTreeSet<usize>,
    mut excluded: BTreeSet<usize>,
    out: &mut Vec<Vec<usize>>,
) {
    if candidates.is_empty() {
        if excluded.is_empty() {
            let mut found = clique.clone();
            found.sort_unstable();
            out.push(found);
        }
        return;
    }

    let pivot = candidates
        .iter()
        .chain(excluded.iter())
        .copied()
        .max_by_key(|&u| adj[u].intersection(&candidates).count());
    let Some(pivot) = pivot else { return };

    let branch: Vec<usize> = candidates.difference(&adj[pivot]).copied().collect();
    for v in branch {
        clique.push(v);
        bron_kerbosch(
            adj,
            clique,
            candidates.intersection(&adj[v]).copied().collect(),
            excluded.intersection(&adj[v]).copied().collect(),
            out,
        );
        clique.pop();
        candidates.remove(&v);
        excluded.insert(v);
    }
}

/// Directed density: distinct ordered pairs with an edge over `n(n-1)`.
pub(crate) fn directed_density(view: &DirectedView, members: &[usize]) -> f64 {
    let n = members.len();
    if n < 2 {
        return 0.0;
    }
    let mut pairs = 0usize;
    for &u in members {
        for &v in members {
            if u != v && view.has_edge(u, v) {
                pairs += 1;
            }
        }
    }
    pairs as f64 / (n * (n - 1)) as f64
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DenseSubgraph {
    pub entity_ids: Vec<String>,
    pub size: usize,
    pub density: f64,
}

impl<'g, S: GraphStore> GraphAnalytics<'g, S> {
    /// Bridges of the undirected projection as sorted id pairs.
    pub fn find_bridges(&self) -> Vec<(String, String)> {
        let data = GraphData::from_graph(self.graph);
        let mut bridges: Vec<(String, String)> = connectivity(&data)
            .bridges
            .into_iter()
            .map(|(a, b)| {
                let (a, b) = (&data.entities[a], &data.entities[b]);
                if a <= b { (a.clone(), b.clone()) } else { (b.clone(), a.clone()) }
            })
            .collect();
        bridges.sort();
        bridges
    }

    pub fn find_cut_vertices(&self) -> Vec<String> {
        let data = GraphData::from_graph(self.graph);
        let mut vertices: Vec<String> = connectivity(&data)
            .cut_vertices
            .into_iter()
            .map(|v| data.entities[v].clone())
            .collect();
        vertices.sort();
        vertices
    }

    /// Maximal cliques with at least `min_size` members whose directed
    /// density reaches `min_density`, densest first.
    pub fn find_dense_subgraphs(&self, min_density: f64, min_size: usize) -> Vec<DenseSubgraph> {
        let data = GraphData::from_graph(self.graph);
        if data.node_count() > self.config.clique_node_limit {
            warn!(
                nodes = data.node_count(),
                limit = self.config.clique_node_limit,
                "graph too large for clique enumeration"
            );
            return Vec::new();
        }

        let view = DirectedView::from_graph(self.graph);
        let mut dense: Vec<DenseSubgraph> = maximal_cliques(&data)
            .into_iter()
            .filter(|clique| clique.len() >= min_size)
            .filter_map(|clique| {
                let members: Vec<usize> = clique
                    .iter()
                    .filter_map(|&i| view.index.get(&data.entities[i]).copied())
                    .collect();
                let density = directed_density(&view, &members);
                if density < min_density {
                    return None;
                }
                let mut entity_ids: Vec<String> = clique.iter().map(|&i| data.entities[i].clone()).collect();
                entity_ids.sort();
                Some(DenseSubgraph {
                    size: entity_ids.len(),
                    entity_ids,
                    density,
                })
            })
            .collect();
        dense.sort_by(|a, b| {
            b.density
                .total_cmp(&a.density)
                .then_with(|| b.size.cmp(&a.size))
                .then_with(|| a.entity_ids.cmp(&b.entity_ids))
        });
        dense
    }
}
