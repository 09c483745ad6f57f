use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::view::DirectedView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CentralityMetric {
    Betweenness,
    Closeness,
    PageRank,
    Eigenvector,
}

impl fmt::Display for CentralityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CentralityMetric::Betweenness => "betweenness",
            CentralityMetric::Closeness => "closeness",
            CentralityMetric::PageRank => "pagerank",
            CentralityMetric::Eigenvector => "eigenvector",
        })
    }
}

impl FromStr for CentralityMetric {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "betweenness" => Ok(CentralityMetric::Betweenness),
            "closeness" => Ok(CentralityMetric::Closeness),
            "pagerank" => Ok(CentralityMetric::PageRank),
            "eigenvector" => Ok(CentralityMetric::Eigenvector),
            other => bail!("Unknown centrality metric: {other}"),
        }
    }
}

/// Iteration settings shared by PageRank and eigenvector centrality.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PowerIteration {
    pub damping: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
}

/// Brandes' algorithm over directed shortest paths, normalised by
/// `(n-1)(n-2)`.
pub(crate) fn betweenness(view: &DirectedView) -> Vec<f64> {
    let n = view.len();
    let mut centrality = vec![0.0; n];

    for source in 0..n {
        let mut stack = Vec::with_capacity(n);
        let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0_f64; n];
        let mut dist: Vec<Option<usize>> = vec![None; n];
        sigma[source] = 1.0;
        dist[source] = Some(0);

        let mut queue = VecDeque::from([source]);
        while let Some(v) = queue.pop_front() {
            stack.push(v);
            let Some(dv) = dist[v] else { continue };
            for &w in &view.succ[v] {
                if dist[w].is_none() {
                    dist[w] = Some(dv + 1);
                    queue.push_back(w);
                }
                if dist[w] == Some(dv + 1) {
                    sigma[w] += sigma[v];
                    preds[w].push(v);
                }
            }
        }

        let mut delta = vec![0.0; n];
        while let Some(w) = stack.pop() {
            for &v in &preds[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != source {
                centrality[w] += delta[w];
            }
        }
    }

    if n > 2 {
        let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
        for value in &mut centrality {
            *value *= scale;
        }
    }
    centrality
}

/// Closeness over incoming distances, scaled by the reachable share of the
/// graph so that nodes in small components do not score as high as hubs.
pub(crate) fn closeness(view: &DirectedView) -> Vec<f64> {
    let n = view.len();
    (0..n)
        .map(|target| {
            let mut dist: Vec<Option<usize>> = vec![None; n];
            dist[target] = Some(0);
            let mut queue = VecDeque::from([target]);
            let mut total = 0usize;
            let mut reached = 1usize;

            while let Some(v) = queue.pop_front() {
                let dv = dist[v].unwrap_or(0);
                for &u in &view.pred[v] {
                    if dist[u].is_none() {
                        dist[u] = Some(dv + 1);
                        total += dv + 1;
                        reached += 1;
                        queue.push_back(u);
                    }
                }
            }

            if total == 0 || n < 2 {
                return 0.0;
            }
            let r = (reached - 1) as f64;
            (r / total as f64) * (r / (n - 1) as f64)
        })
        .collect()
}

/// PageRank with parallel edges as weights; dangling mass is spread evenly.
pub(crate) fn pagerank(view: &DirectedView, settings: PowerIteration) -> Vec<f64> {
    let n = view.len();
    if n == 0 {
        return Vec::new();
    }
    let nf = n as f64;
    let out_total: Vec<f64> = view.out_weight.iter().map(|w| w.iter().map(|(_, x)| x).sum()).collect();
    let mut rank = vec![1.0 / nf; n];

    for _ in 0..settings.max_iterations {
        let dangling: f64 = (0..n).filter(|&v| out_total[v] == 0.0).map(|v| rank[v]).sum();
        let base = (1.0 - settings.damping) / nf + settings.damping * dangling / nf;
        let mut next = vec![base; n];
        for (source, targets) in view.out_weight.iter().enumerate() {
            if out_total[source] == 0.0 {
                continue;
            }
            let share = settings.damping * rank[source] / out_total[source];
            for &(target, weight) in targets {
                next[target] += share * weight;
            }
        }

        let error: f64 = next.iter().zip(&rank).map(|(a, b)| (a - b).abs()).sum();
        rank = next;
        if error < nf * settings.tolerance {
            return rank;
        }
    }

    warn!(nodes = n, "pagerank did not converge, using last iterate");
    rank
}

/// Power iteration on `A^T + I`; `None` when it fails to converge.
pub(crate) fn eigenvector(view: &DirectedView, settings: PowerIteration) -> Option<Vec<f64>> {
    let n = view.len();
    if n == 0 {
        return Some(Vec::new());
    }
    let nf = n as f64;
    let mut x = vec![1.0 / nf; n];

    for _ in 0..settings.max_iterations {
        let mut next = x.clone();
        for (source, targets) in view.out_weight.iter().enumerate() {
            for &(target, weight) in targets {
                next[target] += x[source] * weight;
            }
        }
        let norm = next.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm == 0.0 {
            return None;
        }
        for value in &mut next {
            *value /= norm;
        }

        let error: f64 = next.iter().zip(&x).map(|(a, b)| (a - b).abs()).sum();
        x = next;
        if error < nf * settings.tolerance {
            return Some(x);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::{Entity, EntityAttributes, EntityType, Relation};
    use index::KnowledgeGraph;

    const SETTINGS: PowerIteration = PowerIteration {
        damping: 0.85,
        max_iterations: 100,
        tolerance: 1e-6,
    };

    /// a -> b -> c, plus d -> b
    fn chain() -> (KnowledgeGraph, Vec<Entity>) {
        let nodes: Vec<Entity> = ["§1", "§2", "§3", "§4"]
            .iter()
            .map(|n| Entity::new(EntityType::Paragraph, *n, EntityAttributes::None, "doc-1", 0.9))
            .collect();
        let mut graph = KnowledgeGraph::new("test");
        graph.add_entities(nodes.clone());
        for (x, y) in [(0, 1), (1, 2), (3, 1)] {
            graph.add_relation(Relation::new(
                "verweist_auf",
                nodes[x].id.as_str(),
                nodes[y].id.as_str(),
                "doc-1",
                0.8,
            ));
        }
        (graph, nodes)
    }

    #[test]
    fn test_metric_from_str() {
        assert_eq!("PageRank".parse::<CentralityMetric>().unwrap(), CentralityMetric::PageRank);
        assert_eq!("page_rank".parse::<CentralityMetric>().unwrap(), CentralityMetric::PageRank);
        assert!("katz".parse::<CentralityMetric>().is_err());
    }

    #[test]
    fn test_betweenness_middle_node() {
        let (graph, _) = chain();
        let view = DirectedView::from_graph(&graph);
        let scores = betweenness(&view);

        // b lies on a->c and d->c out of 3*2 ordered pairs
        assert!((scores[1] - 2.0 / 6.0).abs() < 1e-9);
        assert_eq!(scores[0], 0.0);
        assert_eq!(scores[2], 0.0);
    }

    #[test]
    fn test_closeness_incoming() {
        let (graph, _) = chain();
        let view = DirectedView::from_graph(&graph);
        let scores = closeness(&view);

        assert_eq!(scores[0], 0.0);
        // c is reached from b (1), a (2), d (2)
        assert!((scores[2] - (3.0 / 5.0) * (3.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn test_pagerank_sums_to_one() {
        let (graph, _) = chain();
        let view = DirectedView::from_graph(&graph);
        let ranks = pagerank(&view, SETTINGS);

        assert!((ranks.iter().sum::<f64>() - 1.0).abs() < 1e-6);
        assert!(ranks[2] > ranks[0]);
    }

    #[test]
    fn test_eigenvector_on_cycle_converges() {
        let nodes: Vec<Entity> = ["§1", "§2", "§3"]
            .iter()
            .map(|n| Entity::new(EntityType::Paragraph, *n, EntityAttributes::None, "doc-1", 0.9))
            .collect();
        let mut graph = KnowledgeGraph::new("test");
        graph.add_entities(nodes.clone());
        for (x, y) in [(0, 1), (1, 2), (2, 0)] {
            graph.add_relation(Relation::new(
                "verweist_auf",
                nodes[x].id.as_str(),
                nodes[y].id.as_str(),
                "doc-1",
                0.8,
            ));
        }
        let view = DirectedView::from_graph(&graph);
        let scores = eigenvector(&view, SETTINGS).unwrap();
        let expected = 1.0 / 3.0_f64.sqrt();
        assert!(scores.iter().all(|s| (s - expected).abs() < 1e-6));
    }
}
