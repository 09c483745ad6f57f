pub mod centrality;
pub mod diagnostics;
pub mod importance;
pub mod reports;
pub mod structure;
mod view;

pub use centrality::CentralityMetric;
pub use diagnostics::{MissingRelation, RelationTypeStats};
pub use reports::{CoverageReport, Recommendation, RecommendationKind, TemporalReport};
pub use structure::DenseSubgraph;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use communities::{Community, CommunityAlgorithm, CommunityDetector};
use extract::{Entity, EntityType};
use index::{GraphStore, KnowledgeGraph, PetgraphStore};

use centrality::PowerIteration;
use view::DirectedView;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub pagerank_damping: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
    /// Clique enumeration is skipped above this many nodes
    pub clique_node_limit: usize,
    pub low_confidence_threshold: f64,
    pub missing_relation_max_hops: usize,
    pub community_seed: u64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            pagerank_damping: 0.85,
            max_iterations: 100,
            tolerance: 1e-6,
            clique_node_limit: 2000,
            low_confidence_threshold: 0.6,
            missing_relation_max_hops: 3,
            community_seed: 42,
        }
    }
}

impl AnalyticsConfig {
    fn power_iteration(&self) -> PowerIteration {
        PowerIteration {
            damping: self.pagerank_damping,
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
        }
    }
}

/// Read-only structural analysis of a knowledge graph.
pub struct GraphAnalytics<'g, S: GraphStore = PetgraphStore> {
    graph: &'g KnowledgeGraph<S>,
    config: AnalyticsConfig,
}

impl<'g, S: GraphStore> GraphAnalytics<'g, S> {
    pub fn new(graph: &'g KnowledgeGraph<S>) -> Self {
        Self::with_config(graph, AnalyticsConfig::default())
    }

    pub fn with_config(graph: &'g KnowledgeGraph<S>, config: AnalyticsConfig) -> Self {
        Self { graph, config }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Entities ranked by total degree, ties by id.
    pub fn get_most_connected_entities(
        &self,
        top_n: usize,
        entity_type: Option<&EntityType>,
    ) -> Vec<(&'g Entity, usize)> {
        let mut ranked: Vec<(&'g Entity, usize)> = self
            .graph
            .entities()
            .filter(|e| entity_type.is_none_or(|t| &e.entity_type == t))
            .map(|e| (e, self.graph.degree(&e.id)))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.id.cmp(&b.0.id)));
        ranked.truncate(top_n);
        ranked
    }

    /// Per-node scores for `metric`, indexed like the directed view.
    fn centrality_scores(&self, view: &DirectedView, metric: CentralityMetric) -> Vec<f64> {
        let settings = self.config.power_iteration();
        match metric {
            CentralityMetric::Betweenness => centrality::betweenness(view),
            CentralityMetric::Closeness => centrality::closeness(view),
            CentralityMetric::PageRank => centrality::pagerank(view, settings),
            CentralityMetric::Eigenvector => centrality::eigenvector(view, settings).unwrap_or_else(|| {
                warn!(
                    domain = self.graph.domain(),
                    "eigenvector centrality did not converge, falling back to pagerank"
                );
                centrality::pagerank(view, settings)
            }),
        }
    }

    pub fn get_central_entities(&self, metric: CentralityMetric, top_n: usize) -> Vec<(&'g Entity, f64)> {
        let view = DirectedView::from_graph(self.graph);
        let scores = self.centrality_scores(&view, metric);

        let mut ranked: Vec<(&'g Entity, f64)> = view
            .ids
            .iter()
            .zip(scores)
            .filter_map(|(id, score)| self.graph.get_entity(id).map(|e| (e, score)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.id.cmp(&b.0.id)));
        ranked.truncate(top_n);

        debug!(metric = %metric, returned = ranked.len(), "central entities");
        ranked
    }

    /// Communities of the undirected projection, named `Community_N`.
    pub fn detect_communities(&self, algorithm: CommunityAlgorithm) -> Vec<Community> {
        CommunityDetector::new(algorithm)
            .with_seed(self.config.community_seed)
            .detect(self.graph)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use extract::{Entity, EntityAttributes, EntityType, Relation};
    use index::KnowledgeGraph;

    pub fn entity(entity_type: EntityType, name: &str, confidence: f64) -> Entity {
        Entity::new(entity_type, name, EntityAttributes::None, "doc-1", confidence)
    }

    pub fn link(graph: &mut KnowledgeGraph, kind: &str, source: &Entity, target: &Entity) {
        graph.add_relation(Relation::new(kind, source.id.as_str(), target.id.as_str(), "doc-1", 0.8));
    }
}
