use extract::{Entity, EntityType};
use index::GraphStore;

use crate::GraphAnalytics;
use crate::centrality;
use crate::view::DirectedView;

const DEGREE_WEIGHT: f64 = 0.3;
const PAGERANK_WEIGHT: f64 = 0.3;
const CONFIDENCE_WEIGHT: f64 = 0.2;
const MENTION_WEIGHT: f64 = 0.2;
const MENTION_SATURATION: f64 = 10.0;

/// Weighted blend of degree, PageRank, confidence and mention count, in [0, 1].
pub fn importance_score(entity: &Entity, degree: usize, node_count: usize, pagerank: f64) -> f64 {
    let degree_term = if node_count > 1 {
        (degree as f64 / (node_count - 1) as f64).min(1.0)
    } else {
        0.0
    };
    let mention_term = (entity.mention_count() as f64 / MENTION_SATURATION).min(1.0);

    let score = DEGREE_WEIGHT * degree_term
        + PAGERANK_WEIGHT * pagerank
        + CONFIDENCE_WEIGHT * entity.confidence
        + MENTION_WEIGHT * mention_term;
    score.clamp(0.0, 1.0)
}

impl<'g, S: GraphStore> GraphAnalytics<'g, S> {
    fn pagerank_by_id(&self) -> (DirectedView, Vec<f64>) {
        let view = DirectedView::from_graph(self.graph);
        let ranks = centrality::pagerank(&view, self.config.power_iteration());
        (view, ranks)
    }

    /// `None` if the entity is not in the graph.
    pub fn get_entity_importance_score(&self, entity_id: &str) -> Option<f64> {
        let entity = self.graph.get_entity(entity_id)?;
        let (view, ranks) = self.pagerank_by_id();
        let pagerank = view.index.get(entity_id).map_or(0.0, |&i| ranks[i]);
        Some(importance_score(entity, self.graph.degree(entity_id), view.len(), pagerank))
    }

    pub fn rank_entities_by_importance(
        &self,
        entity_type: Option<&EntityType>,
        top_n: usize,
    ) -> Vec<(&'g Entity, f64)> {
        let (view, ranks) = self.pagerank_by_id();
        let mut ranked: Vec<(&'g Entity, f64)> = self
            .graph
            .entities()
            .filter(|e| entity_type.is_none_or(|t| &e.entity_type == t))
            .map(|e| {
                let pagerank = view.index.get(&e.id).map_or(0.0, |&i| ranks[i]);
                (e, importance_score(e, self.graph.degree(&e.id), view.len(), pagerank))
            })
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.id.cmp(&b.0.id)));
        ranked.truncate(top_n);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{entity, link};
    use index::KnowledgeGraph;

    fn graph_with_hub() -> (KnowledgeGraph, Entity, Entity) {
        let hub = entity(EntityType::Law, "SGB IX", 0.95).with_property("mention_count", 8);
        let isolated = entity(EntityType::Person, "Herr Müller", 0.5);
        let mut graph = KnowledgeGraph::new("test");
        graph.add_entities([hub.clone(), isolated.clone()]);
        for i in 1..=5 {
            let paragraph = entity(EntityType::Paragraph, &format!("§{i}"), 0.9);
            graph.add_entity(paragraph.clone());
            link(&mut graph, "belongs_to", &paragraph, &hub);
        }
        (graph, hub, isolated)
    }

    #[test]
    fn test_isolated_scores_below_hub() {
        let (graph, hub, isolated) = graph_with_hub();
        let analytics = GraphAnalytics::new(&graph);

        let hub_score = analytics.get_entity_importance_score(&hub.id).unwrap();
        let isolated_score = analytics.get_entity_importance_score(&isolated.id).unwrap();
        assert!(isolated_score < hub_score);
        assert!(analytics.get_entity_importance_score("missing").is_none());
    }

    #[test]
    fn test_scores_are_bounded() {
        let (graph, _, _) = graph_with_hub();
        let analytics = GraphAnalytics::new(&graph);
        for entity in graph.entities() {
            let score = analytics.get_entity_importance_score(&entity.id).unwrap();
            assert!((0.0..=1.0).contains(&score));
        }
    }

    #[test]
    fn test_score_formula() {
        let e = entity(EntityType::Law, "SGB IX", 1.0).with_property("mention_count", 20);
        // degree saturates at n-1, mentions at 10
        let score = importance_score(&e, 10, 5, 0.5);
        assert!((score - (0.3 + 0.15 + 0.2 + 0.2)).abs() < 1e-9);
        assert_eq!(importance_score(&e, 0, 1, 0.0), 0.4);
    }

    #[test]
    fn test_ranking_by_type() {
        let (graph, hub, _) = graph_with_hub();
        let analytics = GraphAnalytics::new(&graph);

        let top = analytics.rank_entities_by_importance(None, 1);
        assert_eq!(top[0].0.id, hub.id);
        let paragraphs = analytics.rank_entities_by_importance(Some(&EntityType::Paragraph), 10);
        assert_eq!(paragraphs.len(), 5);
    }
}
