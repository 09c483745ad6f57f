use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use extract::{EntityNormalizer, EntityType, relation_types};
use index::GraphStore;

use crate::GraphAnalytics;

/// Fewer source documents than this is reported as thin coverage.
const MIN_SOURCE_DOCUMENTS: usize = 10;
const MAX_EXAMPLES: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TemporalReport {
    pub first_entity_created: Option<DateTime<Utc>>,
    pub last_entity_created: Option<DateTime<Utc>>,
    /// Keyed by `YYYY-MM`
    pub entities_by_month: BTreeMap<String, usize>,
    pub relations_by_month: BTreeMap<String, usize>,
    /// Running total of entities at the end of each month
    pub cumulative_entities: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoverageReport {
    pub total_entities: usize,
    pub entity_types: BTreeMap<String, usize>,
    /// Entities contributed per source document
    pub source_documents: BTreeMap<String, usize>,
    pub isolated_entities: Vec<String>,
    pub low_confidence_entities: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    UnderrepresentedType,
    MissingCrossReferences,
    LowConfidence,
    DuplicateCandidates,
    ThinCoverage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub message: String,
}

fn month(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m").to_string()
}

impl<'g, S: GraphStore> GraphAnalytics<'g, S> {
    pub fn temporal_analysis(&self) -> TemporalReport {
        let mut report = TemporalReport::default();

        for entity in self.graph.entities() {
            *report.entities_by_month.entry(month(&entity.created_at)).or_insert(0) += 1;
            report.first_entity_created = Some(match report.first_entity_created {
                Some(first) => first.min(entity.created_at),
                None => entity.created_at,
            });
            report.last_entity_created = Some(match report.last_entity_created {
                Some(last) => last.max(entity.created_at),
                None => entity.created_at,
            });
        }
        for relation in self.graph.relations() {
            *report.relations_by_month.entry(month(&relation.created_at)).or_insert(0) += 1;
        }

        let mut running = 0;
        for (key, count) in &report.entities_by_month {
            running += count;
            report.cumulative_entities.insert(key.clone(), running);
        }
        report
    }

    pub fn knowledge_coverage_analysis(&self) -> CoverageReport {
        let threshold = self.config.low_confidence_threshold;
        let mut report = CoverageReport {
            total_entities: self.graph.entity_count(),
            ..CoverageReport::default()
        };

        for entity in self.graph.entities() {
            *report.entity_types.entry(entity.entity_type.to_string()).or_insert(0) += 1;
            for doc in entity.source_documents() {
                *report.source_documents.entry(doc).or_insert(0) += 1;
            }
            if self.graph.degree(&entity.id) == 0 {
                report.isolated_entities.push(entity.id.clone());
            }
            if entity.confidence < threshold {
                report.low_confidence_entities.push(entity.id.clone());
            }
        }
        report
    }

    pub fn generate_recommendations(&self) -> Vec<Recommendation> {
        let coverage = self.knowledge_coverage_analysis();
        let mut recommendations = Vec::new();

        if !coverage.entity_types.is_empty() {
            let mean = coverage.total_entities as f64 / coverage.entity_types.len() as f64;
            for (entity_type, &count) in &coverage.entity_types {
                if (count as f64) < mean / 2.0 {
                    recommendations.push(Recommendation {
                        kind: RecommendationKind::UnderrepresentedType,
                        message: format!(
                            "Only {count} {entity_type} entities against a mean of {mean:.1} per type; \
                             add documents that cover {entity_type}"
                        ),
                    });
                }
            }
        }

        let unreferenced = self.unreferenced_paragraphs();
        if unreferenced > 0 {
            recommendations.push(Recommendation {
                kind: RecommendationKind::MissingCrossReferences,
                message: format!(
                    "{unreferenced} paragraphs have no {} cross-reference; review citations between norms",
                    relation_types::VERWEIST_AUF
                ),
            });
        }

        if !coverage.low_confidence_entities.is_empty() {
            recommendations.push(Recommendation {
                kind: RecommendationKind::LowConfidence,
                message: format!(
                    "{} entities have confidence below {}; verify them manually",
                    coverage.low_confidence_entities.len(),
                    self.config.low_confidence_threshold
                ),
            });
        }

        let duplicates = self.duplicate_candidates();
        if !duplicates.is_empty() {
            let examples: Vec<String> = duplicates
                .iter()
                .take(MAX_EXAMPLES)
                .map(|(a, b)| format!("'{a}' / '{b}'"))
                .collect();
            recommendations.push(Recommendation {
                kind: RecommendationKind::DuplicateCandidates,
                message: format!(
                    "{} possible duplicate entity pairs, e.g. {}",
                    duplicates.len(),
                    examples.join(", ")
                ),
            });
        }

        if coverage.source_documents.len() < MIN_SOURCE_DOCUMENTS {
            recommendations.push(Recommendation {
                kind: RecommendationKind::ThinCoverage,
                message: format!(
                    "Graph is built from {} source documents; add at least {} for broader coverage",
                    coverage.source_documents.len(),
                    MIN_SOURCE_DOCUMENTS
                ),
            });
        }

        info!(
            domain = self.graph.domain(),
            recommendations = recommendations.len(),
            "recommendations generated"
        );
        recommendations
    }

    /// Paragraphs with no cross-reference edge in either direction, counted
    /// only when the graph holds more than one paragraph.
    fn unreferenced_paragraphs(&self) -> usize {
        let paragraphs: Vec<_> = self
            .graph
            .entities()
            .filter(|e| e.entity_type == EntityType::Paragraph)
            .collect();
        if paragraphs.len() < 2 {
            return 0;
        }
        let is_reference = |r: &&extract::Relation| r.relation_type == relation_types::VERWEIST_AUF;
        paragraphs
            .into_iter()
            .filter(|p| {
                !self.graph.outgoing_relations(&p.id).iter().any(is_reference)
                    && !self.graph.incoming_relations(&p.id).iter().any(is_reference)
            })
            .count()
    }

    /// Same-type entity names that look alike despite different ids.
    fn duplicate_candidates(&self) -> Vec<(String, String)> {
        let normalizer = EntityNormalizer::new();
        let mut by_type: BTreeMap<&EntityType, Vec<&str>> = BTreeMap::new();
        for entity in self.graph.entities() {
            by_type.entry(&entity.entity_type).or_default().push(entity.name.as_str());
        }

        let mut pairs = Vec::new();
        for names in by_type.values() {
            for (i, a) in names.iter().enumerate() {
                for b in &names[i + 1..] {
                    if normalizer.are_similar(a, b) {
                        pairs.push((a.to_string(), b.to_string()));
                    }
                }
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{entity, link};
    use chrono::TimeZone;
    use index::KnowledgeGraph;

    #[test]
    fn test_temporal_buckets() {
        let mut a = entity(EntityType::Law, "SGB IX", 0.9);
        a.created_at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let mut b = entity(EntityType::Law, "SGB XII", 0.9);
        b.created_at = Utc.with_ymd_and_hms(2024, 1, 20, 10, 0, 0).unwrap();
        let mut c = entity(EntityType::Paragraph, "§29", 0.9);
        c.created_at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();

        let mut graph = KnowledgeGraph::new("test");
        graph.add_entities([a.clone(), b, c.clone()]);

        let report = GraphAnalytics::new(&graph).temporal_analysis();
        assert_eq!(report.entities_by_month["2024-01"], 2);
        assert_eq!(report.entities_by_month["2024-03"], 1);
        assert_eq!(report.cumulative_entities["2024-03"], 3);
        assert_eq!(report.first_entity_created, Some(a.created_at));
        assert_eq!(report.last_entity_created, Some(c.created_at));
    }

    #[test]
    fn test_coverage() {
        let law = entity(EntityType::Law, "SGB IX", 0.95);
        let paragraph = entity(EntityType::Paragraph, "§29", 0.9);
        let person = entity(EntityType::Person, "Herr Müller", 0.5);
        let mut graph = KnowledgeGraph::new("test");
        graph.add_entities([law.clone(), paragraph.clone(), person.clone()]);
        link(&mut graph, "belongs_to", &paragraph, &law);

        let report = GraphAnalytics::new(&graph).knowledge_coverage_analysis();
        assert_eq!(report.total_entities, 3);
        assert_eq!(report.entity_types["Law"], 1);
        assert_eq!(report.source_documents["doc-1"], 3);
        assert_eq!(report.isolated_entities, vec![person.id.clone()]);
        assert_eq!(report.low_confidence_entities, vec![person.id]);
    }

    #[test]
    fn test_recommendations() {
        let mut graph = KnowledgeGraph::new("test");
        for i in 1..=4 {
            graph.add_entity(entity(EntityType::Paragraph, &format!("§{i}"), 0.9));
        }
        graph.add_entities([
            entity(EntityType::Authority, "Sozialamt München", 0.85),
            entity(EntityType::Authority, "Sozialamt Muenchen Stadt", 0.85),
            entity(EntityType::Authority, "Sozialamt", 0.4),
        ]);
        graph.add_entity(entity(EntityType::Law, "SGB IX", 0.95));

        let recommendations = GraphAnalytics::new(&graph).generate_recommendations();
        let kinds: Vec<RecommendationKind> = recommendations.iter().map(|r| r.kind).collect();

        assert!(kinds.contains(&RecommendationKind::UnderrepresentedType));
        assert!(kinds.contains(&RecommendationKind::MissingCrossReferences));
        assert!(kinds.contains(&RecommendationKind::LowConfidence));
        assert!(kinds.contains(&RecommendationKind::DuplicateCandidates));
        assert!(kinds.contains(&RecommendationKind::ThinCoverage));
    }
}
