pub mod config;
pub mod metrics;
pub mod registry;
pub mod telemetry;

pub use config::{LoggingConfig, OperationMode, PipelineConfig, StorageConfig};
pub use metrics::{MetricsSnapshot, PipelineMetrics, TimedOperation};
pub use registry::DomainRegistry;
pub use telemetry::init_tracing;

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use analytics::GraphAnalytics;
use communities::{CommunityDetector, CommunitySummary};
use extract::{Entity, Extractor, Relation, merge_entities};
use ingest::Document;
use index::KnowledgeGraph;
use query::GraphQueryEngine;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub doc_id: String,
    pub document_type: String,
    pub entities: usize,
    pub relations: usize,
    /// Entities not in the graph before this document
    pub new_entities: usize,
}

/// Extraction plus graph maintenance for one domain.
///
/// A pipeline is the single writer of its graph; share it behind a lock.
pub struct KnowledgePipeline {
    config: PipelineConfig,
    extractor: Extractor,
    graph: KnowledgeGraph,
    metrics: Arc<PipelineMetrics>,
}

impl KnowledgePipeline {
    pub fn new(domain: impl Into<String>, config: &PipelineConfig) -> Self {
        Self::with_graph(KnowledgeGraph::new(domain), config)
    }

    pub fn with_graph(graph: KnowledgeGraph, config: &PipelineConfig) -> Self {
        Self {
            config: config.clone(),
            extractor: Extractor::new(&config.extraction),
            graph,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    pub fn domain(&self) -> &str {
        self.graph.domain()
    }

    pub fn graph(&self) -> &KnowledgeGraph {
        &self.graph
    }

    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn query(&self) -> GraphQueryEngine<'_> {
        GraphQueryEngine::new(&self.graph)
    }

    pub fn analytics(&self) -> GraphAnalytics<'_> {
        GraphAnalytics::with_config(&self.graph, self.config.analytics.clone())
    }

    pub fn community_summaries(&self) -> Vec<CommunitySummary> {
        CommunityDetector::new(self.config.community_algorithm)
            .with_seed(self.config.analytics.community_seed)
            .detect_and_summarize(&self.graph)
    }

    /// Extract a document and fold the result into the graph.
    ///
    /// Entities already in the graph are merged with the new extraction, so
    /// mention counts and source documents accumulate across documents.
    /// Ingesting the same document again leaves the graph unchanged.
    pub fn ingest_document(&mut self, document: &dyn Document) -> IngestReport {
        let timer = TimedOperation::start();
        let extracted = self.extractor.extract_document(document);
        let entities = extracted.extraction.entities;
        let relations = extracted.extraction.relations;
        self.metrics.record_extract(timer.elapsed(), entities.len(), relations.len());

        let timer = TimedOperation::start();
        let report = IngestReport {
            doc_id: extracted.doc_id,
            document_type: extracted.document_type,
            entities: entities.len(),
            relations: relations.len(),
            new_entities: entities.iter().filter(|e| !self.graph.contains_entity(&e.id)).count(),
        };

        for entity in entities {
            if let Some(merged) = self.merge_with_existing(entity, &report.doc_id) {
                self.graph.add_entity(merged);
            }
        }
        for relation in relations {
            let relation = self.merge_relation(relation);
            self.graph.add_relation(relation);
        }
        self.metrics.record_insert(timer.elapsed());

        info!(
            domain = self.graph.domain(),
            document_id = %report.doc_id,
            entities = report.entities,
            new_entities = report.new_entities,
            relations = report.relations,
            "document ingested"
        );
        report
    }

    /// `None` when the stored entity already accounts for this document.
    fn merge_with_existing(&self, entity: Entity, doc_id: &str) -> Option<Entity> {
        match self.graph.get_entity(&entity.id) {
            None => Some(entity),
            Some(existing) if existing.source_documents().iter().any(|d| d == doc_id) => None,
            Some(existing) => merge_entities(vec![existing.clone(), entity]),
        }
    }

    /// The first stored relation between a pair keeps its id and direction.
    fn merge_relation(&self, relation: Relation) -> Relation {
        match self.graph.find_equivalent_relation(&relation) {
            None => relation,
            Some(existing) if existing.id == relation.id => Relation {
                confidence: relation.confidence.max(existing.confidence),
                created_at: existing.created_at,
                ..relation
            },
            Some(existing) => {
                let mut kept = existing.clone();
                kept.confidence = kept.confidence.max(relation.confidence);
                kept.updated_at = relation.updated_at;
                kept
            }
        }
    }

    /// Read every supported file in `dir` and ingest it. Unreadable files
    /// fail the whole call before anything is ingested.
    pub async fn ingest_directory(&mut self, dir: &Path) -> Result<Vec<IngestReport>> {
        let documents = ingest::ingest_directory(dir)
            .await
            .with_context(|| format!("Failed to read documents from {}", dir.display()))?;
        if documents.is_empty() {
            warn!(path = %dir.display(), "no documents found");
        }

        Ok(documents.iter().map(|doc| self.ingest_document(doc)).collect())
    }

    /// Save under `<storage root>/<domain>/` and return that directory.
    pub fn save(&self) -> Result<PathBuf> {
        let dir = self.config.domain_dir(self.domain());
        self.graph
            .save(&dir)
            .with_context(|| format!("Failed to save domain {}", self.domain()))?;
        Ok(dir)
    }

    /// Load a previously saved domain.
    pub fn load(domain: &str, config: &PipelineConfig) -> Result<Self> {
        let dir = config.domain_dir(domain);
        let graph: KnowledgeGraph =
            KnowledgeGraph::load(&dir).with_context(|| format!("Failed to load domain {domain}"))?;
        Ok(Self::with_graph(graph, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::EntityType;
    use ingest::TextDocument;
    use tempfile::TempDir;

    fn config(root: &Path) -> PipelineConfig {
        PipelineConfig {
            storage: StorageConfig {
                root: root.to_path_buf(),
            },
            ..PipelineConfig::default()
        }
    }

    fn law_id(pipeline: &KnowledgePipeline) -> String {
        pipeline
            .query()
            .find_entities_by_type(&EntityType::Law)
            .first()
            .map(|e| e.id.clone())
            .unwrap()
    }

    #[test]
    fn test_cross_document_merge() {
        let mut pipeline = KnowledgePipeline::new("sozialrecht", &PipelineConfig::default());
        pipeline.ingest_document(&TextDocument::new("doc-1", "Leistungen nach dem SGB-IX werden gewährt."));
        pipeline.ingest_document(&TextDocument::new("doc-2", "Der Anspruch ergibt sich aus dem SGB IX."));

        let laws = pipeline.query().find_entities_by_type(&EntityType::Law);
        assert_eq!(laws.len(), 1);
        assert_eq!(laws[0].mention_count(), 2);
        assert_eq!(laws[0].source_documents(), vec!["doc-1".to_string(), "doc-2".to_string()]);
    }

    #[test]
    fn test_reversed_relation_across_documents() {
        let mut pipeline = KnowledgePipeline::new("sozialrecht", &PipelineConfig::default());
        pipeline.ingest_document(&TextDocument::new("doc-1", "Anspruch nach SGB IX und BGB."));
        pipeline.ingest_document(&TextDocument::new("doc-2", "Anspruch nach BGB und SGB IX."));

        let laws = pipeline.query().find_entities_by_type(&EntityType::Law);
        assert_eq!(laws.len(), 2);
        let between: Vec<&Relation> = pipeline
            .graph()
            .relations()
            .filter(|r| laws.iter().any(|l| l.id == r.source_id) && laws.iter().any(|l| l.id == r.target_id))
            .collect();

        assert_eq!(between.len(), 1);
        assert_eq!(between[0].relation_type, "mentioned_with");
        assert_eq!(pipeline.graph().relation_count(), pipeline.graph().edges().len());
    }

    #[test]
    fn test_reingest_is_idempotent() {
        let doc = TextDocument::new(
            "doc-1",
            "Der Antragsteller widerspricht gemäß § 29 SGB IX dem Bescheid vom 15.03.2024 des Sozialamt München.",
        );
        let mut pipeline = KnowledgePipeline::new("sozialrecht", &PipelineConfig::default());

        let first = pipeline.ingest_document(&doc);
        let stats = pipeline.graph().stats();
        let law = pipeline.graph().get_entity(&law_id(&pipeline)).cloned().unwrap();

        let second = pipeline.ingest_document(&doc);
        assert_eq!(second.new_entities, 0);
        assert_eq!(first.entities, second.entities);
        assert_eq!(pipeline.graph().stats(), stats);

        let again = pipeline.graph().get_entity(&law.id).unwrap();
        assert_eq!(again.mention_count(), law.mention_count());
        assert_eq!(again.confidence, law.confidence);
        assert_eq!(pipeline.metrics().snapshot().documents_processed, 2);
    }

    #[test]
    fn test_save_and_load() {
        let root = TempDir::new().unwrap();
        let config = config(root.path());
        let mut pipeline = KnowledgePipeline::new("sozialrecht", &config);
        pipeline.ingest_document(&TextDocument::new("doc-1", "Nach § 35a SGB VIII ist das Jugendamt zuständig."));

        let dir = pipeline.save().unwrap();
        assert_eq!(dir, root.path().join("sozialrecht"));

        let loaded = KnowledgePipeline::load("sozialrecht", &config).unwrap();
        assert_eq!(loaded.graph().entity_index(), pipeline.graph().entity_index());
        assert!(KnowledgePipeline::load("missing", &config).is_err());
    }

    #[tokio::test]
    async fn test_ingest_directory() {
        let root = TempDir::new().unwrap();
        let docs = root.path().join("docs");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(docs.join("a.txt"), "Widerspruch gegen den Bescheid nach § 29 SGB IX.").unwrap();
        std::fs::write(docs.join("b.md"), "Das Sozialamt München ist zuständig für die Eingliederungshilfe.").unwrap();

        let mut pipeline = KnowledgePipeline::new("sozialrecht", &config(root.path()));
        let reports = pipeline.ingest_directory(&docs).await.unwrap();

        assert_eq!(reports.len(), 2);
        assert!(pipeline.graph().entity_count() > 0);
        assert!(pipeline.ingest_directory(&root.path().join("nope")).await.is_err());
    }
}
