use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use tracing::info;

use analytics::CentralityMetric;
use pipeline::{DomainRegistry, PipelineConfig, init_tracing};

const USAGE: &str = "usage: build_graph <domain> <document-dir> [config.json]";

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let (Some(domain), Some(input)) = (args.next(), args.next()) else {
        bail!(USAGE);
    };
    let config = match args.next() {
        Some(path) => PipelineConfig::from_file(&PathBuf::from(path))?,
        None => PipelineConfig::default(),
    };

    init_tracing(&config.logging)?;
    info!(domain = %domain, input = %input, mode = ?config.mode, "building knowledge graph");

    let registry = DomainRegistry::new(config);
    let pipeline = registry.get_or_load(&domain)?;
    let mut pipeline = pipeline.lock().await;

    let reports = pipeline
        .ingest_directory(&PathBuf::from(&input))
        .await
        .context("Failed to ingest documents")?;
    let saved_to = pipeline.save()?;

    let stats = pipeline.graph().stats();
    info!(
        documents = reports.len(),
        entities = stats.entity_count,
        relations = stats.relation_count,
        placeholders = stats.placeholder_nodes,
        path = %saved_to.display(),
        "graph saved"
    );

    let analytics = pipeline.analytics();
    for (entity, score) in analytics.get_central_entities(CentralityMetric::PageRank, 5) {
        info!(entity = %entity.name, entity_type = %entity.entity_type, score, "central entity");
    }
    for summary in pipeline.community_summaries().iter().take(5) {
        info!(community = %summary.name, size = summary.entity_count, "{}", summary.summary);
    }
    for recommendation in analytics.generate_recommendations() {
        info!(kind = ?recommendation.kind, "{}", recommendation.message);
    }

    let metrics = serde_json::to_string(&pipeline.metrics().snapshot())?;
    info!(metrics = %metrics, "pipeline metrics");
    Ok(())
}
