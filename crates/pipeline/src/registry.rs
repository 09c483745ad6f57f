use anyhow::Result;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::KnowledgePipeline;
use crate::config::PipelineConfig;

pub type SharedPipeline = Arc<Mutex<KnowledgePipeline>>;

/// Independently locked pipelines keyed by domain name.
///
/// Each domain has exactly one pipeline, so writes to a domain's graph are
/// serialised by its lock while different domains proceed in parallel.
pub struct DomainRegistry {
    config: PipelineConfig,
    pipelines: DashMap<String, SharedPipeline>,
}

impl DomainRegistry {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            pipelines: DashMap::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Return the domain's pipeline, loading it from storage if it was saved
    /// before and creating an empty one otherwise.
    pub fn get_or_load(&self, domain: &str) -> Result<SharedPipeline> {
        if let Some(existing) = self.pipelines.get(domain) {
            return Ok(Arc::clone(existing.value()));
        }

        let entry = self.pipelines.entry(domain.to_string()).or_try_insert_with(|| {
            let saved = self.config.domain_dir(domain).join("graph.json").exists();
            let pipeline = if saved {
                KnowledgePipeline::load(domain, &self.config)?
            } else {
                KnowledgePipeline::new(domain, &self.config)
            };
            info!(domain, loaded = saved, "domain registered");
            Ok::<_, anyhow::Error>(Arc::new(Mutex::new(pipeline)))
        })?;
        Ok(Arc::clone(entry.value()))
    }

    pub fn get(&self, domain: &str) -> Option<SharedPipeline> {
        self.pipelines.get(domain).map(|p| Arc::clone(p.value()))
    }

    pub fn remove(&self, domain: &str) -> Option<SharedPipeline> {
        self.pipelines.remove(domain).map(|(_, p)| p)
    }

    pub fn domains(&self) -> Vec<String> {
        let mut names: Vec<String> = self.pipelines.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Save every registered domain.
    pub async fn save_all(&self) -> Result<()> {
        let pipelines: Vec<SharedPipeline> = self.pipelines.iter().map(|e| Arc::clone(e.value())).collect();
        for pipeline in pipelines {
            let pipeline = pipeline.lock().await;
            pipeline.save()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use ingest::TextDocument;
    use tempfile::TempDir;

    fn registry(root: &std::path::Path) -> DomainRegistry {
        DomainRegistry::new(PipelineConfig {
            storage: StorageConfig {
                root: root.to_path_buf(),
            },
            ..PipelineConfig::default()
        })
    }

    #[tokio::test]
    async fn test_same_domain_same_pipeline() {
        let root = TempDir::new().unwrap();
        let registry = registry(root.path());

        let a = registry.get_or_load("sozialrecht").unwrap();
        let b = registry.get_or_load("sozialrecht").unwrap();
        let c = registry.get_or_load("jugendhilfe").unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(registry.domains(), vec!["jugendhilfe", "sozialrecht"]);
    }

    #[tokio::test]
    async fn test_saved_domain_is_reloaded() {
        let root = TempDir::new().unwrap();
        {
            let registry = registry(root.path());
            let pipeline = registry.get_or_load("sozialrecht").unwrap();
            pipeline
                .lock()
                .await
                .ingest_document(&TextDocument::new("doc-1", "Zuständig ist das Jugendamt nach § 35a SGB VIII."));
            registry.save_all().await.unwrap();
        }

        let registry = registry(root.path());
        let pipeline = registry.get_or_load("sozialrecht").unwrap();
        assert!(pipeline.lock().await.graph().entity_count() > 0);
        assert!(registry.remove("sozialrecht").is_some());
        assert!(registry.get("sozialrecht").is_none());
    }

    #[tokio::test]
    async fn test_concurrent_writers_per_domain() {
        let root = TempDir::new().unwrap();
        let registry = Arc::new(registry(root.path()));

        let mut handles = Vec::new();
        for i in 0..4 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                let pipeline = registry.get_or_load("sozialrecht")?;
                let doc = TextDocument::new(format!("doc-{i}"), "Leistungen nach dem SGB IX.");
                pipeline.lock().await.ingest_document(&doc);
                anyhow::Ok(())
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let pipeline = registry.get("sozialrecht").unwrap();
        let guard = pipeline.lock().await;
        let laws = guard.graph().entities().filter(|e| e.name == "SGB IX").count();
        assert_eq!(laws, 1);
        assert_eq!(guard.metrics().snapshot().documents_processed, 4);
    }
}
