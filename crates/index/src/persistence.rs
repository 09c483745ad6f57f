//! On-disk layout of a saved graph:
//!
//! ```text
//! <dir>/graph.json      topology: format version, domain, node ids, edges
//! <dir>/entities.json   entity index
//! <dir>/relations.json  relation index
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::info;

use extract::{Entity, Relation};

use crate::error::{PersistenceError, PersistenceResult};
use crate::knowledge_graph::KnowledgeGraph;
use crate::store::{EdgeRecord, GraphStore};

pub const FORMAT_VERSION: u32 = 1;

const GRAPH_FILE: &str = "graph.json";
const ENTITIES_FILE: &str = "entities.json";
const RELATIONS_FILE: &str = "relations.json";

#[derive(Debug, Serialize, Deserialize)]
struct GraphTopology {
    format_version: u32,
    domain: String,
    nodes: Vec<String>,
    edges: Vec<EdgeRecord>,
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> PersistenceResult<()> {
    let json = serde_json::to_vec_pretty(value).map_err(|source| PersistenceError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> PersistenceResult<T> {
    let bytes = fs::read(path).map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| PersistenceError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

impl<S: GraphStore> KnowledgeGraph<S> {
    /// Write topology and both indices into `dir`, creating it if needed.
    pub fn save(&self, dir: &Path) -> PersistenceResult<()> {
        fs::create_dir_all(dir).map_err(|source| PersistenceError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let topology = GraphTopology {
            format_version: FORMAT_VERSION,
            domain: self.domain.clone(),
            nodes: self.store.node_ids().into_iter().map(str::to_string).collect(),
            edges: self.store.edges().into_iter().cloned().collect(),
        };
        let entities: Vec<&Entity> = self.entity_index.values().collect();
        let relations: Vec<&Relation> = self.relation_index.values().collect();

        write_json(&dir.join(GRAPH_FILE), &topology)?;
        write_json(&dir.join(ENTITIES_FILE), &entities)?;
        write_json(&dir.join(RELATIONS_FILE), &relations)?;

        info!(
            domain = %self.domain,
            path = %dir.display(),
            entities = entities.len(),
            relations = relations.len(),
            "graph saved"
        );
        Ok(())
    }

    /// Read a graph written by [`KnowledgeGraph::save`].
    ///
    /// Fails if any file is missing or malformed, or if the topology and the
    /// indices disagree.
    pub fn load(dir: &Path) -> PersistenceResult<Self> {
        let topology: GraphTopology = read_json(&dir.join(GRAPH_FILE))?;
        if topology.format_version != FORMAT_VERSION {
            return Err(PersistenceError::UnsupportedVersion(topology.format_version));
        }
        let entities: Vec<Entity> = read_json(&dir.join(ENTITIES_FILE))?;
        let relations: Vec<Relation> = read_json(&dir.join(RELATIONS_FILE))?;

        validate(&topology, &entities, &relations)?;

        let mut graph = Self::with_store(topology.domain, S::default());
        for node in &topology.nodes {
            graph.store.add_node(node);
        }
        graph.add_entities(entities);
        graph.add_relations(relations);

        info!(
            domain = %graph.domain,
            path = %dir.display(),
            entities = graph.entity_count(),
            relations = graph.relation_count(),
            "graph loaded"
        );
        Ok(graph)
    }
}

fn validate(topology: &GraphTopology, entities: &[Entity], relations: &[Relation]) -> PersistenceResult<()> {
    let nodes: HashSet<&str> = topology.nodes.iter().map(String::as_str).collect();
    if nodes.len() != topology.nodes.len() {
        return Err(PersistenceError::Inconsistent("duplicate node ids in topology".to_string()));
    }

    if let Some(entity) = entities.iter().find(|e| !nodes.contains(e.id.as_str())) {
        return Err(PersistenceError::Inconsistent(format!(
            "entity {} has no node in the topology",
            entity.id
        )));
    }

    if topology.edges.len() != relations.len() {
        return Err(PersistenceError::Inconsistent(format!(
            "topology has {} edges but {} relations were stored",
            topology.edges.len(),
            relations.len()
        )));
    }

    let edges: HashSet<(&str, &str, &str)> = topology
        .edges
        .iter()
        .map(|e| (e.key.as_str(), e.source.as_str(), e.target.as_str()))
        .collect();
    for relation in relations {
        let key = (
            relation.id.as_str(),
            relation.source_id.as_str(),
            relation.target_id.as_str(),
        );
        if !edges.contains(&key) {
            return Err(PersistenceError::Inconsistent(format!(
                "relation {} does not match any edge",
                relation.id
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::{EntityAttributes, EntityType};
    use serde_json::json;
    use tempfile::TempDir;

    fn load(dir: &Path) -> PersistenceResult<KnowledgeGraph> {
        KnowledgeGraph::load(dir)
    }

    fn sample_graph() -> KnowledgeGraph {
        let law = Entity::new(
            EntityType::Law,
            "SGB IX",
            EntityAttributes::Law {
                code: "SGB-IX".to_string(),
                full_name: Some("Sozialgesetzbuch Neuntes Buch".to_string()),
                url: None,
            },
            "doc-1",
            0.95,
        )
        .with_mention(10, 16)
        .with_property("source_documents", json!(["doc-1", "doc-2"]))
        .with_property("mention_count", 2);
        let paragraph = Entity::new(EntityType::Paragraph, "§29", EntityAttributes::None, "doc-1", 0.9);

        let mut graph = KnowledgeGraph::new("eingliederungshilfe");
        graph.add_entities([law.clone(), paragraph.clone()]);
        graph.add_relation(
            Relation::new("belongs_to", paragraph.id.as_str(), law.id.as_str(), "doc-1", 0.9)
                .with_property("pattern", "§ 29 SGB"),
        );
        graph.add_relation(Relation::new("verweist_auf", paragraph.id.as_str(), "paragraph_missing", "doc-1", 0.85));
        graph
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let graph = sample_graph();

        graph.save(dir.path()).unwrap();
        let loaded = load(dir.path()).unwrap();

        assert_eq!(loaded.domain(), "eingliederungshilfe");
        assert_eq!(loaded.entity_index(), graph.entity_index());
        assert_eq!(loaded.relation_index(), graph.relation_index());
        assert_eq!(loaded.nodes(), graph.nodes());
        assert_eq!(loaded.stats(), graph.stats());
    }

    #[test]
    fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        let err = load(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, PersistenceError::Io { .. }));
    }

    #[test]
    fn test_malformed_file() {
        let dir = TempDir::new().unwrap();
        sample_graph().save(dir.path()).unwrap();
        fs::write(dir.path().join(ENTITIES_FILE), "{not json").unwrap();

        let err = load(dir.path()).unwrap_err();
        assert!(matches!(err, PersistenceError::Malformed { .. }));
        assert!(err.to_string().contains(ENTITIES_FILE));
    }

    #[test]
    fn test_inconsistent_files() {
        let dir = TempDir::new().unwrap();
        sample_graph().save(dir.path()).unwrap();
        fs::write(dir.path().join(RELATIONS_FILE), "[]").unwrap();

        let err = load(dir.path()).unwrap_err();
        assert!(matches!(err, PersistenceError::Inconsistent(_)));
    }

    #[test]
    fn test_unsupported_version() {
        let dir = TempDir::new().unwrap();
        sample_graph().save(dir.path()).unwrap();

        let path = dir.path().join(GRAPH_FILE);
        let mut topology: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        topology["format_version"] = json!(99);
        fs::write(&path, topology.to_string()).unwrap();

        let err = load(dir.path()).unwrap_err();
        assert!(matches!(err, PersistenceError::UnsupportedVersion(99)));
    }
}
