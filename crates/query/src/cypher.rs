//! Single-pattern query form:
//!
//! ```text
//! MATCH (a:TypeA)-[:relation_type]->(b:TypeB) RETURN a, b
//! ```
//!
//! Type names may be English or German (`Gesetz`, `Behörde`, ...). Anything
//! else is not understood and yields no rows.

use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::debug;

use extract::EntityType;
use index::{GraphStore, KnowledgeGraph};

static MATCH_RETURN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*MATCH\s*\(\s*(\w+)\s*:\s*(\w+)\s*\)\s*-\s*\[\s*:\s*(\w+)\s*\]\s*->\s*\(\s*(\w+)\s*:\s*(\w+)\s*\)\s*RETURN\s+(\w+)\s*,\s*(\w+)\s*;?\s*$",
    )
    .unwrap_or_else(|e| panic!("invalid query pattern: {e}"))
});

pub type Row = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPattern {
    pub source_var: String,
    pub source_type: EntityType,
    pub relation_type: String,
    pub target_var: String,
    pub target_type: EntityType,
}

impl MatchPattern {
    /// `None` for any query outside the supported shape, including a RETURN
    /// clause that does not name exactly the two matched variables.
    pub fn parse(query: &str) -> Option<Self> {
        let caps = MATCH_RETURN.captures(query)?;
        let source_var = caps[1].to_string();
        let target_var = caps[4].to_string();
        if source_var == target_var {
            return None;
        }

        let returned = [&caps[6], &caps[7]];
        let names_both = returned.contains(&source_var.as_str()) && returned.contains(&target_var.as_str());
        if !names_both {
            return None;
        }

        Some(Self {
            source_var,
            source_type: EntityType::parse(&caps[2]),
            relation_type: caps[3].to_string(),
            target_var,
            target_type: EntityType::parse(&caps[5]),
        })
    }

    pub fn execute<S: GraphStore>(&self, graph: &KnowledgeGraph<S>) -> Vec<Row> {
        let mut rows = Vec::new();
        for source in graph.entities().filter(|e| e.entity_type == self.source_type) {
            for relation in graph.outgoing_relations(&source.id) {
                if relation.relation_type != self.relation_type {
                    continue;
                }
                let Some(target) = graph.get_entity(&relation.target_id) else {
                    continue;
                };
                if target.entity_type != self.target_type {
                    continue;
                }
                rows.push(Row::from([
                    (self.source_var.clone(), source.to_value()),
                    (self.target_var.clone(), target.to_value()),
                ]));
            }
        }
        rows
    }
}

/// Run `query` against `graph`. Unsupported queries return no rows.
pub fn run<S: GraphStore>(graph: &KnowledgeGraph<S>, query: &str) -> Vec<Row> {
    match MatchPattern::parse(query) {
        Some(pattern) => pattern.execute(graph),
        None => {
            debug!(query, "unsupported query shape");
            Vec::new()
        }
    }
}
