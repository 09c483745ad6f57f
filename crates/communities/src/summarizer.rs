use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use index::{GraphStore, KnowledgeGraph};

use crate::Community;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommunitySummary {
    pub community_id: usize,
    pub name: String,
    pub entity_count: usize,
    pub relation_count: usize,
    pub summary: String,
    pub key_entities: Vec<String>,
    /// (entity type, member count), most frequent first
    pub dominant_types: Vec<(String, usize)>,
}

/// Rule-based description of a community from the entities it contains.
#[derive(Debug, Clone)]
pub struct CommunitySummarizer {
    max_key_entities: usize,
    max_types: usize,
}

impl Default for CommunitySummarizer {
    fn default() -> Self {
        Self::new(5)
    }
}

impl CommunitySummarizer {
    pub fn new(max_key_entities: usize) -> Self {
        Self {
            max_key_entities,
            max_types: 3,
        }
    }

    pub fn summarize_community<S: GraphStore>(
        &self,
        community: &Community,
        graph: &KnowledgeGraph<S>,
    ) -> CommunitySummary {
        let members: HashSet<&str> = community.members.iter().map(String::as_str).collect();

        let mut types: BTreeMap<String, usize> = BTreeMap::new();
        for id in &community.members {
            let entity_type = graph
                .get_entity(id)
                .map_or_else(|| "Unknown".to_string(), |e| e.entity_type.to_string());
            *types.entry(entity_type).or_insert(0) += 1;
        }
        let mut dominant_types: Vec<(String, usize)> = types.into_iter().collect();
        dominant_types.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        dominant_types.truncate(self.max_types);

        // Degree counted over relations with both ends inside the community
        let mut internal_degree: BTreeMap<&str, usize> = members.iter().map(|&id| (id, 0)).collect();
        let mut relation_count = 0;
        for relation in graph.relations() {
            let (source, target) = (relation.source_id.as_str(), relation.target_id.as_str());
            if members.contains(source) && members.contains(target) {
                relation_count += 1;
                *internal_degree.entry(source).or_insert(0) += 1;
                *internal_degree.entry(target).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(&str, usize)> = internal_degree.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        let key_entities: Vec<String> = ranked
            .into_iter()
            .take(self.max_key_entities)
            .map(|(id, _)| graph.get_entity(id).map_or_else(|| id.to_string(), |e| e.name.clone()))
            .collect();

        let summary = self.describe(community, relation_count, &dominant_types, &key_entities);

        CommunitySummary {
            community_id: community.id,
            name: community.name.clone(),
            entity_count: community.members.len(),
            relation_count,
            summary,
            key_entities,
            dominant_types,
        }
    }

    fn describe(
        &self,
        community: &Community,
        relation_count: usize,
        dominant_types: &[(String, usize)],
        key_entities: &[String],
    ) -> String {
        let mut text = format!(
            "{} groups {} entities connected by {} internal relations.",
            community.name,
            community.members.len(),
            relation_count
        );

        if !dominant_types.is_empty() {
            let types: Vec<String> = dominant_types
                .iter()
                .map(|(name, count)| format!("{name} ({count})"))
                .collect();
            text.push_str(&format!(" Mostly {}.", types.join(", ")));
        }
        if !key_entities.is_empty() {
            text.push_str(&format!(" Key entities: {}.", key_entities.join(", ")));
        }
        text
    }
}
