pub mod graph_export;
pub mod greedy_modularity;
pub mod label_propagation;
pub mod louvain;
pub mod summarizer;

pub use graph_export::{ExportLink, ExportNode, GraphData, GraphExport};
pub use greedy_modularity::GreedyModularityDetector;
pub use label_propagation::LabelPropagationDetector;
pub use louvain::LouvainDetector;
pub use summarizer::{CommunitySummarizer, CommunitySummary};

use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::info;

use index::{GraphStore, KnowledgeGraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunityAlgorithm {
    #[default]
    Louvain,
    LabelPropagation,
    GreedyModularity,
}

impl CommunityAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommunityAlgorithm::Louvain => "louvain",
            CommunityAlgorithm::LabelPropagation => "label_propagation",
            CommunityAlgorithm::GreedyModularity => "greedy_modularity",
        }
    }
}

impl fmt::Display for CommunityAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommunityAlgorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "louvain" => Ok(CommunityAlgorithm::Louvain),
            "label_propagation" => Ok(CommunityAlgorithm::LabelPropagation),
            "greedy_modularity" => Ok(CommunityAlgorithm::GreedyModularity),
            other => bail!("Unknown community algorithm: {other}"),
        }
    }
}

/// One detected community; members are entity ids in sorted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Community {
    pub id: usize,
    pub name: String,
    pub members: Vec<String>,
}

/// Modularity of a partition given as one community index per node.
pub fn modularity(graph: &GraphData, labels: &[usize]) -> f64 {
    let m = graph.edge_count() as f64;
    if m == 0.0 {
        return 0.0;
    }

    let mut internal: BTreeMap<usize, f64> = BTreeMap::new();
    let mut degree: BTreeMap<usize, f64> = BTreeMap::new();
    for &(a, b) in &graph.edges {
        if labels[a] == labels[b] {
            *internal.entry(labels[a]).or_insert(0.0) += 1.0;
        }
        *degree.entry(labels[a]).or_insert(0.0) += 1.0;
        *degree.entry(labels[b]).or_insert(0.0) += 1.0;
    }

    degree
        .iter()
        .map(|(label, &d)| {
            let l = internal.get(label).copied().unwrap_or(0.0);
            l / m - (d / (2.0 * m)).powi(2)
        })
        .sum()
}

/// Partitions the undirected projection of a knowledge graph.
#[derive(Debug, Clone)]
pub struct CommunityDetector {
    algorithm: CommunityAlgorithm,
    seed: u64,
    summarizer: CommunitySummarizer,
}

impl Default for CommunityDetector {
    fn default() -> Self {
        Self::new(CommunityAlgorithm::default())
    }
}

impl CommunityDetector {
    pub fn new(algorithm: CommunityAlgorithm) -> Self {
        Self {
            algorithm,
            seed: 42,
            summarizer: CommunitySummarizer::default(),
        }
    }

    /// Seed for label propagation's visiting order.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_summarizer(mut self, summarizer: CommunitySummarizer) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn algorithm(&self) -> CommunityAlgorithm {
        self.algorithm
    }

    fn labels(&self, data: GraphData) -> Vec<usize> {
        match self.algorithm {
            CommunityAlgorithm::Louvain => LouvainDetector::new(data).detect(),
            CommunityAlgorithm::LabelPropagation => LabelPropagationDetector::new(data, self.seed).detect(),
            CommunityAlgorithm::GreedyModularity => GreedyModularityDetector::new(data).detect(),
        }
    }

    /// Communities named `Community_N`, largest first.
    pub fn detect<S: GraphStore>(&self, graph: &KnowledgeGraph<S>) -> Vec<Community> {
        let data = GraphData::from_graph(graph);
        if data.node_count() == 0 {
            return Vec::new();
        }

        let entities = data.entities.clone();
        let labels = self.labels(data);

        let mut groups: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for (entity_id, label) in entities.into_iter().zip(labels) {
            groups.entry(label).or_default().push(entity_id);
        }
        let mut members: Vec<Vec<String>> = groups
            .into_values()
            .map(|mut ids| {
                ids.sort();
                ids
            })
            .collect();
        members.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let communities: Vec<Community> = members
            .into_iter()
            .enumerate()
            .map(|(id, members)| Community {
                id,
                name: format!("Community_{id}"),
                members,
            })
            .collect();

        info!(
            domain = graph.domain(),
            algorithm = %self.algorithm,
            communities = communities.len(),
            "communities detected"
        );
        communities
    }

    /// Full pipeline: detect communities and generate summaries
    pub fn detect_and_summarize<S: GraphStore>(&self, graph: &KnowledgeGraph<S>) -> Vec<CommunitySummary> {
        self.detect(graph)
            .iter()
            .map(|community| self.summarizer.summarize_community(community, graph))
            .collect()
    }
}
