use serde::{Deserialize, Serialize};

/// Knobs for entity and relation extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Max gap in bytes between two mentions for a `mentioned_with` relation
    pub proximity_window: usize,
    /// How far back a paragraph looks for its law
    pub law_window: usize,
    pub enable_proximity: bool,
    pub enable_structural: bool,
    /// Entities below this confidence are dropped after merging
    pub min_confidence: f64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            proximity_window: 200,
            law_window: 200,
            enable_proximity: true,
            enable_structural: true,
            min_confidence: 0.0,
        }
    }
}
