pub mod cypher;
pub mod engine;

pub use cypher::{MatchPattern, Row};
pub use engine::{EntityContext, GraphQueryEngine, RelatedEntry};
