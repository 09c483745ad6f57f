pub mod error;
pub mod knowledge_graph;
pub mod persistence;
pub mod store;

pub use error::{PersistenceError, PersistenceResult};
pub use knowledge_graph::{GraphStats, KnowledgeGraph, TraversalDirection};
pub use persistence::FORMAT_VERSION;
pub use store::{EdgeRecord, GraphStore, PetgraphStore};
