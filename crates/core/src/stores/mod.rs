pub mod memory;
pub mod qdrant;

pub use memory::{MemoryStore, MemoryVectorIndex};
pub use qdrant::QdrantIndex;
