//! Vector Index implementations.
//!
//! `MemoryVectorIndex` keeps vectors in process and answers with exact cosine
//! similarity. With the `lancedb` feature, `LanceVectorIndex` stores them in a
//! LanceDB table on disk.
pub mod memory;
pub mod similarity;

#[cfg(feature = "lancedb")]
pub mod lance;
#[cfg(feature = "lancedb")]
pub mod schema;

pub use memory::MemoryVectorIndex;

#[cfg(feature = "lancedb")]
pub use lance::LanceVectorIndex;
