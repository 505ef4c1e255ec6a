//! docqa-vector
//!
//! Exact in-memory vector index used for passage retrieval.

pub mod distance;
pub mod index;

pub use index::{FlatIndex, Neighbor};
