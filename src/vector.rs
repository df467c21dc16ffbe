//! Vector math primitives and vector storage.
//!
//! - [`math`] provides pure numeric operations over `f32` slices
//!   (dot product, normalization, similarity metrics, k-NN selection).
//! - [`store`] provides the [`store::VectorStore`] trait with an in-memory
//!   implementation and a snapshot-persisting file-backed wrapper.

pub mod math;
pub mod store;
