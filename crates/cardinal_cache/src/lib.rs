//! Identity-preserving entity cache.
//!
//! Every manager of the Cardinal client keeps its entities in an
//! [`EntityCache`]. The cache guarantees that one identifier maps to one
//! live `Arc` for as long as the entry exists, and collapses concurrent
//! lookups of the same missing key into a single fetch.

#![warn(missing_docs)]

mod cache;
mod entity;

pub use cache::{EntityCache, WeakEntityCache};
pub use entity::Entity;
