//! The trait shared by all cached entities.

use std::fmt::{Debug, Display};
use std::hash::Hash;

/// A remote resource that can be memoized by identifier.
pub trait Entity: Send + Sync + 'static {
    /// Identifier type (a snowflake string or a server-assigned integer).
    type Id: Clone + Eq + Hash + Debug + Display + Send + Sync + 'static;

    /// Kind name used in logs, e.g. `"guild"`.
    const KIND: &'static str;

    /// The identifier this entity is cached under.
    fn id(&self) -> Self::Id;
}
