//! Profile graph access and predicate resolution

pub mod graph;
pub mod resolver;

pub use graph::{OxigraphProfileGraph, ProfileGraph};
pub use resolver::{PredicateResolver, DEFAULT_BNODE_DEPTH};
