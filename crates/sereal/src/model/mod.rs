//! Core data types for Sereal object graphs.

pub mod value;

pub use value::{node, Node, RegexFlags, Value, WeakNode};
