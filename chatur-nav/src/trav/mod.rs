//! The lazy 3D traversability graph.
//!
//! A sparse graph over (cell, layer) pairs of the elevation map. Nodes are
//! created when first reached and classified on expansion: plane fit,
//! slope test, chest-height obstacle test, step-height neighbor linking.

pub mod builder;
pub mod map;
pub mod node;

pub use builder::TravBuilder;
pub use map::TravMap;
pub use node::{NodeId, NodeKind, TravNode};
