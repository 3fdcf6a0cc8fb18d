// src/dag/mod.rs

//! Task graph representation.
//!
//! - [`task`] holds the task declaration ([`TaskSpec`]), its lifecycle
//!   ([`TaskState`]) and the per-task runtime data ([`TaskNode`]).
//! - [`graph`] is the index-based arena that stores dependencies and
//!   successors for every node.

pub mod graph;
pub mod task;

pub use graph::TaskGraph;
pub use task::{TaskId, TaskNode, TaskSpec, TaskState};
