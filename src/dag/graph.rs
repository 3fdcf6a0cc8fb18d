// src/dag/graph.rs

use tracing::warn;

use super::task::{TaskId, TaskNode, TaskSpec, TaskState};

/// Arena of task nodes with edges stored as index lists in both directions.
///
/// A task may only depend on tasks registered before it, so the graph is
/// acyclic by construction.
#[derive(Debug, Default)]
pub struct TaskGraph {
    nodes: Vec<TaskNode>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. Each dependency records the new task as a successor.
    ///
    /// Dependencies that do not name an earlier task are dropped with a
    /// warning.
    pub fn add(&mut self, mut spec: TaskSpec) -> TaskId {
        let id = TaskId(self.nodes.len());

        spec.deps.retain(|dep| {
            let known = dep.0 < id.0;
            if !known {
                warn!(task = %spec.name, dep = dep.0, "ignoring dependency on unregistered task");
            }
            known
        });

        for dep in &spec.deps {
            self.nodes[dep.0].successors.push(id);
        }

        self.nodes.push(TaskNode::new(spec));
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        (0..self.nodes.len()).map(TaskId)
    }

    pub fn get(&self, id: TaskId) -> Option<&TaskNode> {
        self.nodes.get(id.0)
    }

    pub(crate) fn node(&self, id: TaskId) -> &TaskNode {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: TaskId) -> &mut TaskNode {
        &mut self.nodes[id.0]
    }

    pub fn state(&self, id: TaskId) -> TaskState {
        self.nodes[id.0].state
    }

    pub fn name(&self, id: TaskId) -> &str {
        &self.nodes[id.0].spec.name
    }

    pub fn dependencies_of(&self, id: TaskId) -> &[TaskId] {
        &self.nodes[id.0].spec.deps
    }

    pub fn successors_of(&self, id: TaskId) -> &[TaskId] {
        &self.nodes[id.0].successors
    }

    /// Every dependency of `id` has reached `Finished`.
    pub fn deps_finished(&self, id: TaskId) -> bool {
        self.dependencies_of(id)
            .iter()
            .all(|dep| self.nodes[dep.0].state == TaskState::Finished)
    }

    /// Move `id` to `to` if that is a legal lifecycle step.
    ///
    /// Returns `false` (and leaves the state alone) otherwise.
    pub fn advance(&mut self, id: TaskId, to: TaskState) -> bool {
        let node = &mut self.nodes[id.0];
        if !node.state.can_become(to) {
            warn!(
                task = %node.spec.name,
                from = ?node.state,
                to = ?to,
                "rejected illegal task state transition"
            );
            return false;
        }
        node.state = to;
        true
    }
}
