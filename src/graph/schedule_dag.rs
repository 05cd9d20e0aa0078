use crate::error::ScheduleError;
use crate::task::{Relation, Task, TaskId};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Precedence graph over the schedulable tasks. Edges run from
/// predecessor to successor and carry the relation.
#[derive(Debug, Clone, Default)]
pub struct ScheduleDag {
    pub graph: DiGraph<TaskId, Relation>,
    pub id_to_index: HashMap<TaskId, NodeIndex>,
}

impl ScheduleDag {
    /// Builds the graph from active, non-summary tasks. Relations touching
    /// any other task are left out.
    pub fn build(tasks: &[Task]) -> Self {
        let mut graph: DiGraph<TaskId, Relation> = DiGraph::new();
        let mut id_to_index: HashMap<TaskId, NodeIndex> = HashMap::new();

        for task in tasks.iter().filter(|t| t.is_schedulable()) {
            let node_ix = graph.add_node(task.id);
            id_to_index.insert(task.id, node_ix);
        }

        for task in tasks.iter().filter(|t| t.is_schedulable()) {
            for relation in &task.predecessors {
                if let (Some(&u), Some(&v)) =
                    (id_to_index.get(&relation.target), id_to_index.get(&relation.source))
                {
                    graph.add_edge(u, v, *relation);
                }
            }
        }

        Self { graph, id_to_index }
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.id_to_index.contains_key(&id)
    }

    /// Relations in which `id` is the successor.
    pub fn predecessors(&self, id: TaskId) -> Vec<&Relation> {
        self.relations(id, Direction::Incoming)
    }

    /// Relations in which `id` is the predecessor.
    pub fn successors(&self, id: TaskId) -> Vec<&Relation> {
        self.relations(id, Direction::Outgoing)
    }

    fn relations(&self, id: TaskId, direction: Direction) -> Vec<&Relation> {
        let Some(&node_ix) = self.id_to_index.get(&id) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self.graph.edges_directed(node_ix, direction).collect();
        edges.sort_by_key(|edge| edge.id());
        edges.into_iter().map(|edge| edge.weight()).collect()
    }

    /// Orders tasks so that every predecessor precedes its successors.
    ///
    /// Depth-first over predecessor edges with an explicit stack: a task is
    /// emitted once all of its predecessors have been emitted. Reaching a
    /// task that is still in progress means the graph has a cycle, and no
    /// partial order is returned.
    pub fn topological_order(&self) -> Result<Vec<TaskId>, ScheduleError> {
        let mut marks = vec![Mark::Unvisited; self.graph.node_count()];
        let mut order = Vec::with_capacity(self.graph.node_count());
        let mut stack: Vec<(NodeIndex, Vec<NodeIndex>)> = Vec::new();

        for root in self.graph.node_indices() {
            if marks[root.index()] != Mark::Unvisited {
                continue;
            }
            marks[root.index()] = Mark::InProgress;
            stack.push((root, self.pending_predecessors(root)));

            while let Some((node, pending)) = stack.last_mut() {
                let node = *node;
                match pending.pop() {
                    Some(next) => match marks[next.index()] {
                        Mark::InProgress => {
                            let task = self.graph[next];
                            debug!(task, "cycle reached during topological sort");
                            return Err(ScheduleError::Cycle);
                        }
                        Mark::Done => {}
                        Mark::Unvisited => {
                            marks[next.index()] = Mark::InProgress;
                            stack.push((next, self.pending_predecessors(next)));
                        }
                    },
                    None => {
                        marks[node.index()] = Mark::Done;
                        order.push(self.graph[node]);
                        stack.pop();
                    }
                }
            }
        }

        Ok(order)
    }

    /// Predecessor nodes in reverse insertion order, so popping visits them
    /// in insertion order.
    fn pending_predecessors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut predecessors: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .collect();
        predecessors.sort_unstable_by(|a, b| b.cmp(a));
        predecessors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::WorkDuration;
    use crate::task::RelationType;

    fn task(id: TaskId, preds: &[TaskId]) -> Task {
        let mut task = Task::new(id, format!("T{id}"), WorkDuration::days(1.0));
        for &pred in preds {
            task.add_predecessor(pred, RelationType::FinishStart, WorkDuration::zero());
        }
        task
    }

    #[test]
    fn orders_predecessors_first() {
        let tasks = vec![task(3, &[1, 2]), task(2, &[1]), task(1, &[])];
        let order = ScheduleDag::build(&tasks).topological_order().unwrap();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn skips_summary_and_inactive_tasks() {
        let mut summary = task(10, &[]);
        summary.summary = true;
        let mut inactive = task(11, &[1]);
        inactive.active = false;
        let tasks = vec![task(1, &[]), summary, inactive, task(2, &[10, 1])];
        let dag = ScheduleDag::build(&tasks);
        assert_eq!(dag.len(), 2);
        assert_eq!(dag.predecessors(2).len(), 1);
        assert_eq!(dag.topological_order().unwrap(), vec![1, 2]);
    }

    #[test]
    fn two_task_cycle_is_rejected() {
        let tasks = vec![task(1, &[2]), task(2, &[1])];
        assert!(matches!(
            ScheduleDag::build(&tasks).topological_order(),
            Err(ScheduleError::Cycle)
        ));
    }

    #[test]
    fn successors_follow_relation_direction() {
        let tasks = vec![task(1, &[]), task(2, &[1]), task(3, &[1])];
        let dag = ScheduleDag::build(&tasks);
        let successors: Vec<TaskId> = dag.successors(1).iter().map(|r| r.source).collect();
        assert_eq!(successors, vec![2, 3]);
        assert!(dag.successors(3).is_empty());
    }
}
