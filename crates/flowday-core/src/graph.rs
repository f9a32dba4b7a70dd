//! Graph builder: node map and dependency graph for one user's day.
//!
//! Assembles the schedulable node set (habits plus active tasks) with their
//! derived scheduling attributes, and the directed dependency graph from the
//! stored relation edges. Every relation kind is a precedence constraint.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveTime;

use crate::model::{Edge, Habit, NodeKey, NodeType, Task};

/// Derived scheduling attributes for one schedulable node.
#[derive(Debug, Clone, Default)]
pub struct NodeAttrs {
    pub soft_start: Option<NaiveTime>,
    pub soft_end: Option<NaiveTime>,
    pub energy_tag: Option<String>,
}

/// Adjacency and in-degree counts over node keys.
///
/// Covers every node that appears in an edge, schedulable or not; nodes with
/// no incoming edges carry an explicit in-degree of 0.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    pub adjacency: BTreeMap<NodeKey, BTreeSet<NodeKey>>,
    pub in_degree: BTreeMap<NodeKey, usize>,
}

impl DependencyGraph {
    pub fn successors(&self, key: &NodeKey) -> impl Iterator<Item = &NodeKey> {
        self.adjacency.get(key).into_iter().flatten()
    }
}

/// Build the schedulable node map from a user's habits and active tasks.
///
/// A task without its own energy tag inherits the tag of its linked habit,
/// and always inherits the habit's soft window; a task with no habit link
/// has no soft window.
pub fn collect_nodes(habits: &[Habit], tasks: &[Task]) -> BTreeMap<NodeKey, NodeAttrs> {
    let habit_by_id: HashMap<i64, &Habit> = habits.iter().map(|h| (h.id, h)).collect();

    let mut nodes = BTreeMap::new();
    for habit in habits {
        nodes.insert(
            (NodeType::Habit, habit.id),
            NodeAttrs {
                soft_start: habit.soft_window_start,
                soft_end: habit.soft_window_end,
                energy_tag: habit.energy_tag.clone(),
            },
        );
    }

    for task in tasks {
        let linked = task.habit_id.and_then(|id| habit_by_id.get(&id).copied());
        nodes.insert(
            (NodeType::Task, task.id),
            NodeAttrs {
                soft_start: linked.and_then(|h| h.soft_window_start),
                soft_end: linked.and_then(|h| h.soft_window_end),
                energy_tag: task
                    .energy_tag
                    .clone()
                    .or_else(|| linked.and_then(|h| h.energy_tag.clone())),
            },
        );
    }

    nodes
}

/// Build adjacency and in-degree counts from relation edges.
///
/// Duplicate edges between the same pair are counted once.
pub fn build_dependency_graph(edges: &[Edge]) -> DependencyGraph {
    let mut graph = DependencyGraph::default();

    for edge in edges {
        let from = edge.from_key();
        let to = edge.to_key();

        let inserted = graph.adjacency.entry(from).or_default().insert(to);
        if inserted {
            *graph.in_degree.entry(to).or_insert(0) += 1;
        }
        graph.in_degree.entry(from).or_insert(0);
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RelationType;

    fn habit(id: i64, start: Option<(u32, u32)>, energy: Option<&str>) -> Habit {
        Habit {
            id,
            user_id: 1,
            system_id: 1,
            name: format!("habit-{id}"),
            soft_window_start: start.and_then(|(h, m)| NaiveTime::from_hms_opt(h, m, 0)),
            soft_window_end: start.and_then(|(h, m)| NaiveTime::from_hms_opt(h + 1, m, 0)),
            energy_tag: energy.map(str::to_string),
            recurrence_rule: None,
            anchor_event: None,
        }
    }

    fn task(id: i64, habit_id: Option<i64>, energy: Option<&str>) -> Task {
        Task {
            id,
            user_id: 1,
            habit_id,
            title: format!("task-{id}"),
            difficulty: 3,
            est_minutes: None,
            priority: 1,
            energy_tag: energy.map(str::to_string),
            is_recurring: false,
            active: true,
        }
    }

    fn edge(from: NodeKey, to: NodeKey, relation: RelationType) -> Edge {
        Edge {
            id: 0,
            user_id: 1,
            from_type: from.0,
            from_id: from.1,
            to_type: to.0,
            to_id: to.1,
            relation,
        }
    }

    #[test]
    fn task_inherits_window_and_tag_from_linked_habit() {
        let habits = vec![habit(1, Some((18, 0)), Some("evening"))];
        let tasks = vec![task(10, Some(1), None)];

        let nodes = collect_nodes(&habits, &tasks);
        let attrs = &nodes[&(NodeType::Task, 10)];
        assert_eq!(attrs.soft_start, NaiveTime::from_hms_opt(18, 0, 0));
        assert_eq!(attrs.energy_tag.as_deref(), Some("evening"));
    }

    #[test]
    fn task_own_tag_wins_over_habit_tag() {
        let habits = vec![habit(1, Some((18, 0)), Some("evening"))];
        let tasks = vec![task(10, Some(1), Some("high-focus"))];

        let nodes = collect_nodes(&habits, &tasks);
        assert_eq!(
            nodes[&(NodeType::Task, 10)].energy_tag.as_deref(),
            Some("high-focus")
        );
    }

    #[test]
    fn unlinked_task_has_no_window() {
        let nodes = collect_nodes(&[], &[task(10, None, None)]);
        let attrs = &nodes[&(NodeType::Task, 10)];
        assert!(attrs.soft_start.is_none());
        assert!(attrs.soft_end.is_none());
    }

    #[test]
    fn in_degree_counts_incoming_edges_once() {
        let a = (NodeType::Habit, 1);
        let b = (NodeType::Task, 2);
        let edges = vec![
            edge(a, b, RelationType::Triggers),
            edge(a, b, RelationType::Supports),
        ];

        let graph = build_dependency_graph(&edges);
        assert_eq!(graph.in_degree[&b], 1);
        assert_eq!(graph.in_degree[&a], 0);
        assert_eq!(graph.adjacency[&a].len(), 1);
    }

    #[test]
    fn all_relation_kinds_are_precedence() {
        let a = (NodeType::Habit, 1);
        let b = (NodeType::Habit, 2);
        let c = (NodeType::Habit, 3);
        let d = (NodeType::Habit, 4);
        let edges = vec![
            edge(a, b, RelationType::Supports),
            edge(a, c, RelationType::Triggers),
            edge(a, d, RelationType::Follows),
        ];

        let graph = build_dependency_graph(&edges);
        assert_eq!(graph.in_degree[&b], 1);
        assert_eq!(graph.in_degree[&c], 1);
        assert_eq!(graph.in_degree[&d], 1);
    }
}
