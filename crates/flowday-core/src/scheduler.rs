//! Dependency-aware day scheduler.
//!
//! Orders the schedulable nodes with Kahn's algorithm over the relation
//! graph. The ready set is a binary heap keyed by
//! `(preferred-window-start-minutes, node key)`, so among simultaneously
//! ready nodes the earliest window is emitted first and a newly readied node
//! with an earlier window overtakes nodes that were already waiting. Nodes
//! without a preferred start sort as end-of-day.
//!
//! Cycles are not an error: nodes whose in-degree never reaches zero are
//! appended after all acyclic nodes in ascending node-key order. Edges that
//! reference nodes outside the schedulable set still propagate ordering but
//! are never emitted.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use chrono::{NaiveTime, Timelike};

use crate::graph::{DependencyGraph, NodeAttrs};
use crate::model::{NodeKey, PlanAnchor};
use crate::storage::SchedulerConfig;

/// Sort key for nodes with no preferred window start.
pub const END_OF_DAY_MINUTES: u32 = 24 * 60;

/// Convert a preferred window start to minutes since midnight.
pub fn time_to_minutes(value: Option<NaiveTime>) -> u32 {
    match value {
        Some(t) => t.hour() * 60 + t.minute(),
        None => END_OF_DAY_MINUTES,
    }
}

/// One emitted node with its derived plan-item attributes.
#[derive(Debug, Clone)]
pub struct ScheduledNode {
    pub key: NodeKey,
    /// True when the node had zero unresolved dependencies at generation
    /// time; such items start READY, all others start PLANNED.
    pub initially_ready: bool,
    pub window_start: Option<NaiveTime>,
    pub window_end: Option<NaiveTime>,
    pub anchor: Option<PlanAnchor>,
}

/// Topological day scheduler.
pub struct DayScheduler {
    config: SchedulerConfig,
}

impl DayScheduler {
    pub fn new() -> Self {
        Self {
            config: SchedulerConfig::default(),
        }
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Produce the emission order over all schedulable nodes.
    ///
    /// For every edge `from -> to` between acyclic schedulable nodes, `from`
    /// appears before `to`.
    pub fn schedule(
        &self,
        nodes: &BTreeMap<NodeKey, NodeAttrs>,
        graph: &DependencyGraph,
    ) -> Vec<ScheduledNode> {
        let mut in_degree = graph.in_degree.clone();
        for key in nodes.keys() {
            in_degree.entry(*key).or_insert(0);
        }

        let initially_ready: BTreeSet<NodeKey> = in_degree
            .iter()
            .filter(|(key, degree)| **degree == 0 && nodes.contains_key(*key))
            .map(|(key, _)| *key)
            .collect();

        let sort_minutes = |key: &NodeKey| -> u32 {
            time_to_minutes(nodes.get(key).and_then(|attrs| attrs.soft_start))
        };

        let mut ready = BinaryHeap::new();
        for (key, degree) in &in_degree {
            if *degree == 0 {
                ready.push(Reverse((sort_minutes(key), *key)));
            }
        }

        let mut order: Vec<NodeKey> = Vec::with_capacity(in_degree.len());
        while let Some(Reverse((_, key))) = ready.pop() {
            order.push(key);
            for successor in graph.successors(&key) {
                if let Some(degree) = in_degree.get_mut(successor) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(Reverse((sort_minutes(successor), *successor)));
                    }
                }
            }
        }

        // Cycle fallback: whatever never reached in-degree zero, appended in
        // ascending node-key order.
        let stuck: Vec<NodeKey> = in_degree
            .iter()
            .filter(|(_, degree)| **degree > 0)
            .map(|(key, _)| *key)
            .collect();
        if !stuck.is_empty() {
            tracing::debug!("cycle fallback: appending {} stuck node(s)", stuck.len());
            order.extend(stuck);
        }

        order
            .into_iter()
            .filter_map(|key| {
                let attrs = nodes.get(&key)?;
                Some(self.emit(key, attrs, initially_ready.contains(&key)))
            })
            .collect()
    }

    fn emit(&self, key: NodeKey, attrs: &NodeAttrs, initially_ready: bool) -> ScheduledNode {
        let mut window_start = attrs.soft_start;
        let mut window_end = attrs.soft_end;

        // The TIME anchor is decided before the energy backfill, so a
        // windowless high-energy node gains a window but no anchor.
        let anchor = if window_start.is_some() || window_end.is_some() {
            Some(PlanAnchor::Time)
        } else {
            None
        };

        if let Some(tag) = &attrs.energy_tag {
            if tag.to_lowercase().contains("high") && self.config.high_energy_start <= 10 {
                window_start = window_start
                    .or_else(|| NaiveTime::from_hms_opt(self.config.high_energy_start, 0, 0));
                window_end = window_end
                    .or_else(|| NaiveTime::from_hms_opt(self.config.high_energy_end, 0, 0));
            }
        }

        ScheduledNode {
            key,
            initially_ready,
            window_start,
            window_end,
            anchor,
        }
    }
}

impl Default for DayScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_dependency_graph;
    use crate::model::{Edge, NodeType, RelationType};

    fn attrs(start: Option<(u32, u32)>, energy: Option<&str>) -> NodeAttrs {
        NodeAttrs {
            soft_start: start.and_then(|(h, m)| NaiveTime::from_hms_opt(h, m, 0)),
            soft_end: start.and_then(|(h, m)| NaiveTime::from_hms_opt(h + 1, m, 0)),
            energy_tag: energy.map(str::to_string),
        }
    }

    fn edge(from: NodeKey, to: NodeKey) -> Edge {
        Edge {
            id: 0,
            user_id: 1,
            from_type: from.0,
            from_id: from.1,
            to_type: to.0,
            to_id: to.1,
            relation: RelationType::Triggers,
        }
    }

    fn keys(scheduled: &[ScheduledNode]) -> Vec<NodeKey> {
        scheduled.iter().map(|s| s.key).collect()
    }

    #[test]
    fn earliest_window_emitted_first() {
        let mut nodes = BTreeMap::new();
        nodes.insert((NodeType::Habit, 1), attrs(Some((18, 0)), None));
        nodes.insert((NodeType::Habit, 2), attrs(Some((8, 0)), None));
        nodes.insert((NodeType::Habit, 3), attrs(None, None));

        let scheduled = DayScheduler::new().schedule(&nodes, &DependencyGraph::default());
        assert_eq!(
            keys(&scheduled),
            vec![
                (NodeType::Habit, 2),
                (NodeType::Habit, 1),
                (NodeType::Habit, 3),
            ]
        );
    }

    #[test]
    fn windowless_node_sorts_after_all_windowed_nodes() {
        let mut nodes = BTreeMap::new();
        // Key order would put habit 1 first; the 23:00 window still beats
        // "no window at all".
        nodes.insert((NodeType::Habit, 1), attrs(None, None));
        nodes.insert((NodeType::Habit, 2), attrs(Some((23, 0)), None));

        let scheduled = DayScheduler::new().schedule(&nodes, &DependencyGraph::default());
        assert_eq!(scheduled[0].key, (NodeType::Habit, 2));
    }

    #[test]
    fn dependencies_order_before_windows() {
        let a = (NodeType::Habit, 1);
        let b = (NodeType::Task, 2);
        let mut nodes = BTreeMap::new();
        // b prefers the earlier window but depends on a.
        nodes.insert(a, attrs(Some((18, 0)), None));
        nodes.insert(b, attrs(Some((6, 0)), None));
        let graph = build_dependency_graph(&[edge(a, b)]);

        let scheduled = DayScheduler::new().schedule(&nodes, &graph);
        assert_eq!(keys(&scheduled), vec![a, b]);
        assert!(scheduled[0].initially_ready);
        assert!(!scheduled[1].initially_ready);
    }

    #[test]
    fn newly_ready_node_overtakes_waiting_later_window() {
        // a(07:00) -> c(08:00); b(12:00) has no dependencies.
        // After a is emitted, c becomes ready and must beat b.
        let a = (NodeType::Habit, 1);
        let b = (NodeType::Habit, 2);
        let c = (NodeType::Task, 3);
        let mut nodes = BTreeMap::new();
        nodes.insert(a, attrs(Some((7, 0)), None));
        nodes.insert(b, attrs(Some((12, 0)), None));
        nodes.insert(c, attrs(Some((8, 0)), None));
        let graph = build_dependency_graph(&[edge(a, c)]);

        let scheduled = DayScheduler::new().schedule(&nodes, &graph);
        assert_eq!(keys(&scheduled), vec![a, c, b]);
    }

    #[test]
    fn two_node_cycle_yields_both_nodes_in_key_order() {
        let a = (NodeType::Habit, 1);
        let b = (NodeType::Habit, 2);
        let mut nodes = BTreeMap::new();
        nodes.insert(a, attrs(None, None));
        nodes.insert(b, attrs(None, None));
        let graph = build_dependency_graph(&[edge(a, b), edge(b, a)]);

        let scheduled = DayScheduler::new().schedule(&nodes, &graph);
        assert_eq!(keys(&scheduled), vec![a, b]);
        assert!(!scheduled[0].initially_ready);
        assert!(!scheduled[1].initially_ready);
    }

    #[test]
    fn graph_only_and_dangling_nodes_are_not_emitted() {
        // goal -> habit -> missing task: the goal and the dangling task
        // participate in ordering but never appear in the output.
        let goal = (NodeType::Goal, 1);
        let habit = (NodeType::Habit, 2);
        let gone = (NodeType::Task, 99);
        let mut nodes = BTreeMap::new();
        nodes.insert(habit, attrs(None, None));
        let graph = build_dependency_graph(&[edge(goal, habit), edge(habit, gone)]);

        let scheduled = DayScheduler::new().schedule(&nodes, &graph);
        assert_eq!(keys(&scheduled), vec![habit]);
        // The habit has an incoming edge, so it starts PLANNED even though
        // its predecessor will never be scheduled.
        assert!(!scheduled[0].initially_ready);
    }

    #[test]
    fn high_energy_backfill_fills_missing_window_without_anchor() {
        let mut nodes = BTreeMap::new();
        nodes.insert((NodeType::Task, 1), attrs(None, Some("HIGH-focus")));

        let scheduled = DayScheduler::new().schedule(&nodes, &DependencyGraph::default());
        let node = &scheduled[0];
        assert_eq!(node.window_start, NaiveTime::from_hms_opt(9, 0, 0));
        assert_eq!(node.window_end, NaiveTime::from_hms_opt(13, 0, 0));
        assert_eq!(node.anchor, None);
    }

    #[test]
    fn late_high_energy_window_is_not_backfilled() {
        let mut nodes = BTreeMap::new();
        nodes.insert((NodeType::Task, 1), attrs(None, Some("high")));

        let scheduler = DayScheduler::with_config(SchedulerConfig {
            high_energy_start: 14,
            high_energy_end: 17,
        });
        let scheduled = scheduler.schedule(&nodes, &DependencyGraph::default());
        assert_eq!(scheduled[0].window_start, None);
    }

    #[test]
    fn own_window_survives_energy_backfill() {
        let mut nodes = BTreeMap::new();
        nodes.insert((NodeType::Habit, 1), attrs(Some((7, 30)), Some("high")));

        let scheduled = DayScheduler::new().schedule(&nodes, &DependencyGraph::default());
        let node = &scheduled[0];
        assert_eq!(node.window_start, NaiveTime::from_hms_opt(7, 30, 0));
        assert_eq!(node.anchor, Some(PlanAnchor::Time));
    }
}
