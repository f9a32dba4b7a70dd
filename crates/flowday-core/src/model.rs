//! Domain types for goals, systems, habits, tasks, and day plans.
//!
//! A node is identified by `(NodeType, id)`. Goals and systems only exist in
//! the relation graph; habits and active tasks are the schedulable nodes that
//! end up in a day plan.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of node in the relation graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Goal,
    System,
    Habit,
    Task,
}

/// Node identity: type plus row id.
pub type NodeKey = (NodeType, i64);

/// Semantic kind of a relation edge.
///
/// All three kinds act as scheduling precedence constraints: the `from` node
/// is ordered before the `to` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Supports,
    Triggers,
    Follows,
}

/// Plan item lifecycle: `Planned -> Ready -> (Done | Skipped)`.
///
/// `Done` and `Skipped` are terminal within one plan generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Planned,
    Ready,
    Done,
    Skipped,
}

/// What a plan item is anchored to for bonus scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAnchor {
    Time,
    Habit,
    Task,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewType {
    Daily,
    Weekly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// IANA timezone name.
    pub tz: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct System {
    pub id: i64,
    pub user_id: i64,
    pub goal_id: i64,
    pub title: String,
    pub description: Option<String>,
}

/// A recurring practice with an optional preferred time-of-day window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habit {
    pub id: i64,
    pub user_id: i64,
    pub system_id: i64,
    pub name: String,
    pub soft_window_start: Option<NaiveTime>,
    pub soft_window_end: Option<NaiveTime>,
    pub energy_tag: Option<String>,
    pub recurrence_rule: Option<String>,
    pub anchor_event: Option<String>,
}

/// A one-off or recurring piece of work, optionally linked to a habit.
///
/// A task without its own energy tag inherits the tag and soft window of its
/// linked habit at scheduling time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub user_id: i64,
    pub habit_id: Option<i64>,
    pub title: String,
    pub difficulty: i64,
    pub est_minutes: Option<i64>,
    pub priority: i64,
    pub energy_tag: Option<String>,
    pub is_recurring: bool,
    pub active: bool,
}

/// Directed relation between two nodes. Unique per (user, from, to).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: i64,
    pub user_id: i64,
    pub from_type: NodeType,
    pub from_id: i64,
    pub to_type: NodeType,
    pub to_id: i64,
    pub relation: RelationType,
}

impl Edge {
    pub fn from_key(&self) -> NodeKey {
        (self.from_type, self.from_id)
    }

    pub fn to_key(&self) -> NodeKey {
        (self.to_type, self.to_id)
    }
}

/// The materialized, ordered schedule for one user on one date.
///
/// Unique per (user, date). Owns its items; regenerating the plan replaces
/// all of them. `flow_score` is derived by the flow scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayPlan {
    pub id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub flow_score: i64,
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<PlanItem>,
}

/// One node's scheduled occurrence within a day plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanItem {
    pub id: i64,
    pub dayplan_id: i64,
    pub node_type: NodeType,
    pub node_id: i64,
    pub status: PlanStatus,
    /// 1-based position from the topological sort.
    pub scheduled_order: i64,
    pub scheduled_window_start: Option<NaiveTime>,
    pub scheduled_window_end: Option<NaiveTime>,
    pub anchor: Option<PlanAnchor>,
}

impl PlanItem {
    pub fn node_key(&self) -> NodeKey {
        (self.node_type, self.node_id)
    }
}

/// Consecutive-skip counter per node, reset on any completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureStats {
    pub id: i64,
    pub user_id: i64,
    pub node_type: NodeType,
    pub node_id: i64,
    pub rolling_fail_count: i64,
    pub last_failed_at: Option<DateTime<Utc>>,
}

/// Per-day gamification counters. Unique per (user, date).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gamification {
    pub id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    pub streak_days: i64,
    pub xp: i64,
    pub flow_streak: i64,
}

/// A stored daily or weekly reflection summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub user_id: i64,
    pub date_range_start: NaiveDate,
    pub date_range_end: NaiveDate,
    pub review_type: ReviewType,
    pub reflection_text: Option<String>,
    pub summary: Option<String>,
    pub suggestions: serde_json::Value,
}
