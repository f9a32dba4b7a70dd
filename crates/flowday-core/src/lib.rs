//! # Flowday Core Library
//!
//! Core business logic for the Flowday personal productivity planner. Users
//! define goals, systems, habits, and tasks connected by directed relations;
//! the engine turns those into an ordered day plan, tracks completions and
//! skips through an append-only event ledger, scores the day's flow, and
//! coaches nodes that keep failing.
//!
//! ## Architecture
//!
//! - **Graph + Scheduler**: dependency graph over the node set, ordered with
//!   Kahn's algorithm and a preferred-window priority queue
//! - **Flow Scorer**: replays the event ledger in schedule order to reward
//!   on-time completion, momentum, and anchor adjacency
//! - **Storage**: SQLite-based persistence and TOML-based configuration
//! - **Coach / Review**: templated nudges and daily/weekly summaries
//!
//! ## Key Components
//!
//! - [`Planner`]: engine entry points (generate / complete / skip)
//! - [`PlannerDb`]: planner persistence
//! - [`Config`]: planner configuration (thresholds, energy window)

pub mod coach;
pub mod error;
pub mod events;
pub mod flow;
pub mod graph;
pub mod model;
pub mod planner;
pub mod review;
pub mod scheduler;
pub mod storage;

pub use coach::{CoachAction, CoachSuggestion};
pub use error::{ConfigError, CoreError, DatabaseError, Result};
pub use events::{EventKind, EventRecord, PlanEventPayload};
pub use model::{
    DayPlan, Edge, FailureStats, Gamification, Goal, Habit, NodeKey, NodeType, PlanAnchor,
    PlanItem, PlanStatus, RelationType, Review, ReviewType, System, Task, User,
};
pub use planner::Planner;
pub use review::ReviewSummary;
pub use scheduler::DayScheduler;
pub use storage::{Config, PlannerDb};
