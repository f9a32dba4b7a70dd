//! Planner orchestration: the external entry points of the engine.
//!
//! `generate_day_plan` rebuilds a user's plan for one date from the node
//! graph. `complete_item` and `skip_item` record an outcome and run the
//! follow-on machinery — event append, failure stats, dependency unlock, and
//! flow recompute — inside a single transaction, so the four effects commit
//! together or not at all.
//!
//! Concurrent regeneration for the same (user, date) is last-writer-wins;
//! callers that can race must serialize per user.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{CoreError, Result};
use crate::events::{EventKind, PlanEventPayload};
use crate::flow;
use crate::graph;
use crate::model::{DayPlan, PlanItem, PlanStatus};
use crate::scheduler::DayScheduler;
use crate::storage::{database::PlanItemDraft, Config, PlannerDb};

/// Engine facade bound to one database and one configuration.
pub struct Planner<'a> {
    db: &'a PlannerDb,
    config: Config,
}

impl<'a> Planner<'a> {
    pub fn new(db: &'a PlannerDb, config: Config) -> Self {
        Self { db, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Generate or refresh the day plan for one user and date.
    ///
    /// Replaces any existing items for that date. Fails with `NotFound` for
    /// an unknown user, leaving no partial state behind.
    pub fn generate_day_plan(&self, user_id: i64, date: NaiveDate) -> Result<DayPlan> {
        self.db
            .get_user(user_id)?
            .ok_or_else(|| CoreError::not_found("user", user_id))?;

        let habits = self.db.list_habits(user_id)?;
        let tasks = self.db.list_active_tasks(user_id)?;
        let edges = self.db.list_edges(user_id)?;

        let nodes = graph::collect_nodes(&habits, &tasks);
        let dep_graph = graph::build_dependency_graph(&edges);
        let scheduled = DayScheduler::with_config(self.config.scheduler.clone())
            .schedule(&nodes, &dep_graph);

        let drafts: Vec<PlanItemDraft> = scheduled
            .iter()
            .enumerate()
            .map(|(index, node)| PlanItemDraft {
                node_type: node.key.0,
                node_id: node.key.1,
                status: if node.initially_ready {
                    PlanStatus::Ready
                } else {
                    PlanStatus::Planned
                },
                scheduled_order: (index + 1) as i64,
                window_start: node.window_start,
                window_end: node.window_end,
                anchor: node.anchor,
            })
            .collect();

        self.db.begin()?;
        let result = (|| -> Result<DayPlan> {
            let plan = self.db.upsert_day_plan(user_id, date, Utc::now())?;
            self.db.replace_plan_items(plan.id, &drafts)?;
            Ok(plan)
        })();

        match result {
            Ok(mut plan) => {
                self.db.commit()?;
                plan.items = self.db.plan_items(plan.id)?;
                tracing::info!(
                    "generated day plan {} for user {} on {}: {} item(s)",
                    plan.id,
                    user_id,
                    date,
                    plan.items.len()
                );
                Ok(plan)
            }
            Err(err) => {
                let _ = self.db.rollback();
                Err(err)
            }
        }
    }

    /// Mark a plan item DONE.
    ///
    /// Appends the `plan_complete` event (at `ts`, defaulting to now),
    /// resets the node's failure stats, promotes dependents from PLANNED to
    /// READY within the same plan, and recomputes the flow score.
    pub fn complete_item(&self, plan_item_id: i64, ts: Option<DateTime<Utc>>) -> Result<()> {
        self.db.begin()?;
        match self.complete_item_inner(plan_item_id, ts) {
            Ok(()) => {
                self.db.commit()?;
                Ok(())
            }
            Err(err) => {
                let _ = self.db.rollback();
                Err(err)
            }
        }
    }

    fn complete_item_inner(
        &self,
        plan_item_id: i64,
        ts: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let (item, plan) = self.item_with_plan(plan_item_id)?;
        let completed_at = ts.unwrap_or_else(Utc::now);

        self.db.update_plan_item_status(item.id, PlanStatus::Done)?;
        self.db.append_event(
            plan.user_id,
            completed_at,
            EventKind::PlanComplete,
            serde_json::to_value(PlanEventPayload {
                plan_item_id: item.id,
                node_type: item.node_type,
                node_id: item.node_id,
                reason: None,
            })?,
        )?;
        self.db
            .reset_failure(plan.user_id, item.node_type, item.node_id)?;
        self.unlock_dependents(&plan, &item)?;
        let score = flow::update_flow_score(self.db, &plan)?;

        tracing::info!(
            "completed plan item {} ({:?} {}), flow score now {}",
            item.id,
            item.node_type,
            item.node_id,
            score
        );
        Ok(())
    }

    /// Mark a plan item SKIPPED.
    ///
    /// Appends the `plan_skip` event, bumps the node's rolling failure
    /// count, and recomputes the flow score.
    pub fn skip_item(&self, plan_item_id: i64, reason: Option<&str>) -> Result<()> {
        self.db.begin()?;
        match self.skip_item_inner(plan_item_id, reason) {
            Ok(()) => {
                self.db.commit()?;
                Ok(())
            }
            Err(err) => {
                let _ = self.db.rollback();
                Err(err)
            }
        }
    }

    fn skip_item_inner(&self, plan_item_id: i64, reason: Option<&str>) -> Result<()> {
        let (item, plan) = self.item_with_plan(plan_item_id)?;
        let now = Utc::now();

        self.db.update_plan_item_status(item.id, PlanStatus::Skipped)?;
        self.db.append_event(
            plan.user_id,
            now,
            EventKind::PlanSkip,
            serde_json::to_value(PlanEventPayload {
                plan_item_id: item.id,
                node_type: item.node_type,
                node_id: item.node_id,
                reason: reason.map(str::to_string),
            })?,
        )?;
        self.db
            .record_failure(plan.user_id, item.node_type, item.node_id, now)?;
        let score = flow::update_flow_score(self.db, &plan)?;

        tracing::info!(
            "skipped plan item {} ({:?} {}), flow score now {}",
            item.id,
            item.node_type,
            item.node_id,
            score
        );
        Ok(())
    }

    fn item_with_plan(&self, plan_item_id: i64) -> Result<(PlanItem, DayPlan)> {
        let item = self
            .db
            .plan_item(plan_item_id)?
            .ok_or_else(|| CoreError::not_found("plan item", plan_item_id))?;
        let plan = self
            .db
            .get_day_plan(item.dayplan_id)?
            .ok_or_else(|| CoreError::not_found("day plan", item.dayplan_id))?;
        Ok((item, plan))
    }

    /// Promote PLANNED dependents of a completed node to READY, within the
    /// same day plan only.
    fn unlock_dependents(&self, plan: &DayPlan, item: &PlanItem) -> Result<()> {
        let edges = self
            .db
            .edges_from(plan.user_id, item.node_type, item.node_id)?;
        if edges.is_empty() {
            return Ok(());
        }

        let items = self.db.plan_items(plan.id)?;
        for edge in edges {
            let dependent = items.iter().find(|candidate| {
                candidate.node_key() == edge.to_key() && candidate.status == PlanStatus::Planned
            });
            if let Some(dependent) = dependent {
                self.db
                    .update_plan_item_status(dependent.id, PlanStatus::Ready)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_user_fails_without_writing_a_plan() {
        let db = PlannerDb::open_memory().unwrap();
        let planner = Planner::new(&db, Config::default());
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();

        let err = planner.generate_day_plan(99, date).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { entity: "user", .. }));
        assert!(db.day_plan_by_date(99, date).unwrap().is_none());
    }

    #[test]
    fn completing_a_missing_item_appends_no_event() {
        let db = PlannerDb::open_memory().unwrap();
        let planner = Planner::new(&db, Config::default());

        let err = planner.complete_item(123, None).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));

        let events = db
            .events_of_kinds(1, &[EventKind::PlanComplete, EventKind::PlanSkip])
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn skipping_a_missing_item_is_not_found() {
        let db = PlannerDb::open_memory().unwrap();
        let planner = Planner::new(&db, Config::default());
        let err = planner.skip_item(5, Some("tired")).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }
}
