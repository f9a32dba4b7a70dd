//! Daily and weekly reflection summaries.
//!
//! Thin aggregation over day plans: completion rate, flow score, and coach
//! tweaks for the nodes that were skipped most. Each summary is persisted as
//! a `Review` row alongside the returned value.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::coach::{self, CoachAction};
use crate::error::{CoreError, Result};
use crate::model::{NodeKey, PlanStatus, Review, ReviewType};
use crate::storage::{Config, PlannerDb};

/// Aggregated outcome of a review run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub summary: String,
    pub tweaks: Vec<CoachAction>,
    pub completion_rate: f64,
    pub flow_score: i64,
}

/// Summarize one day's plan.
///
/// Fails with `NotFound` when no plan exists for the date.
pub fn daily_summary(
    db: &PlannerDb,
    config: &Config,
    user_id: i64,
    date: NaiveDate,
) -> Result<ReviewSummary> {
    let plan = db
        .day_plan_by_date(user_id, date)?
        .ok_or_else(|| CoreError::not_found("day plan", format!("user {user_id} on {date}")))?;

    let total = plan.items.len();
    let done = plan
        .items
        .iter()
        .filter(|item| item.status == PlanStatus::Done)
        .count();
    let skipped: Vec<_> = plan
        .items
        .iter()
        .filter(|item| item.status == PlanStatus::Skipped)
        .collect();
    let completion_rate = if total > 0 {
        done as f64 / total as f64
    } else {
        0.0
    };

    let mut tweaks = Vec::new();
    // Coach the most recently skipped node, if any.
    if let Some(last_skipped) = skipped.iter().max_by_key(|item| item.id) {
        let suggestion = coach::suggest_fixes(
            db,
            config,
            user_id,
            last_skipped.node_type,
            last_skipped.node_id,
        )?;
        tweaks.extend(suggestion.actions.into_iter().take(3));
    }

    let summary = format!(
        "{}% complete. Flow score {}. Notice skips? Reflect on energy and sequence alignment.",
        (completion_rate * 100.0) as i64,
        plan.flow_score,
    );

    db.create_review(&Review {
        id: 0,
        user_id,
        date_range_start: date,
        date_range_end: date,
        review_type: ReviewType::Daily,
        reflection_text: None,
        summary: Some(summary.clone()),
        suggestions: json!({ "tweaks": &tweaks }),
    })?;

    Ok(ReviewSummary {
        summary,
        tweaks,
        completion_rate,
        flow_score: plan.flow_score,
    })
}

/// Summarize the seven days ending on `ending` (inclusive).
pub fn weekly_summary(
    db: &PlannerDb,
    config: &Config,
    user_id: i64,
    ending: NaiveDate,
) -> Result<ReviewSummary> {
    let start = ending - Duration::days(6);
    let plans = db.day_plans_in_range(user_id, start, ending)?;

    let mut total_items = 0usize;
    let mut total_done = 0usize;
    let mut aggregate_flow = 0i64;
    let mut skip_counts: BTreeMap<NodeKey, usize> = BTreeMap::new();

    for plan in &plans {
        total_items += plan.items.len();
        aggregate_flow += plan.flow_score;
        for item in &plan.items {
            match item.status {
                PlanStatus::Done => total_done += 1,
                PlanStatus::Skipped => {
                    *skip_counts.entry(item.node_key()).or_insert(0) += 1;
                }
                _ => {}
            }
        }
    }

    let completion_rate = if total_items > 0 {
        total_done as f64 / total_items as f64
    } else {
        0.0
    };
    let average_flow = if plans.is_empty() {
        0
    } else {
        aggregate_flow / plans.len() as i64
    };

    // Coach the two most-skipped nodes; ties resolve by node key so the
    // output is deterministic.
    let mut ranked: Vec<(NodeKey, usize)> = skip_counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut tweaks = Vec::new();
    for ((node_type, node_id), _) in ranked.into_iter().take(2) {
        let suggestion = coach::suggest_fixes(db, config, user_id, node_type, node_id)?;
        tweaks.extend(suggestion.actions.into_iter().take(2));
    }

    let summary = format!(
        "Weekly completion: {}%. Average flow score: {}. Trends: double-down on high-flow \
         windows and redesign the frequent skips.",
        (completion_rate * 100.0) as i64,
        average_flow,
    );

    db.create_review(&Review {
        id: 0,
        user_id,
        date_range_start: start,
        date_range_end: ending,
        review_type: ReviewType::Weekly,
        reflection_text: None,
        summary: Some(summary.clone()),
        suggestions: json!({ "tweaks": &tweaks }),
    })?;

    Ok(ReviewSummary {
        summary,
        tweaks,
        completion_rate,
        flow_score: average_flow,
    })
}
