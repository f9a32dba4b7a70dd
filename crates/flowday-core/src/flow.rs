//! Flow scoring: replay a day plan against the event ledger.
//!
//! Items are processed in scheduled order, not event order. Completion
//! timestamps come from `plan_complete` events; the running
//! previous-completion and anchor-completion state threads across items so
//! momentum and anchor bonuses reward doing adjacent work close together.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Timelike, Utc};

use crate::error::Result;
use crate::events::{EventKind, EventRecord};
use crate::model::{DayPlan, Gamification, PlanAnchor, PlanItem, PlanStatus};
use crate::storage::PlannerDb;

/// Minutes of adjacency rewarded by the momentum and anchor bonuses.
const ADJACENCY_MINUTES: i64 = 60;

/// A day whose flow score reaches this value extends the flow streak.
const FLOW_STREAK_THRESHOLD: i64 = 10;

/// Point value of a single plan item.
///
/// DONE inside the scheduled window (compared by hour and minute on the
/// completion's day) is worth 5; with a window but outside it, 2; with no
/// window, 3. Momentum adds 2 when the previous completed item finished
/// within an hour; the anchor bonus adds 3 when the anchor node finished
/// within an hour. SKIPPED costs 2. Anything else scores 0.
pub fn compute_points(
    item: &PlanItem,
    completion: DateTime<Utc>,
    previous_completion: Option<DateTime<Utc>>,
    anchor_completed_at: Option<DateTime<Utc>>,
) -> i64 {
    let mut points = 0;
    match item.status {
        PlanStatus::Done => {
            match (item.scheduled_window_start, item.scheduled_window_end) {
                (Some(start), Some(end)) => {
                    let minute = completion.hour() * 60 + completion.minute();
                    let window_start = start.hour() * 60 + start.minute();
                    let window_end = end.hour() * 60 + end.minute();
                    if window_start <= minute && minute <= window_end {
                        points += 5;
                    } else {
                        points += 2;
                    }
                }
                _ => points += 3,
            }

            if let Some(previous) = previous_completion {
                if completion - previous <= Duration::minutes(ADJACENCY_MINUTES) {
                    points += 2;
                }
            }

            if let Some(anchored) = anchor_completed_at {
                if completion - anchored <= Duration::minutes(ADJACENCY_MINUTES) {
                    points += 3;
                }
            }
        }
        PlanStatus::Skipped => points -= 2,
        _ => {}
    }
    points
}

/// Replay plan items against ledger events and sum their points.
///
/// `now` is the fallback classification timestamp for a DONE item with no
/// matching `plan_complete` event; such an item still scores, but does not
/// advance the momentum or anchor state.
///
/// Anchor completions are tracked by raw node id: a habit and a task with
/// the same id share one slot.
pub fn replay_score(items: &[PlanItem], events: &[EventRecord], now: DateTime<Utc>) -> i64 {
    let mut events_by_item: HashMap<i64, Vec<&EventRecord>> = HashMap::new();
    for event in events {
        if let Some(payload) = event.plan_payload() {
            events_by_item.entry(payload.plan_item_id).or_default().push(event);
        }
    }
    for bucket in events_by_item.values_mut() {
        bucket.sort_by_key(|event| event.ts);
    }

    let mut ordered: Vec<&PlanItem> = items.iter().collect();
    ordered.sort_by_key(|item| item.scheduled_order);

    let mut previous_completion: Option<DateTime<Utc>> = None;
    let mut anchor_completion: HashMap<i64, DateTime<Utc>> = HashMap::new();
    let mut score = 0;

    for item in ordered {
        let completed_at = events_by_item
            .get(&item.id)
            .and_then(|bucket| {
                bucket
                    .iter()
                    .find(|event| event.is_kind(EventKind::PlanComplete))
            })
            .map(|event| event.ts);

        let anchor_completed_at = match item.anchor {
            Some(PlanAnchor::Habit) | Some(PlanAnchor::Task) => {
                anchor_completion.get(&item.node_id).copied()
            }
            _ => None,
        };

        score += compute_points(
            item,
            completed_at.unwrap_or(now),
            previous_completion,
            anchor_completed_at,
        );

        if item.status == PlanStatus::Done {
            if let Some(ts) = completed_at {
                previous_completion = Some(ts);
                anchor_completion.insert(item.node_id, ts);
            }
        }
    }

    score
}

/// Recompute a plan's flow score from the ledger and update gamification.
///
/// The flow score is replaced on every call. XP is *added* on every call
/// with a positive score — at-least-once accumulation, kept deliberately;
/// callers that need exactly-once must gate recomputation themselves. A
/// score of at least 10 extends the flow streak; a non-positive score
/// resets it.
pub fn update_flow_score(db: &PlannerDb, plan: &DayPlan) -> Result<i64> {
    let items = db.plan_items(plan.id)?;
    let events =
        db.events_of_kinds(plan.user_id, &[EventKind::PlanComplete, EventKind::PlanSkip])?;

    let score = replay_score(&items, &events, Utc::now());
    db.set_flow_score(plan.id, score)?;

    let mut gamification = db
        .gamification(plan.user_id, plan.date)?
        .unwrap_or(Gamification {
            id: 0,
            user_id: plan.user_id,
            date: plan.date,
            streak_days: 0,
            xp: 0,
            flow_streak: 0,
        });

    if score > 0 {
        gamification.xp += score;
        if score >= FLOW_STREAK_THRESHOLD {
            gamification.flow_streak += 1;
        }
    } else {
        gamification.flow_streak = 0;
    }
    db.save_gamification(&gamification)?;

    tracing::debug!(
        "flow score for plan {} recomputed: {} ({} items)",
        plan.id,
        score,
        items.len()
    );

    Ok(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::PlanEventPayload;
    use crate::model::NodeType;
    use chrono::NaiveTime;

    fn item(id: i64, order: i64, status: PlanStatus, window: Option<(u32, u32)>) -> PlanItem {
        PlanItem {
            id,
            dayplan_id: 1,
            node_type: NodeType::Habit,
            node_id: id,
            status,
            scheduled_order: order,
            scheduled_window_start: window.and_then(|(h, _)| NaiveTime::from_hms_opt(h, 0, 0)),
            scheduled_window_end: window.and_then(|(_, h)| NaiveTime::from_hms_opt(h, 0, 0)),
            anchor: window.map(|_| PlanAnchor::Time),
        }
    }

    fn complete_event(item: &PlanItem, ts: DateTime<Utc>) -> EventRecord {
        EventRecord {
            id: item.id * 100,
            user_id: 1,
            ts,
            event_type: EventKind::PlanComplete.as_str().to_string(),
            payload: serde_json::to_value(PlanEventPayload {
                plan_item_id: item.id,
                node_type: item.node_type,
                node_id: item.node_id,
                reason: None,
            })
            .unwrap(),
        }
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        chrono::NaiveDate::from_ymd_opt(2025, 6, 2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn done_inside_window_scores_five() {
        let item = item(1, 1, PlanStatus::Done, Some((9, 10)));
        assert_eq!(compute_points(&item, at(9, 30), None, None), 5);
    }

    #[test]
    fn done_outside_window_scores_two() {
        let item = item(1, 1, PlanStatus::Done, Some((9, 10)));
        assert_eq!(compute_points(&item, at(11, 0), None, None), 2);
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let item = item(1, 1, PlanStatus::Done, Some((9, 10)));
        assert_eq!(compute_points(&item, at(9, 0), None, None), 5);
        assert_eq!(compute_points(&item, at(10, 0), None, None), 5);
        assert_eq!(compute_points(&item, at(10, 1), None, None), 2);
    }

    #[test]
    fn done_without_window_scores_three() {
        let item = item(1, 1, PlanStatus::Done, None);
        assert_eq!(compute_points(&item, at(9, 30), None, None), 3);
    }

    #[test]
    fn skip_costs_two_and_planned_scores_zero() {
        assert_eq!(
            compute_points(&item(1, 1, PlanStatus::Skipped, None), at(9, 0), None, None),
            -2
        );
        assert_eq!(
            compute_points(&item(1, 1, PlanStatus::Planned, None), at(9, 0), None, None),
            0
        );
    }

    #[test]
    fn momentum_bonus_within_the_hour() {
        let item = item(1, 1, PlanStatus::Done, None);
        assert_eq!(compute_points(&item, at(9, 30), Some(at(9, 0)), None), 5);
        assert_eq!(compute_points(&item, at(11, 0), Some(at(9, 0)), None), 3);
    }

    #[test]
    fn anchor_bonus_stacks_with_window_and_momentum() {
        let mut it = item(1, 1, PlanStatus::Done, Some((9, 10)));
        it.anchor = Some(PlanAnchor::Habit);
        assert_eq!(
            compute_points(&it, at(9, 30), Some(at(9, 10)), Some(at(9, 0))),
            10
        );
    }

    #[test]
    fn replay_threads_momentum_in_schedule_order() {
        let first = item(1, 1, PlanStatus::Done, None);
        let second = item(2, 2, PlanStatus::Done, None);
        let events = vec![
            complete_event(&first, at(9, 0)),
            complete_event(&second, at(9, 40)),
        ];

        // 3 (no window) + 3 + 2 momentum.
        let score = replay_score(&[first, second], &events, at(23, 0));
        assert_eq!(score, 8);
    }

    #[test]
    fn anchor_completion_is_keyed_by_raw_node_id() {
        // Habit 7 completes, then task 7 anchored to a habit: the task picks
        // up the habit's completion because the key is the bare id.
        let habit = item(7, 1, PlanStatus::Done, None);
        let mut task = PlanItem {
            node_type: NodeType::Task,
            ..item(7, 2, PlanStatus::Done, None)
        };
        task.id = 8;
        task.anchor = Some(PlanAnchor::Habit);

        let events = vec![
            complete_event(&habit, at(9, 0)),
            complete_event(&task, at(9, 30)),
        ];

        // habit: 3; task: 3 + 2 momentum + 3 anchor.
        let score = replay_score(&[habit, task], &events, at(23, 0));
        assert_eq!(score, 11);
    }

    #[test]
    fn done_without_event_does_not_advance_momentum_state() {
        let first = item(1, 1, PlanStatus::Done, None); // no event recorded
        let second = item(2, 2, PlanStatus::Done, None);
        let events = vec![complete_event(&second, at(9, 40))];

        // first falls back to "now" for its own classification (3 points)
        // but must not feed a momentum bonus into second (3 points).
        let score = replay_score(&[first, second], &events, at(9, 41));
        assert_eq!(score, 6);
    }

    #[test]
    fn first_plan_complete_event_wins() {
        let it = item(1, 1, PlanStatus::Done, Some((9, 10)));
        let events = vec![
            complete_event(&it, at(11, 0)),
            complete_event(&it, at(9, 30)),
        ];

        // Events are sorted by ts, so the 9:30 completion is authoritative.
        let score = replay_score(&[it], &events, at(23, 0));
        assert_eq!(score, 5);
    }
}
