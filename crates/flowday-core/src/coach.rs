//! Coaching suggestions for nodes that keep failing.
//!
//! The suggestion text is templated; picking the template set is a pure
//! function of the rolling failure count against the configured threshold,
//! so the coach is deterministic and testable without storage.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::events::EventKind;
use crate::model::NodeType;
use crate::storage::{Config, PlannerDb};

/// One actionable suggestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachAction {
    pub title: String,
    pub description: String,
    pub suggestion_type: String,
}

/// Suggestion bundle for one node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachSuggestion {
    pub node_type: NodeType,
    pub node_id: i64,
    pub actions: Vec<CoachAction>,
}

/// Build the suggestion list for a node from its failure count.
///
/// At or above the threshold the coach proposes structural changes: shrink
/// the scope, move the step, add a band-aid prep action, and (for habits)
/// automate. Below it, a single encouragement.
pub fn suggestion_actions(
    node_type: NodeType,
    label: &str,
    failure_count: i64,
    fail_threshold: i64,
) -> Vec<CoachAction> {
    if failure_count < fail_threshold {
        return vec![CoachAction {
            title: "Stay curious".to_string(),
            description: "You are experimenting with your system. Keep notes on what works \
                          and adjust soon."
                .to_string(),
            suggestion_type: "encourage".to_string(),
        }];
    }

    let mut actions = vec![
        CoachAction {
            title: "Shrink the scope".to_string(),
            description: format!(
                "Try a smaller version of {label}. Cut the expected time or difficulty \
                 for a quick win."
            ),
            suggestion_type: "reduce_scope".to_string(),
        },
        CoachAction {
            title: "Adjust the sequence".to_string(),
            description: "Move this step to when you have more energy or pair it with a \
                          habit you already complete."
                .to_string(),
            suggestion_type: "swap_order".to_string(),
        },
        CoachAction {
            title: "Add a band-aid step".to_string(),
            description: "Add a tiny prep action (open materials, set a 5-minute timer) \
                          to lower friction."
                .to_string(),
            suggestion_type: "band_aid".to_string(),
        },
    ];

    if node_type == NodeType::Habit {
        actions.push(CoachAction {
            title: "Automate or delegate".to_string(),
            description: "Consider reminders, automations, or asking for help to keep the \
                          habit alive."
                .to_string(),
            suggestion_type: "automate".to_string(),
        });
    }

    actions
}

/// Look up the node's failure stats, build suggestions, and log the
/// `coach_suggest` ledger event.
pub fn suggest_fixes(
    db: &PlannerDb,
    config: &Config,
    user_id: i64,
    node_type: NodeType,
    node_id: i64,
) -> Result<CoachSuggestion> {
    let failure_count = db
        .failure_stats(user_id, node_type, node_id)?
        .map(|stats| stats.rolling_fail_count)
        .unwrap_or(0);

    let label = node_label(db, node_type, node_id)?;
    let actions = suggestion_actions(
        node_type,
        &label,
        failure_count,
        config.coach.fail_threshold,
    );

    let suggestion = CoachSuggestion {
        node_type,
        node_id,
        actions,
    };
    db.append_event(
        user_id,
        Utc::now(),
        EventKind::CoachSuggest,
        serde_json::to_value(&suggestion)?,
    )?;

    Ok(suggestion)
}

fn node_label(db: &PlannerDb, node_type: NodeType, node_id: i64) -> Result<String> {
    let label = match node_type {
        NodeType::Habit => db.get_habit(node_id)?.map(|h| h.name),
        NodeType::Task => db.get_task(node_id)?.map(|t| t.title),
        _ => None,
    };
    Ok(label.unwrap_or_else(|| "item".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_threshold_is_a_single_encouragement() {
        let actions = suggestion_actions(NodeType::Task, "Math Assignment", 2, 3);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].suggestion_type, "encourage");
    }

    #[test]
    fn at_threshold_proposes_structural_changes() {
        let actions = suggestion_actions(NodeType::Task, "Math Assignment", 3, 3);
        let kinds: Vec<&str> = actions.iter().map(|a| a.suggestion_type.as_str()).collect();
        assert_eq!(kinds, vec!["reduce_scope", "swap_order", "band_aid"]);
        assert!(actions[0].description.contains("Math Assignment"));
    }

    #[test]
    fn habits_additionally_get_the_automate_suggestion() {
        let actions = suggestion_actions(NodeType::Habit, "Shower", 5, 3);
        assert_eq!(actions.last().unwrap().suggestion_type, "automate");
        assert_eq!(actions.len(), 4);
    }

    #[test]
    fn override_threshold_changes_the_cutoff() {
        let actions = suggestion_actions(NodeType::Task, "t", 3, 5);
        assert_eq!(actions[0].suggestion_type, "encourage");
    }
}
