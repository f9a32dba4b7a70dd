//! Append-only event ledger types.
//!
//! The ledger is the authoritative history of what happened and when; plan
//! item status is a cache derived from it. The flow scorer replays
//! completion and skip events to reconstruct timing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::NodeType;

/// Well-known event types written by the engine.
///
/// The ledger column is free-form text, so foreign writers may append other
/// types; the engine only ever filters on these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PlanComplete,
    PlanSkip,
    CoachSuggest,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::PlanComplete => "plan_complete",
            EventKind::PlanSkip => "plan_skip",
            EventKind::CoachSuggest => "coach_suggest",
        }
    }
}

/// One ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: i64,
    pub user_id: i64,
    pub ts: DateTime<Utc>,
    pub event_type: String,
    pub payload: serde_json::Value,
}

impl EventRecord {
    pub fn is_kind(&self, kind: EventKind) -> bool {
        self.event_type == kind.as_str()
    }

    /// Decode the payload as a plan event, if it is one.
    pub fn plan_payload(&self) -> Option<PlanEventPayload> {
        serde_json::from_value(self.payload.clone()).ok()
    }
}

/// Payload carried by `plan_complete` and `plan_skip` events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanEventPayload {
    pub plan_item_id: i64,
    pub node_type: NodeType,
    pub node_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_payload_round_trip() {
        let payload = PlanEventPayload {
            plan_item_id: 12,
            node_type: NodeType::Habit,
            node_id: 3,
            reason: None,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert!(value.get("reason").is_none());

        let record = EventRecord {
            id: 1,
            user_id: 1,
            ts: Utc::now(),
            event_type: EventKind::PlanComplete.as_str().to_string(),
            payload: value,
        };
        assert!(record.is_kind(EventKind::PlanComplete));
        let decoded = record.plan_payload().unwrap();
        assert_eq!(decoded.plan_item_id, 12);
        assert_eq!(decoded.node_type, NodeType::Habit);
    }

    #[test]
    fn foreign_payload_is_not_a_plan_event() {
        let record = EventRecord {
            id: 2,
            user_id: 1,
            ts: Utc::now(),
            event_type: "integration_sync".to_string(),
            payload: serde_json::json!({"service": "calendar"}),
        };
        assert!(record.plan_payload().is_none());
    }
}
