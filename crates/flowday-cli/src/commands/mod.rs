pub mod coach;
pub mod edge;
pub mod goal;
pub mod habit;
pub mod plan;
pub mod review;
pub mod seed;
pub mod stats;
pub mod system;
pub mod task;
pub mod user;

use flowday_core::model::NodeType;

/// Parse a node type argument ("goal", "system", "habit", "task").
pub fn parse_node_type(value: &str) -> Result<NodeType, String> {
    match value {
        "goal" => Ok(NodeType::Goal),
        "system" => Ok(NodeType::System),
        "habit" => Ok(NodeType::Habit),
        "task" => Ok(NodeType::Task),
        other => Err(format!(
            "unknown node type '{other}' (expected goal, system, habit, or task)"
        )),
    }
}
