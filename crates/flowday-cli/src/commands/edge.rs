//! Relation edge management commands.

use clap::Subcommand;
use flowday_core::model::{Edge, RelationType};
use flowday_core::storage::PlannerDb;

use super::parse_node_type;

#[derive(Subcommand)]
pub enum EdgeAction {
    /// Create a relation edge between two nodes
    Add {
        /// Owning user id
        #[arg(long)]
        user: i64,
        /// Source node type (goal, system, habit, task)
        #[arg(long)]
        from_type: String,
        /// Source node id
        #[arg(long)]
        from_id: i64,
        /// Target node type
        #[arg(long)]
        to_type: String,
        /// Target node id
        #[arg(long)]
        to_id: i64,
        /// Relation kind: supports, triggers, or follows
        #[arg(long, default_value = "triggers")]
        relation: String,
    },
    /// List edges
    List {
        #[arg(long)]
        user: i64,
    },
}

fn parse_relation(value: &str) -> Result<RelationType, String> {
    match value {
        "supports" => Ok(RelationType::Supports),
        "triggers" => Ok(RelationType::Triggers),
        "follows" => Ok(RelationType::Follows),
        other => Err(format!(
            "unknown relation '{other}' (expected supports, triggers, or follows)"
        )),
    }
}

pub fn run(action: EdgeAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = PlannerDb::open()?;

    match action {
        EdgeAction::Add {
            user,
            from_type,
            from_id,
            to_type,
            to_id,
            relation,
        } => {
            let edge = Edge {
                id: 0,
                user_id: user,
                from_type: parse_node_type(&from_type)?,
                from_id,
                to_type: parse_node_type(&to_type)?,
                to_id,
                relation: parse_relation(&relation)?,
            };
            let id = db.create_edge(&edge)?;
            println!("Edge created: {id}");
        }
        EdgeAction::List { user } => {
            println!("{}", serde_json::to_string_pretty(&db.list_edges(user)?)?);
        }
    }
    Ok(())
}
