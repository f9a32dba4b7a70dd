//! Coaching suggestion commands.

use clap::Subcommand;
use flowday_core::coach::suggest_fixes;
use flowday_core::storage::{Config, PlannerDb};

use super::parse_node_type;

#[derive(Subcommand)]
pub enum CoachAction {
    /// Print suggestions for a node based on its failure history
    Suggest {
        /// User id
        #[arg(long)]
        user: i64,
        /// Node type (habit or task)
        #[arg(long)]
        node_type: String,
        /// Node id
        #[arg(long)]
        node_id: i64,
    },
}

pub fn run(action: CoachAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = PlannerDb::open()?;
    let config = Config::load_or_default();

    match action {
        CoachAction::Suggest {
            user,
            node_type,
            node_id,
        } => {
            let suggestion =
                suggest_fixes(&db, &config, user, parse_node_type(&node_type)?, node_id)?;
            println!("{}", serde_json::to_string_pretty(&suggestion)?);
        }
    }
    Ok(())
}
