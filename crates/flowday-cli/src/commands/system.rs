//! System management commands.

use clap::Subcommand;
use flowday_core::model::System;
use flowday_core::storage::PlannerDb;

#[derive(Subcommand)]
pub enum SystemAction {
    /// Create a new system under a goal
    Add {
        /// System title
        title: String,
        /// Owning user id
        #[arg(long)]
        user: i64,
        /// Parent goal id
        #[arg(long)]
        goal: i64,
        /// System description
        #[arg(long)]
        description: Option<String>,
    },
    /// List systems
    List {
        #[arg(long)]
        user: i64,
    },
}

pub fn run(action: SystemAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = PlannerDb::open()?;

    match action {
        SystemAction::Add {
            title,
            user,
            goal,
            description,
        } => {
            let id = db.create_system(&System {
                id: 0,
                user_id: user,
                goal_id: goal,
                title,
                description,
            })?;
            println!("System created: {id}");
        }
        SystemAction::List { user } => {
            println!("{}", serde_json::to_string_pretty(&db.list_systems(user)?)?);
        }
    }
    Ok(())
}
