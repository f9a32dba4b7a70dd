//! Goal management commands.

use clap::Subcommand;
use flowday_core::model::Goal;
use flowday_core::storage::PlannerDb;

#[derive(Subcommand)]
pub enum GoalAction {
    /// Create a new goal
    Add {
        /// Goal title
        title: String,
        /// Owning user id
        #[arg(long)]
        user: i64,
        /// Goal description
        #[arg(long)]
        description: Option<String>,
    },
    /// List goals
    List {
        #[arg(long)]
        user: i64,
    },
}

pub fn run(action: GoalAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = PlannerDb::open()?;

    match action {
        GoalAction::Add {
            title,
            user,
            description,
        } => {
            let id = db.create_goal(&Goal {
                id: 0,
                user_id: user,
                title,
                description,
            })?;
            println!("Goal created: {id}");
        }
        GoalAction::List { user } => {
            println!("{}", serde_json::to_string_pretty(&db.list_goals(user)?)?);
        }
    }
    Ok(())
}
