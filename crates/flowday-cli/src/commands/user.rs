//! User management commands.

use clap::Subcommand;
use flowday_core::storage::PlannerDb;

#[derive(Subcommand)]
pub enum UserAction {
    /// Create a new user
    Add {
        /// IANA timezone name
        #[arg(long, default_value = "America/Argentina/Buenos_Aires")]
        tz: String,
    },
    /// List users
    List,
}

pub fn run(action: UserAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = PlannerDb::open()?;

    match action {
        UserAction::Add { tz } => {
            let id = db.create_user(&tz)?;
            println!("User created: {id}");
        }
        UserAction::List => {
            println!("{}", serde_json::to_string_pretty(&db.list_users()?)?);
        }
    }
    Ok(())
}
