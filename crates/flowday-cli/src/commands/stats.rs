//! Gamification stats commands.

use chrono::{Local, NaiveDate};
use clap::Subcommand;
use flowday_core::storage::PlannerDb;

#[derive(Subcommand)]
pub enum StatsAction {
    /// XP and flow streak for a date
    Show {
        /// User id
        #[arg(long)]
        user: i64,
        /// Date (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = PlannerDb::open()?;

    match action {
        StatsAction::Show { user, date } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            match db.gamification(user, date)? {
                Some(row) => println!("{}", serde_json::to_string_pretty(&row)?),
                None => println!("No gamification data for user {user} on {date}"),
            }
        }
    }
    Ok(())
}
