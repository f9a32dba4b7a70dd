//! Review summary commands.

use chrono::{Local, NaiveDate};
use clap::Subcommand;
use flowday_core::review::{daily_summary, weekly_summary};
use flowday_core::storage::{Config, PlannerDb};

#[derive(Subcommand)]
pub enum ReviewAction {
    /// Summarize one day's plan
    Daily {
        /// User id
        #[arg(long)]
        user: i64,
        /// Date to review (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Summarize the week ending on a date
    Weekly {
        /// User id
        #[arg(long)]
        user: i64,
        /// Last day of the week under review (default: today)
        #[arg(long)]
        ending: Option<NaiveDate>,
    },
}

pub fn run(action: ReviewAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = PlannerDb::open()?;
    let config = Config::load_or_default();
    let today = Local::now().date_naive();

    match action {
        ReviewAction::Daily { user, date } => {
            let summary = daily_summary(&db, &config, user, date.unwrap_or(today))?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        ReviewAction::Weekly { user, ending } => {
            let summary = weekly_summary(&db, &config, user, ending.unwrap_or(today))?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}
