//! Day plan commands: generation, inspection, and item tracking.

use chrono::{DateTime, Local, NaiveDate, Utc};
use clap::Subcommand;
use flowday_core::storage::{Config, PlannerDb};
use flowday_core::Planner;

#[derive(Subcommand)]
pub enum PlanAction {
    /// Generate or refresh the plan for a date (replaces existing items)
    Generate {
        /// User id
        #[arg(long)]
        user: i64,
        /// Plan date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Show the plan for a date
    Show {
        /// User id
        #[arg(long)]
        user: i64,
        /// Plan date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Mark a plan item done
    Complete {
        /// Plan item id
        item: i64,
        /// Completion timestamp (RFC3339, default: now)
        #[arg(long)]
        ts: Option<DateTime<Utc>>,
    },
    /// Mark a plan item skipped
    Skip {
        /// Plan item id
        item: i64,
        /// Why the item was skipped
        #[arg(long)]
        reason: Option<String>,
    },
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn run(action: PlanAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = PlannerDb::open()?;
    let config = Config::load_or_default();
    let planner = Planner::new(&db, config);

    match action {
        PlanAction::Generate { user, date } => {
            let plan = planner.generate_day_plan(user, date.unwrap_or_else(today))?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        PlanAction::Show { user, date } => {
            let date = date.unwrap_or_else(today);
            match db.day_plan_by_date(user, date)? {
                Some(plan) => println!("{}", serde_json::to_string_pretty(&plan)?),
                None => println!("No plan for user {user} on {date}"),
            }
        }
        PlanAction::Complete { item, ts } => {
            planner.complete_item(item, ts)?;
            println!("Plan item {item} completed");
        }
        PlanAction::Skip { item, reason } => {
            planner.skip_item(item, reason.as_deref())?;
            println!("Plan item {item} skipped");
        }
    }
    Ok(())
}
