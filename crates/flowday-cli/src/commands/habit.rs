//! Habit management commands.

use chrono::NaiveTime;
use clap::Subcommand;
use flowday_core::model::Habit;
use flowday_core::storage::PlannerDb;

#[derive(Subcommand)]
pub enum HabitAction {
    /// Create a new habit
    Add {
        /// Habit name
        name: String,
        /// Owning user id
        #[arg(long)]
        user: i64,
        /// Parent system id
        #[arg(long)]
        system: i64,
        /// Preferred window start (HH:MM)
        #[arg(long)]
        window_start: Option<String>,
        /// Preferred window end (HH:MM)
        #[arg(long)]
        window_end: Option<String>,
        /// Energy tag (e.g. morning, high, evening)
        #[arg(long)]
        energy: Option<String>,
        /// Recurrence rule label
        #[arg(long)]
        recurrence: Option<String>,
    },
    /// List habits
    List {
        #[arg(long)]
        user: i64,
    },
}

fn parse_window(value: Option<String>) -> Result<Option<NaiveTime>, Box<dyn std::error::Error>> {
    match value {
        Some(raw) => Ok(Some(NaiveTime::parse_from_str(&raw, "%H:%M")?)),
        None => Ok(None),
    }
}

pub fn run(action: HabitAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = PlannerDb::open()?;

    match action {
        HabitAction::Add {
            name,
            user,
            system,
            window_start,
            window_end,
            energy,
            recurrence,
        } => {
            let habit = Habit {
                id: 0,
                user_id: user,
                system_id: system,
                name,
                soft_window_start: parse_window(window_start)?,
                soft_window_end: parse_window(window_end)?,
                energy_tag: energy,
                recurrence_rule: recurrence,
                anchor_event: None,
            };
            let id = db.create_habit(&habit)?;
            println!("Habit created: {id}");
        }
        HabitAction::List { user } => {
            println!("{}", serde_json::to_string_pretty(&db.list_habits(user)?)?);
        }
    }
    Ok(())
}
