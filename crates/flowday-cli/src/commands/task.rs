//! Task management commands.

use clap::Subcommand;
use flowday_core::model::Task;
use flowday_core::storage::PlannerDb;

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Add {
        /// Task title
        title: String,
        /// Owning user id
        #[arg(long)]
        user: i64,
        /// Linked habit id (the task inherits its window and tag)
        #[arg(long)]
        habit: Option<i64>,
        /// Difficulty 1-5 (default: 3)
        #[arg(long, default_value = "3")]
        difficulty: i64,
        /// Estimated minutes
        #[arg(long)]
        est_minutes: Option<i64>,
        /// Priority (default: 1)
        #[arg(long, default_value = "1")]
        priority: i64,
        /// Energy tag
        #[arg(long)]
        energy: Option<String>,
        /// Recurring task
        #[arg(long)]
        recurring: bool,
    },
    /// List tasks
    List {
        #[arg(long)]
        user: i64,
        /// Only active tasks
        #[arg(long)]
        active: bool,
    },
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = PlannerDb::open()?;

    match action {
        TaskAction::Add {
            title,
            user,
            habit,
            difficulty,
            est_minutes,
            priority,
            energy,
            recurring,
        } => {
            let task = Task {
                id: 0,
                user_id: user,
                habit_id: habit,
                title,
                difficulty,
                est_minutes,
                priority,
                energy_tag: energy,
                is_recurring: recurring,
                active: true,
            };
            let id = db.create_task(&task)?;
            println!("Task created: {id}");
        }
        TaskAction::List { user, active } => {
            let tasks = if active {
                db.list_active_tasks(user)?
            } else {
                db.list_tasks(user)?
            };
            println!("{}", serde_json::to_string_pretty(&tasks)?);
        }
    }
    Ok(())
}
