use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "flowday", version, about = "Flowday planner CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// User management
    User {
        #[command(subcommand)]
        action: commands::user::UserAction,
    },
    /// Goal management
    Goal {
        #[command(subcommand)]
        action: commands::goal::GoalAction,
    },
    /// System management
    System {
        #[command(subcommand)]
        action: commands::system::SystemAction,
    },
    /// Habit management
    Habit {
        #[command(subcommand)]
        action: commands::habit::HabitAction,
    },
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Relation edge management
    Edge {
        #[command(subcommand)]
        action: commands::edge::EdgeAction,
    },
    /// Day plan generation and item tracking
    Plan {
        #[command(subcommand)]
        action: commands::plan::PlanAction,
    },
    /// Coaching suggestions
    Coach {
        #[command(subcommand)]
        action: commands::coach::CoachAction,
    },
    /// Daily and weekly reviews
    Review {
        #[command(subcommand)]
        action: commands::review::ReviewAction,
    },
    /// Gamification stats
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Insert the demo dataset
    Seed,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::User { action } => commands::user::run(action),
        Commands::Goal { action } => commands::goal::run(action),
        Commands::System { action } => commands::system::run(action),
        Commands::Habit { action } => commands::habit::run(action),
        Commands::Task { action } => commands::task::run(action),
        Commands::Edge { action } => commands::edge::run(action),
        Commands::Plan { action } => commands::plan::run(action),
        Commands::Coach { action } => commands::coach::run(action),
        Commands::Review { action } => commands::review::run(action),
        Commands::Stats { action } => commands::stats::run(action),
        Commands::Seed => commands::seed::run(),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
