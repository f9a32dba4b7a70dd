//! Demo dataset: one user with a small goal/system/habit/task graph.

use chrono::NaiveTime;
use flowday_core::model::{Edge, Goal, Habit, NodeType, RelationType, System, Task};
use flowday_core::storage::PlannerDb;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let db = PlannerDb::open()?;

    let user = db.create_user("America/Argentina/Buenos_Aires")?;

    let goal = db.create_goal(&Goal {
        id: 0,
        user_id: user,
        title: "Thrive Daily".to_string(),
        description: Some("Stay energized and move important work forward.".to_string()),
    })?;

    let system = db.create_system(&System {
        id: 0,
        user_id: user,
        goal_id: goal,
        title: "Evening Momentum".to_string(),
        description: Some("Light habits to ease into deep work.".to_string()),
    })?;

    let habit = |name: &str, start: (u32, u32), end: (u32, u32), energy: &str| Habit {
        id: 0,
        user_id: user,
        system_id: system,
        name: name.to_string(),
        soft_window_start: NaiveTime::from_hms_opt(start.0, start.1, 0),
        soft_window_end: NaiveTime::from_hms_opt(end.0, end.1, 0),
        energy_tag: Some(energy.to_string()),
        recurrence_rule: Some("daily".to_string()),
        anchor_event: None,
    };

    db.create_habit(&habit("Wake up", (8, 0), (9, 0), "morning"))?;
    db.create_habit(&habit("Breakfast", (10, 0), (10, 30), "steady"))?;
    let shower = db.create_habit(&habit("Shower", (18, 0), (18, 30), "evening"))?;

    let math = db.create_task(&Task {
        id: 0,
        user_id: user,
        habit_id: Some(shower),
        title: "Math Assignment".to_string(),
        difficulty: 3,
        est_minutes: Some(45),
        priority: 2,
        energy_tag: Some("evening-focus".to_string()),
        is_recurring: false,
        active: true,
    })?;

    db.create_edge(&Edge {
        id: 0,
        user_id: user,
        from_type: NodeType::Habit,
        from_id: shower,
        to_type: NodeType::Task,
        to_id: math,
        relation: RelationType::Triggers,
    })?;

    println!("Seeded demo data for user {user} (3 habits, 1 task, 1 edge)");
    Ok(())
}
