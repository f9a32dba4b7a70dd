//! SQLite-based storage for the planner.
//!
//! One database holds users, the node graph (goals, systems, habits, tasks,
//! edges), day plans with their items, the append-only event ledger, failure
//! stats, gamification counters, and reviews.

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use super::data_dir;
use crate::error::DatabaseError;
use crate::events::{EventKind, EventRecord};
use crate::model::{
    DayPlan, Edge, FailureStats, Gamification, Goal, Habit, NodeType, PlanAnchor, PlanItem,
    PlanStatus, RelationType, Review, ReviewType, System, Task, User,
};

// === Helper Functions ===

fn format_node_type(node_type: NodeType) -> &'static str {
    match node_type {
        NodeType::Goal => "goal",
        NodeType::System => "system",
        NodeType::Habit => "habit",
        NodeType::Task => "task",
    }
}

fn parse_node_type(value: &str) -> NodeType {
    match value {
        "goal" => NodeType::Goal,
        "system" => NodeType::System,
        "habit" => NodeType::Habit,
        _ => NodeType::Task,
    }
}

fn format_relation(relation: RelationType) -> &'static str {
    match relation {
        RelationType::Supports => "supports",
        RelationType::Triggers => "triggers",
        RelationType::Follows => "follows",
    }
}

fn parse_relation(value: &str) -> RelationType {
    match value {
        "supports" => RelationType::Supports,
        "follows" => RelationType::Follows,
        _ => RelationType::Triggers,
    }
}

fn format_status(status: PlanStatus) -> &'static str {
    match status {
        PlanStatus::Planned => "planned",
        PlanStatus::Ready => "ready",
        PlanStatus::Done => "done",
        PlanStatus::Skipped => "skipped",
    }
}

fn parse_status(value: &str) -> PlanStatus {
    match value {
        "ready" => PlanStatus::Ready,
        "done" => PlanStatus::Done,
        "skipped" => PlanStatus::Skipped,
        _ => PlanStatus::Planned,
    }
}

fn format_anchor(anchor: Option<PlanAnchor>) -> Option<&'static str> {
    anchor.map(|a| match a {
        PlanAnchor::Time => "time",
        PlanAnchor::Habit => "habit",
        PlanAnchor::Task => "task",
    })
}

fn parse_anchor(value: Option<&str>) -> Option<PlanAnchor> {
    match value {
        Some("time") => Some(PlanAnchor::Time),
        Some("habit") => Some(PlanAnchor::Habit),
        Some("task") => Some(PlanAnchor::Task),
        _ => None,
    }
}

fn format_review_type(review_type: ReviewType) -> &'static str {
    match review_type {
        ReviewType::Daily => "daily",
        ReviewType::Weekly => "weekly",
    }
}

fn parse_review_type(value: &str) -> ReviewType {
    match value {
        "weekly" => ReviewType::Weekly,
        _ => ReviewType::Daily,
    }
}

fn format_time(value: Option<NaiveTime>) -> Option<String> {
    value.map(|t| t.format("%H:%M").to_string())
}

fn parse_time(value: Option<String>) -> Option<NaiveTime> {
    let value = value?;
    NaiveTime::parse_from_str(&value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(&value, "%H:%M:%S"))
        .ok()
}

fn format_date(value: NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

fn parse_date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap_or_default()
}

/// Parse datetime from RFC3339 string with fallback to current time.
fn parse_datetime_fallback(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_datetime_opt(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn row_to_plan_item(row: &rusqlite::Row) -> Result<PlanItem, rusqlite::Error> {
    let node_type: String = row.get(2)?;
    let status: String = row.get(4)?;
    let anchor: Option<String> = row.get(8)?;
    Ok(PlanItem {
        id: row.get(0)?,
        dayplan_id: row.get(1)?,
        node_type: parse_node_type(&node_type),
        node_id: row.get(3)?,
        status: parse_status(&status),
        scheduled_order: row.get(5)?,
        scheduled_window_start: parse_time(row.get(6)?),
        scheduled_window_end: parse_time(row.get(7)?),
        anchor: parse_anchor(anchor.as_deref()),
    })
}

fn row_to_day_plan(row: &rusqlite::Row) -> Result<DayPlan, rusqlite::Error> {
    let date: String = row.get(2)?;
    let generated_at: String = row.get(3)?;
    Ok(DayPlan {
        id: row.get(0)?,
        user_id: row.get(1)?,
        date: parse_date(&date),
        generated_at: parse_datetime_fallback(&generated_at),
        flow_score: row.get(4)?,
        notes: row.get(5)?,
        items: Vec::new(),
    })
}

/// A plan item as produced by the scheduler, before it has a row id.
#[derive(Debug, Clone)]
pub struct PlanItemDraft {
    pub node_type: NodeType,
    pub node_id: i64,
    pub status: PlanStatus,
    pub scheduled_order: i64,
    pub window_start: Option<NaiveTime>,
    pub window_end: Option<NaiveTime>,
    pub anchor: Option<PlanAnchor>,
}

/// SQLite database for planner storage.
pub struct PlannerDb {
    conn: Connection,
}

impl PlannerDb {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/flowday/flowday.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let path = data_dir()?.join("flowday.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::from)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS users (
                    id  INTEGER PRIMARY KEY AUTOINCREMENT,
                    tz  TEXT NOT NULL DEFAULT 'America/Argentina/Buenos_Aires'
                );

                CREATE TABLE IF NOT EXISTS goals (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id     INTEGER NOT NULL,
                    title       TEXT NOT NULL,
                    description TEXT
                );

                CREATE TABLE IF NOT EXISTS systems (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id     INTEGER NOT NULL,
                    goal_id     INTEGER NOT NULL,
                    title       TEXT NOT NULL,
                    description TEXT
                );

                CREATE TABLE IF NOT EXISTS habits (
                    id                INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id           INTEGER NOT NULL,
                    system_id         INTEGER NOT NULL,
                    name              TEXT NOT NULL,
                    soft_window_start TEXT,
                    soft_window_end   TEXT,
                    energy_tag        TEXT,
                    recurrence_rule   TEXT,
                    anchor_event      TEXT
                );

                CREATE TABLE IF NOT EXISTS tasks (
                    id           INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id      INTEGER NOT NULL,
                    habit_id     INTEGER,
                    title        TEXT NOT NULL,
                    difficulty   INTEGER NOT NULL DEFAULT 3,
                    est_minutes  INTEGER,
                    priority     INTEGER NOT NULL DEFAULT 1,
                    energy_tag   TEXT,
                    is_recurring INTEGER NOT NULL DEFAULT 0,
                    active       INTEGER NOT NULL DEFAULT 1
                );

                CREATE TABLE IF NOT EXISTS edges (
                    id        INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id   INTEGER NOT NULL,
                    from_type TEXT NOT NULL,
                    from_id   INTEGER NOT NULL,
                    to_type   TEXT NOT NULL,
                    to_id     INTEGER NOT NULL,
                    relation  TEXT NOT NULL
                );

                CREATE UNIQUE INDEX IF NOT EXISTS uq_edge_link
                    ON edges(user_id, from_type, from_id, to_type, to_id);

                CREATE TABLE IF NOT EXISTS day_plans (
                    id           INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id      INTEGER NOT NULL,
                    date         TEXT NOT NULL,
                    generated_at TEXT NOT NULL,
                    flow_score   INTEGER NOT NULL DEFAULT 0,
                    notes        TEXT
                );

                CREATE UNIQUE INDEX IF NOT EXISTS uq_user_day
                    ON day_plans(user_id, date);

                CREATE TABLE IF NOT EXISTS plan_items (
                    id                     INTEGER PRIMARY KEY AUTOINCREMENT,
                    dayplan_id             INTEGER NOT NULL,
                    node_type              TEXT NOT NULL,
                    node_id                INTEGER NOT NULL,
                    status                 TEXT NOT NULL DEFAULT 'planned',
                    scheduled_order        INTEGER NOT NULL,
                    scheduled_window_start TEXT,
                    scheduled_window_end   TEXT,
                    anchor                 TEXT
                );

                CREATE INDEX IF NOT EXISTS idx_plan_items_dayplan
                    ON plan_items(dayplan_id);

                CREATE TABLE IF NOT EXISTS event_logs (
                    id         INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id    INTEGER NOT NULL,
                    ts         TEXT NOT NULL,
                    event_type TEXT NOT NULL,
                    payload    TEXT NOT NULL DEFAULT '{}'
                );

                CREATE INDEX IF NOT EXISTS idx_event_logs_user_type
                    ON event_logs(user_id, event_type);

                CREATE TABLE IF NOT EXISTS failure_stats (
                    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id            INTEGER NOT NULL,
                    node_type          TEXT NOT NULL,
                    node_id            INTEGER NOT NULL,
                    rolling_fail_count INTEGER NOT NULL DEFAULT 0,
                    last_failed_at     TEXT
                );

                CREATE UNIQUE INDEX IF NOT EXISTS uq_failure_node
                    ON failure_stats(user_id, node_type, node_id);

                CREATE TABLE IF NOT EXISTS gamification (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id     INTEGER NOT NULL,
                    date        TEXT NOT NULL,
                    streak_days INTEGER NOT NULL DEFAULT 0,
                    xp          INTEGER NOT NULL DEFAULT 0,
                    flow_streak INTEGER NOT NULL DEFAULT 0
                );

                CREATE UNIQUE INDEX IF NOT EXISTS uq_user_gamification_day
                    ON gamification(user_id, date);

                CREATE TABLE IF NOT EXISTS reviews (
                    id               INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id          INTEGER NOT NULL,
                    date_range_start TEXT NOT NULL,
                    date_range_end   TEXT NOT NULL,
                    review_type      TEXT NOT NULL,
                    reflection_text  TEXT,
                    summary          TEXT,
                    suggestions      TEXT NOT NULL DEFAULT '{}'
                );",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    // === Transactions ===

    /// Begin an immediate transaction.
    pub fn begin(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch("BEGIN IMMEDIATE TRANSACTION;")
    }

    pub fn commit(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch("COMMIT;")
    }

    pub fn rollback(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch("ROLLBACK;")
    }

    // === Users ===

    pub fn create_user(&self, tz: &str) -> Result<i64, rusqlite::Error> {
        self.conn
            .execute("INSERT INTO users (tz) VALUES (?1)", params![tz])?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>, rusqlite::Error> {
        self.conn
            .query_row("SELECT id, tz FROM users WHERE id = ?1", params![id], |row| {
                Ok(User {
                    id: row.get(0)?,
                    tz: row.get(1)?,
                })
            })
            .optional()
    }

    pub fn list_users(&self) -> Result<Vec<User>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT id, tz FROM users ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(User {
                id: row.get(0)?,
                tz: row.get(1)?,
            })
        })?;
        rows.collect()
    }

    // === Goals and systems ===

    pub fn create_goal(&self, goal: &Goal) -> Result<i64, rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO goals (user_id, title, description) VALUES (?1, ?2, ?3)",
            params![goal.user_id, goal.title, goal.description],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_goals(&self, user_id: i64) -> Result<Vec<Goal>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, title, description FROM goals WHERE user_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(Goal {
                id: row.get(0)?,
                user_id: row.get(1)?,
                title: row.get(2)?,
                description: row.get(3)?,
            })
        })?;
        rows.collect()
    }

    pub fn create_system(&self, system: &System) -> Result<i64, rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO systems (user_id, goal_id, title, description) VALUES (?1, ?2, ?3, ?4)",
            params![system.user_id, system.goal_id, system.title, system.description],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_systems(&self, user_id: i64) -> Result<Vec<System>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, goal_id, title, description
             FROM systems WHERE user_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(System {
                id: row.get(0)?,
                user_id: row.get(1)?,
                goal_id: row.get(2)?,
                title: row.get(3)?,
                description: row.get(4)?,
            })
        })?;
        rows.collect()
    }

    // === Habits ===

    pub fn create_habit(&self, habit: &Habit) -> Result<i64, rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO habits (
                user_id, system_id, name, soft_window_start, soft_window_end,
                energy_tag, recurrence_rule, anchor_event
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                habit.user_id,
                habit.system_id,
                habit.name,
                format_time(habit.soft_window_start),
                format_time(habit.soft_window_end),
                habit.energy_tag,
                habit.recurrence_rule,
                habit.anchor_event,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_habit(&self, id: i64) -> Result<Option<Habit>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT id, user_id, system_id, name, soft_window_start, soft_window_end,
                        energy_tag, recurrence_rule, anchor_event
                 FROM habits WHERE id = ?1",
                params![id],
                Self::row_to_habit,
            )
            .optional()
    }

    pub fn list_habits(&self, user_id: i64) -> Result<Vec<Habit>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, system_id, name, soft_window_start, soft_window_end,
                    energy_tag, recurrence_rule, anchor_event
             FROM habits WHERE user_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![user_id], Self::row_to_habit)?;
        rows.collect()
    }

    fn row_to_habit(row: &rusqlite::Row) -> Result<Habit, rusqlite::Error> {
        Ok(Habit {
            id: row.get(0)?,
            user_id: row.get(1)?,
            system_id: row.get(2)?,
            name: row.get(3)?,
            soft_window_start: parse_time(row.get(4)?),
            soft_window_end: parse_time(row.get(5)?),
            energy_tag: row.get(6)?,
            recurrence_rule: row.get(7)?,
            anchor_event: row.get(8)?,
        })
    }

    // === Tasks ===

    pub fn create_task(&self, task: &Task) -> Result<i64, rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO tasks (
                user_id, habit_id, title, difficulty, est_minutes, priority,
                energy_tag, is_recurring, active
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                task.user_id,
                task.habit_id,
                task.title,
                task.difficulty,
                task.est_minutes,
                task.priority,
                task.energy_tag,
                task.is_recurring,
                task.active,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_task(&self, id: i64) -> Result<Option<Task>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT id, user_id, habit_id, title, difficulty, est_minutes, priority,
                        energy_tag, is_recurring, active
                 FROM tasks WHERE id = ?1",
                params![id],
                Self::row_to_task,
            )
            .optional()
    }

    pub fn list_tasks(&self, user_id: i64) -> Result<Vec<Task>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, habit_id, title, difficulty, est_minutes, priority,
                    energy_tag, is_recurring, active
             FROM tasks WHERE user_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![user_id], Self::row_to_task)?;
        rows.collect()
    }

    pub fn list_active_tasks(&self, user_id: i64) -> Result<Vec<Task>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, habit_id, title, difficulty, est_minutes, priority,
                    energy_tag, is_recurring, active
             FROM tasks WHERE user_id = ?1 AND active = 1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![user_id], Self::row_to_task)?;
        rows.collect()
    }

    fn row_to_task(row: &rusqlite::Row) -> Result<Task, rusqlite::Error> {
        Ok(Task {
            id: row.get(0)?,
            user_id: row.get(1)?,
            habit_id: row.get(2)?,
            title: row.get(3)?,
            difficulty: row.get(4)?,
            est_minutes: row.get(5)?,
            priority: row.get(6)?,
            energy_tag: row.get(7)?,
            is_recurring: row.get(8)?,
            active: row.get(9)?,
        })
    }

    // === Edges ===

    pub fn create_edge(&self, edge: &Edge) -> Result<i64, rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO edges (user_id, from_type, from_id, to_type, to_id, relation)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                edge.user_id,
                format_node_type(edge.from_type),
                edge.from_id,
                format_node_type(edge.to_type),
                edge.to_id,
                format_relation(edge.relation),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_edges(&self, user_id: i64) -> Result<Vec<Edge>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, from_type, from_id, to_type, to_id, relation
             FROM edges WHERE user_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![user_id], Self::row_to_edge)?;
        rows.collect()
    }

    /// Edges leaving one node, used by the dependency unlock engine.
    pub fn edges_from(
        &self,
        user_id: i64,
        from_type: NodeType,
        from_id: i64,
    ) -> Result<Vec<Edge>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, from_type, from_id, to_type, to_id, relation
             FROM edges WHERE user_id = ?1 AND from_type = ?2 AND from_id = ?3 ORDER BY id",
        )?;
        let rows = stmt.query_map(
            params![user_id, format_node_type(from_type), from_id],
            Self::row_to_edge,
        )?;
        rows.collect()
    }

    fn row_to_edge(row: &rusqlite::Row) -> Result<Edge, rusqlite::Error> {
        let from_type: String = row.get(2)?;
        let to_type: String = row.get(4)?;
        let relation: String = row.get(6)?;
        Ok(Edge {
            id: row.get(0)?,
            user_id: row.get(1)?,
            from_type: parse_node_type(&from_type),
            from_id: row.get(3)?,
            to_type: parse_node_type(&to_type),
            to_id: row.get(5)?,
            relation: parse_relation(&relation),
        })
    }

    // === Day plans ===

    /// Fetch the plan for one date, items included, ordered by position.
    pub fn day_plan_by_date(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<Option<DayPlan>, rusqlite::Error> {
        let plan = self
            .conn
            .query_row(
                "SELECT id, user_id, date, generated_at, flow_score, notes
                 FROM day_plans WHERE user_id = ?1 AND date = ?2",
                params![user_id, format_date(date)],
                row_to_day_plan,
            )
            .optional()?;

        match plan {
            Some(mut plan) => {
                plan.items = self.plan_items(plan.id)?;
                Ok(Some(plan))
            }
            None => Ok(None),
        }
    }

    pub fn get_day_plan(&self, id: i64) -> Result<Option<DayPlan>, rusqlite::Error> {
        let plan = self
            .conn
            .query_row(
                "SELECT id, user_id, date, generated_at, flow_score, notes
                 FROM day_plans WHERE id = ?1",
                params![id],
                row_to_day_plan,
            )
            .optional()?;

        match plan {
            Some(mut plan) => {
                plan.items = self.plan_items(plan.id)?;
                Ok(Some(plan))
            }
            None => Ok(None),
        }
    }

    /// Fetch-or-create the plan row for one date (without items).
    pub fn upsert_day_plan(
        &self,
        user_id: i64,
        date: NaiveDate,
        generated_at: DateTime<Utc>,
    ) -> Result<DayPlan, rusqlite::Error> {
        let existing = self
            .conn
            .query_row(
                "SELECT id, user_id, date, generated_at, flow_score, notes
                 FROM day_plans WHERE user_id = ?1 AND date = ?2",
                params![user_id, format_date(date)],
                row_to_day_plan,
            )
            .optional()?;

        if let Some(mut plan) = existing {
            self.conn.execute(
                "UPDATE day_plans SET generated_at = ?1 WHERE id = ?2",
                params![generated_at.to_rfc3339(), plan.id],
            )?;
            plan.generated_at = generated_at;
            return Ok(plan);
        }

        self.conn.execute(
            "INSERT INTO day_plans (user_id, date, generated_at) VALUES (?1, ?2, ?3)",
            params![user_id, format_date(date), generated_at.to_rfc3339()],
        )?;
        Ok(DayPlan {
            id: self.conn.last_insert_rowid(),
            user_id,
            date,
            generated_at,
            flow_score: 0,
            notes: None,
            items: Vec::new(),
        })
    }

    /// Plans whose date falls in `[start, end]`, items included.
    pub fn day_plans_in_range(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DayPlan>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, date, generated_at, flow_score, notes
             FROM day_plans
             WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date",
        )?;
        let rows = stmt.query_map(
            params![user_id, format_date(start), format_date(end)],
            row_to_day_plan,
        )?;
        let mut plans = rows.collect::<Result<Vec<DayPlan>, _>>()?;
        for plan in &mut plans {
            plan.items = self.plan_items(plan.id)?;
        }
        Ok(plans)
    }

    /// Destructively replace a plan's items with freshly scheduled drafts.
    pub fn replace_plan_items(
        &self,
        dayplan_id: i64,
        drafts: &[PlanItemDraft],
    ) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "DELETE FROM plan_items WHERE dayplan_id = ?1",
            params![dayplan_id],
        )?;
        for draft in drafts {
            self.conn.execute(
                "INSERT INTO plan_items (
                    dayplan_id, node_type, node_id, status, scheduled_order,
                    scheduled_window_start, scheduled_window_end, anchor
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    dayplan_id,
                    format_node_type(draft.node_type),
                    draft.node_id,
                    format_status(draft.status),
                    draft.scheduled_order,
                    format_time(draft.window_start),
                    format_time(draft.window_end),
                    format_anchor(draft.anchor),
                ],
            )?;
        }
        Ok(())
    }

    pub fn plan_items(&self, dayplan_id: i64) -> Result<Vec<PlanItem>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, dayplan_id, node_type, node_id, status, scheduled_order,
                    scheduled_window_start, scheduled_window_end, anchor
             FROM plan_items WHERE dayplan_id = ?1 ORDER BY scheduled_order",
        )?;
        let rows = stmt.query_map(params![dayplan_id], row_to_plan_item)?;
        rows.collect()
    }

    pub fn plan_item(&self, id: i64) -> Result<Option<PlanItem>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT id, dayplan_id, node_type, node_id, status, scheduled_order,
                        scheduled_window_start, scheduled_window_end, anchor
                 FROM plan_items WHERE id = ?1",
                params![id],
                row_to_plan_item,
            )
            .optional()
    }

    pub fn update_plan_item_status(
        &self,
        id: i64,
        status: PlanStatus,
    ) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "UPDATE plan_items SET status = ?1 WHERE id = ?2",
            params![format_status(status), id],
        )?;
        Ok(())
    }

    pub fn set_flow_score(&self, dayplan_id: i64, score: i64) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "UPDATE day_plans SET flow_score = ?1 WHERE id = ?2",
            params![score, dayplan_id],
        )?;
        Ok(())
    }

    // === Event ledger ===

    pub fn append_event(
        &self,
        user_id: i64,
        ts: DateTime<Utc>,
        kind: EventKind,
        payload: serde_json::Value,
    ) -> Result<i64, rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO event_logs (user_id, ts, event_type, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_id, ts.to_rfc3339(), kind.as_str(), payload.to_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// All of a user's events of the given kinds, in insertion order.
    pub fn events_of_kinds(
        &self,
        user_id: i64,
        kinds: &[EventKind],
    ) -> Result<Vec<EventRecord>, rusqlite::Error> {
        if kinds.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = (0..kinds.len())
            .map(|i| format!("?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT id, user_id, ts, event_type, payload
             FROM event_logs
             WHERE user_id = ?1 AND event_type IN ({placeholders})
             ORDER BY id",
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut values: Vec<rusqlite::types::Value> = vec![user_id.into()];
        values.extend(kinds.iter().map(|k| k.as_str().to_string().into()));

        let rows = stmt.query_map(params_from_iter(values), |row| {
            let ts: String = row.get(2)?;
            let payload: String = row.get(4)?;
            Ok(EventRecord {
                id: row.get(0)?,
                user_id: row.get(1)?,
                ts: parse_datetime_fallback(&ts),
                event_type: row.get(3)?,
                payload: serde_json::from_str(&payload)
                    .unwrap_or(serde_json::Value::Null),
            })
        })?;
        rows.collect()
    }

    // === Failure stats ===

    pub fn failure_stats(
        &self,
        user_id: i64,
        node_type: NodeType,
        node_id: i64,
    ) -> Result<Option<FailureStats>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT id, user_id, node_type, node_id, rolling_fail_count, last_failed_at
                 FROM failure_stats
                 WHERE user_id = ?1 AND node_type = ?2 AND node_id = ?3",
                params![user_id, format_node_type(node_type), node_id],
                |row| {
                    let node_type: String = row.get(2)?;
                    Ok(FailureStats {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        node_type: parse_node_type(&node_type),
                        node_id: row.get(3)?,
                        rolling_fail_count: row.get(4)?,
                        last_failed_at: parse_datetime_opt(row.get(5)?),
                    })
                },
            )
            .optional()
    }

    /// Upsert on skip: bump the rolling count and stamp the failure time.
    pub fn record_failure(
        &self,
        user_id: i64,
        node_type: NodeType,
        node_id: i64,
        failed_at: DateTime<Utc>,
    ) -> Result<(), rusqlite::Error> {
        let updated = self.conn.execute(
            "UPDATE failure_stats
             SET rolling_fail_count = rolling_fail_count + 1, last_failed_at = ?4
             WHERE user_id = ?1 AND node_type = ?2 AND node_id = ?3",
            params![
                user_id,
                format_node_type(node_type),
                node_id,
                failed_at.to_rfc3339(),
            ],
        )?;
        if updated == 0 {
            self.conn.execute(
                "INSERT INTO failure_stats
                    (user_id, node_type, node_id, rolling_fail_count, last_failed_at)
                 VALUES (?1, ?2, ?3, 1, ?4)",
                params![
                    user_id,
                    format_node_type(node_type),
                    node_id,
                    failed_at.to_rfc3339(),
                ],
            )?;
        }
        Ok(())
    }

    /// Reset on completion. No-op when the node has no stats row.
    pub fn reset_failure(
        &self,
        user_id: i64,
        node_type: NodeType,
        node_id: i64,
    ) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "UPDATE failure_stats
             SET rolling_fail_count = 0, last_failed_at = NULL
             WHERE user_id = ?1 AND node_type = ?2 AND node_id = ?3",
            params![user_id, format_node_type(node_type), node_id],
        )?;
        Ok(())
    }

    // === Gamification ===

    pub fn gamification(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<Option<Gamification>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT id, user_id, date, streak_days, xp, flow_streak
                 FROM gamification WHERE user_id = ?1 AND date = ?2",
                params![user_id, format_date(date)],
                |row| {
                    let date: String = row.get(2)?;
                    Ok(Gamification {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        date: parse_date(&date),
                        streak_days: row.get(3)?,
                        xp: row.get(4)?,
                        flow_streak: row.get(5)?,
                    })
                },
            )
            .optional()
    }

    /// Insert (id 0) or update a gamification row.
    pub fn save_gamification(&self, row: &Gamification) -> Result<i64, rusqlite::Error> {
        if row.id == 0 {
            self.conn.execute(
                "INSERT INTO gamification (user_id, date, streak_days, xp, flow_streak)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    row.user_id,
                    format_date(row.date),
                    row.streak_days,
                    row.xp,
                    row.flow_streak,
                ],
            )?;
            Ok(self.conn.last_insert_rowid())
        } else {
            self.conn.execute(
                "UPDATE gamification
                 SET streak_days = ?1, xp = ?2, flow_streak = ?3
                 WHERE id = ?4",
                params![row.streak_days, row.xp, row.flow_streak, row.id],
            )?;
            Ok(row.id)
        }
    }

    // === Reviews ===

    pub fn create_review(&self, review: &Review) -> Result<i64, rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO reviews (
                user_id, date_range_start, date_range_end, review_type,
                reflection_text, summary, suggestions
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                review.user_id,
                format_date(review.date_range_start),
                format_date(review.date_range_end),
                format_review_type(review.review_type),
                review.reflection_text,
                review.summary,
                review.suggestions.to_string(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_reviews(&self, user_id: i64) -> Result<Vec<Review>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, date_range_start, date_range_end, review_type,
                    reflection_text, summary, suggestions
             FROM reviews WHERE user_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            let start: String = row.get(2)?;
            let end: String = row.get(3)?;
            let review_type: String = row.get(4)?;
            let suggestions: String = row.get(7)?;
            Ok(Review {
                id: row.get(0)?,
                user_id: row.get(1)?,
                date_range_start: parse_date(&start),
                date_range_end: parse_date(&end),
                review_type: parse_review_type(&review_type),
                reflection_text: row.get(5)?,
                summary: row.get(6)?,
                suggestions: serde_json::from_str(&suggestions)
                    .unwrap_or(serde_json::Value::Null),
            })
        })?;
        rows.collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn habit(user_id: i64, name: &str) -> Habit {
        Habit {
            id: 0,
            user_id,
            system_id: 1,
            name: name.to_string(),
            soft_window_start: NaiveTime::from_hms_opt(8, 0, 0),
            soft_window_end: NaiveTime::from_hms_opt(9, 0, 0),
            energy_tag: Some("morning".to_string()),
            recurrence_rule: Some("daily".to_string()),
            anchor_event: None,
        }
    }

    #[test]
    fn open_at_creates_the_schema_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flowday.db");
        {
            let db = PlannerDb::open_at(&path).unwrap();
            db.create_user("UTC").unwrap();
        }
        // Reopening migrates idempotently and sees the existing rows.
        let db = PlannerDb::open_at(&path).unwrap();
        assert_eq!(db.list_users().unwrap().len(), 1);
    }

    #[test]
    fn create_and_get_user() {
        let db = PlannerDb::open_memory().unwrap();
        let id = db.create_user("Europe/Berlin").unwrap();
        let user = db.get_user(id).unwrap().unwrap();
        assert_eq!(user.tz, "Europe/Berlin");
        assert!(db.get_user(id + 1).unwrap().is_none());
    }

    #[test]
    fn habit_round_trip_keeps_window_times() {
        let db = PlannerDb::open_memory().unwrap();
        let id = db.create_habit(&habit(1, "Wake up")).unwrap();

        let retrieved = db.get_habit(id).unwrap().unwrap();
        assert_eq!(retrieved.name, "Wake up");
        assert_eq!(
            retrieved.soft_window_start,
            NaiveTime::from_hms_opt(8, 0, 0)
        );
        assert_eq!(retrieved.energy_tag.as_deref(), Some("morning"));
    }

    #[test]
    fn duplicate_edge_is_rejected() {
        let db = PlannerDb::open_memory().unwrap();
        let edge = Edge {
            id: 0,
            user_id: 1,
            from_type: NodeType::Habit,
            from_id: 1,
            to_type: NodeType::Task,
            to_id: 2,
            relation: RelationType::Triggers,
        };
        db.create_edge(&edge).unwrap();
        assert!(db.create_edge(&edge).is_err());
    }

    #[test]
    fn replace_plan_items_is_destructive() {
        let db = PlannerDb::open_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let plan = db.upsert_day_plan(1, date, Utc::now()).unwrap();

        let draft = |node_id, order| PlanItemDraft {
            node_type: NodeType::Habit,
            node_id,
            status: PlanStatus::Ready,
            scheduled_order: order,
            window_start: None,
            window_end: None,
            anchor: None,
        };

        db.replace_plan_items(plan.id, &[draft(1, 1), draft(2, 2)])
            .unwrap();
        db.replace_plan_items(plan.id, &[draft(3, 1)]).unwrap();

        let items = db.plan_items(plan.id).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].node_id, 3);
    }

    #[test]
    fn upsert_day_plan_reuses_the_row_per_date() {
        let db = PlannerDb::open_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let first = db.upsert_day_plan(1, date, Utc::now()).unwrap();
        let second = db.upsert_day_plan(1, date, Utc::now()).unwrap();
        assert_eq!(first.id, second.id);

        let other_user = db.upsert_day_plan(2, date, Utc::now()).unwrap();
        assert_ne!(first.id, other_user.id);
    }

    #[test]
    fn events_filter_by_kind_and_user() {
        let db = PlannerDb::open_memory().unwrap();
        let now = Utc::now();
        db.append_event(1, now, EventKind::PlanComplete, serde_json::json!({"plan_item_id": 1}))
            .unwrap();
        db.append_event(1, now, EventKind::CoachSuggest, serde_json::json!({}))
            .unwrap();
        db.append_event(2, now, EventKind::PlanComplete, serde_json::json!({"plan_item_id": 9}))
            .unwrap();

        let events = db
            .events_of_kinds(1, &[EventKind::PlanComplete, EventKind::PlanSkip])
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "plan_complete");
    }

    #[test]
    fn failure_upsert_then_reset() {
        let db = PlannerDb::open_memory().unwrap();
        let now = Utc::now();
        db.record_failure(1, NodeType::Task, 7, now).unwrap();
        db.record_failure(1, NodeType::Task, 7, now).unwrap();

        let stats = db.failure_stats(1, NodeType::Task, 7).unwrap().unwrap();
        assert_eq!(stats.rolling_fail_count, 2);
        assert!(stats.last_failed_at.is_some());

        db.reset_failure(1, NodeType::Task, 7).unwrap();
        let stats = db.failure_stats(1, NodeType::Task, 7).unwrap().unwrap();
        assert_eq!(stats.rolling_fail_count, 0);
        assert!(stats.last_failed_at.is_none());

        // Resetting a node without stats stays a no-op.
        db.reset_failure(1, NodeType::Habit, 7).unwrap();
        assert!(db.failure_stats(1, NodeType::Habit, 7).unwrap().is_none());
    }

    #[test]
    fn gamification_insert_then_update() {
        let db = PlannerDb::open_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let id = db
            .save_gamification(&Gamification {
                id: 0,
                user_id: 1,
                date,
                streak_days: 0,
                xp: 12,
                flow_streak: 1,
            })
            .unwrap();

        let mut row = db.gamification(1, date).unwrap().unwrap();
        assert_eq!(row.id, id);
        assert_eq!(row.xp, 12);

        row.xp += 5;
        db.save_gamification(&row).unwrap();
        assert_eq!(db.gamification(1, date).unwrap().unwrap().xp, 17);
    }
}
