//! Goal repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD and listing APIs over canonical `goals` storage.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `Goal::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - A failed INSERT leaves no partial row behind; single-statement writes
//!   are atomic in SQLite.

use crate::db::{migrations, DbError};
use crate::model::goal::{Goal, GoalId, GoalValidationError};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const GOAL_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    detail,
    deadline,
    is_done
FROM goals";

const REQUIRED_GOAL_COLUMNS: &[&str] = &[
    "seq",
    "uuid",
    "title",
    "detail",
    "deadline",
    "is_done",
    "created_at",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for goal persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(GoalValidationError),
    Db(DbError),
    NotFound(GoalId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "goal not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted goal data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}; run migrations first"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table `{table}` is missing")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` is missing")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GoalValidationError> for RepoError {
    fn from(value: GoalValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Requested ordering for goal listings.
///
/// `NewestDeadlineFirst` is the default, matching the main list view of the
/// application this store backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GoalSort {
    /// Latest deadline first (descending).
    #[default]
    NewestDeadlineFirst,
    /// Earliest deadline first (ascending).
    OldestDeadlineFirst,
    /// Completed goals only, earliest deadline first. Implicitly restricts
    /// the listing to `is_done = true`, overriding any `done` filter.
    CompletedByDeadline,
}

/// Query options for listing goals.
#[derive(Debug, Clone, Default)]
pub struct GoalQuery {
    pub sort: GoalSort,
    /// Optional completion filter. Ignored under `CompletedByDeadline`.
    pub done: Option<bool>,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl GoalQuery {
    /// Shorthand for a full listing under the given ordering.
    pub fn sorted(sort: GoalSort) -> Self {
        Self {
            sort,
            ..Self::default()
        }
    }
}

/// Repository interface for goal CRUD and listing operations.
pub trait GoalRepository {
    fn create_goal(&self, goal: &Goal) -> RepoResult<GoalId>;
    fn get_goal(&self, id: GoalId) -> RepoResult<Option<Goal>>;
    /// Flips the completion flag and returns the new value.
    fn toggle_done(&self, id: GoalId) -> RepoResult<bool>;
    /// Permanently removes the goal. There is no tombstone to restore from.
    fn delete_goal(&self, id: GoalId) -> RepoResult<()>;
    fn list_goals(&self, query: &GoalQuery) -> RepoResult<Vec<Goal>>;
}

/// SQLite-backed goal repository.
pub struct SqliteGoalRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGoalRepository<'conn> {
    /// Wraps a connection after verifying it carries the expected schema.
    ///
    /// # Errors
    /// - `UninitializedConnection` when `PRAGMA user_version` does not match
    ///   the latest migration known to this binary.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the `goals`
    ///   table shape is incomplete.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        verify_goal_schema(conn)?;
        Ok(Self { conn })
    }
}

impl GoalRepository for SqliteGoalRepository<'_> {
    fn create_goal(&self, goal: &Goal) -> RepoResult<GoalId> {
        goal.validate()?;

        self.conn.execute(
            "INSERT INTO goals (
                uuid,
                title,
                detail,
                deadline,
                is_done,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, (strftime('%s', 'now') * 1000));",
            params![
                goal.uuid.to_string(),
                goal.title.as_str(),
                goal.detail.as_str(),
                goal.deadline_ms,
                bool_to_int(goal.is_done),
            ],
        )?;

        Ok(goal.uuid)
    }

    fn get_goal(&self, id: GoalId) -> RepoResult<Option<Goal>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{GOAL_SELECT_SQL} WHERE uuid = ?1;"))?;

        let mut rows = stmt.query(params![id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_goal_row(row)?));
        }

        Ok(None)
    }

    fn toggle_done(&self, id: GoalId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE goals SET is_done = 1 - is_done WHERE uuid = ?1;",
            [id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        let flipped: i64 = self.conn.query_row(
            "SELECT is_done FROM goals WHERE uuid = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )?;
        int_to_bool(flipped, "goals.is_done")
    }

    fn delete_goal(&self, id: GoalId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM goals WHERE uuid = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn list_goals(&self, query: &GoalQuery) -> RepoResult<Vec<Goal>> {
        let mut sql = format!("{GOAL_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        match query.sort {
            GoalSort::CompletedByDeadline => {
                sql.push_str(" AND is_done = 1");
            }
            _ => {
                if let Some(done) = query.done {
                    sql.push_str(" AND is_done = ?");
                    bind_values.push(Value::Integer(bool_to_int(done)));
                }
            }
        }

        // Equal deadlines fall back to insertion order so repeated queries
        // stay deterministic.
        sql.push_str(match query.sort {
            GoalSort::NewestDeadlineFirst => " ORDER BY deadline DESC, seq ASC",
            GoalSort::OldestDeadlineFirst | GoalSort::CompletedByDeadline => {
                " ORDER BY deadline ASC, seq ASC"
            }
        });

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut goals = Vec::new();

        while let Some(row) = rows.next()? {
            goals.push(parse_goal_row(row)?);
        }

        Ok(goals)
    }
}

fn verify_goal_schema(conn: &Connection) -> RepoResult<()> {
    let expected_version = migrations::latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let table_exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = 'goals'
        );",
        [],
        |row| row.get(0),
    )?;
    if table_exists == 0 {
        return Err(RepoError::MissingRequiredTable("goals"));
    }

    let mut stmt = conn.prepare("PRAGMA table_info('goals');")?;
    let mut rows = stmt.query([])?;
    let mut present = Vec::new();
    while let Some(row) = rows.next()? {
        present.push(row.get::<_, String>("name")?);
    }

    for &column in REQUIRED_GOAL_COLUMNS {
        if !present.iter().any(|name| name.as_str() == column) {
            return Err(RepoError::MissingRequiredColumn {
                table: "goals",
                column,
            });
        }
    }

    Ok(())
}

fn parse_goal_row(row: &Row<'_>) -> RepoResult<Goal> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in goals.uuid"))
    })?;

    let is_done = int_to_bool(row.get::<_, i64>("is_done")?, "goals.is_done")?;

    let goal = Goal {
        uuid,
        title: row.get("title")?,
        detail: row.get("detail")?,
        deadline_ms: row.get("deadline")?,
        is_done,
    };
    goal.validate()?;
    Ok(goal)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn int_to_bool(value: i64, source: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {source}"
        ))),
    }
}
