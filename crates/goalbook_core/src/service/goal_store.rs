//! Durable goal store with serialized mutations and change notification.
//!
//! # Responsibility
//! - Act as the single writer and reader of the durable goal collection.
//! - Serialize all operations so no two mutations interleave mid-write.
//! - Notify subscribers exactly once per successful mutation, after the
//!   durable write commits.
//!
//! # Invariants
//! - The connection lock is released before subscriber callbacks run, so a
//!   callback may re-enter the store without deadlocking.
//! - Failed mutations never fire a change notification.
//! - Query results are detached snapshots; callers cannot mutate store
//!   state through them.

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::goal::{Goal, GoalId};
use crate::repo::goal_repo::{
    GoalQuery, GoalRepository, RepoError, RepoResult, SqliteGoalRepository,
};
use log::{error, info};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level error taxonomy exposed to view collaborators.
#[derive(Debug)]
pub enum StoreError {
    /// The operation referenced a goal id that does not exist.
    NotFound(GoalId),
    /// The underlying durable write or read failed.
    Persistence(RepoError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "goal not found: {id}"),
            Self::Persistence(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotFound(_) => None,
            Self::Persistence(err) => Some(err),
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Persistence(other),
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Persistence(RepoError::Db(value))
    }
}

/// Opaque handle returned by [`GoalStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionHandle {
    id: u64,
}

type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct SubscriberRegistry {
    next_id: u64,
    entries: Vec<(u64, ChangeCallback)>,
}

/// Serialized owner of the durable goal collection.
///
/// The connection sits behind a mutex so concurrent callers see each
/// mutation as all-or-nothing. The store is an explicit handle: open it at
/// startup, hand it to collaborators, drop it at shutdown.
pub struct GoalStore {
    conn: Mutex<Connection>,
    subscribers: Mutex<SubscriberRegistry>,
}

impl GoalStore {
    /// Opens a store backed by a SQLite database file.
    ///
    /// Applies pending migrations and verifies the schema before returning.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::from_connection(open_db(path)?)
    }

    /// Opens a store backed by an in-memory database.
    ///
    /// Data does not survive the store; intended for tests and throwaway
    /// sessions.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(open_db_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        SqliteGoalRepository::try_new(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            subscribers: Mutex::new(SubscriberRegistry::default()),
        })
    }

    /// Creates a new goal and persists it synchronously.
    ///
    /// The store accepts any text and deadline values; interactive callers
    /// are expected to run `validate_new_input` first.
    pub fn create(
        &self,
        title: impl Into<String>,
        detail: impl Into<String>,
        deadline_ms: i64,
    ) -> StoreResult<GoalId> {
        let goal = Goal::new(title, detail, deadline_ms);
        self.mutate("goal_create", |repo| repo.create_goal(&goal))
    }

    /// Inserts a caller-constructed goal, keeping its identity.
    ///
    /// Import path for records whose id already exists externally. Fails
    /// with a persistence error when the id is already present.
    pub fn insert(&self, goal: &Goal) -> StoreResult<GoalId> {
        self.mutate("goal_insert", |repo| repo.create_goal(goal))
    }

    /// Flips the completion flag of an existing goal and returns the new
    /// value.
    pub fn toggle_done(&self, id: GoalId) -> StoreResult<bool> {
        self.mutate("goal_toggle", |repo| repo.toggle_done(id))
    }

    /// Permanently deletes an existing goal. Irreversible.
    pub fn delete(&self, id: GoalId) -> StoreResult<()> {
        self.mutate("goal_delete", |repo| repo.delete_goal(id))
    }

    /// Fetches a single goal by id.
    pub fn get(&self, id: GoalId) -> StoreResult<Option<Goal>> {
        self.with_repo(|repo| repo.get_goal(id))
    }

    /// Returns a detached, ordered snapshot of the collection.
    ///
    /// Re-runs the underlying query on every call; results always reflect
    /// the latest committed state.
    pub fn query(&self, query: &GoalQuery) -> StoreResult<Vec<Goal>> {
        self.with_repo(|repo| repo.list_goals(query))
    }

    /// Registers a change callback fired after each successful mutation.
    ///
    /// Callbacks run on the mutating thread, after the durable write has
    /// committed and the connection lock has been released.
    pub fn subscribe(&self, on_change: impl Fn() + Send + Sync + 'static) -> SubscriptionHandle {
        let mut registry = lock_or_recover(&self.subscribers);
        registry.next_id += 1;
        let id = registry.next_id;
        registry.entries.push((id, Arc::new(on_change)));
        SubscriptionHandle { id }
    }

    /// Removes a previously registered callback.
    ///
    /// Returns `false` when the handle was already removed.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut registry = lock_or_recover(&self.subscribers);
        let before = registry.entries.len();
        registry.entries.retain(|(id, _)| *id != handle.id);
        registry.entries.len() != before
    }

    fn with_repo<T>(
        &self,
        f: impl FnOnce(&SqliteGoalRepository<'_>) -> RepoResult<T>,
    ) -> StoreResult<T> {
        let conn = lock_or_recover(&self.conn);
        let repo = SqliteGoalRepository::try_new(&conn)?;
        f(&repo).map_err(StoreError::from)
    }

    fn mutate<T>(
        &self,
        event: &str,
        f: impl FnOnce(&SqliteGoalRepository<'_>) -> RepoResult<T>,
    ) -> StoreResult<T> {
        let started_at = Instant::now();
        let result = self.with_repo(f);

        match &result {
            Ok(_) => {
                info!(
                    "event={event} module=store status=ok duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                self.notify_subscribers();
            }
            Err(err) => {
                error!(
                    "event={event} module=store status=error duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
            }
        }

        result
    }

    fn notify_subscribers(&self) {
        // Snapshot the callbacks so none of them runs under the registry
        // lock; a callback may subscribe/unsubscribe or query the store.
        let callbacks: Vec<ChangeCallback> = {
            let registry = lock_or_recover(&self.subscribers);
            registry
                .entries
                .iter()
                .map(|(_, callback)| Arc::clone(callback))
                .collect()
        };

        for callback in callbacks {
            callback();
        }
    }
}

// A poisoned lock only means another caller panicked mid-operation; the
// connection itself stays usable, so recover the guard instead of
// propagating the panic.
fn lock_or_recover<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
