use goalbook_core::db::migrations::latest_version;
use goalbook_core::db::open_db_in_memory;
use goalbook_core::{
    Goal, GoalQuery, GoalRepository, GoalSort, RepoError, SqliteGoalRepository,
};
use rusqlite::Connection;
use uuid::Uuid;

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGoalRepository::try_new(&conn).unwrap();

    let goal = Goal::new("buy milk", "2% milk", 1_700_000_000_000);
    let id = repo.create_goal(&goal).unwrap();

    let loaded = repo.get_goal(id).unwrap().unwrap();
    assert_eq!(loaded.uuid, goal.uuid);
    assert_eq!(loaded.title, "buy milk");
    assert_eq!(loaded.detail, "2% milk");
    assert_eq!(loaded.deadline_ms, 1_700_000_000_000);
    assert!(!loaded.is_done);
}

#[test]
fn create_then_list_yields_exactly_one_new_goal() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGoalRepository::try_new(&conn).unwrap();

    let goal = Goal::new("buy milk", "2% milk", 1_700_000_000_000);
    repo.create_goal(&goal).unwrap();

    let listed = repo
        .list_goals(&GoalQuery::sorted(GoalSort::OldestDeadlineFirst))
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].title, "buy milk");
    assert_eq!(listed[0].deadline_ms, 1_700_000_000_000);
    assert!(!listed[0].is_done);
}

#[test]
fn toggle_done_twice_restores_original_state() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGoalRepository::try_new(&conn).unwrap();

    let goal = Goal::new("file taxes", "gather receipts first", 1_700_000_000_000);
    let id = repo.create_goal(&goal).unwrap();

    assert!(repo.toggle_done(id).unwrap());
    assert!(repo.get_goal(id).unwrap().unwrap().is_done);

    assert!(!repo.toggle_done(id).unwrap());
    assert!(!repo.get_goal(id).unwrap().unwrap().is_done);
}

#[test]
fn toggle_done_on_missing_goal_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGoalRepository::try_new(&conn).unwrap();

    let missing = Uuid::new_v4();
    let err = repo.toggle_done(missing).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == missing));
}

#[test]
fn delete_removes_goal_permanently() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGoalRepository::try_new(&conn).unwrap();

    let goal = Goal::new("return parcel", "drop-off point closes at 18:00", 1_700_000_000_000);
    let id = repo.create_goal(&goal).unwrap();

    repo.delete_goal(id).unwrap();

    assert!(repo.get_goal(id).unwrap().is_none());
    let listed = repo.list_goals(&GoalQuery::default()).unwrap();
    assert!(listed.iter().all(|item| item.uuid != id));

    let err = repo.delete_goal(id).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(other) if other == id));
}

#[test]
fn list_orders_by_deadline_with_insertion_order_tie_break() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGoalRepository::try_new(&conn).unwrap();

    let late = goal_with_fixed_id("00000000-0000-4000-8000-000000000001", "late", 3_000);
    let early = goal_with_fixed_id("00000000-0000-4000-8000-000000000002", "early", 1_000);
    let tie_first = goal_with_fixed_id("00000000-0000-4000-8000-000000000003", "tie first", 2_000);
    let tie_second =
        goal_with_fixed_id("00000000-0000-4000-8000-000000000004", "tie second", 2_000);

    repo.create_goal(&late).unwrap();
    repo.create_goal(&early).unwrap();
    repo.create_goal(&tie_first).unwrap();
    repo.create_goal(&tie_second).unwrap();

    let ascending = repo
        .list_goals(&GoalQuery::sorted(GoalSort::OldestDeadlineFirst))
        .unwrap();
    let ascending_ids: Vec<_> = ascending.iter().map(|goal| goal.uuid).collect();
    assert_eq!(
        ascending_ids,
        vec![early.uuid, tie_first.uuid, tie_second.uuid, late.uuid]
    );

    let descending = repo
        .list_goals(&GoalQuery::sorted(GoalSort::NewestDeadlineFirst))
        .unwrap();
    let descending_ids: Vec<_> = descending.iter().map(|goal| goal.uuid).collect();
    // Ties keep insertion order under both directions.
    assert_eq!(
        descending_ids,
        vec![late.uuid, tie_first.uuid, tie_second.uuid, early.uuid]
    );
}

#[test]
fn completed_sort_returns_only_done_goals_ascending() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGoalRepository::try_new(&conn).unwrap();

    let open_goal = goal_with_fixed_id("00000000-0000-4000-8000-000000000001", "open", 500);
    let done_late = goal_with_fixed_id("00000000-0000-4000-8000-000000000002", "done late", 2_000);
    let done_early = goal_with_fixed_id("00000000-0000-4000-8000-000000000003", "done early", 1_000);

    repo.create_goal(&open_goal).unwrap();
    repo.create_goal(&done_late).unwrap();
    repo.create_goal(&done_early).unwrap();
    repo.toggle_done(done_late.uuid).unwrap();
    repo.toggle_done(done_early.uuid).unwrap();

    let completed = repo
        .list_goals(&GoalQuery::sorted(GoalSort::CompletedByDeadline))
        .unwrap();
    let ids: Vec<_> = completed.iter().map(|goal| goal.uuid).collect();
    assert_eq!(ids, vec![done_early.uuid, done_late.uuid]);
    assert!(completed.iter().all(|goal| goal.is_done));
}

#[test]
fn completed_sort_ignores_conflicting_done_filter() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGoalRepository::try_new(&conn).unwrap();

    let done = Goal::new("done", "finished already", 1_000);
    repo.create_goal(&done).unwrap();
    repo.toggle_done(done.uuid).unwrap();

    let query = GoalQuery {
        sort: GoalSort::CompletedByDeadline,
        done: Some(false),
        ..GoalQuery::default()
    };
    let listed = repo.list_goals(&query).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].uuid, done.uuid);
}

#[test]
fn done_filter_applies_to_deadline_sorts() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGoalRepository::try_new(&conn).unwrap();

    let open_goal = Goal::new("open", "still pending", 1_000);
    let done_goal = Goal::new("done", "wrapped up", 2_000);
    repo.create_goal(&open_goal).unwrap();
    repo.create_goal(&done_goal).unwrap();
    repo.toggle_done(done_goal.uuid).unwrap();

    let open_only = GoalQuery {
        sort: GoalSort::OldestDeadlineFirst,
        done: Some(false),
        ..GoalQuery::default()
    };
    let listed = repo.list_goals(&open_only).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].uuid, open_goal.uuid);
}

#[test]
fn failed_duplicate_insert_leaves_collection_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGoalRepository::try_new(&conn).unwrap();

    let original = goal_with_fixed_id("00000000-0000-4000-8000-000000000001", "original", 1_000);
    repo.create_goal(&original).unwrap();
    let before = repo.list_goals(&GoalQuery::default()).unwrap();

    let duplicate =
        goal_with_fixed_id("00000000-0000-4000-8000-000000000001", "duplicate", 9_000);
    let err = repo.create_goal(&duplicate).unwrap_err();
    assert!(matches!(err, RepoError::Db(_)));

    let after = repo.list_goals(&GoalQuery::default()).unwrap();
    assert_eq!(after, before);
}

#[test]
fn create_accepts_empty_text_for_import_paths() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGoalRepository::try_new(&conn).unwrap();

    let goal = Goal::new("", "", 0);
    let id = repo.create_goal(&goal).unwrap();

    let loaded = repo.get_goal(id).unwrap().unwrap();
    assert_eq!(loaded.title, "");
    assert_eq!(loaded.detail, "");
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let result = SqliteGoalRepository::try_new(&conn);
    match result {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert!(expected_version > 0),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_required_goals_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteGoalRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredTable("goals"))
    ));
}

#[test]
fn repository_rejects_connection_missing_required_goals_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE goals (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            is_done INTEGER NOT NULL DEFAULT 0
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteGoalRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredColumn {
            table: "goals",
            column: "detail"
        })
    ));
}

#[test]
fn list_pagination_with_limit_and_offset_is_stable() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGoalRepository::try_new(&conn).unwrap();

    let goal_a = goal_with_fixed_id("00000000-0000-4000-8000-000000000001", "a", 1_000);
    let goal_b = goal_with_fixed_id("00000000-0000-4000-8000-000000000002", "b", 2_000);
    let goal_c = goal_with_fixed_id("00000000-0000-4000-8000-000000000003", "c", 3_000);
    repo.create_goal(&goal_a).unwrap();
    repo.create_goal(&goal_b).unwrap();
    repo.create_goal(&goal_c).unwrap();

    let query = GoalQuery {
        sort: GoalSort::OldestDeadlineFirst,
        limit: Some(2),
        offset: 1,
        ..GoalQuery::default()
    };
    let page = repo.list_goals(&query).unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].uuid, goal_b.uuid);
    assert_eq!(page[1].uuid, goal_c.uuid);

    let offset_only = GoalQuery {
        sort: GoalSort::OldestDeadlineFirst,
        offset: 2,
        ..GoalQuery::default()
    };
    let tail = repo.list_goals(&offset_only).unwrap();
    assert_eq!(tail.len(), 1);
    assert_eq!(tail[0].uuid, goal_c.uuid);
}

fn goal_with_fixed_id(id: &str, title: &str, deadline_ms: i64) -> Goal {
    Goal::with_id(Uuid::parse_str(id).unwrap(), title, "fixture detail", deadline_ms).unwrap()
}
