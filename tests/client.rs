use reqwest::StatusCode;
use tempfile::TempDir;

use keepgoing::api;
use keepgoing::client::{ClientError, SyncClient};
use keepgoing::models::{CreateHabitInput, UpdateHabitInput, WEEK_DAYS};
use keepgoing::Database;

fn open_store(dir: &TempDir, file: &str) -> Database {
    let db = Database::open(dir.path().join(file)).unwrap();
    db.migrate().unwrap();
    db
}

async fn spawn_server(db: Database) -> String {
    let app = api::create_router(db);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test(flavor = "multi_thread")]
async fn refresh_mirrors_the_server() {
    let dir = TempDir::new().unwrap();
    let db = open_store(&dir, "habits.sqlite");
    db.create_habit(&CreateHabitInput { name: "Read".into() })
        .unwrap();
    let url = spawn_server(db).await;

    let mut client = SyncClient::new(url);
    let habits = client.refresh().await.unwrap();
    assert_eq!(habits.len(), 1);
    assert_eq!(habits[0].name, "Read");
}

#[tokio::test(flavor = "multi_thread")]
async fn add_touches_the_view_only_after_the_server_confirms() {
    let dir = TempDir::new().unwrap();
    let db = open_store(&dir, "habits.sqlite");
    let url = spawn_server(db).await;

    let mut client = SyncClient::new(url);
    client.refresh().await.unwrap();

    let habit = client.add("Exercise").await.unwrap();
    assert!(habit.id >= 1);
    assert_eq!(client.habits().len(), 1);

    // A rejected create must leave the view untouched.
    let err = client.add("   ").await.unwrap_err();
    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(message, "Invalid habit name");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(client.habits().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn successful_day_edits_adopt_the_server_record_wholesale() {
    let dir = TempDir::new().unwrap();
    let db = open_store(&dir, "habits.sqlite");
    let habit = db
        .create_habit(&CreateHabitInput {
            name: "Exercise".into(),
        })
        .unwrap();
    let url = spawn_server(db).await;

    let mut client = SyncClient::new(url);
    client.refresh().await.unwrap();

    for day in 0..WEEK_DAYS {
        client.set_day(habit.id, day, true).await.unwrap();
    }

    // The streak came back with the last server record; the client never
    // computes it locally.
    let cached = &client.habits()[0];
    assert_eq!(cached.days_checked, [true; WEEK_DAYS]);
    assert_eq!(cached.streak, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_day_edit_rolls_the_vector_back() {
    let dir = TempDir::new().unwrap();
    let db = open_store(&dir, "habits.sqlite");
    let habit = db
        .create_habit(&CreateHabitInput { name: "Read".into() })
        .unwrap();
    let url = spawn_server(db.clone()).await;

    let mut client = SyncClient::new(url);
    client.refresh().await.unwrap();

    // The habit disappears server-side while our view is stale.
    db.delete_habit(habit.id).unwrap();

    let err = client.toggle_day(habit.id, 2).await.unwrap_err();
    match err {
        ClientError::Api { status, .. } => assert_eq!(status, StatusCode::NOT_FOUND),
        other => panic!("unexpected error: {other}"),
    }

    // Optimistic flip undone; the record itself stays until the next refresh.
    let cached = &client.habits()[0];
    assert_eq!(cached.days_checked, [false; WEEK_DAYS]);

    client.refresh().await.unwrap();
    assert!(client.habits().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn edits_against_an_unknown_local_id_fail_before_any_request() {
    let mut client = SyncClient::new("http://127.0.0.1:9");
    let err = client.set_day(5, 0, true).await.unwrap_err();
    assert!(matches!(err, ClientError::UnknownHabit(5)));
    let err = client.set_day(5, 9, true).await.unwrap_err();
    assert!(matches!(err, ClientError::BadDay(9)));
}

#[tokio::test(flavor = "multi_thread")]
async fn remove_reinserts_the_record_when_the_request_fails() {
    let dir = TempDir::new().unwrap();
    let db = open_store(&dir, "habits.sqlite");
    db.create_habit(&CreateHabitInput { name: "Read".into() })
        .unwrap();
    let habit = db
        .create_habit(&CreateHabitInput {
            name: "Exercise".into(),
        })
        .unwrap();

    let app = api::create_router(db);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown, signal) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                signal.await.ok();
            })
            .await
            .unwrap();
    });

    let mut client = SyncClient::new(format!("http://{addr}"));
    client.refresh().await.unwrap();
    assert_eq!(client.habits().len(), 2);

    shutdown.send(()).unwrap();
    server.await.unwrap();

    let err = client.remove(habit.id).await.unwrap_err();
    assert!(matches!(err, ClientError::Http(_)));

    // Rolled back into its original slot.
    let names: Vec<&str> = client
        .habits()
        .iter()
        .map(|habit| habit.name.as_str())
        .collect();
    assert_eq!(names, vec!["Read", "Exercise"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn remove_drops_the_record_on_success() {
    let dir = TempDir::new().unwrap();
    let db = open_store(&dir, "habits.sqlite");
    let habit = db
        .create_habit(&CreateHabitInput { name: "Read".into() })
        .unwrap();
    let url = spawn_server(db.clone()).await;

    let mut client = SyncClient::new(url);
    client.refresh().await.unwrap();
    client.remove(habit.id).await.unwrap();
    assert!(client.habits().is_empty());
    assert!(db.all_habits().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn rename_replaces_the_cached_record_on_success() {
    let dir = TempDir::new().unwrap();
    let db = open_store(&dir, "habits.sqlite");
    let habit = db
        .create_habit(&CreateHabitInput { name: "Run".into() })
        .unwrap();
    // A fully checked week: the rename rides update, so the streak advances.
    db.update_habit(
        habit.id,
        &UpdateHabitInput {
            days_checked: vec![true; WEEK_DAYS],
            name: None,
        },
    )
    .unwrap();
    let url = spawn_server(db).await;

    let mut client = SyncClient::new(url);
    client.refresh().await.unwrap();

    let renamed = client.rename(habit.id, "Morning run").await.unwrap();
    assert_eq!(renamed.name, "Morning run");
    assert_eq!(renamed.streak, 2);
    assert_eq!(client.habits()[0].name, "Morning run");

    let err = client.rename(habit.id, "  ").await.unwrap_err();
    assert!(matches!(err, ClientError::Api { .. }));
    assert_eq!(client.habits()[0].name, "Morning run");
}

#[tokio::test(flavor = "multi_thread")]
async fn import_reloads_the_whole_view() {
    let dir = TempDir::new().unwrap();

    // The dataset to upload, prepared in a separate store.
    let source = open_store(&dir, "source.sqlite");
    source
        .create_habit(&CreateHabitInput { name: "A".into() })
        .unwrap();
    source
        .create_habit(&CreateHabitInput { name: "B".into() })
        .unwrap();
    let snapshot = source.export_snapshot().unwrap();

    let db = open_store(&dir, "habits.sqlite");
    db.create_habit(&CreateHabitInput { name: "Old".into() })
        .unwrap();
    let url = spawn_server(db.clone()).await;

    let mut client = SyncClient::new(url);
    client.refresh().await.unwrap();
    assert_eq!(client.habits().len(), 1);

    let count = client.import_bytes(snapshot).await.unwrap();
    assert_eq!(count, 2);
    let names: Vec<&str> = client
        .habits()
        .iter()
        .map(|habit| habit.name.as_str())
        .collect();
    assert_eq!(names, vec!["A", "B"]);

    // The server really swapped its dataset.
    let names: Vec<String> = db
        .all_habits()
        .unwrap()
        .into_iter()
        .map(|habit| habit.name)
        .collect();
    assert_eq!(names, vec!["A", "B"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn export_writes_a_loadable_snapshot() {
    let dir = TempDir::new().unwrap();
    let db = open_store(&dir, "habits.sqlite");
    db.create_habit(&CreateHabitInput { name: "Read".into() })
        .unwrap();
    let url = spawn_server(db).await;

    let mut client = SyncClient::new(url);
    client.refresh().await.unwrap();

    let target = dir.path().join("download.sqlite");
    let bytes = client.export_to(&target).await.unwrap();
    assert!(bytes > 0);

    let reloaded = open_store(&dir, "download.sqlite");
    let habits = reloaded.all_habits().unwrap();
    assert_eq!(habits.len(), 1);
    assert_eq!(habits[0].name, "Read");
}
