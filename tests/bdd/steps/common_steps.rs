use cucumber::{given, then};

use tasktrack::models::Status;

use crate::TrackerWorld;
use crate::fake_api::FakeApi;

/// The fake API for this scenario. Panics when no step started it.
pub fn api(world: &TrackerWorld) -> &FakeApi {
    world
        .api
        .as_ref()
        .expect("task API not started; add 'Given the task API is running'")
}

fn parse_status(s: &str) -> Status {
    Status::from_str(s).unwrap_or_else(|e| panic!("{e}"))
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given("the task API is running")]
async fn the_task_api_is_running(world: &mut TrackerWorld) {
    world.api = Some(FakeApi::start().await);
}

#[given(expr = "an account {string} with password {string}")]
async fn an_account(world: &mut TrackerWorld, email: String, password: String) {
    api(world).data().accounts.insert(email, password);
}

#[given(expr = "the task API has {int} tasks")]
async fn the_task_api_has_n_tasks(world: &mut TrackerWorld, n: usize) {
    let fake = api(world);
    let mut data = fake.data();
    for i in 1..=n {
        data.insert_task(&format!("Seeded task {i:02}"), Status::NotStarted, None);
    }
}

#[given(expr = "the task API has a task {string} with status {string}")]
async fn the_task_api_has_a_task(world: &mut TrackerWorld, title: String, status: String) {
    let task = api(world)
        .data()
        .insert_task(&title, parse_status(&status), None);
    world.task_ids.insert(title, task.id);
}

#[given(expr = "the task API has a task {string} assigned to {string} with status {string}")]
async fn the_task_api_has_an_assigned_task(
    world: &mut TrackerWorld,
    title: String,
    assignee: String,
    status: String,
) {
    let task = api(world)
        .data()
        .insert_task(&title, parse_status(&status), Some(&assignee));
    world.task_ids.insert(title, task.id);
}

#[given("the task API revokes every session")]
async fn the_task_api_revokes_every_session(world: &mut TrackerWorld) {
    api(world).data().tokens.clear();
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then(expr = "the task API has {int} tasks")]
async fn the_task_api_holds_n_tasks(world: &mut TrackerWorld, expected: usize) {
    let actual = api(world).data().tasks.len();
    assert_eq!(actual, expected, "task count mismatch");
}

#[then(expr = "the task API has a task titled {string}")]
async fn the_task_api_has_a_task_titled(world: &mut TrackerWorld, title: String) {
    assert!(
        api(world).data().task_by_title(&title).is_some(),
        "no task titled {title:?}"
    );
}

#[then(expr = "the task API has no task titled {string}")]
async fn the_task_api_has_no_task_titled(world: &mut TrackerWorld, title: String) {
    assert!(
        api(world).data().task_by_title(&title).is_none(),
        "task titled {title:?} still exists"
    );
}

#[then(expr = "the task {string} has status {string} and a completion time")]
async fn the_task_is_completed(world: &mut TrackerWorld, title: String, status: String) {
    let data = api(world).data();
    let task = data
        .task_by_title(&title)
        .unwrap_or_else(|| panic!("no task titled {title:?}"));
    assert_eq!(task.status, parse_status(&status));
    assert!(task.completed_at.is_some(), "completed_at was not sent");
}

#[then(expr = "the task {string} has no completion time")]
async fn the_task_has_no_completion_time(world: &mut TrackerWorld, title: String) {
    let data = api(world).data();
    let task = data
        .task_by_title(&title)
        .unwrap_or_else(|| panic!("no task titled {title:?}"));
    assert_eq!(task.completed_at, None);
}

#[then(expr = "the task {string} has {int} log entry/entries")]
async fn the_task_has_n_logs(world: &mut TrackerWorld, title: String, expected: usize) {
    let data = api(world).data();
    let id = data
        .task_by_title(&title)
        .map(|t| t.id.clone())
        .unwrap_or_else(|| panic!("no task titled {title:?}"));
    let actual = data.logs.get(&id).map(Vec::len).unwrap_or(0);
    assert_eq!(actual, expected, "log count mismatch");
}

#[then(expr = "the task API received no request to create a task")]
async fn no_create_request(world: &mut TrackerWorld) {
    let data = api(world).data();
    assert!(
        !data.requests.iter().any(|r| r == "POST /tasks"),
        "unexpected create request: {:?}",
        data.requests
    );
}
