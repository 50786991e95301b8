//! In-memory task API used by unit tests in place of `ApiClient`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use reqwest::Method;
use serde_json::{Value, json};
use url::form_urlencoded;

use crate::client::{ApiError, Backend};
use crate::models::{ALL_STATUSES, Status, Task, TaskLog};

#[derive(Default)]
struct FakeState {
    tasks: Vec<Task>,
    logs: Vec<TaskLog>,
    calls: Vec<(Method, String)>,
    delays: HashMap<String, Duration>,
    failures: HashMap<String, ApiError>,
    next_id: u64,
}

#[derive(Default)]
pub(crate) struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    /// `n` tasks with ids `t-1..=t-n`; `t-n` is the newest.
    pub fn seeded(n: usize) -> Self {
        let fake = FakeBackend::default();
        for i in 1..=n {
            fake.insert_task(&format!("Task {i}"), ALL_STATUSES[(i - 1) % 3]);
        }
        fake
    }

    pub fn insert_task(&self, title: &str, status: Status) -> Task {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let n = state.next_id;
        let task = Task {
            id: format!("t-{n}"),
            title: title.to_string(),
            description: None,
            assignee: Some(if n % 2 == 0 { "Budi" } else { "Ana" }.to_string()),
            status,
            created_at: Utc.timestamp_opt(1_700_000_000 + n as i64 * 60, 0).unwrap(),
            created_by: Some("u-1".into()),
            start_date: None,
            due_date: None,
            completed_at: None,
        };
        state.tasks.push(task.clone());
        task
    }

    pub fn remove_task(&self, id: &str) {
        self.state.lock().unwrap().tasks.retain(|t| t.id != id);
    }

    pub fn delay(&self, path: &str, by: Duration) {
        self.state.lock().unwrap().delays.insert(path.to_string(), by);
    }

    pub fn fail_next(&self, path: &str, err: ApiError) {
        self.state.lock().unwrap().failures.insert(path.to_string(), err);
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(_, p)| p == path)
            .count()
    }

    pub fn calls(&self) -> Vec<(Method, String)> {
        self.state.lock().unwrap().calls.clone()
    }

    fn answer(&self, method: &Method, path: &str, body: Option<Value>) -> (Option<Duration>, Result<Value, ApiError>) {
        let mut state = self.state.lock().unwrap();
        state.calls.push((method.clone(), path.to_string()));
        let delay = state.delays.remove(path);
        if let Some(err) = state.failures.remove(path) {
            return (delay, Err(err));
        }
        (delay, route(&mut state, method, path, body))
    }
}

impl Backend for FakeBackend {
    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        let (delay, result) = self.answer(&method, path, body);
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        result
    }
}

fn not_found() -> ApiError {
    ApiError::http(404, "Not found")
}

fn route(state: &mut FakeState, method: &Method, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
    let (path_only, query) = path.split_once('?').unwrap_or((path, ""));
    let segments: Vec<&str> = path_only.trim_matches('/').split('/').collect();
    match (method.as_str(), segments.as_slice()) {
        ("GET", ["tasks"]) => Ok(list(state, query)),
        ("GET", ["dashboard", "summary"]) => Ok(summary(state)),
        ("GET", ["tasks", id]) => state
            .tasks
            .iter()
            .find(|t| t.id == *id)
            .map(|t| serde_json::to_value(t).unwrap())
            .ok_or_else(not_found),
        ("GET", ["tasks", id, "logs"]) => {
            if !state.tasks.iter().any(|t| t.id == *id) {
                return Err(not_found());
            }
            let logs: Vec<&TaskLog> = state.logs.iter().filter(|l| l.task_id == *id).collect();
            Ok(serde_json::to_value(logs).unwrap())
        }
        ("POST", ["tasks"]) => {
            let body = body.unwrap_or_default();
            state.next_id += 1;
            let n = state.next_id;
            let task = Task {
                id: format!("t-{n}"),
                title: body["title"].as_str().unwrap_or_default().to_string(),
                description: body["description"].as_str().map(String::from),
                assignee: body["assignee"].as_str().map(String::from),
                status: serde_json::from_value(body["status"].clone()).unwrap_or(Status::NotStarted),
                created_at: Utc.timestamp_opt(1_700_000_000 + n as i64 * 60, 0).unwrap(),
                created_by: Some("u-1".into()),
                start_date: body["start_date"].as_str().and_then(|s| s.parse().ok()),
                due_date: body["due_date"].as_str().and_then(|s| s.parse().ok()),
                completed_at: None,
            };
            state.tasks.push(task.clone());
            Ok(serde_json::to_value(task).unwrap())
        }
        ("PATCH", ["tasks", id]) => {
            let body = body.unwrap_or_default();
            let task = state.tasks.iter_mut().find(|t| t.id == *id).ok_or_else(not_found)?;
            if let Some(title) = body["title"].as_str() {
                task.title = title.to_string();
            }
            if let Ok(status) = serde_json::from_value(body["status"].clone()) {
                task.status = status;
            }
            if let Some(at) = body["completed_at"].as_str() {
                task.completed_at = at.parse().ok();
            }
            Ok(serde_json::to_value(task.clone()).unwrap())
        }
        ("DELETE", ["tasks", id]) => {
            state.tasks.retain(|t| t.id != *id);
            state.logs.retain(|l| l.task_id != *id);
            Ok(json!({"ok": true}))
        }
        ("POST", ["tasks", id, "logs"]) => {
            if !state.tasks.iter().any(|t| t.id == *id) {
                return Err(not_found());
            }
            let body = body.unwrap_or_default();
            let log = TaskLog {
                id: format!("l-{}", state.logs.len() + 1),
                task_id: id.to_string(),
                event: body["event"].as_str().unwrap_or_default().to_string(),
                detail: body["detail"].as_str().map(String::from),
                created_at: Utc::now(),
            };
            state.logs.push(log.clone());
            Ok(serde_json::to_value(log).unwrap())
        }
        _ => Err(not_found()),
    }
}

fn list(state: &FakeState, query: &str) -> Value {
    let params: HashMap<String, String> = form_urlencoded::parse(query.as_bytes()).into_owned().collect();
    let status = params.get("status").and_then(|s| Status::from_str(s).ok());
    let q = params.get("q").map(|s| s.to_lowercase());
    let mut rows: Vec<&Task> = state
        .tasks
        .iter()
        .filter(|t| status.is_none_or(|s| t.status == s))
        .filter(|t| {
            q.as_ref().is_none_or(|q| {
                t.title.to_lowercase().contains(q)
                    || t.assignee.as_deref().unwrap_or("").to_lowercase().contains(q)
            })
        })
        .collect();
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let rows: Vec<&Task> = if let Some(limit) = params.get("limit").and_then(|l| l.parse().ok()) {
        rows.into_iter().take(limit).collect()
    } else {
        let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1).max(1);
        let size: usize = params.get("size").and_then(|s| s.parse().ok()).unwrap_or(10).clamp(1, 100);
        rows.into_iter().skip((page - 1) * size).take(size).collect()
    };
    serde_json::to_value(rows).unwrap()
}

fn summary(state: &FakeState) -> Value {
    let count = |s: Status| state.tasks.iter().filter(|t| t.status == s).count();
    let mut wip: HashMap<String, u64> = HashMap::new();
    for t in state.tasks.iter().filter(|t| t.status == Status::InProgress) {
        if let Some(a) = &t.assignee {
            *wip.entry(a.clone()).or_default() += 1;
        }
    }
    let wip: Vec<Value> = wip
        .into_iter()
        .map(|(assignee, count)| json!({"assignee": assignee, "count": count}))
        .collect();
    json!({
        "total": state.tasks.len(),
        "by_status": {
            "NOT_STARTED": count(Status::NotStarted),
            "IN_PROGRESS": count(Status::InProgress),
            "COMPLETED": count(Status::Completed),
        },
        "overdue": 0,
        "due_soon": 0,
        "wip_by_assignee": wip,
    })
}
