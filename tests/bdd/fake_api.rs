//! A small in-process version of the task REST API the client talks to.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Path, Query, Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

use tasktrack::models::{Status, Task, TaskLog};

#[derive(Debug, Default)]
pub struct ApiData {
    pub accounts: HashMap<String, String>,
    pub tokens: HashSet<String>,
    pub tasks: Vec<Task>,
    pub logs: HashMap<String, Vec<TaskLog>>,
    pub requests: Vec<String>,
    next_id: u64,
}

impl ApiData {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    /// Creation times are spaced a minute apart so newest-first order is stable.
    fn next_created_at(&self) -> DateTime<Utc> {
        let base = Utc.with_ymd_and_hms(2025, 1, 6, 1, 0, 0).single().unwrap_or_else(Utc::now);
        base + Duration::minutes(self.next_id as i64)
    }

    pub fn insert_task(&mut self, title: &str, status: Status, assignee: Option<&str>) -> Task {
        let created_at = self.next_created_at();
        let task = Task {
            id: self.next_id("task"),
            title: title.to_string(),
            description: None,
            assignee: assignee.map(str::to_string),
            status,
            created_at,
            created_by: Some("seed".to_string()),
            start_date: None,
            due_date: None,
            completed_at: (status == Status::Completed).then_some(created_at),
        };
        self.tasks.push(task.clone());
        task
    }

    pub fn task_by_title(&self, title: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.title == title)
    }
}

pub type Shared = Arc<Mutex<ApiData>>;

#[derive(Debug)]
pub struct FakeApi {
    pub port: u16,
    pub data: Shared,
    handle: JoinHandle<()>,
}

impl FakeApi {
    pub async fn start() -> Self {
        let data: Shared = Arc::default();
        let app = router(data.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind fake api");
        let port = listener.local_addr().expect("fake api addr").port();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake api error");
        });
        FakeApi { port, data, handle }
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn data(&self) -> MutexGuard<'_, ApiData> {
        self.data.lock().expect("fake api state poisoned")
    }
}

impl Drop for FakeApi {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn router(data: Shared) -> Router {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/{id}",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route("/tasks/{id}/logs", get(list_logs).post(append_log))
        .route("/dashboard/summary", get(summary))
        .layer(middleware::from_fn_with_state(data.clone(), require_token))
        .route("/auth/login", post(login))
        .with_state(data)
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

async fn require_token(State(data): State<Shared>, req: Request, next: Next) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    {
        let mut d = data.lock().expect("fake api state poisoned");
        let line = match req.uri().query() {
            Some(q) => format!("{} {}?{q}", req.method(), req.uri().path()),
            None => format!("{} {}", req.method(), req.uri().path()),
        };
        d.requests.push(line);
        if !token.is_some_and(|t| d.tokens.contains(&t)) {
            return detail(StatusCode::UNAUTHORIZED, "Not authenticated");
        }
    }
    next.run(req).await
}

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

async fn login(State(data): State<Shared>, Json(body): Json<Credentials>) -> Response {
    let mut d = data.lock().expect("fake api state poisoned");
    if d.accounts.get(&body.email) != Some(&body.password) {
        return detail(StatusCode::UNAUTHORIZED, "Incorrect email or password");
    }
    let token = d.next_id("token");
    d.tokens.insert(token.clone());
    Json(json!({ "access_token": token, "token_type": "bearer" })).into_response()
}

async fn list_tasks(
    State(data): State<Shared>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Response {
    let d = data.lock().expect("fake api state poisoned");
    let status = params.get("status").and_then(|s| Status::from_str(s).ok());
    let needle = params.get("q").map(|q| q.to_lowercase());
    let mut rows: Vec<Task> = d
        .tasks
        .iter()
        .filter(|t| status.is_none_or(|s| t.status == s))
        .filter(|t| {
            needle.as_ref().is_none_or(|n| {
                [Some(&t.title), t.description.as_ref(), t.assignee.as_ref()]
                    .into_iter()
                    .flatten()
                    .any(|field| field.to_lowercase().contains(n.as_str()))
            })
        })
        .cloned()
        .collect();
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    if let Some(limit) = params.get("limit").and_then(|l| l.parse::<usize>().ok()) {
        rows.truncate(limit);
        return Json(rows).into_response();
    }

    let page = params
        .get("page")
        .and_then(|p| p.parse::<usize>().ok())
        .unwrap_or(1)
        .max(1);
    let size = params
        .get("size")
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10)
        .clamp(1, 100);
    let total = rows.len();
    let items: Vec<Task> = rows.into_iter().skip((page - 1) * size).take(size).collect();
    Json(json!({ "items": items, "total": total, "page": page, "size": size })).into_response()
}

#[derive(Deserialize)]
struct TaskBody {
    title: String,
    description: Option<String>,
    assignee: Option<String>,
    #[serde(default)]
    status: Status,
    start_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    completed_at: Option<DateTime<Utc>>,
}

impl TaskBody {
    fn apply(self, task: &mut Task) {
        task.title = self.title;
        task.description = self.description;
        task.assignee = self.assignee;
        task.status = self.status;
        task.start_date = self.start_date;
        task.due_date = self.due_date;
        task.completed_at = self.completed_at;
    }
}

fn title_missing() -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "detail": [{ "loc": ["body", "title"], "msg": "title must not be empty" }] })),
    )
        .into_response()
}

async fn create_task(State(data): State<Shared>, Json(body): Json<TaskBody>) -> Response {
    if body.title.trim().is_empty() {
        return title_missing();
    }
    let mut d = data.lock().expect("fake api state poisoned");
    let mut task = d.insert_task(&body.title, body.status, None);
    body.apply(&mut task);
    if let Some(slot) = d.tasks.iter_mut().find(|t| t.id == task.id) {
        *slot = task.clone();
    }
    (StatusCode::CREATED, Json(task)).into_response()
}

async fn get_task(State(data): State<Shared>, Path(id): Path<String>) -> Response {
    let d = data.lock().expect("fake api state poisoned");
    match d.tasks.iter().find(|t| t.id == id) {
        Some(task) => Json(task.clone()).into_response(),
        None => detail(StatusCode::NOT_FOUND, "Task not found"),
    }
}

async fn update_task(
    State(data): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<TaskBody>,
) -> Response {
    if body.title.trim().is_empty() {
        return title_missing();
    }
    let mut d = data.lock().expect("fake api state poisoned");
    match d.tasks.iter_mut().find(|t| t.id == id) {
        Some(task) => {
            body.apply(task);
            Json(task.clone()).into_response()
        }
        None => detail(StatusCode::NOT_FOUND, "Task not found"),
    }
}

async fn delete_task(State(data): State<Shared>, Path(id): Path<String>) -> Response {
    let mut d = data.lock().expect("fake api state poisoned");
    let before = d.tasks.len();
    d.tasks.retain(|t| t.id != id);
    if d.tasks.len() == before {
        return detail(StatusCode::NOT_FOUND, "Task not found");
    }
    d.logs.remove(&id);
    StatusCode::NO_CONTENT.into_response()
}

async fn list_logs(State(data): State<Shared>, Path(id): Path<String>) -> Response {
    let d = data.lock().expect("fake api state poisoned");
    if !d.tasks.iter().any(|t| t.id == id) {
        return detail(StatusCode::NOT_FOUND, "Task not found");
    }
    Json(d.logs.get(&id).cloned().unwrap_or_default()).into_response()
}

#[derive(Deserialize)]
struct LogBody {
    event: String,
    detail: Option<String>,
}

async fn append_log(
    State(data): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<LogBody>,
) -> Response {
    let mut d = data.lock().expect("fake api state poisoned");
    if !d.tasks.iter().any(|t| t.id == id) {
        return detail(StatusCode::NOT_FOUND, "Task not found");
    }
    let created_at = d.next_created_at();
    let log = TaskLog {
        id: d.next_id("log"),
        task_id: id.clone(),
        event: body.event,
        detail: body.detail,
        created_at,
    };
    d.logs.entry(id).or_default().push(log.clone());
    (StatusCode::CREATED, Json(log)).into_response()
}

async fn summary(State(data): State<Shared>) -> Response {
    let d = data.lock().expect("fake api state poisoned");
    let count = |s: Status| d.tasks.iter().filter(|t| t.status == s).count();
    let mut wip: BTreeMap<String, u64> = BTreeMap::new();
    for task in d.tasks.iter().filter(|t| t.status == Status::InProgress) {
        if let Some(ref who) = task.assignee {
            *wip.entry(who.clone()).or_default() += 1;
        }
    }
    let wip: Vec<Value> = wip
        .into_iter()
        .map(|(assignee, count)| json!({ "assignee": assignee, "count": count }))
        .collect();
    Json(json!({
        "total": d.tasks.len(),
        "by_status": {
            "NOT_STARTED": count(Status::NotStarted),
            "IN_PROGRESS": count(Status::InProgress),
            "COMPLETED": count(Status::Completed),
        },
        "overdue": 0,
        "due_soon": 0,
        "wip_by_assignee": wip,
    }))
    .into_response()
}
