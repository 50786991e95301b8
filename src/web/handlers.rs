use axum::Json;
use axum::extract::{Form, Path, Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use axum_htmx::HxRequest;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::AppState;
use super::errors::AppError;
use super::session::{PageOrigin, RequestScope, cleared_cookie, redirect, token_from};
use super::views::{
    Badge, DashboardPage, FilterView, LogFormView, LoginPage, LogsView, Nav, StatsView,
    TableView, TaskDetailPage, TaskFormView, TaskTablePartial, TasksPage, WipPanel, render,
    table_href,
};
use crate::client::{ApiClient, DASHBOARD_PATH, LOGIN_PATH, safe_next};
use crate::datetime::format_date_time;
use crate::form::{LogFields, LogForm, SubmitError, TaskFields, TaskForm};
use crate::models::Status;
use crate::table::{StatusFilter, TableMode, TableQuery, TaskTable};

pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

pub async fn index() -> Redirect {
    Redirect::to(DASHBOARD_PATH)
}

pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No page at {}", uri.path()))
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    next: Option<String>,
}

pub async fn login_page(jar: CookieJar, Query(query): Query<LoginQuery>) -> Result<Response, AppError> {
    let next = safe_next(query.next.as_deref());
    if token_from(&jar).is_some() {
        return Ok(Redirect::to(&next).into_response());
    }
    render(&LoginPage {
        nav: Nav::for_path(LOGIN_PATH),
        next,
        email: String::new(),
        error: None,
    })
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    next: Option<String>,
}

pub async fn login_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    origin: PageOrigin,
    Form(form): Form<LoginForm>,
) -> Response {
    let scope = RequestScope::new(&state, &jar, &origin);
    let next = safe_next(form.next.as_deref());
    let result = match scope.client().login(form.email.trim(), &form.password).await {
        Ok(_) => Ok(Redirect::to(&next).into_response()),
        Err(err) => {
            debug!("login rejected: {err}");
            render(&LoginPage {
                nav: Nav::for_path(LOGIN_PATH),
                next,
                email: form.email,
                error: Some(err.message().to_string()),
            })
        }
    };
    scope.finish(jar, result, false)
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    info!("signed out");
    (jar.remove(cleared_cookie()), Redirect::to(LOGIN_PATH))
}

pub async fn dashboard(
    State(state): State<AppState>,
    jar: CookieJar,
    uri: Uri,
    origin: PageOrigin,
) -> Response {
    let scope = RequestScope::new(&state, &jar, &origin);
    let summary = scope.store.summary().await;
    let mut recent = TaskTable::new(
        scope.store.clone(),
        TableMode::capped(state.config.preview_limit),
    );
    recent.load().await;
    // Second read of the summary key; answered from the page cache.
    let wip = scope.store.summary().await;

    let page = DashboardPage {
        nav: Nav::for_path(uri.path()),
        stats: StatsView::from_snapshot(&summary),
        wip: WipPanel::from_snapshot(&wip),
        table: TableView::from_table("recent-tasks", &recent),
    };
    scope.finish(jar, render(&page), false)
}

#[derive(Debug, Default, Deserialize)]
pub struct TableParams {
    #[serde(default)]
    status: String,
    #[serde(default)]
    q: String,
    page: Option<u32>,
}

impl TableParams {
    fn query(&self) -> Result<TableQuery, AppError> {
        Ok(TableQuery {
            status: StatusFilter::parse(&self.status).map_err(AppError::Validation)?,
            search: self.q.trim().to_string(),
            page: self.page.unwrap_or(1),
        })
    }
}

async fn load_table(
    state: &AppState,
    scope: &RequestScope,
    params: &TableParams,
) -> Result<TaskTable<ApiClient>, AppError> {
    let mut table = TaskTable::with_query(
        scope.store.clone(),
        TableMode::paginated(state.config.page_size),
        params.query()?,
    );
    table.load().await;
    Ok(table)
}

async fn tasks_page(
    state: &AppState,
    scope: &RequestScope,
    uri: &Uri,
    params: &TableParams,
    form: &TaskForm,
) -> Result<TasksPage, AppError> {
    let table = load_table(state, scope, params).await?;
    Ok(TasksPage {
        nav: Nav::for_path(uri.path()),
        form: TaskFormView::new(form, "/tasks".to_string(), None),
        filter: FilterView::new(table.status_filter(), table.debounced_search()),
        table: TableView::from_table("task-table", &table),
    })
}

pub async fn tasks(
    State(state): State<AppState>,
    jar: CookieJar,
    uri: Uri,
    origin: PageOrigin,
    HxRequest(htmx): HxRequest,
    Query(params): Query<TableParams>,
) -> Response {
    let scope = RequestScope::new(&state, &jar, &origin);
    let result = if htmx {
        match load_table(&state, &scope, &params).await {
            Ok(table) => render(&TaskTablePartial {
                table: TableView::from_table("task-table", &table),
            }),
            Err(e) => Err(e),
        }
    } else {
        let form = TaskForm::create(state.config.time_zone);
        match tasks_page(&state, &scope, &uri, &params, &form).await {
            Ok(page) => render(&page),
            Err(e) => Err(e),
        }
    };
    scope.finish(jar, result, htmx)
}

/// A posted task form plus the status it was rendered with.
#[derive(Debug, Deserialize)]
pub struct PostedTask {
    #[serde(flatten)]
    fields: TaskFields,
    #[serde(default)]
    previous_status: String,
}

impl PostedTask {
    fn previous(&self) -> Option<Status> {
        Status::from_str(&self.previous_status).ok()
    }
}

fn rejected(err: &SubmitError) -> StatusCode {
    match err {
        SubmitError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SubmitError::Busy => StatusCode::CONFLICT,
        SubmitError::Api(e) => e
            .status()
            .and_then(|s| StatusCode::from_u16(s).ok())
            .unwrap_or(StatusCode::BAD_GATEWAY),
    }
}

pub async fn create_task(
    State(state): State<AppState>,
    jar: CookieJar,
    uri: Uri,
    origin: PageOrigin,
    Form(posted): Form<PostedTask>,
) -> Response {
    let scope = RequestScope::new(&state, &jar, &origin);
    let mut form = TaskForm::from_posted(posted.fields, None, state.config.time_zone, Utc::now());
    let store = scope.store.clone();
    let outcome = form
        .submit(move |payload| async move { store.create_task(&payload).await })
        .await;
    let result = match outcome {
        Ok(task) => {
            info!(id = %task.id, "task created");
            Ok(Redirect::to("/tasks").into_response())
        }
        Err(err) => {
            let status = rejected(&err);
            match tasks_page(&state, &scope, &uri, &TableParams::default(), &form).await {
                Ok(page) => render(&page).map(|html| (status, html).into_response()),
                Err(e) => Err(e),
            }
        }
    };
    scope.finish(jar, result, false)
}

fn task_path(id: &str) -> String {
    format!("/tasks/{id}")
}

async fn detail_page(
    state: &AppState,
    scope: &RequestScope,
    uri: &Uri,
    id: &str,
    form: Option<TaskForm>,
    log_form: LogForm,
) -> Result<TaskDetailPage, AppError> {
    let tz = state.config.time_zone;
    let task = scope.store.task(id).await;
    let logs = scope.store.logs(id).await;
    let task = match (task.data, task.error) {
        (Some(task), _) => task,
        (None, Some(err)) => return Err(err.into()),
        (None, None) => return Err(AppError::Internal(format!("task {id} did not load"))),
    };
    let form = form.unwrap_or_else(|| TaskForm::edit(&task, tz));
    Ok(TaskDetailPage {
        nav: Nav::for_path(uri.path()),
        id: task.id.clone(),
        title: task.title.clone(),
        badge: Badge::from(task.status),
        created: format_date_time(Some(task.created_at), tz),
        completed: format_date_time(task.completed_at, tz),
        form: TaskFormView::new(&form, task_path(&task.id), Some(task.status)),
        logs: LogsView::from_snapshot(&logs, tz),
        log_form: LogFormView::new(&log_form, format!("{}/logs", task_path(&task.id))),
    })
}

pub async fn task_detail(
    State(state): State<AppState>,
    jar: CookieJar,
    uri: Uri,
    origin: PageOrigin,
    Path(id): Path<String>,
) -> Response {
    let scope = RequestScope::new(&state, &jar, &origin);
    let result = match detail_page(&state, &scope, &uri, &id, None, LogForm::new()).await {
        Ok(page) => render(&page),
        Err(e) => Err(e),
    };
    scope.finish(jar, result, false)
}

pub async fn update_task(
    State(state): State<AppState>,
    jar: CookieJar,
    uri: Uri,
    origin: PageOrigin,
    Path(id): Path<String>,
    Form(posted): Form<PostedTask>,
) -> Response {
    let scope = RequestScope::new(&state, &jar, &origin);
    let previous = posted.previous();
    let mut form =
        TaskForm::from_posted(posted.fields, previous, state.config.time_zone, Utc::now());
    let store = scope.store.clone();
    let target = id.clone();
    let outcome = form
        .submit(move |payload| async move { store.update_task(&target, &payload).await })
        .await;
    let result = match outcome {
        Ok(task) => {
            info!(id = %task.id, status = %task.status, "task updated");
            Ok(Redirect::to(&task_path(&task.id)).into_response())
        }
        Err(err) => {
            let status = rejected(&err);
            match detail_page(&state, &scope, &uri, &id, Some(form), LogForm::new()).await {
                Ok(page) => render(&page).map(|html| (status, html).into_response()),
                Err(e) => Err(e),
            }
        }
    };
    scope.finish(jar, result, false)
}

#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    #[serde(default)]
    confirmed: String,
    /// Query string of the table the row was deleted from.
    #[serde(default)]
    state: String,
    #[serde(default)]
    return_to: String,
}

pub async fn delete_task(
    State(state): State<AppState>,
    jar: CookieJar,
    origin: PageOrigin,
    HxRequest(htmx): HxRequest,
    Path(id): Path<String>,
    Form(posted): Form<DeleteForm>,
) -> Response {
    let scope = RequestScope::new(&state, &jar, &origin);
    let params: TableParams = table_params_from(&posted.state);
    let result = match params.query() {
        Ok(query) => {
            let mut table = TaskTable::with_query(
                scope.store.clone(),
                TableMode::paginated(state.config.page_size),
                query,
            );
            match table.delete(&id, |_| posted.confirmed == "yes").await {
                Ok(deleted) => {
                    if deleted {
                        info!(id = %id, "task deleted");
                    }
                    let target = if posted.return_to.starts_with(DASHBOARD_PATH) {
                        DASHBOARD_PATH.to_string()
                    } else {
                        table_href(table.status_filter(), table.debounced_search(), table.page())
                    };
                    Ok(redirect(&target, htmx))
                }
                Err(err) => Err(AppError::from(err)),
            }
        }
        Err(e) => Err(e),
    };
    scope.finish(jar, result, htmx)
}

fn table_params_from(query: &str) -> TableParams {
    let mut params = TableParams::default();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "status" => params.status = value.into_owned(),
            "q" => params.q = value.into_owned(),
            "page" => params.page = value.parse().ok(),
            _ => {}
        }
    }
    params
}

pub async fn append_log(
    State(state): State<AppState>,
    jar: CookieJar,
    uri: Uri,
    origin: PageOrigin,
    Path(id): Path<String>,
    Form(posted): Form<LogFields>,
) -> Response {
    let scope = RequestScope::new(&state, &jar, &origin);
    let mut form = LogForm::from_posted(posted);
    let store = scope.store.clone();
    let target = id.clone();
    let outcome = form
        .submit(move |payload| async move { store.append_log(&target, &payload).await })
        .await;
    let result = match outcome {
        Ok(log) => {
            info!(task = %id, event = %log.event, "log appended");
            Ok(Redirect::to(&format!("{}#activity", task_path(&id))).into_response())
        }
        Err(err) => {
            let status = rejected(&err);
            match detail_page(&state, &scope, &uri, &id, None, form).await {
                Ok(page) => render(&page).map(|html| (status, html).into_response()),
                Err(e) => Err(e),
            }
        }
    };
    scope.finish(jar, result, false)
}
