//! View models and askama templates for the dashboard pages.

use askama::Template;
use axum::response::{Html, IntoResponse, Response};
use chrono_tz::Tz;
use url::form_urlencoded;

use super::errors::AppError;
use crate::client::{ApiError, Backend, DASHBOARD_PATH, LOGIN_PATH};
use crate::datetime::{format_date, format_date_time, format_relative_due_date};
use crate::form::{LogForm, TaskFields, TaskForm};
use crate::models::{ALL_STATUSES, DashboardSummary, Status, Task, TaskLog, WipRow};
use crate::store::Snapshot;
use crate::table::{StatusFilter, TableMode, TaskTable};

pub fn render<T: Template>(page: &T) -> Result<Response, AppError> {
    Ok(Html(page.render()?).into_response())
}

pub struct NavLink {
    pub href: &'static str,
    pub label: &'static str,
    pub active: bool,
}

pub struct Nav {
    pub visible: bool,
    pub links: Vec<NavLink>,
}

impl Nav {
    pub fn for_path(path: &str) -> Self {
        let links = [(DASHBOARD_PATH, "Dashboard"), ("/tasks", "Tasks")]
            .into_iter()
            .map(|(href, label)| NavLink {
                href,
                label,
                active: path == href || path.starts_with(&format!("{href}/")),
            })
            .collect();
        Nav {
            visible: !path.starts_with(LOGIN_PATH),
            links,
        }
    }
}

pub struct Badge {
    pub label: &'static str,
    pub tone: &'static str,
}

impl From<Status> for Badge {
    fn from(status: Status) -> Self {
        Badge {
            label: status.label(),
            tone: status.tone(),
        }
    }
}

pub struct SelectOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

fn status_options(selected: Option<Status>) -> Vec<SelectOption> {
    ALL_STATUSES
        .iter()
        .map(|s| SelectOption {
            value: s.as_str(),
            label: s.label(),
            selected: selected == Some(*s),
        })
        .collect()
}

/// First letters of the first two words, upper-cased.
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .take(2)
        .filter_map(|w| w.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

pub struct StatCard {
    pub label: &'static str,
    pub value: u64,
    pub tone: &'static str,
}

pub struct StatsView {
    pub loading: bool,
    pub error: Option<String>,
    pub cards: Vec<StatCard>,
}

pub struct WipView {
    pub initials: String,
    pub assignee: String,
    pub count: u64,
}

pub struct WipPanel {
    pub loading: bool,
    pub rows: Vec<WipView>,
}

impl StatsView {
    pub fn from_snapshot(snap: &Snapshot<DashboardSummary>) -> Self {
        let cards = snap
            .data
            .as_ref()
            .map(|s| {
                vec![
                    StatCard {
                        label: "Total tasks",
                        value: s.total,
                        tone: "slate",
                    },
                    StatCard {
                        label: Status::InProgress.label(),
                        value: s.by_status.get(Status::InProgress),
                        tone: Status::InProgress.tone(),
                    },
                    StatCard {
                        label: Status::Completed.label(),
                        value: s.by_status.get(Status::Completed),
                        tone: Status::Completed.tone(),
                    },
                ]
            })
            .unwrap_or_default();
        StatsView {
            loading: snap.data.is_none() && snap.error.is_none(),
            error: snap.error.as_ref().map(|e| e.message().to_string()),
            cards,
        }
    }
}

impl WipPanel {
    pub fn from_snapshot(snap: &Snapshot<DashboardSummary>) -> Self {
        let rows = snap
            .data
            .as_ref()
            .map(|s| s.wip_by_assignee.iter().map(wip_row).collect())
            .unwrap_or_default();
        WipPanel {
            loading: snap.data.is_none() && snap.error.is_none(),
            rows,
        }
    }
}

fn wip_row(row: &WipRow) -> WipView {
    WipView {
        initials: initials(&row.assignee),
        assignee: row.assignee.clone(),
        count: row.count,
    }
}

pub struct TaskRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub assignee: String,
    pub badge: Badge,
    pub start: String,
    pub due: String,
}

impl TaskRow {
    fn new(task: &Task) -> Self {
        TaskRow {
            id: task.id.clone(),
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_else(|| "-".into()),
            assignee: task.assignee.clone().unwrap_or_else(|| "-".into()),
            badge: task.status.into(),
            start: format_date(task.start_date),
            due: format_relative_due_date(task.due_date),
        }
    }
}

pub struct Pager {
    pub page: u32,
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
}

/// One rendered task table: rows, an inline notice row, optional pager.
pub struct TableView {
    pub id: &'static str,
    pub condensed: bool,
    pub rows: Vec<TaskRow>,
    pub notice: Option<String>,
    pub failed: bool,
    pub pager: Option<Pager>,
    /// Query string that reproduces this table, carried by delete forms.
    pub state: String,
}

pub fn table_href(status: StatusFilter, search: &str, page: u32) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if let Some(s) = status.as_param() {
        query.append_pair("status", s);
    }
    if !search.trim().is_empty() {
        query.append_pair("q", search.trim());
    }
    if page > 1 {
        query.append_pair("page", &page.to_string());
    }
    let query = query.finish();
    if query.is_empty() {
        "/tasks".to_string()
    } else {
        format!("/tasks?{query}")
    }
}

impl TableView {
    pub fn from_table<B: Backend>(id: &'static str, table: &TaskTable<B>) -> Self {
        let snap = table.snapshot();
        let rows: Vec<TaskRow> = table.rows().iter().map(TaskRow::new).collect();
        let notice = match (&snap.error, &snap.data) {
            (Some(err), _) => Some(format!("Failed to load: {}", err.message())),
            (None, None) => Some("Loading…".to_string()),
            (None, Some(_)) if rows.is_empty() => Some("No matching tasks.".to_string()),
            _ => None,
        };
        let href = |page| table_href(table.status_filter(), table.debounced_search(), page);
        let pager = matches!(table.mode(), TableMode::Paginated { .. }).then(|| Pager {
            page: table.page(),
            prev_href: table.has_prev().then(|| href(table.page() - 1)),
            next_href: table.has_next().then(|| href(table.page() + 1)),
        });
        let state = href(table.page())
            .split_once('?')
            .map(|(_, q)| q.to_string())
            .unwrap_or_default();
        TableView {
            id,
            condensed: !table.mode().is_paginated(),
            failed: snap.error.is_some(),
            rows,
            notice,
            pager,
            state,
        }
    }
}

pub struct FilterView {
    pub q: String,
    pub options: Vec<SelectOption>,
}

impl FilterView {
    pub fn new(status: StatusFilter, q: &str) -> Self {
        let selected = match status {
            StatusFilter::All => None,
            StatusFilter::Only(s) => Some(s),
        };
        FilterView {
            q: q.to_string(),
            options: status_options(selected),
        }
    }
}

pub struct TaskFormView {
    pub action: String,
    pub submit_label: &'static str,
    pub fields: TaskFields,
    pub options: Vec<SelectOption>,
    pub previous_status: String,
    pub time_zone: String,
    pub title_error: Option<String>,
    pub submit_error: Option<String>,
    pub submitting: bool,
}

impl TaskFormView {
    pub fn new(form: &TaskForm, action: String, previous: Option<Status>) -> Self {
        let fields = form.fields().clone();
        TaskFormView {
            action,
            submit_label: if previous.is_some() { "Save changes" } else { "Create task" },
            options: status_options(Some(fields.status)),
            previous_status: previous.map(|s| s.as_str().to_string()).unwrap_or_default(),
            time_zone: form.tz().name().to_string(),
            title_error: form.title_error().map(String::from),
            submit_error: form.submit_error().map(String::from),
            submitting: form.is_submitting(),
            fields,
        }
    }
}

pub struct LogRow {
    pub at: String,
    pub event: String,
    pub detail: String,
}

pub struct LogsView {
    pub loading: bool,
    pub error: Option<String>,
    pub rows: Vec<LogRow>,
}

impl LogsView {
    pub fn from_snapshot(snap: &Snapshot<Vec<TaskLog>>, tz: Tz) -> Self {
        let rows = snap
            .data
            .iter()
            .flatten()
            .map(|l| LogRow {
                at: format_date_time(Some(l.created_at), tz),
                event: l.event.clone(),
                detail: l.detail.clone().unwrap_or_else(|| "-".into()),
            })
            .collect();
        LogsView {
            loading: snap.data.is_none() && snap.error.is_none(),
            error: snap.error.as_ref().map(ApiError::message).map(String::from),
            rows,
        }
    }
}

pub struct LogFormView {
    pub action: String,
    pub event: String,
    pub detail: String,
    pub event_error: Option<String>,
    pub submit_error: Option<String>,
    pub submitting: bool,
}

impl LogFormView {
    pub fn new(form: &LogForm, action: String) -> Self {
        LogFormView {
            action,
            event: form.fields().event.clone(),
            detail: form.fields().detail.clone(),
            event_error: form.event_error().map(String::from),
            submit_error: form.submit_error().map(String::from),
            submitting: form.is_submitting(),
        }
    }
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage {
    pub nav: Nav,
    pub next: String,
    pub email: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardPage {
    pub nav: Nav,
    pub stats: StatsView,
    pub wip: WipPanel,
    pub table: TableView,
}

#[derive(Template)]
#[template(path = "tasks.html")]
pub struct TasksPage {
    pub nav: Nav,
    pub form: TaskFormView,
    pub filter: FilterView,
    pub table: TableView,
}

/// Table body swapped in by htmx when filters or pages change.
#[derive(Template)]
#[template(path = "partials/task_table.html")]
pub struct TaskTablePartial {
    pub table: TableView,
}

#[derive(Template)]
#[template(path = "task_detail.html")]
pub struct TaskDetailPage {
    pub nav: Nav,
    pub id: String,
    pub title: String,
    pub badge: Badge,
    pub created: String,
    pub completed: String,
    pub form: TaskFormView,
    pub logs: LogsView,
    pub log_form: LogFormView,
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundPage {
    pub nav: Nav,
    pub message: String,
}
