use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Every status, in workflow order.
pub const ALL_STATUSES: [Status; 3] = [Status::NotStarted, Status::InProgress, Status::Completed];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    #[serde(alias = "BELUM_DIMULAI")]
    NotStarted,
    #[serde(alias = "SEDANG_DIKERJAKAN")]
    InProgress,
    #[serde(alias = "SELESAI")]
    Completed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::NotStarted => "NOT_STARTED",
            Status::InProgress => "IN_PROGRESS",
            Status::Completed => "COMPLETED",
        }
    }

    /// Human label used by badges and select options.
    pub fn label(&self) -> &'static str {
        match self {
            Status::NotStarted => "Not started",
            Status::InProgress => "In progress",
            Status::Completed => "Completed",
        }
    }

    /// CSS modifier for the status badge.
    pub fn tone(&self) -> &'static str {
        match self {
            Status::NotStarted => "slate",
            Status::InProgress => "amber",
            Status::Completed => "emerald",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "NOT_STARTED" | "NOTSTARTED" | "TODO" | "BELUM_DIMULAI" => Ok(Status::NotStarted),
            "IN_PROGRESS" | "INPROGRESS" | "WIP" | "SEDANG_DIKERJAKAN" => Ok(Status::InProgress),
            "COMPLETED" | "DONE" | "SELESAI" => Ok(Status::Completed),
            _ => Err(format!(
                "unknown status: {s}. valid statuses: not_started, in_progress, completed"
            )),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskLog {
    pub id: String,
    pub task_id: String,
    pub event: String,
    #[serde(default)]
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WipRow {
    pub assignee: String,
    pub count: u64,
}

/// Server-side aggregate; never recomputed from a local task list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub by_status: StatusCounts,
    #[serde(default)]
    pub overdue: u64,
    #[serde(default)]
    pub due_soon: u64,
    #[serde(default, alias = "top_assignees")]
    pub wip_by_assignee: Vec<WipRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct StatusCounts {
    #[serde(default, alias = "BELUM_DIMULAI")]
    pub not_started: u64,
    #[serde(default, alias = "SEDANG_DIKERJAKAN")]
    pub in_progress: u64,
    #[serde(default, alias = "SELESAI")]
    pub completed: u64,
}

impl StatusCounts {
    pub fn get(&self, status: Status) -> u64 {
        match status {
            Status::NotStarted => self.not_started,
            Status::InProgress => self.in_progress,
            Status::Completed => self.completed,
        }
    }
}

/// Outgoing create/update body. `id`, `created_at` and `created_by` are
/// server-owned and have no field here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskPayload {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogPayload {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
}

/// Reduce the list endpoint's response to one canonical shape.
///
/// The backend answers with a bare array or an envelope carrying `items` or
/// `data`. Anything else is rejected instead of being read as an empty page.
pub fn tasks_from_response(value: Value) -> Result<Vec<Task>, String> {
    let array = match value {
        Value::Array(_) => value,
        Value::Object(mut obj) => match (obj.remove("items"), obj.remove("data")) {
            (Some(items @ Value::Array(_)), _) => items,
            (_, Some(data @ Value::Array(_))) => data,
            _ => return Err("task list response has no items array".to_string()),
        },
        other => return Err(format!("unexpected task list response: {other}")),
    };
    serde_json::from_value(array).map_err(|e| format!("invalid task in list: {e}"))
}
