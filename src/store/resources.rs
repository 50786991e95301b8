use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{ResourceState, ResourceStore};
use crate::client::{ApiError, Backend};
use crate::models::{DashboardSummary, LogPayload, Task, TaskLog, TaskPayload, tasks_from_response};

/// Every task-scoped key (list, detail, logs) starts with this.
pub const TASKS_PREFIX: &str = "/tasks";
pub const SUMMARY_KEY: &str = "/dashboard/summary";

pub fn task_key(id: &str) -> String {
    format!("{TASKS_PREFIX}/{id}")
}

pub fn logs_key(id: &str) -> String {
    format!("{TASKS_PREFIX}/{id}/logs")
}

/// Keys a task create/update/delete makes stale: every `/tasks` key plus the
/// dashboard summary.
pub fn task_scoped(key: &str) -> bool {
    key.starts_with(TASKS_PREFIX) || key == SUMMARY_KEY
}

/// Typed view of one cached resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub data: Option<T>,
    pub error: Option<ApiError>,
    pub is_loading: bool,
}

impl<T> Snapshot<T> {
    pub fn from_state<F>(state: ResourceState, decode: F) -> Self
    where
        F: FnOnce(Value) -> Result<T, String>,
    {
        let ResourceState {
            data,
            mut error,
            is_loading,
        } = state;
        let data = match data.map(decode) {
            Some(Ok(v)) => Some(v),
            Some(Err(e)) => {
                error.get_or_insert(ApiError::Decode(e));
                None
            }
            None => None,
        };
        Snapshot {
            data,
            error,
            is_loading,
        }
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, String> {
    serde_json::from_value(value).map_err(|e| e.to_string())
}

fn decode_reply<T: DeserializeOwned>(path: &str, value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(format!("{path}: {e}")))
}

fn to_body<T: serde::Serialize>(payload: &T) -> Result<Value, ApiError> {
    serde_json::to_value(payload).map_err(|e| ApiError::Decode(e.to_string()))
}

impl<B: Backend> ResourceStore<B> {
    pub async fn tasks(&self, key: &str) -> Snapshot<Vec<Task>> {
        Snapshot::from_state(self.load(key).await, tasks_from_response)
    }

    pub async fn task(&self, id: &str) -> Snapshot<Task> {
        Snapshot::from_state(self.load(&task_key(id)).await, decode)
    }

    pub async fn logs(&self, id: &str) -> Snapshot<Vec<TaskLog>> {
        Snapshot::from_state(self.load(&logs_key(id)).await, decode)
    }

    pub async fn summary(&self) -> Snapshot<DashboardSummary> {
        Snapshot::from_state(self.load(SUMMARY_KEY).await, decode)
    }

    pub async fn create_task(self: &Arc<Self>, payload: &TaskPayload) -> Result<Task, ApiError> {
        let body = to_body(payload)?;
        let reply = self
            .mutate(Method::POST, TASKS_PREFIX, Some(body), task_scoped)
            .await?;
        decode_reply(TASKS_PREFIX, reply)
    }

    pub async fn update_task(
        self: &Arc<Self>,
        id: &str,
        payload: &TaskPayload,
    ) -> Result<Task, ApiError> {
        let path = task_key(id);
        let body = to_body(payload)?;
        let reply = self
            .mutate(Method::PATCH, &path, Some(body), task_scoped)
            .await?;
        decode_reply(&path, reply)
    }

    pub async fn delete_task(self: &Arc<Self>, id: &str) -> Result<(), ApiError> {
        self.mutate(Method::DELETE, &task_key(id), None, task_scoped)
            .await
            .map(|_| ())
    }

    /// Logs are append-only; only the owning task's log key goes stale.
    pub async fn append_log(
        self: &Arc<Self>,
        id: &str,
        payload: &LogPayload,
    ) -> Result<TaskLog, ApiError> {
        let path = logs_key(id);
        let body = to_body(payload)?;
        let reply = self
            .mutate(Method::POST, &path, Some(body), |k: &str| k == path)
            .await?;
        decode_reply(&path, reply)
    }
}
