//! Create/edit form state for tasks and the log-append form.
//!
//! Forms never talk to the API themselves. `submit` validates, normalizes and
//! hands the payload to a caller-supplied handler, so the same form serves
//! create and update.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::client::ApiError;
use crate::datetime::{editable_to_utc, to_editable};
use crate::models::{LogPayload, Status, Task, TaskPayload};

pub const TITLE_REQUIRED: &str = "Title is required.";
pub const EVENT_REQUIRED: &str = "Event is required.";

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitError {
    /// Field-level validation failed; no request was made.
    Invalid(String),
    /// Another submission from this form is still outstanding.
    Busy,
    Api(ApiError),
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::Invalid(msg) => write!(f, "{msg}"),
            SubmitError::Busy => write!(f, "a submission is already in progress"),
            SubmitError::Api(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SubmitError {}

/// Shared "submission outstanding" flag. Clones observe the same state, so a
/// view can disable its submit control while the owning form is busy.
#[derive(Debug, Clone, Default)]
pub struct InFlight(Arc<AtomicBool>);

impl InFlight {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Claim the flag; `None` when a submission already holds it.
    pub fn try_begin(&self) -> Option<InFlightGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(self.0.clone()))
    }
}

/// Releases the flag on drop, including when the submit future is cancelled.
#[derive(Debug)]
pub struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Raw field values as typed (or posted by the browser).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TaskFields {
    pub title: String,
    pub description: String,
    pub assignee: String,
    pub status: Status,
    pub start_date: String,
    pub due_date: String,
    pub completed_at: String,
}

#[derive(Debug, Clone)]
pub struct TaskForm {
    fields: TaskFields,
    tz: Tz,
    title_error: Option<String>,
    submit_error: Option<String>,
    in_flight: InFlight,
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl TaskForm {
    pub fn create(tz: Tz) -> Self {
        TaskForm {
            fields: TaskFields::default(),
            tz,
            title_error: None,
            submit_error: None,
            in_flight: InFlight::default(),
        }
    }

    /// Edit mode: fields start from `task`, with `completed_at` rendered in
    /// the reference zone so an untouched value converts back unchanged.
    pub fn edit(task: &Task, tz: Tz) -> Self {
        let mut form = TaskForm::create(tz);
        form.fields = TaskFields {
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            assignee: task.assignee.clone().unwrap_or_default(),
            status: task.status,
            start_date: task.start_date.map(|d| d.to_string()).unwrap_or_default(),
            due_date: task.due_date.map(|d| d.to_string()).unwrap_or_default(),
            completed_at: task
                .completed_at
                .map(|at| to_editable(at, tz))
                .unwrap_or_default(),
        };
        form
    }

    /// Rebuild a form from a browser post. `previous` is the status the form
    /// was rendered with (`None` when creating); a status change applies the
    /// same completion rule as [`TaskForm::set_status_at`], keeping a
    /// completion time the browser already filled in.
    pub fn from_posted(posted: TaskFields, previous: Option<Status>, tz: Tz, now: DateTime<Utc>) -> Self {
        let mut form = TaskForm::create(tz);
        form.fields = posted;
        let status = form.fields.status;
        if status != Status::Completed {
            form.fields.completed_at.clear();
        } else if previous != Some(status) && form.fields.completed_at.trim().is_empty() {
            form.fields.completed_at = to_editable(now, tz);
        }
        form
    }

    pub fn fields(&self) -> &TaskFields {
        &self.fields
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn set_title(&mut self, title: &str) {
        self.fields.title = title.to_string();
        if self.title_error.is_some() && !title.trim().is_empty() {
            self.title_error = None;
        }
    }

    pub fn set_description(&mut self, description: &str) {
        self.fields.description = description.to_string();
    }

    pub fn set_assignee(&mut self, assignee: &str) {
        self.fields.assignee = assignee.to_string();
    }

    pub fn set_start_date(&mut self, date: &str) {
        self.fields.start_date = date.to_string();
    }

    pub fn set_due_date(&mut self, date: &str) {
        self.fields.due_date = date.to_string();
    }

    pub fn set_completed_at(&mut self, value: &str) {
        self.fields.completed_at = value.to_string();
    }

    pub fn set_status(&mut self, status: Status) {
        self.set_status_at(status, Utc::now());
    }

    /// Entering COMPLETED stamps `completed_at` with `now` in the reference
    /// zone; any other status clears it.
    pub fn set_status_at(&mut self, status: Status, now: DateTime<Utc>) {
        self.fields.status = status;
        self.fields.completed_at = if status == Status::Completed {
            to_editable(now, self.tz)
        } else {
            String::new()
        };
    }

    pub fn title_error(&self) -> Option<&str> {
        self.title_error.as_deref()
    }

    /// Message from the last failed submission, shown above the form.
    pub fn submit_error(&self) -> Option<&str> {
        self.submit_error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.is_set()
    }

    pub fn in_flight(&self) -> InFlight {
        self.in_flight.clone()
    }

    pub fn validate(&mut self) -> bool {
        self.title_error = self
            .fields
            .title
            .trim()
            .is_empty()
            .then(|| TITLE_REQUIRED.to_string());
        self.title_error.is_none()
    }

    pub fn normalize(&self) -> TaskPayload {
        let f = &self.fields;
        let completed_at = if f.status == Status::Completed {
            editable_to_utc(&f.completed_at, self.tz)
        } else {
            None
        };
        TaskPayload {
            title: f.title.trim().to_string(),
            description: optional(&f.description),
            assignee: optional(&f.assignee),
            status: f.status,
            start_date: optional(&f.start_date),
            due_date: optional(&f.due_date),
            completed_at,
        }
    }

    /// Validate, then pass the normalized payload to `handler`. Auth failures
    /// are not kept as an inline error: the client has already redirected.
    pub async fn submit<T, F, Fut>(&mut self, handler: F) -> Result<T, SubmitError>
    where
        F: FnOnce(TaskPayload) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if !self.validate() {
            return Err(SubmitError::Invalid(TITLE_REQUIRED.to_string()));
        }
        let _guard = self.in_flight.try_begin().ok_or(SubmitError::Busy)?;
        self.submit_error = None;
        match handler(self.normalize()).await {
            Ok(value) => Ok(value),
            Err(err) => {
                if !err.is_auth() {
                    self.submit_error = Some(err.message().to_string());
                }
                Err(SubmitError::Api(err))
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogFields {
    pub event: String,
    pub detail: String,
}

#[derive(Debug, Clone, Default)]
pub struct LogForm {
    fields: LogFields,
    event_error: Option<String>,
    submit_error: Option<String>,
    in_flight: InFlight,
}

impl LogForm {
    pub fn new() -> Self {
        LogForm::default()
    }

    pub fn from_posted(fields: LogFields) -> Self {
        LogForm {
            fields,
            ..LogForm::default()
        }
    }

    pub fn fields(&self) -> &LogFields {
        &self.fields
    }

    pub fn set_event(&mut self, event: &str) {
        self.fields.event = event.to_string();
    }

    pub fn set_detail(&mut self, detail: &str) {
        self.fields.detail = detail.to_string();
    }

    pub fn event_error(&self) -> Option<&str> {
        self.event_error.as_deref()
    }

    pub fn submit_error(&self) -> Option<&str> {
        self.submit_error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.is_set()
    }

    pub fn in_flight(&self) -> InFlight {
        self.in_flight.clone()
    }

    pub fn normalize(&self) -> LogPayload {
        LogPayload {
            event: self.fields.event.trim().to_string(),
            detail: optional(&self.fields.detail),
        }
    }

    /// On success the fields are cleared for the next entry.
    pub async fn submit<T, F, Fut>(&mut self, handler: F) -> Result<T, SubmitError>
    where
        F: FnOnce(LogPayload) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if self.fields.event.trim().is_empty() {
            self.event_error = Some(EVENT_REQUIRED.to_string());
            return Err(SubmitError::Invalid(EVENT_REQUIRED.to_string()));
        }
        self.event_error = None;
        let _guard = self.in_flight.try_begin().ok_or(SubmitError::Busy)?;
        self.submit_error = None;
        match handler(self.normalize()).await {
            Ok(value) => {
                self.fields = LogFields::default();
                Ok(value)
            }
            Err(err) => {
                if !err.is_auth() {
                    self.submit_error = Some(err.message().to_string());
                }
                Err(SubmitError::Api(err))
            }
        }
    }
}
