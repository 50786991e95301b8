pub mod create;
pub mod delete;
pub mod list;
pub mod log;
pub mod login;
pub mod logout;
pub mod show;
pub mod summary;
pub mod update;

use std::sync::Arc;

use colored::Colorize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use tasktrack::auth::FileTokenStore;
use tasktrack::client::{ApiClient, ApiError, Headless};
use tasktrack::config::AppConfig;
use tasktrack::datetime::{format_date, format_relative_due_date};
use tasktrack::form::SubmitError;
use tasktrack::models::{Status, Task};
use tasktrack::store::ResourceStore;

/// A cache over the task API, signed in with the saved session file.
pub fn connect(config: &AppConfig) -> Arc<ResourceStore<ApiClient>> {
    let client = ApiClient::new(
        reqwest::Client::new(),
        &config.api_base_url,
        Arc::new(FileTokenStore::new(&config.session_file)),
        Arc::new(Headless),
    );
    ResourceStore::new(Arc::new(client))
}

/// Format a status as a colored label.
pub fn format_status(s: Status) -> String {
    match s {
        Status::NotStarted => s.label().bright_black().to_string(),
        Status::InProgress => s.label().yellow().to_string(),
        Status::Completed => s.label().green().to_string(),
    }
}

/// Turn an API failure into the message `main` prints.
pub fn api_error(err: ApiError) -> String {
    if err.is_auth() {
        format!("{err} (run `ttt login` to sign in)")
    } else {
        err.to_string()
    }
}

pub fn submit_error(err: SubmitError) -> String {
    match err {
        SubmitError::Api(e) => api_error(e),
        other => other.to_string(),
    }
}

pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), String> {
    let j = serde_json::to_string_pretty(value).map_err(|e| format!("json error: {e}"))?;
    println!("{j}");
    Ok(())
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "TITLE")]
    title: String,
    #[tabled(rename = "STATUS")]
    status: &'static str,
    #[tabled(rename = "ASSIGNEE")]
    assignee: String,
    #[tabled(rename = "START")]
    start: String,
    #[tabled(rename = "DUE")]
    due: String,
}

impl From<&Task> for TaskRow {
    fn from(t: &Task) -> Self {
        let title = if t.title.chars().count() > 48 {
            format!("{}...", t.title.chars().take(45).collect::<String>())
        } else {
            t.title.clone()
        };
        TaskRow {
            id: t.id.clone(),
            title,
            status: t.status.label(),
            assignee: t.assignee.clone().unwrap_or_else(|| "-".to_string()),
            start: format_date(t.start_date),
            due: format_relative_due_date(t.due_date),
        }
    }
}

/// Print a list of tasks as a table or JSON.
pub fn print_tasks(tasks: &[Task], json: bool) -> Result<(), String> {
    if json {
        return print_json(tasks);
    }

    if tasks.is_empty() {
        println!("No matching tasks.");
        return Ok(());
    }

    let mut table = Table::new(tasks.iter().map(TaskRow::from));
    table.with(Style::psql());
    println!("{table}");
    Ok(())
}
