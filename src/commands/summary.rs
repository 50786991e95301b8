use colored::Colorize;

use tasktrack::config::AppConfig;
use tasktrack::models::Status;
use tasktrack::table::{TableMode, TaskTable};

use super::{api_error, connect, print_json, print_tasks};

/// Counts, WIP per assignee and the most recent tasks, like the dashboard.
pub async fn run(config: &AppConfig, json: bool) -> Result<(), String> {
    let store = connect(config);
    let summary = store.summary().await;
    if let Some(err) = summary.error {
        return Err(api_error(err));
    }
    let summary = summary.data.unwrap_or_default();

    let mut recent = TaskTable::new(store.clone(), TableMode::capped(config.preview_limit));
    if let Some(err) = recent.load().await.error.clone() {
        return Err(api_error(err));
    }

    if json {
        return print_json(&summary);
    }

    println!("{}", "Tasks".bold());
    println!("  Total:       {}", summary.total);
    for status in [Status::InProgress, Status::Completed] {
        println!(
            "  {:<12} {}",
            format!("{}:", status.label()),
            summary.by_status.get(status)
        );
    }
    if summary.overdue > 0 || summary.due_soon > 0 {
        println!("  Overdue:     {}", summary.overdue.to_string().red());
        println!("  Due soon:    {}", summary.due_soon);
    }

    println!("\n{}", "Work in progress".bold());
    if summary.wip_by_assignee.is_empty() {
        println!("  No work in progress recorded yet.");
    }
    for row in &summary.wip_by_assignee {
        println!("  {:<24} {}", row.assignee, row.count);
    }

    println!("\n{}", "Recent tasks".bold());
    print_tasks(recent.rows(), false)
}
