use colored::Colorize;
use serde_json::json;

use tasktrack::config::AppConfig;
use tasktrack::datetime::{format_date, format_date_time, format_relative_due_date};

use super::{api_error, connect, format_status, print_json};

pub async fn run(config: &AppConfig, id: &str, json: bool) -> Result<(), String> {
    let store = connect(config);
    let task = store.task(id).await;
    let task = match (task.data, task.error) {
        (_, Some(err)) if err.status() == Some(404) => return Err(format!("task not found: {id}")),
        (_, Some(err)) => return Err(api_error(err)),
        (Some(t), None) => t,
        (None, None) => return Err(format!("task not found: {id}")),
    };
    let logs = store.logs(id).await;
    if let Some(err) = logs.error {
        return Err(api_error(err));
    }
    let logs = logs.data.unwrap_or_default();

    if json {
        return print_json(&json!({ "task": task, "logs": logs }));
    }

    let tz = config.time_zone;
    println!("ID:          {}", task.id);
    println!("Title:       {}", task.title);
    println!("Status:      {}", format_status(task.status));
    if let Some(ref desc) = task.description {
        println!("Description: {desc}");
    }
    if let Some(ref assignee) = task.assignee {
        println!("Assignee:    {assignee}");
    }
    println!("Start:       {}", format_date(task.start_date));
    println!("Due:         {}", format_relative_due_date(task.due_date));
    println!("Created:     {}", format_date_time(Some(task.created_at), tz));
    if task.completed_at.is_some() {
        println!("Completed:   {}", format_date_time(task.completed_at, tz));
    }

    println!("\n{}", "Activity:".bold());
    if logs.is_empty() {
        println!("  No activity yet.");
    }
    for log in &logs {
        match log.detail {
            Some(ref detail) => println!(
                "  [{}] {}: {detail}",
                format_date_time(Some(log.created_at), tz),
                log.event
            ),
            None => println!(
                "  [{}] {}",
                format_date_time(Some(log.created_at), tz),
                log.event
            ),
        }
    }
    Ok(())
}
