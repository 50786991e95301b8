use colored::Colorize;

use tasktrack::config::AppConfig;
use tasktrack::table::{StatusFilter, TableMode, TableQuery, TaskTable};

use super::{api_error, connect, print_tasks};

pub async fn run(
    config: &AppConfig,
    status: Option<&str>,
    search: Option<&str>,
    page: u32,
    limit: Option<u32>,
    json: bool,
) -> Result<(), String> {
    let query = TableQuery {
        status: StatusFilter::parse(status.unwrap_or(""))?,
        search: search.unwrap_or("").trim().to_string(),
        page: page.max(1),
    };
    let mode = match limit {
        Some(n) => TableMode::capped(n),
        None => TableMode::paginated(config.page_size),
    };

    let mut table = TaskTable::with_query(connect(config), mode, query);
    let snapshot = table.load().await;
    if let Some(err) = snapshot.error.clone() {
        return Err(api_error(err));
    }
    print_tasks(table.rows(), json)?;

    if !json && table.mode().is_paginated() {
        let mut footer = format!("page {}", table.page());
        if table.has_prev() {
            footer.push_str(&format!(" | --page {} for previous", table.page() - 1));
        }
        if table.has_next() {
            footer.push_str(&format!(" | --page {} for more", table.page() + 1));
        }
        println!("{}", footer.bright_black());
    }
    Ok(())
}
