use std::io::{self, BufRead, Write};

use tasktrack::config::AppConfig;
use tasktrack::table::{TableMode, TaskTable};

use super::{api_error, connect};

pub async fn run(config: &AppConfig, id: &str, yes: bool) -> Result<(), String> {
    let mut table = TaskTable::new(connect(config), TableMode::paginated(config.page_size));
    let deleted = table
        .delete(id, |prompt| yes || confirm(prompt))
        .await
        .map_err(api_error)?;

    if deleted {
        println!("Deleted task {id}");
    } else {
        println!("Cancelled.");
    }
    Ok(())
}

fn confirm(prompt: &str) -> bool {
    eprint!("{prompt} [y/N] ");
    if io::stderr().flush().is_err() {
        return false;
    }
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(_) => matches!(line.trim().to_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}
