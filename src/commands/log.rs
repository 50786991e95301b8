use tasktrack::config::AppConfig;
use tasktrack::form::LogForm;

use super::{connect, print_json, submit_error};

pub async fn run(
    config: &AppConfig,
    id: &str,
    event: &str,
    detail: Option<&str>,
    json: bool,
) -> Result<(), String> {
    let mut form = LogForm::new();
    form.set_event(event);
    if let Some(detail) = detail {
        form.set_detail(detail);
    }

    let store = connect(config);
    let log = form
        .submit(|payload| async move { store.append_log(id, &payload).await })
        .await
        .map_err(submit_error)?;

    if json {
        return print_json(&log);
    }
    println!("Logged \"{}\" on task {id}", log.event);
    Ok(())
}
