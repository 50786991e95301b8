use tasktrack::config::AppConfig;
use tasktrack::form::TaskForm;

use super::create::TaskArgs;
use super::{api_error, connect, format_status, print_json, submit_error};

pub async fn run(config: &AppConfig, id: &str, args: &TaskArgs<'_>, json: bool) -> Result<(), String> {
    let store = connect(config);
    let current = store.task(id).await;
    let current = match (current.data, current.error) {
        (_, Some(err)) if err.status() == Some(404) => return Err(format!("task not found: {id}")),
        (_, Some(err)) => return Err(api_error(err)),
        (Some(t), None) => t,
        (None, None) => return Err(format!("task not found: {id}")),
    };

    let mut form = TaskForm::edit(&current, config.time_zone);
    args.apply(&mut form)?;

    let task = form
        .submit(|payload| {
            let store = store.clone();
            async move { store.update_task(id, &payload).await }
        })
        .await
        .map_err(submit_error)?;

    if json {
        return print_json(&task);
    }
    println!("Updated task {}: {} [{}]", task.id, task.title, format_status(task.status));
    Ok(())
}
