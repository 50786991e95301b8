use tasktrack::config::AppConfig;
use tasktrack::form::TaskForm;
use tasktrack::models::Status;

use super::{connect, print_json, submit_error};

/// Optional fields shared by `create` and `update`.
#[derive(Debug, Default)]
pub struct TaskArgs<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub assignee: Option<&'a str>,
    pub status: Option<&'a str>,
    pub start: Option<&'a str>,
    pub due: Option<&'a str>,
    pub completed_at: Option<&'a str>,
}

impl TaskArgs<'_> {
    /// Apply the given values on top of `form`. A status change runs the
    /// completion stamp rule before an explicit `--completed-at` overrides it.
    pub fn apply(&self, form: &mut TaskForm) -> Result<(), String> {
        if let Some(title) = self.title {
            form.set_title(title);
        }
        if let Some(desc) = self.description {
            form.set_description(desc);
        }
        if let Some(assignee) = self.assignee {
            form.set_assignee(assignee);
        }
        if let Some(start) = self.start {
            form.set_start_date(start);
        }
        if let Some(due) = self.due {
            form.set_due_date(due);
        }
        if let Some(status) = self.status {
            let status = Status::from_str(status)?;
            if status != form.fields().status {
                form.set_status(status);
            }
        }
        if let Some(at) = self.completed_at {
            form.set_completed_at(at);
        }
        Ok(())
    }
}

pub async fn run(config: &AppConfig, args: &TaskArgs<'_>, json: bool) -> Result<(), String> {
    let mut form = TaskForm::create(config.time_zone);
    args.apply(&mut form)?;

    let store = connect(config);
    let task = form
        .submit(|payload| async move { store.create_task(&payload).await })
        .await
        .map_err(submit_error)?;

    if json {
        return print_json(&task);
    }
    println!("Created task {}: {}", task.id, task.title);
    Ok(())
}
