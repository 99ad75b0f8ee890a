//! Reminder management tools.
//!
//! Thin wrappers over the [`Scheduler`]: the model can create, list, remove,
//! and pause recurring reminders. Scheduler failures come back as text so the
//! model can correct itself (bad cron expression, unknown name) within the
//! same turn.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use schemars::JsonSchema;
use serde::Deserialize;

use valet_types::cron::NewCronJob;

use crate::scheduler::Scheduler;

use super::{parse_args, Tool, ToolContext, ToolError};

/// The four reminder tools sharing one scheduler handle.
pub fn reminder_tools(scheduler: Arc<Scheduler>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(SetReminderTool {
            scheduler: Arc::clone(&scheduler),
        }),
        Arc::new(ListRemindersTool {
            scheduler: Arc::clone(&scheduler),
        }),
        Arc::new(RemoveReminderTool {
            scheduler: Arc::clone(&scheduler),
        }),
        Arc::new(ToggleReminderTool { scheduler }),
    ]
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SetReminderArgs {
    /// A short unique name for this reminder, e.g. "morning-greeting".
    name: String,
    /// Cron expression for the schedule, e.g. "0 9 * * *" for daily at 9am.
    cron: String,
    /// The message delivered when the reminder fires.
    message: String,
}

pub struct SetReminderTool {
    scheduler: Arc<Scheduler>,
}

impl Tool for SetReminderTool {
    fn name(&self) -> &str {
        "set_reminder"
    }

    fn description(&self) -> &str {
        "Set a recurring reminder or scheduled task. The message will be sent \
         to you at the specified schedule so you can act on it. Use standard \
         cron expressions (e.g. \"0 9 * * *\" for daily at 9am)."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(SetReminderArgs)).unwrap_or_default()
    }

    fn execute<'a>(
        &'a self,
        arguments: serde_json::Value,
        ctx: &'a ToolContext,
    ) -> BoxFuture<'a, Result<String, ToolError>> {
        Box::pin(async move {
            let args: SetReminderArgs = parse_args(arguments)?;
            match self
                .scheduler
                .add_job(NewCronJob {
                    name: args.name,
                    schedule: args.cron,
                    message: args.message.clone(),
                    profile: ctx.profile.clone(),
                })
                .await
            {
                Ok(job) => Ok(format!(
                    "Reminder \"{}\" created! Schedule: {}. I'll receive the message \
                     \"{}\" on that schedule.",
                    job.name, job.schedule, args.message
                )),
                Err(e) => Ok(format!("Failed to create reminder: {e}")),
            }
        })
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ListRemindersArgs {}

pub struct ListRemindersTool {
    scheduler: Arc<Scheduler>,
}

impl Tool for ListRemindersTool {
    fn name(&self) -> &str {
        "list_reminders"
    }

    fn description(&self) -> &str {
        "List all scheduled reminders and recurring tasks."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(ListRemindersArgs)).unwrap_or_default()
    }

    fn execute<'a>(
        &'a self,
        _arguments: serde_json::Value,
        _ctx: &'a ToolContext,
    ) -> BoxFuture<'a, Result<String, ToolError>> {
        Box::pin(async move {
            let jobs = match self.scheduler.list_jobs().await {
                Ok(jobs) => jobs,
                Err(e) => return Ok(format!("Failed to list reminders: {e}")),
            };
            if jobs.is_empty() {
                return Ok("No reminders set.".to_string());
            }
            Ok(jobs
                .iter()
                .map(|j| {
                    let status = if j.enabled { "active" } else { "paused" };
                    let last = j
                        .last_run
                        .map(|t| format!(" (last ran: {})", t.format("%Y-%m-%d %H:%M")))
                        .unwrap_or_default();
                    format!(
                        "\u{2022} {} [{}] \u{2014} {} \u{2014} \"{}\"{}",
                        j.name, status, j.schedule, j.message, last
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"))
        })
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct RemoveReminderArgs {
    /// The name of the reminder to remove.
    name: String,
}

pub struct RemoveReminderTool {
    scheduler: Arc<Scheduler>,
}

impl Tool for RemoveReminderTool {
    fn name(&self) -> &str {
        "remove_reminder"
    }

    fn description(&self) -> &str {
        "Remove a scheduled reminder by name."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(RemoveReminderArgs)).unwrap_or_default()
    }

    fn execute<'a>(
        &'a self,
        arguments: serde_json::Value,
        _ctx: &'a ToolContext,
    ) -> BoxFuture<'a, Result<String, ToolError>> {
        Box::pin(async move {
            let args: RemoveReminderArgs = parse_args(arguments)?;
            match self.scheduler.remove_job(&args.name).await {
                Ok(()) => Ok(format!("Reminder \"{}\" removed.", args.name)),
                Err(e) => Ok(format!("Failed to remove reminder: {e}")),
            }
        })
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ToggleReminderArgs {
    /// The name of the reminder.
    name: String,
    /// Whether to enable (true) or disable (false) the reminder.
    enabled: bool,
}

pub struct ToggleReminderTool {
    scheduler: Arc<Scheduler>,
}

impl Tool for ToggleReminderTool {
    fn name(&self) -> &str {
        "toggle_reminder"
    }

    fn description(&self) -> &str {
        "Enable or disable a scheduled reminder by name."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(ToggleReminderArgs)).unwrap_or_default()
    }

    fn execute<'a>(
        &'a self,
        arguments: serde_json::Value,
        _ctx: &'a ToolContext,
    ) -> BoxFuture<'a, Result<String, ToolError>> {
        Box::pin(async move {
            let args: ToggleReminderArgs = parse_args(arguments)?;
            match self.scheduler.toggle_job(&args.name, args.enabled).await {
                Ok(()) => Ok(format!(
                    "Reminder \"{}\" is now {}.",
                    args.name,
                    if args.enabled { "enabled" } else { "disabled" }
                )),
                Err(e) => Ok(format!("Failed to toggle reminder: {e}")),
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::CronJobRepository;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;
    use uuid::Uuid;
    use valet_types::cron::CronJob;
    use valet_types::error::RepositoryError;

    #[derive(Default)]
    struct MemCronRepo {
        jobs: Mutex<Vec<CronJob>>,
    }

    impl CronJobRepository for MemCronRepo {
        fn insert(&self, job: &CronJob) -> BoxFuture<'_, Result<(), RepositoryError>> {
            let job = job.clone();
            Box::pin(async move {
                let mut jobs = self.jobs.lock().unwrap();
                if jobs.iter().any(|j| j.name == job.name) {
                    return Err(RepositoryError::Conflict(job.name.clone()));
                }
                jobs.push(job);
                Ok(())
            })
        }

        fn delete(&self, name: &str) -> BoxFuture<'_, Result<bool, RepositoryError>> {
            let name = name.to_string();
            Box::pin(async move {
                let mut jobs = self.jobs.lock().unwrap();
                let before = jobs.len();
                jobs.retain(|j| j.name != name);
                Ok(jobs.len() < before)
            })
        }

        fn get(&self, name: &str) -> BoxFuture<'_, Result<Option<CronJob>, RepositoryError>> {
            let name = name.to_string();
            Box::pin(async move {
                Ok(self
                    .jobs
                    .lock()
                    .unwrap()
                    .iter()
                    .find(|j| j.name == name)
                    .cloned())
            })
        }

        fn list(&self) -> BoxFuture<'_, Result<Vec<CronJob>, RepositoryError>> {
            Box::pin(async move { Ok(self.jobs.lock().unwrap().clone()) })
        }

        fn list_enabled(&self) -> BoxFuture<'_, Result<Vec<CronJob>, RepositoryError>> {
            Box::pin(async move {
                Ok(self
                    .jobs
                    .lock()
                    .unwrap()
                    .iter()
                    .filter(|j| j.enabled)
                    .cloned()
                    .collect())
            })
        }

        fn set_enabled(
            &self,
            name: &str,
            enabled: bool,
        ) -> BoxFuture<'_, Result<(), RepositoryError>> {
            let name = name.to_string();
            Box::pin(async move {
                let mut jobs = self.jobs.lock().unwrap();
                match jobs.iter_mut().find(|j| j.name == name) {
                    Some(job) => {
                        job.enabled = enabled;
                        Ok(())
                    }
                    None => Err(RepositoryError::NotFound),
                }
            })
        }

        fn stamp_last_run(
            &self,
            _id: Uuid,
            _at: DateTime<Utc>,
        ) -> BoxFuture<'_, Result<(), RepositoryError>> {
            Box::pin(async move { Ok(()) })
        }
    }

    async fn make_scheduler() -> Arc<Scheduler> {
        let scheduler = Arc::new(Scheduler::new(Arc::new(MemCronRepo::default())));
        scheduler.start().await.unwrap();
        scheduler
    }

    fn test_ctx() -> ToolContext {
        ToolContext {
            invocation_id: Uuid::now_v7(),
            conversation_id: Uuid::now_v7(),
            channel: "webchat".to_string(),
            profile: "free".to_string(),
        }
    }

    #[tokio::test]
    async fn set_reminder_uses_context_profile() {
        let scheduler = make_scheduler().await;
        let tools = reminder_tools(Arc::clone(&scheduler));
        let set = &tools[0];

        let result = set
            .execute(
                serde_json::json!({
                    "name": "daily",
                    "cron": "0 9 * * *",
                    "message": "good morning"
                }),
                &test_ctx(),
            )
            .await
            .unwrap();
        assert!(result.contains("Reminder \"daily\" created"));

        let jobs = scheduler.list_jobs().await.unwrap();
        assert_eq!(jobs[0].profile, "free");
        scheduler.stop().await.unwrap();
    }

    #[tokio::test]
    async fn bad_cron_reported_as_text_not_error() {
        let scheduler = make_scheduler().await;
        let tools = reminder_tools(Arc::clone(&scheduler));
        let set = &tools[0];

        let result = set
            .execute(
                serde_json::json!({"name": "bad", "cron": "nope", "message": "x"}),
                &test_ctx(),
            )
            .await
            .unwrap();
        assert!(result.starts_with("Failed to create reminder"));
        scheduler.stop().await.unwrap();
    }

    #[tokio::test]
    async fn list_remove_toggle_round_trip() {
        let scheduler = make_scheduler().await;
        let tools = reminder_tools(Arc::clone(&scheduler));
        let (set, list, remove, toggle) = (&tools[0], &tools[1], &tools[2], &tools[3]);
        let ctx = test_ctx();

        assert_eq!(
            list.execute(serde_json::json!({}), &ctx).await.unwrap(),
            "No reminders set."
        );

        set.execute(
            serde_json::json!({"name": "daily", "cron": "0 9 * * *", "message": "hi"}),
            &ctx,
        )
        .await
        .unwrap();

        let listing = list.execute(serde_json::json!({}), &ctx).await.unwrap();
        assert!(listing.contains("daily [active]"));

        toggle
            .execute(serde_json::json!({"name": "daily", "enabled": false}), &ctx)
            .await
            .unwrap();
        let listing = list.execute(serde_json::json!({}), &ctx).await.unwrap();
        assert!(listing.contains("daily [paused]"));

        let result = remove
            .execute(serde_json::json!({"name": "daily"}), &ctx)
            .await
            .unwrap();
        assert_eq!(result, "Reminder \"daily\" removed.");
        scheduler.stop().await.unwrap();
    }
}
