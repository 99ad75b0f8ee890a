//! Tool execution contract and built-in tools.
//!
//! A tool takes validated JSON arguments plus an explicit [`ToolContext`] and
//! returns a string result. Tool-level failures are rendered as text fed back
//! to the model, never surfaced raw to the human. The context is passed into
//! each invocation rather than held globally, so concurrent turns cannot
//! corrupt each other's conversation/channel/profile.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use valet_types::config::AppConfig;
use valet_types::tool::ToolDescriptor;

use crate::confirm::ConfirmationGate;
use crate::repository::SocialPostRepository;
use crate::scheduler::Scheduler;

pub mod command;
pub mod registry;
pub mod reminders;
pub mod search;
pub mod skills;
pub mod social;

pub use registry::{RegistryError, ToolRegistry};

/// Errors from tool execution. Rendered as model-visible text by the
/// orchestrator.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Failed(String),
}

/// Per-invocation execution context, passed explicitly into every tool.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub invocation_id: Uuid,
    pub conversation_id: Uuid,
    pub channel: String,
    pub profile: String,
}

/// A named capability the model may invoke.
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema for the tool's arguments.
    fn parameters(&self) -> serde_json::Value;

    /// Execute with validated arguments. String out; failures become
    /// model-visible text.
    fn execute<'a>(
        &'a self,
        arguments: serde_json::Value,
        ctx: &'a ToolContext,
    ) -> BoxFuture<'a, Result<String, ToolError>>;

    /// Descriptor advertised to the model backend.
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Deserialize tool arguments, mapping shape errors to `InvalidArguments`.
pub(crate) fn parse_args<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, ToolError> {
    serde_json::from_value(value).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// External collaborators the built-in tools wrap.
pub struct BuiltinToolDeps {
    pub gate: Arc<ConfirmationGate>,
    pub scheduler: Arc<Scheduler>,
    /// Enables the web-search tool when present.
    pub search: Option<Arc<dyn search::SearchClient>>,
    /// Enables the social monitoring tools when present.
    pub social: Option<(Arc<dyn search::SocialClient>, Arc<dyn SocialPostRepository>)>,
}

/// Register the built-in tool set.
///
/// Command execution, skills, and reminders are always available; search and
/// social tools only when their collaborators are configured.
pub fn register_builtin_tools(
    registry: &ToolRegistry,
    config: &AppConfig,
    deps: BuiltinToolDeps,
) -> Result<(), RegistryError> {
    registry.register(Arc::new(command::RunCommandTool::new(config, deps.gate)))?;

    for tool in skills::skill_tools(config.skills_dir()) {
        registry.register(tool)?;
    }

    for tool in reminders::reminder_tools(Arc::clone(&deps.scheduler)) {
        registry.register(tool)?;
    }

    if let Some(client) = deps.search {
        registry.register(Arc::new(search::WebSearchTool::new(client)))?;
    }

    if let Some((client, store)) = deps.social {
        registry.register(Arc::new(social::MonitorRedditTool::new(
            client,
            Arc::clone(&store),
        )))?;
        registry.register(Arc::new(social::RecallSocialTool::new(store)))?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventBus;
    use crate::repository::CronJobRepository;
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;
    use valet_types::cron::CronJob;
    use valet_types::error::RepositoryError;
    use valet_types::social::{NewSocialPost, Platform, SocialPost};

    struct NullCronRepo;

    impl CronJobRepository for NullCronRepo {
        fn insert(&self, _job: &CronJob) -> BoxFuture<'_, Result<(), RepositoryError>> {
            Box::pin(async move { Ok(()) })
        }
        fn delete(&self, _name: &str) -> BoxFuture<'_, Result<bool, RepositoryError>> {
            Box::pin(async move { Ok(false) })
        }
        fn get(&self, _name: &str) -> BoxFuture<'_, Result<Option<CronJob>, RepositoryError>> {
            Box::pin(async move { Ok(None) })
        }
        fn list(&self) -> BoxFuture<'_, Result<Vec<CronJob>, RepositoryError>> {
            Box::pin(async move { Ok(vec![]) })
        }
        fn list_enabled(&self) -> BoxFuture<'_, Result<Vec<CronJob>, RepositoryError>> {
            Box::pin(async move { Ok(vec![]) })
        }
        fn set_enabled(
            &self,
            _name: &str,
            _enabled: bool,
        ) -> BoxFuture<'_, Result<(), RepositoryError>> {
            Box::pin(async move { Err(RepositoryError::NotFound) })
        }
        fn stamp_last_run(
            &self,
            _id: Uuid,
            _at: DateTime<Utc>,
        ) -> BoxFuture<'_, Result<(), RepositoryError>> {
            Box::pin(async move { Ok(()) })
        }
    }

    struct NullSearch;

    impl search::SearchClient for NullSearch {
        fn search(
            &self,
            _query: &str,
            _count: u8,
        ) -> BoxFuture<'_, Result<Vec<search::SearchHit>, ToolError>> {
            Box::pin(async move { Ok(vec![]) })
        }
    }

    struct NullSocial;

    impl search::SocialClient for NullSocial {
        fn search(
            &self,
            _query: &str,
            _subreddit: Option<&str>,
            _limit: u32,
        ) -> BoxFuture<'_, Result<Vec<NewSocialPost>, ToolError>> {
            Box::pin(async move { Ok(vec![]) })
        }
    }

    struct NullSocialStore;

    impl SocialPostRepository for NullSocialStore {
        fn upsert_many(
            &self,
            _posts: Vec<NewSocialPost>,
        ) -> BoxFuture<'_, Result<u64, RepositoryError>> {
            Box::pin(async move { Ok(0) })
        }
        fn recent(
            &self,
            _platform: Option<Platform>,
            _limit: usize,
        ) -> BoxFuture<'_, Result<Vec<SocialPost>, RepositoryError>> {
            Box::pin(async move { Ok(vec![]) })
        }
        fn search(
            &self,
            _query: &str,
            _platform: Option<Platform>,
            _limit: usize,
        ) -> BoxFuture<'_, Result<Vec<SocialPost>, RepositoryError>> {
            Box::pin(async move { Ok(vec![]) })
        }
        fn count(
            &self,
            _platform: Option<Platform>,
        ) -> BoxFuture<'_, Result<u64, RepositoryError>> {
            Box::pin(async move { Ok(0) })
        }
    }

    fn test_config(dir: &tempfile::TempDir) -> AppConfig {
        AppConfig {
            profiles: HashMap::new(),
            data_dir: PathBuf::from(dir.path()),
            max_execution_timeout_ms: 30_000,
            approval_margin_ms: 10_000,
            command_deny_list: None,
            search_api_key: None,
        }
    }

    async fn deps(with_external: bool) -> BuiltinToolDeps {
        let events = EventBus::new(16);
        let gate = Arc::new(crate::confirm::ConfirmationGate::new(
            events,
            Duration::from_secs(40),
        ));
        let scheduler = Arc::new(Scheduler::new(Arc::new(NullCronRepo)));
        BuiltinToolDeps {
            gate,
            scheduler,
            search: with_external.then(|| Arc::new(NullSearch) as Arc<dyn search::SearchClient>),
            social: with_external.then(|| {
                (
                    Arc::new(NullSocial) as Arc<dyn search::SocialClient>,
                    Arc::new(NullSocialStore) as Arc<dyn SocialPostRepository>,
                )
            }),
        }
    }

    #[tokio::test]
    async fn core_tools_always_registered() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ToolRegistry::new();
        register_builtin_tools(&registry, &test_config(&dir), deps(false).await).unwrap();

        for name in [
            "run_command",
            "write_skill",
            "read_skill",
            "list_skills",
            "set_reminder",
            "list_reminders",
            "remove_reminder",
            "toggle_reminder",
        ] {
            assert!(registry.get(name).is_some(), "missing {name}");
        }
        assert!(registry.get("web_search").is_none());
        assert!(registry.get("monitor_reddit").is_none());
        assert_eq!(registry.len(), 8);
    }

    #[tokio::test]
    async fn external_tools_registered_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ToolRegistry::new();
        register_builtin_tools(&registry, &test_config(&dir), deps(true).await).unwrap();

        assert!(registry.get("web_search").is_some());
        assert!(registry.get("monitor_reddit").is_some());
        assert!(registry.get("recall_social").is_some());
        assert_eq!(registry.len(), 11);

        // Every descriptor advertises a parameter schema.
        let descriptors = registry.descriptors().unwrap();
        assert_eq!(descriptors.len(), 11);
        for descriptor in descriptors {
            assert!(descriptor.parameters.is_object(), "{}", descriptor.name);
        }
    }
}
