//! Durable script storage ("skills").
//!
//! Skills are scripts the assistant writes for itself: they persist across
//! conversations in one fixed sandbox directory and can be executed later via
//! the command tool. Names must be bare filenames; anything that could step
//! out of the sandbox is rejected.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::debug;

use super::{parse_args, Tool, ToolContext, ToolError};

/// Reject names with path separators or traversal sequences.
fn validate_name(name: &str) -> Result<(), ToolError> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(ToolError::InvalidArguments(
            "skill name must be a bare filename without path separators".to_string(),
        ));
    }
    Ok(())
}

async fn ensure_dir(dir: &Path) -> Result<(), ToolError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ToolError::Failed(format!("cannot create skills directory: {e}")))
}

/// The three skill tools sharing one sandbox directory.
pub fn skill_tools(skills_dir: PathBuf) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(WriteSkillTool {
            dir: skills_dir.clone(),
        }),
        Arc::new(ReadSkillTool {
            dir: skills_dir.clone(),
        }),
        Arc::new(ListSkillsTool { dir: skills_dir }),
    ]
}

#[derive(Debug, Deserialize, JsonSchema)]
struct WriteSkillArgs {
    /// Filename with extension, e.g. "summarize.py" or "backup.sh".
    name: String,
    /// Full script content including shebang line if applicable.
    content: String,
    /// Brief description of what the skill does.
    description: Option<String>,
}

pub struct WriteSkillTool {
    dir: PathBuf,
}

impl Tool for WriteSkillTool {
    fn name(&self) -> &str {
        "write_skill"
    }

    fn description(&self) -> &str {
        "Write a reusable script/skill to disk. The skill persists across \
         conversations and can be executed later."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(WriteSkillArgs)).unwrap_or_default()
    }

    fn execute<'a>(
        &'a self,
        arguments: serde_json::Value,
        _ctx: &'a ToolContext,
    ) -> BoxFuture<'a, Result<String, ToolError>> {
        Box::pin(async move {
            let args: WriteSkillArgs = parse_args(arguments)?;
            validate_name(&args.name)?;
            ensure_dir(&self.dir).await?;

            let path = self.dir.join(&args.name);
            tokio::fs::write(&path, &args.content)
                .await
                .map_err(|e| ToolError::Failed(format!("write failed: {e}")))?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                    .await
                    .map_err(|e| ToolError::Failed(format!("chmod failed: {e}")))?;
            }

            debug!(name = %args.name, "skill written");
            let mut msg = format!("Skill \"{}\" written to {}", args.name, path.display());
            if let Some(description) = args.description {
                msg.push_str(&format!("\nDescription: {description}"));
            }
            Ok(msg)
        })
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ReadSkillArgs {
    /// The skill filename to read.
    name: String,
}

pub struct ReadSkillTool {
    dir: PathBuf,
}

impl Tool for ReadSkillTool {
    fn name(&self) -> &str {
        "read_skill"
    }

    fn description(&self) -> &str {
        "Read the content of an existing skill/script."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(ReadSkillArgs)).unwrap_or_default()
    }

    fn execute<'a>(
        &'a self,
        arguments: serde_json::Value,
        _ctx: &'a ToolContext,
    ) -> BoxFuture<'a, Result<String, ToolError>> {
        Box::pin(async move {
            let args: ReadSkillArgs = parse_args(arguments)?;
            validate_name(&args.name)?;

            let path = self.dir.join(&args.name);
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => Ok(content),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Ok(format!("Skill \"{}\" not found.", args.name))
                }
                Err(e) => Err(ToolError::Failed(format!("read failed: {e}"))),
            }
        })
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ListSkillsArgs {}

pub struct ListSkillsTool {
    dir: PathBuf,
}

impl Tool for ListSkillsTool {
    fn name(&self) -> &str {
        "list_skills"
    }

    fn description(&self) -> &str {
        "List all saved skills/scripts with their sizes."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(ListSkillsArgs)).unwrap_or_default()
    }

    fn execute<'a>(
        &'a self,
        _arguments: serde_json::Value,
        _ctx: &'a ToolContext,
    ) -> BoxFuture<'a, Result<String, ToolError>> {
        Box::pin(async move {
            ensure_dir(&self.dir).await?;

            let mut entries = tokio::fs::read_dir(&self.dir)
                .await
                .map_err(|e| ToolError::Failed(format!("list failed: {e}")))?;

            let mut lines = Vec::new();
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| ToolError::Failed(format!("list failed: {e}")))?
            {
                let name = entry.file_name().to_string_lossy().to_string();
                let size = entry.metadata().await.map(|m| m.len()).unwrap_or(0);
                lines.push(format!("- {name} ({size} bytes)"));
            }

            if lines.is_empty() {
                return Ok("No skills saved yet.".to_string());
            }
            lines.sort();
            Ok(lines.join("\n"))
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
