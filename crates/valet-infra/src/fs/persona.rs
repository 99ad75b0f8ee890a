//! Filesystem persona store.
//!
//! The persona document lives at `<data_dir>/PERSONA.md` and is re-read on
//! every turn so edits take effect without a restart. A missing file yields a
//! minimal default rather than an error.

use std::path::PathBuf;

use futures_util::future::BoxFuture;
use tracing::debug;

use valet_core::repository::PersonaStore;
use valet_types::error::RepositoryError;

const DEFAULT_PERSONA: &str = "You are a helpful personal assistant.";

/// Persona document read from disk.
pub struct FsPersonaStore {
    path: PathBuf,
}

impl FsPersonaStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl PersonaStore for FsPersonaStore {
    fn content(&self) -> BoxFuture<'_, Result<String, RepositoryError>> {
        Box::pin(async move {
            match tokio::fs::read_to_string(&self.path).await {
                Ok(content) => Ok(content),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(path = %self.path.display(), "persona file absent, using default");
                    Ok(DEFAULT_PERSONA.to_string())
                }
                Err(e) => Err(RepositoryError::Query(format!(
                    "cannot read persona file: {e}"
                ))),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_file_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("PERSONA.md");
        std::fs::write(&path, "I am Valet, butler of bits.").unwrap();

        let store = FsPersonaStore::new(path);
        assert_eq!(store.content().await.unwrap(), "I am Valet, butler of bits.");
    }

    #[tokio::test]
    async fn missing_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsPersonaStore::new(dir.path().join("PERSONA.md"));
        assert_eq!(store.content().await.unwrap(), DEFAULT_PERSONA);
    }
}
