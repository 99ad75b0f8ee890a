//! Tool registry: name -> executor + descriptor.
//!
//! Read-mostly lookup table, safe under concurrent access. Duplicate names
//! are rejected at registration rather than silently overwritten, so two
//! components cannot swap executors out from under an in-flight turn.

use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tracing::debug;

use valet_types::tool::ToolDescriptor;

use super::Tool;

/// Errors from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("tool '{0}' is already registered")]
    Duplicate(String),
}

/// Concurrent name -> tool table.
#[derive(Default)]
pub struct ToolRegistry {
    tools: DashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, rejecting duplicate names.
    pub fn register(&self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        match self.tools.entry(name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(RegistryError::Duplicate(name)),
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                debug!(tool = %name, "tool registered");
                vacant.insert(tool);
                Ok(())
            }
        }
    }

    /// Remove a tool by name. Returns `true` if it existed.
    pub fn unregister(&self, name: &str) -> bool {
        self.tools.remove(name).is_some()
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Descriptors for every registered tool, sorted by name.
    ///
    /// Returns `None` when the registry is empty, matching the backend
    /// contract where `tools: None` means "no tools available".
    pub fn descriptors(&self) -> Option<Vec<ToolDescriptor>> {
        if self.tools.is_empty() {
            return None;
        }
        let mut all: Vec<ToolDescriptor> = self
            .tools
            .iter()
            .map(|entry| entry.value().descriptor())
            .collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Some(all)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.len())
            .finish()
    }
}
