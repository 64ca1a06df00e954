//! Tool registry and capability filter.
//!
//! The registry is built once at startup from the build-time catalog in
//! [`crate::tools::catalog`]. For every catalog entry it:
//!
//! 1. derives the wire name ([`naming::derive_wire_name`]),
//! 2. drops the entry if an earlier one already claimed that name,
//! 3. skips it if the [`ToolFilter`] disables it (without instantiating),
//! 4. instantiates it, isolating constructor failures and panics,
//! 5. fixes its annotations ([`annotations::infer_annotations`] unless declared)
//!    and output schema into an immutable [`ToolDescriptor`].
//!
//! The result is an ordered, read-only name → tool map shared by every host.

pub mod annotations;
pub mod filter;
pub mod naming;
pub mod schema;
mod tool;

use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;

pub use filter::{Categories, ToolFilter};
pub use tool::{
    ConnectionIdentity, ResolvedDocument, Tool, ToolAnnotations, ToolContext, ToolError,
    ToolOutput, ToolResult,
};

/// Constructor for one catalog entry.
pub type ToolFactory = fn() -> ToolResult<Box<dyn Tool>>;

/// One entry of the build-time tool catalog.
#[derive(Clone, Copy)]
pub struct ToolEntry {
    /// Implementation identity; the wire name is derived from it.
    pub identity: &'static str,
    /// Creates the tool.
    pub factory: ToolFactory,
}

impl ToolEntry {
    /// Creates a catalog entry.
    #[must_use]
    pub const fn new(identity: &'static str, factory: ToolFactory) -> Self {
        Self { identity, factory }
    }
}

impl std::fmt::Debug for ToolEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolEntry")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// Public description of a registered tool, as listed by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    /// Unique wire name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the arguments.
    pub input_schema: Value,
    /// Result envelope schema, when the tool declares result shapes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
    /// Behavioural hints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,
}

/// A registered tool: its fixed descriptor and the shared implementation.
#[derive(Clone)]
pub struct ToolHandle {
    /// Descriptor fixed at registration.
    pub descriptor: ToolDescriptor,
    /// The implementation.
    pub tool: Arc<dyn Tool>,
}

impl std::fmt::Debug for ToolHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolHandle")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// The immutable set of enabled tools, in catalog order.
#[derive(Debug, Default, Clone)]
pub struct ToolRegistry {
    tools: IndexMap<String, ToolHandle>,
}

impl ToolRegistry {
    /// Builds the registry from the built-in catalog.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::discover(crate::tools::catalog(), ToolFilter::from_config(config))
    }

    /// Builds the registry from an explicit catalog.
    ///
    /// Never fails: colliding, disabled and failing entries are logged and
    /// skipped. Collisions are resolved over the whole catalog before
    /// filtering, so the winner of a name never depends on configuration.
    #[must_use]
    pub fn discover(catalog: &[ToolEntry], filter: ToolFilter) -> Self {
        let mut claimed = HashSet::new();
        let mut tools = IndexMap::new();

        for entry in catalog {
            let name = naming::derive_wire_name(entry.identity);

            if !claimed.insert(name.clone()) {
                tracing::warn!(
                    tool = %name,
                    identity = entry.identity,
                    "Tool name collision, dropping later implementation"
                );
                continue;
            }

            if !filter.is_enabled(&name) {
                tracing::debug!(tool = %name, "Tool disabled by configuration");
                continue;
            }

            let Some(tool) = instantiate(entry, &name) else {
                continue;
            };

            let descriptor = ToolDescriptor {
                description: tool.description().to_string(),
                input_schema: tool.input_schema(),
                output_schema: schema::output_schema(&tool.output_shapes()),
                annotations: tool
                    .annotations()
                    .filter(|a| !a.is_empty())
                    .or_else(|| annotations::infer_annotations(&name)),
                name: name.clone(),
            };

            tools.insert(
                name,
                ToolHandle {
                    descriptor,
                    tool: Arc::from(tool),
                },
            );
        }

        tracing::info!(count = tools.len(), "Tool registry built");
        Self { tools }
    }

    /// Looks up a registered tool.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolHandle> {
        self.tools.get(name)
    }

    /// Descriptors of all registered tools, in catalog order.
    #[must_use]
    pub fn descriptors(&self) -> Vec<&ToolDescriptor> {
        self.tools.values().map(|h| &h.descriptor).collect()
    }

    /// Wire names of all registered tools, in catalog order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tool is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Runs one factory, turning errors and panics into a logged skip.
fn instantiate(entry: &ToolEntry, name: &str) -> Option<Box<dyn Tool>> {
    match catch_unwind(AssertUnwindSafe(entry.factory)) {
        Ok(Ok(tool)) => Some(tool),
        Ok(Err(err)) => {
            tracing::warn!(tool = %name, error = %err, "Tool failed to initialise, skipping");
            None
        }
        Err(payload) => {
            tracing::warn!(
                tool = %name,
                panic = %panic_message(payload.as_ref()),
                "Tool panicked during initialisation, skipping"
            );
            None
        }
    }
}

/// Extracts the message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_default()
}
