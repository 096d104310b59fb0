//! Request interpretation for the gateway.
//!
//! - `intent`: free-text classifier producing an [`intent::Intent`]
//! - `runtime`: `/execute-agent` planning and per-resource dispatch
//! - `tools`: the MCP tool catalog over the CRM wrappers

pub mod intent;
pub mod runtime;
pub mod tools;

pub use intent::{ContactChanges, ContactDraft, Intent, IntentClassifier};
pub use runtime::{Action, ActionPlan, AgentRuntime, ExecuteOutcome, ExecuteRequest, Resource};
pub use tools::{CrmTool, CrmToolKind, Tool, ToolDescriptor, ToolRegistry};
