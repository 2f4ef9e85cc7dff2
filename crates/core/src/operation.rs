//! Operation trait and registry — the agent's fixed action set.
//!
//! Operations are named, schema-typed remote actions (reads and writes).
//! The registry is static configuration: built once at startup, validated,
//! then consumed read-only by the reasoning loop every turn.

use crate::error::{OperationError, RegistryError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Immutable description of one operation, advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationDescriptor {
    /// Unique name within the registry.
    pub name: String,

    /// Description of what the operation does (sent to the model).
    pub description: String,

    /// JSON Schema describing the operation's parameters.
    pub parameters: serde_json::Value,

    /// Whether executing this operation changes remote state.
    pub mutating: bool,

    /// For mutating operations: the paired read-only preview operation
    /// that must succeed earlier in the same conversation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

/// The outcome of executing an operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationOutput {
    /// Human/model-readable result text.
    pub output: String,

    /// Optional structured payload (e.g. the normalized activities a
    /// preview echoes back for the confirmation gate to match against).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl OperationOutput {
    pub fn text(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            data: None,
        }
    }

    pub fn with_data(output: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            output: output.into(),
            data: Some(data),
        }
    }
}

/// The core Operation trait.
///
/// Each catalog entry (holdings, performance, import preview, ...)
/// implements this trait. Implementations hold a handle to the remote
/// client; the loop never talks to the wire directly.
#[async_trait]
pub trait Operation: Send + Sync {
    /// The unique name of this operation (e.g. "get_portfolio_holdings").
    fn name(&self) -> &str;

    /// A description of what this operation does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this operation's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Whether this operation mutates remote state.
    fn mutating(&self) -> bool {
        false
    }

    /// The paired preview operation required before this one may execute.
    /// Must be `Some` for every mutating operation.
    fn preview_operation(&self) -> Option<&str> {
        None
    }

    /// Execute the operation with the given arguments.
    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<OperationOutput, OperationError>;

    /// Convert this operation into a descriptor for the catalog.
    fn descriptor(&self) -> OperationDescriptor {
        OperationDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
            mutating: self.mutating(),
            preview: self.preview_operation().map(String::from),
        }
    }
}

/// The registry of available operations.
///
/// The reasoning loop uses this to:
/// 1. Advertise the catalog to the model every turn
/// 2. Resolve and execute operations the model requests
///
/// Registration order is preserved so the advertised catalog is stable.
#[derive(Debug)]
pub struct OperationRegistry {
    operations: Vec<Box<dyn Operation>>,
}

impl<'a> std::fmt::Debug for dyn Operation + 'a {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name())
            .field("mutating", &self.mutating())
            .finish()
    }
}

impl OperationRegistry {
    /// Build a registry, validating the preview pairing invariant:
    /// every mutating operation must name a registered preview operation.
    /// A dangling reference is a fatal configuration error.
    pub fn new(operations: Vec<Box<dyn Operation>>) -> Result<Self, RegistryError> {
        for (i, op) in operations.iter().enumerate() {
            if operations[..i].iter().any(|o| o.name() == op.name()) {
                return Err(RegistryError::DuplicateName(op.name().to_string()));
            }
        }

        for op in &operations {
            if op.mutating() {
                let preview = op.preview_operation().ok_or_else(|| {
                    RegistryError::DanglingPreview {
                        operation: op.name().to_string(),
                        preview: "(none declared)".to_string(),
                    }
                })?;
                if !operations.iter().any(|o| o.name() == preview) {
                    return Err(RegistryError::DanglingPreview {
                        operation: op.name().to_string(),
                        preview: preview.to_string(),
                    });
                }
            }
        }

        Ok(Self { operations })
    }

    /// Resolve an operation by name.
    pub fn resolve(&self, name: &str) -> Result<&dyn Operation, RegistryError> {
        self.operations
            .iter()
            .map(|o| o.as_ref())
            .find(|o| o.name() == name)
            .ok_or_else(|| RegistryError::UnknownOperation(name.to_string()))
    }

    /// All descriptors, in registration order (sent to the model).
    pub fn descriptors(&self) -> Vec<OperationDescriptor> {
        self.operations.iter().map(|o| o.descriptor()).collect()
    }

    /// All registered operation names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.operations.iter().map(|o| o.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
