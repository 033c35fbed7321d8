use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Turn;

/// A request to be sent to the model provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRequest {
    /// The system instructions, empty if there are none.
    pub system: String,
    /// The full transcript so far, oldest turn first.
    pub turns: Vec<Turn>,
    /// Tools that are available to the model.
    pub tools: Vec<ToolDescriptor>,
}

/// Describes a tool that can be used by the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Name of the tool, unique within one catalog.
    pub name: String,
    /// Human-readable description of the tool.
    pub description: String,
    /// The contract that arguments passed to the tool must satisfy.
    ///
    /// Remote tool providers describe this with a
    /// [JSON schema](https://json-schema.org/).
    pub input_schema: Value,
}
