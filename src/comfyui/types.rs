//! Wire types for the ComfyUI REST endpoints the worker talks to.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response of `POST /prompt`.
#[derive(Debug, Clone, Deserialize)]
pub struct QueuedWorkflow {
    pub prompt_id: String,
    /// Position in the execution queue.
    #[serde(default)]
    pub number: Option<i64>,
    #[serde(default)]
    pub node_errors: Option<Value>,
}

/// One entry of `GET /history/{prompt_id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryRecord {
    /// Node id to node output. Kept raw so output handling can decide how
    /// strictly to read it.
    #[serde(default)]
    pub outputs: Map<String, Value>,
    #[serde(default)]
    pub status: Option<Value>,
}

impl HistoryRecord {
    pub fn is_complete(&self) -> bool {
        !self.outputs.is_empty()
    }
}

/// Output descriptor of a generated file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OutputImage {
    pub filename: String,
    #[serde(default)]
    pub subfolder: String,
    #[serde(rename = "type", default = "default_output_type")]
    pub kind: String,
}

fn default_output_type() -> String {
    "output".to_string()
}
