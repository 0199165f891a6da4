use serde::{Deserialize, Serialize};

/// Body of `POST /rpc`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Registered function name, e.g. `list_tasks`.
    pub function: String,
    /// Omitted args arrive as `null` and are treated as `{}`.
    #[serde(default)]
    pub args: serde_json::Value,
}

impl RpcRequest {
    /// Build a call to `function` with `args`.
    pub fn new(function: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            function: function.into(),
            args,
        }
    }
}
