use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// GPU buffer sizing.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[schemars(title = "Buffers", inline)]
#[serde(default)]
pub struct BufferOptions {
    /// Vertex buffer capacity. Defaults to the worst case for the grid and
    /// strategy; a smaller value is rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertex_capacity: Option<u32>,
}
