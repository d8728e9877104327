use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The sphere evaluated by the default field module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Sphere", inline)]
#[serde(default)]
pub struct SphereOptions {
    /// World-space center.
    pub center: [f32; 3],
    /// Radius, strictly positive.
    #[schemars(title = "Radius", range(min = 0.0))]
    pub radius: f32,
}

impl Default for SphereOptions {
    fn default() -> Self {
        Self {
            center: [0.0, 0.0, 0.0],
            radius: 1.0,
        }
    }
}
