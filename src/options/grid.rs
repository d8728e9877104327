use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How the grid's world-space box is chosen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BoundsOptions {
    /// Cube around the sphere, `center ± radius * (1 + margin)`.
    FitSphere {
        /// Padding as a fraction of the radius.
        margin: f32,
    },
    /// A fixed box, independent of the sphere.
    Explicit {
        /// Minimum corner.
        min: [f32; 3],
        /// Maximum corner.
        max: [f32; 3],
    },
}

impl Default for BoundsOptions {
    fn default() -> Self {
        Self::FitSphere { margin: 0.25 }
    }
}

/// Sampling grid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Grid", inline)]
#[serde(default)]
pub struct GridOptions {
    /// Cell counts along x, y, z.
    #[schemars(title = "Resolution")]
    pub resolution: [u32; 3],
    /// World-space box covered by the grid.
    pub bounds: BoundsOptions,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            resolution: [32, 32, 32],
            bounds: BoundsOptions::default(),
        }
    }
}
