use glam::Vec4;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::surface::mesher::{MeshingStrategy, Shading};

/// How vertices are colored.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ShadingMode {
    /// Map the surface normal to RGB.
    #[default]
    Normal,
    /// Use `meshing.color` for every vertex.
    Constant,
}

/// Surface extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Meshing", inline)]
#[serde(default)]
pub struct MeshingOptions {
    /// Triangle topology per active cell.
    #[schemars(title = "Strategy")]
    pub strategy: MeshingStrategy,
    /// Vertex color source.
    #[schemars(title = "Shading")]
    pub shading: ShadingMode,
    /// Linear RGBA used by constant shading.
    pub color: [f32; 4],
}

impl Default for MeshingOptions {
    fn default() -> Self {
        Self {
            strategy: MeshingStrategy::Splat,
            shading: ShadingMode::Normal,
            color: [0.8, 0.8, 0.8, 1.0],
        }
    }
}

impl MeshingOptions {
    /// Resolve the shading mode and color.
    #[must_use]
    pub fn shading(&self) -> Shading {
        match self.shading {
            ShadingMode::Normal => Shading::Normal,
            ShadingMode::Constant => {
                Shading::Constant(Vec4::from_array(self.color))
            }
        }
    }
}
