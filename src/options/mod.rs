//! Generation options with TOML preset support.
//!
//! Grid, sphere, meshing, and buffer settings are consolidated here.
//! Options serialize to/from TOML for presets stored in `assets/presets/`.

mod buffers;
mod grid;
mod meshing;
mod sphere;

use std::path::Path;

pub use buffers::BufferOptions;
use glam::{UVec3, Vec3};
pub use grid::{BoundsOptions, GridOptions};
pub use meshing::{MeshingOptions, ShadingMode};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
pub use sphere::SphereOptions;

use crate::error::SdfGenError;
use crate::sdf::Sphere;
use crate::surface::mesher::Mesher;
use crate::surface::params::{GridLayout, SurfaceParams};
use crate::surface::{check_capacity, worst_case_vertices};

/// An explicit capacity more than this many times the worst case is
/// probably a typo.
const OVERSIZED_CAPACITY_FACTOR: u64 = 4;

/// Top-level options container. All sub-structs use `#[serde(default)]` so
/// partial TOML files (e.g. only overriding `[sphere]`) work correctly.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct Options {
    /// Sampling grid.
    pub grid: GridOptions,
    /// Sphere parameters.
    pub sphere: SphereOptions,
    /// Surface extraction.
    pub meshing: MeshingOptions,
    /// Buffer sizing.
    pub buffers: BufferOptions,
}

impl Options {
    /// Generate JSON Schema describing the options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SdfGenError::Io`] or [`SdfGenError::OptionsParse`].
    pub fn load(path: &Path) -> Result<Self, SdfGenError> {
        let content = std::fs::read_to_string(path).map_err(SdfGenError::Io)?;
        toml::from_str(&content)
            .map_err(|e| SdfGenError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// Returns [`SdfGenError::Io`] or [`SdfGenError::OptionsParse`].
    pub fn save(&self, path: &Path) -> Result<(), SdfGenError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SdfGenError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(SdfGenError::Io)?;
        }
        std::fs::write(path, content).map_err(SdfGenError::Io)
    }

    /// List available preset names (TOML file stems) in a directory.
    #[must_use]
    pub fn list_presets(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) =
                        path.file_stem().and_then(|s| s.to_str())
                    {
                        names.push(stem.to_owned());
                    }
                }
            }
        }
        names.sort();
        names
    }

    /// Reject values the shader cannot handle.
    ///
    /// # Errors
    ///
    /// Returns [`SdfGenError::InvalidOptions`] naming the first bad field.
    pub fn validate(&self) -> Result<(), SdfGenError> {
        let invalid = |msg: String| Err(SdfGenError::InvalidOptions(msg));

        if self.grid.resolution.contains(&0) {
            return invalid(format!(
                "grid.resolution {:?} has a zero axis",
                self.grid.resolution
            ));
        }
        if !self.sphere.center.iter().all(|c| c.is_finite()) {
            return invalid(format!(
                "sphere.center {:?} is not finite",
                self.sphere.center
            ));
        }
        if !(self.sphere.radius.is_finite() && self.sphere.radius > 0.0) {
            return invalid(format!(
                "sphere.radius {} must be finite and positive",
                self.sphere.radius
            ));
        }
        match &self.grid.bounds {
            BoundsOptions::FitSphere { margin } => {
                if !(margin.is_finite() && *margin >= 0.0) {
                    return invalid(format!(
                        "grid.bounds.margin {margin} must be finite and \
                         non-negative"
                    ));
                }
            }
            BoundsOptions::Explicit { min, max } => {
                let finite = min.iter().chain(max).all(|v| v.is_finite());
                let ordered = min.iter().zip(max).all(|(lo, hi)| lo < hi);
                if !(finite && ordered) {
                    return invalid(format!(
                        "grid.bounds {min:?}..{max:?} must be finite with \
                         min < max on every axis"
                    ));
                }
            }
        }
        if !self
            .meshing
            .color
            .iter()
            .all(|c| (0.0..=1.0).contains(c))
        {
            return invalid(format!(
                "meshing.color {:?} must lie in [0, 1]",
                self.meshing.color
            ));
        }
        Ok(())
    }

    /// The sphere to evaluate.
    #[must_use]
    pub fn sphere(&self) -> Sphere {
        Sphere::new(Vec3::from_array(self.sphere.center), self.sphere.radius)
    }

    /// Grid layout after resolving the bounds mode.
    #[must_use]
    pub fn layout(&self) -> GridLayout {
        let resolution = UVec3::from_array(self.grid.resolution);
        match &self.grid.bounds {
            BoundsOptions::FitSphere { margin } => {
                GridLayout::around_sphere(resolution, &self.sphere(), *margin)
            }
            BoundsOptions::Explicit { min, max } => GridLayout::new(
                resolution,
                Vec3::from_array(*min),
                Vec3::from_array(*max),
            ),
        }
    }

    /// Strategy and shading.
    #[must_use]
    pub fn mesher(&self) -> Mesher {
        Mesher {
            strategy: self.meshing.strategy,
            shading: self.meshing.shading(),
        }
    }

    /// Most vertices one update can emit with these options.
    #[must_use]
    pub fn worst_case_vertices(&self) -> u64 {
        worst_case_vertices(&self.layout(), self.meshing.strategy)
    }

    /// Vertex buffer capacity: the explicit value if set, otherwise the
    /// worst case.
    ///
    /// # Errors
    ///
    /// [`SdfGenError::CapacityTooSmall`] if the explicit value is below the
    /// worst case; [`SdfGenError::InvalidOptions`] if the worst case does
    /// not fit in a `u32` vertex count.
    pub fn vertex_capacity(&self) -> Result<u32, SdfGenError> {
        let required = self.worst_case_vertices();
        match self.buffers.vertex_capacity {
            Some(capacity) => {
                check_capacity(
                    u64::from(capacity),
                    &self.layout(),
                    self.meshing.strategy,
                )?;
                if u64::from(capacity)
                    > required.saturating_mul(OVERSIZED_CAPACITY_FACTOR)
                {
                    log::warn!(
                        "vertex_capacity {capacity} is far above the worst \
                         case of {required} vertices"
                    );
                }
                Ok(capacity)
            }
            None => u32::try_from(required).map_err(|_| {
                SdfGenError::InvalidOptions(format!(
                    "worst-case emission of {required} vertices does not \
                     fit a u32 vertex count; lower grid.resolution"
                ))
            }),
        }
    }

    /// Uniform block for these options.
    #[must_use]
    pub fn surface_params(&self) -> SurfaceParams {
        SurfaceParams::new(&self.layout(), &self.sphere(), &self.mesher())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::mesher::{MeshingStrategy, Shading};

    const PRESETS: [&str; 3] = [
        include_str!("../../assets/presets/default.toml"),
        include_str!("../../assets/presets/marching_tetrahedra.toml"),
        include_str!("../../assets/presets/offset_grid.toml"),
    ];

    #[test]
    fn default_round_trips_through_toml() {
        let opts = Options::default();
        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed: Options = toml::from_str(&toml_str).unwrap();
        assert_eq!(opts, parsed);
    }

    #[test]
    fn explicit_bounds_round_trip_through_toml() {
        let mut opts = Options::default();
        opts.grid.bounds = BoundsOptions::Explicit {
            min: [-1.0, -2.0, -3.0],
            max: [1.0, 2.0, 3.0],
        };
        opts.buffers.vertex_capacity = Some(1 << 20);
        opts.meshing.strategy = MeshingStrategy::MarchingTetrahedra;
        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed: Options = toml::from_str(&toml_str).unwrap();
        assert_eq!(opts, parsed);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r#"
[sphere]
radius = 2.5

[meshing]
strategy = "marching_tetrahedra"
"#;
        let opts: Options = toml::from_str(toml_str).unwrap();
        assert_eq!(opts.sphere.radius, 2.5);
        assert_eq!(opts.meshing.strategy, MeshingStrategy::MarchingTetrahedra);
        // Everything else should be default
        assert_eq!(opts.sphere.center, [0.0, 0.0, 0.0]);
        assert_eq!(opts.grid, GridOptions::default());
        assert_eq!(opts.buffers.vertex_capacity, None);
    }

    #[test]
    fn bundled_presets_parse_and_validate() {
        for preset in PRESETS {
            let opts: Options = toml::from_str(preset).unwrap();
            opts.validate().unwrap();
            let _ = opts.vertex_capacity().unwrap();
        }
    }

    #[test]
    fn presets_are_listed() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/presets");
        let names = Options::list_presets(&dir);
        assert_eq!(
            names,
            vec!["default", "marching_tetrahedra", "offset_grid"]
        );
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir().join("sdfgen_options_test");
        let path = dir.join("saved.toml");
        let mut opts = Options::default();
        opts.sphere.center = [0.5, -0.25, 1.0];
        opts.meshing.shading = ShadingMode::Constant;
        opts.save(&path).unwrap();
        assert_eq!(Options::load(&path).unwrap(), opts);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut opts = Options::default();
        opts.grid.resolution = [8, 0, 8];
        assert!(matches!(opts.validate(), Err(SdfGenError::InvalidOptions(_))));

        let mut opts = Options::default();
        opts.sphere.radius = 0.0;
        assert!(opts.validate().is_err());
        opts.sphere.radius = f32::NAN;
        assert!(opts.validate().is_err());

        let mut opts = Options::default();
        opts.grid.bounds = BoundsOptions::Explicit {
            min: [0.0, 0.0, 1.0],
            max: [1.0, 1.0, 1.0],
        };
        assert!(opts.validate().is_err());

        let mut opts = Options::default();
        opts.grid.bounds = BoundsOptions::Explicit {
            min: [f32::NAN, 0.0, 0.0],
            max: [1.0, 1.0, 1.0],
        };
        assert!(opts.validate().is_err());

        let mut opts = Options::default();
        opts.sphere.center = [0.0, f32::INFINITY, 0.0];
        assert!(matches!(opts.validate(), Err(SdfGenError::InvalidOptions(_))));

        let mut opts = Options::default();
        opts.grid.bounds = BoundsOptions::FitSphere { margin: -0.5 };
        assert!(opts.validate().is_err());

        let mut opts = Options::default();
        opts.meshing.color = [1.5, 0.0, 0.0, 1.0];
        assert!(opts.validate().is_err());

        Options::default().validate().unwrap();
    }

    #[test]
    fn capacity_defaults_to_worst_case() {
        let mut opts = Options::default();
        opts.grid.resolution = [4, 5, 6];
        assert_eq!(opts.vertex_capacity().unwrap(), 4 * 5 * 6 * 6);

        opts.meshing.strategy = MeshingStrategy::MarchingTetrahedra;
        assert_eq!(opts.vertex_capacity().unwrap(), 4 * 5 * 6 * 36);

        opts.buffers.vertex_capacity = Some(100);
        assert!(matches!(
            opts.vertex_capacity(),
            Err(SdfGenError::CapacityTooSmall {
                capacity: 100,
                required: 4320
            })
        ));

        opts.buffers.vertex_capacity = Some(5000);
        assert_eq!(opts.vertex_capacity().unwrap(), 5000);
    }

    #[test]
    fn generous_capacity_is_kept() {
        let mut opts = Options::default();
        opts.grid.resolution = [2, 2, 2];
        let worst = opts.worst_case_vertices();
        assert_eq!(worst, 48);

        // Above the warning factor: still accepted as given.
        let generous =
            u32::try_from(worst * OVERSIZED_CAPACITY_FACTOR + 1).unwrap();
        opts.buffers.vertex_capacity = Some(generous);
        assert_eq!(opts.vertex_capacity().unwrap(), generous);
    }

    #[test]
    fn oversized_grid_needs_explicit_handling() {
        let mut opts = Options::default();
        opts.grid.resolution = [2048, 2048, 2048];
        opts.meshing.strategy = MeshingStrategy::MarchingTetrahedra;
        assert!(matches!(
            opts.vertex_capacity(),
            Err(SdfGenError::InvalidOptions(_))
        ));
    }

    #[test]
    fn layout_and_params_follow_options() {
        let mut opts = Options::default();
        opts.sphere.center = [1.0, 0.0, 0.0];
        opts.sphere.radius = 2.0;
        opts.grid.bounds = BoundsOptions::FitSphere { margin: 0.5 };
        let layout = opts.layout();
        assert_eq!(layout.bounds_min, Vec3::new(-2.0, -3.0, -3.0));
        assert_eq!(layout.bounds_max, Vec3::new(4.0, 3.0, 3.0));

        opts.meshing.shading = ShadingMode::Constant;
        opts.meshing.color = [0.25, 0.5, 0.75, 1.0];
        assert_eq!(
            opts.mesher().shading,
            Shading::Constant(glam::Vec4::new(0.25, 0.5, 0.75, 1.0))
        );
        let params = opts.surface_params();
        assert_eq!(params.radius, 2.0);
        assert_eq!(params.color_mode, 1);
        assert_eq!(params.resolution, opts.grid.resolution);
    }

    #[test]
    fn schema_has_expected_properties() {
        let schema_value =
            serde_json::to_value(Options::json_schema()).unwrap();
        let props = schema_value["properties"].as_object().unwrap();
        assert!(props.contains_key("grid"));
        assert!(props.contains_key("sphere"));
        assert!(props.contains_key("meshing"));
        assert!(props.contains_key("buffers"));

        let sphere = &props["sphere"]["properties"];
        assert!(sphere.get("radius").is_some());
        assert!(sphere.get("center").is_some());
    }
}
