use std::borrow::Cow;

use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, NagaModuleDescriptor, ShaderLanguage, ShaderType,
};

use crate::error::SdfGenError;

/// Source of the init/update compute shader.
pub const SURFACE_GEN_SOURCE: &str =
    include_str!("../../assets/shaders/compute/surface_gen.wgsl");
/// File path reported in composition diagnostics for [`SURFACE_GEN_SOURCE`].
pub const SURFACE_GEN_PATH: &str = "compute/surface_gen.wgsl";

/// Default `sdfgen::field` module: a single sphere from the uniform block.
pub const DEFAULT_FIELD_SOURCE: &str =
    include_str!("../../assets/shaders/modules/field.wgsl");

/// Wraps `naga_oil::compose::Composer` to provide shader composition with `#import` support.
///
/// Pre-loads the shared WGSL modules at construction time. The generator
/// shader pulls them in with `#import sdfgen::params`, `sdfgen::sdf`, and
/// `sdfgen::field`. The composer produces `naga::Module` IR directly,
/// skipping WGSL re-parse at runtime.
pub struct ShaderComposer {
    composer: Composer,
}

/// Shared module definition: (source, file_path)
struct ModuleDef<'a> {
    source: &'a str,
    file_path: &'a str,
}

impl ShaderComposer {
    /// Composer with the default sphere field.
    ///
    /// # Errors
    ///
    /// Returns [`SdfGenError::ShaderCompose`] if a bundled module fails to
    /// register.
    pub fn new() -> Result<Self, SdfGenError> {
        Self::with_field_module(DEFAULT_FIELD_SOURCE, "modules/field.wgsl")
    }

    /// Composer whose `sdfgen::field` module is `source`.
    ///
    /// The module must start with `#define_import_path sdfgen::field` and
    /// export `fn evaluate(p: vec3<f32>, params: SurfaceParams) -> f32`.
    /// It may import `sdfgen::params` and `sdfgen::sdf`.
    ///
    /// # Errors
    ///
    /// Returns [`SdfGenError::ShaderCompose`] if any module fails to
    /// register.
    pub fn with_field_module(
        source: &str,
        file_path: &str,
    ) -> Result<Self, SdfGenError> {
        let mut composer = Composer::default();

        // Register shared modules in dependency order.
        let modules = [
            ModuleDef {
                source: include_str!("../../assets/shaders/modules/params.wgsl"),
                file_path: "modules/params.wgsl",
            },
            ModuleDef {
                source: include_str!("../../assets/shaders/modules/sdf.wgsl"),
                file_path: "modules/sdf.wgsl",
            },
            ModuleDef { source, file_path },
        ];

        for m in &modules {
            let _ = composer
                .add_composable_module(ComposableModuleDescriptor {
                    source: m.source,
                    file_path: m.file_path,
                    language: ShaderLanguage::Wgsl,
                    ..Default::default()
                })
                .map_err(|e| {
                    SdfGenError::ShaderCompose(format!(
                        "failed to register '{}': {e:?}",
                        m.file_path
                    ))
                })?;
        }

        Ok(Self { composer })
    }

    /// Compose a shader source string (which may contain `#import` directives)
    /// into a `wgpu::ShaderModule` ready for pipeline creation.
    ///
    /// # Errors
    ///
    /// Returns [`SdfGenError::ShaderCompose`] if composition fails.
    pub fn compose(
        &mut self,
        device: &wgpu::Device,
        label: &str,
        source: &str,
        file_path: &str,
    ) -> Result<wgpu::ShaderModule, SdfGenError> {
        let naga_module = self.compose_naga(source, file_path)?;

        Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Naga(Cow::Owned(naga_module)),
        }))
    }

    /// Compose a shader source into a `naga::Module` without creating a wgpu shader module.
    /// Useful for testing shader composition without a GPU device.
    ///
    /// # Errors
    ///
    /// Returns [`SdfGenError::ShaderCompose`] if composition fails.
    pub fn compose_naga(
        &mut self,
        source: &str,
        file_path: &str,
    ) -> Result<naga::Module, SdfGenError> {
        self.composer
            .make_naga_module(NagaModuleDescriptor {
                source,
                file_path,
                shader_type: ShaderType::Wgsl,
                ..Default::default()
            })
            .map_err(|e| {
                SdfGenError::ShaderCompose(format!(
                    "failed to compose '{file_path}': {e}"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(module: &naga::Module) {
        let _ = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::default(),
        )
        .validate(module)
        .unwrap_or_else(|e| panic!("module failed validation: {e:?}"));
    }

    fn entry_point_names(module: &naga::Module) -> Vec<&str> {
        module.entry_points.iter().map(|ep| ep.name.as_str()).collect()
    }

    #[test]
    fn surface_gen_composes_and_validates() {
        let mut composer = ShaderComposer::new().unwrap();
        let module = composer
            .compose_naga(SURFACE_GEN_SOURCE, SURFACE_GEN_PATH)
            .unwrap_or_else(|e| panic!("{e}"));
        validate(&module);

        let names = entry_point_names(&module);
        assert!(names.contains(&"init"));
        assert!(names.contains(&"update"));
        for ep in &module.entry_points {
            assert_eq!(ep.stage, naga::ShaderStage::Compute);
            assert_eq!(ep.workgroup_size, [64, 1, 1]);
        }
    }

    #[test]
    fn replacement_field_module_composes() {
        let field = r"
#define_import_path sdfgen::field

#import sdfgen::params::SurfaceParams
#import sdfgen::sdf

fn evaluate(p: vec3<f32>, params: SurfaceParams) -> f32 {
    let a = sdf::sphere(p, params.center, params.radius);
    let b = sdf::sphere(p, params.center + vec3<f32>(params.radius, 0.0, 0.0), 0.5 * params.radius);
    return sdf::op_subtraction(a, b);
}
";
        let mut composer =
            ShaderComposer::with_field_module(field, "custom_field.wgsl")
                .unwrap();
        let module = composer
            .compose_naga(SURFACE_GEN_SOURCE, SURFACE_GEN_PATH)
            .unwrap_or_else(|e| panic!("{e}"));
        validate(&module);
    }

    #[test]
    fn broken_field_module_is_reported() {
        let result = ShaderComposer::with_field_module(
            "#define_import_path sdfgen::field\nfn evaluate(p: vec3<f32>) -> f32 { return undefined_fn(p); }",
            "broken_field.wgsl",
        )
        .and_then(|mut c| c.compose_naga(SURFACE_GEN_SOURCE, SURFACE_GEN_PATH));
        assert!(matches!(result, Err(SdfGenError::ShaderCompose(_))));
    }
}
