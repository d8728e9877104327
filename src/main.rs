//! Command-line entry point for sdfgen.
// Cargo lints stay warnings here as in the library.
#![warn(clippy::cargo)]

use std::path::Path;

use sdfgen::error::SdfGenError;
use sdfgen::gpu::gpu_context::GpuContext;
use sdfgen::gpu::shader_composer::ShaderComposer;
use sdfgen::options::Options;
use sdfgen::surface::cpu::CpuSurfaceGenerator;
use sdfgen::surface::generator::SurfaceGenerator;
use sdfgen::surface::indirect::DrawIndirectArgs;
use sdfgen::surface::vertex::Vertex;
use web_time::Instant;

struct Args {
    cpu: bool,
    options_path: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        cpu: false,
        options_path: None,
    };
    for arg in std::env::args().skip(1) {
        if arg == "--cpu" {
            args.cpu = true;
        } else if arg.starts_with("--") {
            return Err(format!("unknown flag {arg}"));
        } else if args.options_path.is_some() {
            return Err(format!("unexpected argument {arg}"));
        } else {
            args.options_path = Some(arg);
        }
    }
    Ok(args)
}

fn run_gpu(options: &Options) -> Result<DrawIndirectArgs, SdfGenError> {
    let context = match pollster::block_on(GpuContext::new_headless()) {
        Ok(context) => context,
        Err(e) => {
            log::warn!("no usable GPU adapter ({e}); try --cpu");
            return Err(e.into());
        }
    };
    let mut composer = ShaderComposer::new()?;
    let mut generator =
        SurfaceGenerator::new(&context.device, &mut composer, options)?;
    for (label, bytes) in generator.buffer_info() {
        log::info!("{label} buffer: {bytes} bytes");
    }
    generator.generate(&context)
}

fn run_cpu(options: &Options) -> Result<DrawIndirectArgs, SdfGenError> {
    let mut generator = CpuSurfaceGenerator::from_options(options)?;
    log::info!(
        "vertex slots: {} ({} bytes)",
        generator.capacity(),
        u64::from(generator.capacity()) * Vertex::SIZE
    );
    let report = generator.run()?;
    log::info!(
        "{} active cells, {} reservations, {} guarded invocations",
        report.active_cells,
        report.reservations.len(),
        report.guarded_invocations
    );
    Ok(generator.args())
}

fn main() {
    env_logger::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            log::error!("{e}");
            log::error!("Usage: sdfgen [--cpu] [options.toml]");
            std::process::exit(1);
        }
    };

    let options = match &args.options_path {
        Some(path) => match Options::load(Path::new(path)) {
            Ok(options) => options,
            Err(e) => {
                log::error!("{path}: {e}");
                std::process::exit(1);
            }
        },
        None => Options::default(),
    };

    let start = Instant::now();
    let result = if args.cpu {
        run_cpu(&options)
    } else {
        run_gpu(&options)
    };

    match result {
        Ok(draw_args) => {
            log::info!(
                "draw args: vertex_count={} instance_count={} \
                 first_vertex={} first_instance={}",
                draw_args.vertex_count,
                draw_args.instance_count,
                draw_args.first_vertex,
                draw_args.first_instance
            );
            log::info!(
                "{} bytes of vertices in {:.2?}",
                u64::from(draw_args.vertex_count) * Vertex::SIZE,
                start.elapsed()
            );
        }
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    }
}
