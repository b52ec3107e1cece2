use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use targetidx::bundle;
use targetidx::io::load_target_image;
use targetidx::lowlevel::{
    ExtremaDetectorConfig, ExtremaDetectorFactory, MedoidClusterBuilder, MedoidClusterConfig,
    PyramidConfig, ScalePyramid, ThreadYield,
};
use targetidx::{CompileConfig, CompiledTarget, Compiler};
use tracing_subscriber::EnvFilter;

const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "Targetidx CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Summarize an existing bundle instead of compiling.
    #[arg(long, value_name = "BUNDLE")]
    inspect: Option<PathBuf>,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct PyramidConfigJson {
    matching_min_dim: usize,
    matching_scale_step: f32,
    matching_snap: f32,
    tracking_sizes: Vec<usize>,
}

impl Default for PyramidConfigJson {
    fn default() -> Self {
        let cfg = PyramidConfig::default();
        Self {
            matching_min_dim: cfg.matching_min_dim,
            matching_scale_step: cfg.matching_scale_step,
            matching_snap: cfg.matching_snap,
            tracking_sizes: cfg.tracking_sizes,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DetectorConfigJson {
    inner_radius: usize,
    outer_radius: usize,
    threshold: f32,
    max_points_per_sign: usize,
    patch_radius: usize,
}

impl Default for DetectorConfigJson {
    fn default() -> Self {
        let cfg = ExtremaDetectorConfig::default();
        Self {
            inner_radius: cfg.inner_radius,
            outer_radius: cfg.outer_radius,
            threshold: cfg.threshold,
            max_points_per_sign: cfg.max_points_per_sign,
            patch_radius: cfg.patch_radius,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ClusterConfigJson {
    branching: usize,
    min_points_per_node: usize,
    hypotheses: usize,
    seed: u64,
}

impl Default for ClusterConfigJson {
    fn default() -> Self {
        let cfg = MedoidClusterConfig::default();
        Self {
            branching: cfg.branching,
            min_points_per_node: cfg.min_points_per_node,
            hypotheses: cfg.hypotheses,
            seed: cfg.seed,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct CompileConfigJson {
    yield_interval: usize,
    parallel: bool,
    pyramid: PyramidConfigJson,
    detector: DetectorConfigJson,
    cluster: ClusterConfigJson,
}

impl Default for CompileConfigJson {
    fn default() -> Self {
        let cfg = CompileConfig::default();
        Self {
            yield_interval: cfg.yield_interval,
            parallel: cfg.parallel,
            pyramid: PyramidConfigJson::default(),
            detector: DetectorConfigJson::default(),
            cluster: ClusterConfigJson::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Config {
    image_paths: Vec<String>,
    output_path: String,
    compile: CompileConfigJson,
}

#[derive(Debug, Serialize)]
struct LevelSummary {
    scale: f32,
    width: usize,
    height: usize,
    maxima: usize,
    minima: usize,
    maxima_depth: usize,
    minima_depth: usize,
}

#[derive(Debug, Serialize)]
struct TargetSummary {
    width: usize,
    height: usize,
    matching_levels: Vec<LevelSummary>,
    tracking_sizes: Vec<[usize; 2]>,
}

impl From<&CompiledTarget> for TargetSummary {
    fn from(value: &CompiledTarget) -> Self {
        Self {
            width: value.target_image.width,
            height: value.target_image.height,
            matching_levels: value
                .matching_data
                .levels
                .iter()
                .map(|level| LevelSummary {
                    scale: level.scale,
                    width: level.width,
                    height: level.height,
                    maxima: level.maxima_points.len(),
                    minima: level.minima_points.len(),
                    maxima_depth: level.maxima_cluster.depth(),
                    minima_depth: level.minima_cluster.depth(),
                })
                .collect(),
            tracking_sizes: value
                .tracking_data
                .levels
                .iter()
                .map(|level| [level.width, level.height])
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    version: u32,
    bytes: usize,
    targets: Vec<TargetSummary>,
}

fn summarize(bytes: &[u8]) -> Result<Output, Box<dyn std::error::Error>> {
    let decoded = bundle::decode_bundle(bytes)?;
    Ok(Output {
        version: decoded.version,
        bytes: bytes.len(),
        targets: decoded.targets.iter().map(TargetSummary::from).collect(),
    })
}

fn build_compiler(
    cfg: CompileConfigJson,
) -> Result<Compiler<ExtremaDetectorFactory>, Box<dyn std::error::Error>> {
    let pyramid = ScalePyramid::new(PyramidConfig {
        matching_min_dim: cfg.pyramid.matching_min_dim,
        matching_scale_step: cfg.pyramid.matching_scale_step,
        matching_snap: cfg.pyramid.matching_snap,
        tracking_sizes: cfg.pyramid.tracking_sizes,
    })?;
    let cluster = MedoidClusterBuilder::new(MedoidClusterConfig {
        branching: cfg.cluster.branching,
        min_points_per_node: cfg.cluster.min_points_per_node,
        hypotheses: cfg.cluster.hypotheses,
        seed: cfg.cluster.seed,
    })?;
    let factory = ExtremaDetectorFactory::new(ExtremaDetectorConfig {
        inner_radius: cfg.detector.inner_radius,
        outer_radius: cfg.detector.outer_radius,
        threshold: cfg.detector.threshold,
        max_points_per_sign: cfg.detector.max_points_per_sign,
        patch_radius: cfg.detector.patch_radius,
    });

    let compiler = Compiler::builder()
        .detector_factory(factory)
        .pyramid_builder(pyramid)
        .cluster_builder(cluster)
        .standard_hooks()
        .suspend(ThreadYield)
        .config(CompileConfig {
            yield_interval: cfg.yield_interval,
            parallel: cfg.parallel,
        })
        .build()?;
    Ok(compiler)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("targetidx=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    if let Some(path) = cli.inspect {
        let bytes = fs::read(path)?;
        let output = summarize(&bytes)?;
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.image_paths.is_empty() || config.output_path.is_empty() {
        return Err("image_paths and output_path must be set in the config".into());
    }

    let images = config
        .image_paths
        .iter()
        .map(load_target_image)
        .collect::<Result<Vec<_>, _>>()?;

    let mut compiler = build_compiler(config.compile)?;
    compiler.compile(&images, |percent| {
        tracing::info!(percent = percent as u32, "compile progress");
    })?;
    let bytes = compiler.export_data()?;
    fs::write(&config.output_path, &bytes)?;

    let output = summarize(&bytes)?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
