use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use globset::{Glob, GlobSet, GlobSetBuilder};
use image::{DynamicImage, ImageReader};
use serde::{Deserialize, Serialize};
use spritepack_core::prelude::*;
use tracing::{error, info, warn};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    name = "spritepack",
    about = "Pack sprites into a single texture atlas",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress bars (disable with --progress false or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, global=true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pack sprites into an atlas (PNG + JSON frame dump)
    Pack(PackArgs),
    /// Simple timing bench (packs once per scale, prints time + occupancy)
    Bench(PackArgs),
}

#[derive(Parser, Debug, Clone)]
struct PackArgs {
    // Input/Output
    /// Input files or directories (directories are walked recursively)
    #[arg(required = true, help_heading = "Input/Output")]
    inputs: Vec<PathBuf>,
    /// Output directory
    #[arg(short, long, default_value = "out", help_heading = "Input/Output")]
    out_dir: PathBuf,
    /// Atlas base name (files will be name.png/.json)
    #[arg(short, long, default_value = "atlas", help_heading = "Input/Output")]
    name: String,
    /// YAML config file path (its keys override the matching options)
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,
    /// Include patterns (glob). If set, only files matching any pattern are considered
    #[arg(long, help_heading = "Input/Output")]
    include: Vec<String>,
    /// Exclude patterns (glob). Files matching any pattern will be ignored
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,

    // Layout
    /// Largest atlas side
    #[arg(long, default_value_t = 8192, help_heading = "Layout")]
    max_size: u32,
    /// Keep every atlas dimension a power of two
    #[arg(long, default_value_t = false, help_heading = "Layout")]
    pow2: bool,
    /// Force a square atlas
    #[arg(long, default_value_t = false, help_heading = "Layout")]
    square: bool,
    /// Empty margin around the whole atlas
    #[arg(long, default_value_t = 0, help_heading = "Layout")]
    texture_border: u32,
    /// Pixels reserved right of and below each sprite
    #[arg(long, default_value_t = 1, help_heading = "Layout")]
    sprite_border: u32,
    /// Allow rotation (90deg) when only the rotated sprite fits
    #[arg(long, default_value_t = true, action=ArgAction::Set, help_heading = "Layout")]
    allow_rotation: bool,
    /// Scale factor; repeat the flag to produce one atlas per scale
    #[arg(long, default_values_t = vec![1.0], help_heading = "Layout")]
    scale: Vec<f32>,

    // Image Processing
    /// Trim alpha threshold (1..=255); 0 disables trimming
    #[arg(long, default_value_t = 1, help_heading = "Image Processing")]
    trim_threshold: u8,

    // Algorithms
    /// Algorithm: rect | polygon
    #[arg(long, value_parser = ["rect", "polygon"], default_value = "rect", help_heading = "Algorithms")]
    algorithm: String,
    /// Extract triangle meshes for every sprite
    #[arg(long, default_value_t = false, help_heading = "Algorithms")]
    polygon: bool,
    /// Outline simplification/offset distance in pixels
    #[arg(long, default_value_t = 2.0, help_heading = "Algorithms")]
    epsilon: f32,
    /// Grid stride of the polygon placement search
    #[arg(long, default_value_t = 5, help_heading = "Algorithms")]
    polygon_step: u32,
    /// Guillotine choice: baf|bssf|blsf|waf|wssf|wlsf
    #[arg(long, default_value = "baf", help_heading = "Heuristics")]
    g_choice: String,
    /// Guillotine split: slas|llas|minas|maxas|sas|las
    #[arg(long, default_value = "slas", help_heading = "Heuristics")]
    g_split: String,

    // Export
    /// Export packing stats (JSON) to this file
    #[arg(long, help_heading = "Export")]
    export_stats: Option<PathBuf>,
    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
    /// Dry run: pack and report but do not write files
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    match &cli.command {
        Commands::Pack(args) => run_pack(args, cli.progress && !cli.quiet),
        Commands::Bench(args) => run_bench(args),
    }
}

fn run_pack(cli: &PackArgs, show_progress: bool) -> anyhow::Result<()> {
    let base = build_config(cli)?;
    if cli.print_config {
        match cli.print_config_format.as_str() {
            "yaml" => println!("{}", serde_yaml::to_string(&base)?),
            _ => println!("{}", serde_json::to_string_pretty(&base)?),
        }
        return Ok(());
    }

    let sources = gather_sources(&cli.inputs, &cli.include, &cli.exclude)?;
    if sources.is_empty() {
        anyhow::bail!("no images found in the given inputs");
    }
    let images = load_images_with_progress(&sources, show_progress)?;
    info!(count = images.len(), "loaded input images");

    let configs = variant_configs(&base, &cli.scale);
    let variants = run_variants(&images, &configs, &CancelToken::new());

    if !cli.dry_run {
        fs::create_dir_all(&cli.out_dir)
            .with_context(|| format!("create out_dir {}", cli.out_dir.display()))?;
    }

    let multi = configs.len() > 1;
    let mut failures = Vec::new();
    let mut all_stats = Vec::new();
    for variant in variants {
        let variant = variant?;
        let scale = variant.config.scale;
        let Some(result) = variant.result else {
            error!(scale, outcome = ?variant.outcome, "no atlas produced");
            failures.push((scale, variant.outcome));
            continue;
        };
        let stats = result.stats();
        info!(scale, "{}", stats.summary());
        for name in &result.dropped {
            warn!(%name, "sprite left out of the atlas");
        }
        all_stats.push(StatsEntry { scale, stats });
        if cli.dry_run {
            continue;
        }
        let stem = variant_stem(&cli.name, scale, multi);
        let png_path = cli.out_dir.join(format!("{stem}.png"));
        result
            .image
            .save(&png_path)
            .with_context(|| format!("write {}", png_path.display()))?;
        let json_path = cli.out_dir.join(format!("{stem}.json"));
        let dump = AtlasDump {
            meta: DumpMeta {
                image: format!("{stem}.png"),
                size: (result.width(), result.height()),
                scale,
            },
            frames: &result.frames,
            aliases: &result.aliases,
            dropped: &result.dropped,
        };
        fs::write(&json_path, serde_json::to_string_pretty(&dump)?)
            .with_context(|| format!("write {}", json_path.display()))?;
        info!(?png_path, ?json_path, frames = result.frames.len(), "atlas written");
    }

    if let Some(path) = &cli.export_stats {
        fs::write(path, serde_json::to_string_pretty(&all_stats)?)
            .with_context(|| format!("write {}", path.display()))?;
    }

    if let Some((scale, outcome)) = failures.first() {
        match outcome {
            Outcome::SizeLimitExceeded => anyhow::bail!(
                "sprites do not fit into {}x{} at scale {}",
                base.max_texture_size,
                base.max_texture_size,
                scale
            ),
            other => anyhow::bail!("packing failed at scale {}: {:?}", scale, other),
        }
    }
    Ok(())
}

fn run_bench(cli: &PackArgs) -> anyhow::Result<()> {
    let base = build_config(cli)?;
    let sources = gather_sources(&cli.inputs, &cli.include, &cli.exclude)?;
    let images = load_images_with_progress(&sources, false)?;
    println!("Inputs: {}", images.len());
    for cfg in variant_configs(&base, &cli.scale) {
        let start = Instant::now();
        let mut job = AtlasJob::from_images(images.clone(), cfg.clone())?;
        let outcome = job.generate();
        let elapsed = start.elapsed();
        match job.result() {
            Some(result) => {
                let stats = result.stats();
                println!(
                    "scale {}: {} | {}x{} | occupancy {:.2}% | {} aliases",
                    cfg.scale,
                    fmt_dur(elapsed),
                    stats.width,
                    stats.height,
                    stats.occupancy * 100.0,
                    stats.num_aliases
                );
            }
            None => println!("scale {}: {} | {:?}", cfg.scale, fmt_dur(elapsed), outcome),
        }
    }
    Ok(())
}

fn fmt_dur(d: Duration) -> String {
    let ms = d.as_millis();
    if ms >= 1000 {
        format!("{:.2}s", d.as_secs_f32())
    } else {
        format!("{}ms", ms)
    }
}

fn build_config(cli: &PackArgs) -> anyhow::Result<AtlasConfig> {
    let algorithm: PackAlgorithm = cli
        .algorithm
        .parse()
        .map_err(|_| anyhow::anyhow!("unknown algorithm: {}", cli.algorithm))?;
    let choice: GuillotineChoice = cli
        .g_choice
        .parse()
        .map_err(|_| anyhow::anyhow!("unknown guillotine choice: {}", cli.g_choice))?;
    let split: GuillotineSplit = cli
        .g_split
        .parse()
        .map_err(|_| anyhow::anyhow!("unknown guillotine split: {}", cli.g_split))?;

    let mut cfg = AtlasConfig::builder()
        .texture_border(cli.texture_border)
        .sprite_border(cli.sprite_border)
        .trim_threshold(cli.trim_threshold)
        .algorithm(algorithm)
        .polygon_mode(cli.polygon, cli.epsilon)
        .polygon_step(cli.polygon_step)
        .pow2(cli.pow2)
        .force_squared(cli.square)
        .max_texture_size(cli.max_size)
        .rotate_sprites(cli.allow_rotation)
        .choice(choice)
        .split(split)
        .build();

    // Load config file if provided; its keys win over the CLI values
    if let Some(path) = &cli.config {
        let file = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let y: YamlConfig = serde_yaml::from_str(&file)?;
        cfg = y.into_atlas_config(cfg);
    }
    cfg.validate()?;
    Ok(cfg)
}

fn variant_configs(base: &AtlasConfig, scales: &[f32]) -> Vec<AtlasConfig> {
    scales
        .iter()
        .map(|&scale| AtlasConfig {
            scale,
            ..base.clone()
        })
        .collect()
}

fn variant_stem(name: &str, scale: f32, multi: bool) -> String {
    if multi || scale != 1.0 {
        format!("{name}@{scale}x")
    } else {
        name.to_string()
    }
}

/// Files under `inputs` with their logical names: the path relative to the walked
/// directory without extension, or the file stem for file inputs.
fn gather_sources(
    inputs: &[PathBuf],
    include: &[String],
    exclude: &[String],
) -> anyhow::Result<Vec<SourceEntry>> {
    let inc_set = build_globset(include)?;
    let exc_set = build_globset(exclude)?;
    let mut list: Vec<SourceEntry> = Vec::new();
    for input in inputs {
        if input.is_file() {
            if !should_skip(input, inc_set.as_ref(), exc_set.as_ref()) && is_image(input) {
                let name = input
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                list.push(SourceEntry::new(input, name));
            }
            continue;
        }
        if !input.is_dir() {
            warn!(path = ?input, "input does not exist, skipping");
            continue;
        }
        let mut found: Vec<PathBuf> = WalkDir::new(input)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| p.is_file() && !should_skip(p, inc_set.as_ref(), exc_set.as_ref()) && is_image(p))
            .collect();
        found.sort();
        for p in found {
            let name = logical_name(input, &p);
            list.push(SourceEntry::new(p, name));
        }
    }
    Ok(list)
}

fn build_globset(patterns: &[String]) -> anyhow::Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut b = GlobSetBuilder::new();
    for pat in patterns {
        b.add(Glob::new(pat)?);
    }
    Ok(Some(b.build()?))
}

fn logical_name(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path).with_extension("");
    rel.to_string_lossy().replace('\\', "/")
}

fn should_skip(p: &Path, include: Option<&GlobSet>, exclude: Option<&GlobSet>) -> bool {
    let s = p.to_string_lossy().replace('\\', "/");
    if let Some(ex) = exclude {
        if ex.is_match(&s) {
            return true;
        }
    }
    if let Some(inc) = include {
        if !inc.is_match(&s) {
            return true;
        }
    }
    false
}

fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_ascii_lowercase()),
        Some(ref e) if e == "png" || e == "jpg" || e == "jpeg" || e == "gif" || e == "bmp"
    )
}

fn load_images_with_progress(sources: &[SourceEntry], progress: bool) -> anyhow::Result<Vec<InputImage>> {
    use indicatif::{ProgressBar, ProgressStyle};
    let bar = if progress {
        let b = ProgressBar::new(sources.len() as u64);
        b.set_style(ProgressStyle::with_template(
            "{spinner:.green} loading {pos}/{len} [{elapsed_precise}] {wide_msg}",
        )?);
        Some(b)
    } else {
        None
    };
    let mut list = Vec::with_capacity(sources.len());
    for src in sources {
        if let Some(b) = &bar {
            b.set_message(src.name.clone());
        }
        match load_image(&src.path) {
            Ok(img) => list.push(InputImage::new(src.name.clone(), img)),
            Err(e) => error!(path = ?src.path, error = %e, "skip image"),
        }
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    Ok(list)
}

fn load_image(p: &Path) -> anyhow::Result<DynamicImage> {
    let img = ImageReader::open(p)?.with_guessed_format()?.decode()?;
    Ok(img)
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .try_init();
}

#[derive(Serialize)]
struct DumpMeta {
    image: String,
    size: (u32, u32),
    scale: f32,
}

#[derive(Serialize)]
struct AtlasDump<'a> {
    meta: DumpMeta,
    frames: &'a BTreeMap<String, SpriteFrame>,
    aliases: &'a BTreeMap<String, Vec<String>>,
    dropped: &'a [String],
}

#[derive(Serialize)]
struct StatsEntry {
    scale: f32,
    stats: AtlasStats,
}

#[derive(Debug, Deserialize, Default)]
struct YamlConfig {
    texture_border: Option<u32>,
    sprite_border: Option<u32>,
    trim_threshold: Option<u8>,
    algorithm: Option<String>,
    polygon_mode: Option<bool>,
    epsilon: Option<f32>,
    polygon_step: Option<u32>,
    pow2: Option<bool>,
    force_squared: Option<bool>,
    max_texture_size: Option<u32>,
    rotate_sprites: Option<bool>,
    g_choice: Option<String>,
    g_split: Option<String>,
}

impl YamlConfig {
    fn into_atlas_config(self, mut cfg: AtlasConfig) -> AtlasConfig {
        if let Some(v) = self.texture_border {
            cfg.texture_border = v;
        }
        if let Some(v) = self.sprite_border {
            cfg.sprite_border = v;
        }
        if let Some(v) = self.trim_threshold {
            cfg.trim_threshold = v;
        }
        if let Some(v) = self.algorithm {
            cfg.algorithm = v.parse().unwrap_or(cfg.algorithm);
        }
        if let Some(v) = self.polygon_mode {
            cfg.polygon_mode = v;
        }
        if let Some(v) = self.epsilon {
            cfg.epsilon = v;
        }
        if let Some(v) = self.polygon_step {
            cfg.polygon_step = v;
        }
        if let Some(v) = self.pow2 {
            cfg.pow2 = v;
        }
        if let Some(v) = self.force_squared {
            cfg.force_squared = v;
        }
        if let Some(v) = self.max_texture_size {
            cfg.max_texture_size = v;
        }
        if let Some(v) = self.rotate_sprites {
            cfg.rotate_sprites = v;
        }
        if let Some(v) = self.g_choice {
            cfg.choice = v.parse().unwrap_or(cfg.choice);
        }
        if let Some(v) = self.g_split {
            cfg.split = v.parse().unwrap_or(cfg.split);
        }
        cfg
    }
}
