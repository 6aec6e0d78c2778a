mod codec;
mod colorbars;
mod compositor;
mod constants;
mod error;
mod noise;
mod picture;
mod secam;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use image::imageops::FilterType;
use image::RgbImage;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::codec::OutputFormat;
use crate::constants::{
    CHROMA_BLOCK_H, CHROMA_BLOCK_W, DEFAULT_NOISE_AMPLITUDE, DEFAULT_RANDOM_FACTOR,
    DEFAULT_THRESHOLD, FORCED_HEIGHT,
};
use crate::error::SecamError;
use crate::noise::NoiseLattice;
use crate::picture::{validate_dimensions, YccPicture};
use crate::secam::SecamEffect;

// ────────────────────────────────────────────────────────────────────────────
// Range parameter support
// ────────────────────────────────────────────────────────────────────────────

/// Effect tunable given on the command line as `value` or `min..max`.
///
/// A span is sampled once per output frame; a single value is used as is.
#[derive(Clone, Copy, Debug, PartialEq)]
struct RangeParam {
    min: f64,
    max: f64,
}

impl RangeParam {
    fn fixed(v: f64) -> Self {
        Self { min: v, max: v }
    }

    fn span(min: f64, max: f64) -> std::result::Result<Self, String> {
        if min > max {
            return Err(format!("empty range {}..{} (min is above max)", min, max));
        }
        Ok(Self { min, max })
    }

    fn is_range(self) -> bool {
        self.min < self.max
    }

    fn sample(self, rng: &mut impl Rng) -> f64 {
        match self.is_range() {
            true => rng.random_range(self.min..=self.max),
            false => self.min,
        }
    }
}

fn parse_bound(token: &str) -> std::result::Result<f64, String> {
    token
        .trim()
        .parse()
        .map_err(|e| format!("invalid number '{}': {}", token, e))
}

impl std::str::FromStr for RangeParam {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.split_once("..") {
            Some((lo, hi)) => Self::span(parse_bound(lo)?, parse_bound(hi)?),
            None => parse_bound(s).map(Self::fixed),
        }
    }
}

impl std::fmt::Display for RangeParam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.min)?;
        if self.is_range() {
            write!(f, "..{}", self.max)?;
        }
        Ok(())
    }
}

#[derive(Parser)]
#[command(name = "secam-simulator")]
#[command(about = "SECAM color fire simulator for still images")]
#[command(version)]
struct Cli {
    /// Only print warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Seed for a reproducible run (default: random)
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Number of worker threads (default: all logical cores)
    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

/// Shared effect arguments.
///
/// Numeric parameters accept either a single value (e.g. `0.024`) or a
/// `min..max` range (e.g. `0.01..0.05`), sampled per frame.
#[derive(clap::Args, Clone)]
struct EffectArgs {
    /// Weight of the edge-independent ignition term
    #[arg(short, long, default_value_t = RangeParam::fixed(DEFAULT_RANDOM_FACTOR))]
    random_factor: RangeParam,
    /// Ignition threshold (jittered ±50% per block)
    #[arg(short, long, default_value_t = RangeParam::fixed(DEFAULT_THRESHOLD))]
    threshold: RangeParam,
    /// Number of color fire passes per frame
    #[arg(short, long, default_value_t = 1)]
    passes: usize,
    /// Grain amplitude applied before the first pass (0 disables)
    #[arg(short, long, default_value_t = RangeParam::fixed(DEFAULT_NOISE_AMPLITUDE))]
    noise: RangeParam,
    /// Output format (jpg, jpeg, png, bmp, tga); default: from the extension
    #[arg(long)]
    format: Option<String>,
}

/// Effect settings for one frame, after range sampling.
#[derive(Clone, Copy, Debug)]
struct FrameParams {
    effect: SecamEffect,
    noise: f64,
}

impl EffectArgs {
    fn sample(&self, rng: &mut impl Rng) -> FrameParams {
        FrameParams {
            effect: SecamEffect::new(self.random_factor.sample(rng), self.threshold.sample(rng)),
            noise: self.noise.sample(rng),
        }
    }

    fn has_any_range(&self) -> bool {
        self.random_factor.is_range() || self.threshold.is_range() || self.noise.is_range()
    }

    fn log_sampled(&self, frame: usize, params: &FrameParams) {
        if !self.has_any_range() {
            return;
        }
        let mut parts: Vec<String> = Vec::new();
        if self.random_factor.is_range() {
            parts.push(format!("random={:.4}", params.effect.random_factor));
        }
        if self.threshold.is_range() {
            parts.push(format!("threshold={:.4}", params.effect.threshold));
        }
        if self.noise.is_range() {
            parts.push(format!("noise={:.2}", params.noise));
        }
        info!("Frame {} randomized: {}", frame, parts.join(", "));
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run an image through the SECAM color fire pipeline
    Image {
        /// Input image file
        input: PathBuf,
        /// Output image file (numbered `name-N.ext` when several frames)
        #[arg(short, long, default_value = "output.png")]
        output: PathBuf,
        /// Number of independent output frames
        #[arg(short, long, default_value_t = 1)]
        frames: usize,
        /// Work and write at 480 lines instead of the source size
        #[arg(long = "force-480p")]
        force_480p: bool,
        #[command(flatten)]
        effects: EffectArgs,
    },
    /// Generate SECAM color bars through the pipeline
    Colorbars {
        /// Output image file
        #[arg(short, long, default_value = "colorbars.png")]
        output: PathBuf,
        /// Image width (multiple of 4)
        #[arg(long, default_value_t = 640)]
        width: usize,
        /// Image height (multiple of 2)
        #[arg(long, default_value_t = 480)]
        height: usize,
        #[command(flatten)]
        effects: EffectArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet);

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to initialize thread pool")?;
    }

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };
    let lattice = NoiseLattice::new(&mut rng);
    let run = Run {
        lattice: &lattice,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Image {
            input,
            output,
            frames,
            force_480p,
            effects,
        } => cmd_image(&input, &output, frames, force_480p, &effects, &run, &mut rng),
        Commands::Colorbars {
            output,
            width,
            height,
            effects,
        } => cmd_colorbars(&output, width, height, &effects, &run, &mut rng),
    }
}

fn init_logging(quiet: bool) {
    let level = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Process-wide read-only state shared by every frame.
struct Run<'a> {
    lattice: &'a NoiseLattice,
    quiet: bool,
}

/// Working resolution: 4×2-aligned source size, or 480 lines when forced.
fn working_size(width: usize, height: usize, force_480p: bool) -> Result<(usize, usize), SecamError> {
    if width == 0 || height == 0 {
        return Err(SecamError::InvalidDimensions { width, height });
    }
    let (w, h) = if force_480p {
        let w = (width as f64 * FORCED_HEIGHT as f64 / height as f64).round() as usize;
        (w, FORCED_HEIGHT)
    } else {
        (width, height)
    };
    let aligned = (w - w % CHROMA_BLOCK_W, h - h % CHROMA_BLOCK_H);
    validate_dimensions(aligned.0, aligned.1)?;
    Ok(aligned)
}

/// Resize an RGB24 buffer, or pass it through when the size already matches.
fn scale_rgb(rgb: Vec<u8>, from: (usize, usize), to: (usize, usize)) -> Result<Vec<u8>> {
    if from == to {
        return Ok(rgb);
    }
    let img = RgbImage::from_raw(from.0 as u32, from.1 as u32, rgb)
        .context("Failed to create intermediate image")?;
    Ok(image::imageops::resize(&img, to.0 as u32, to.1 as u32, FilterType::Triangle).into_raw())
}

/// Grain pre-pass followed by `passes` rounds of color fire.
fn process_frame(
    frame: &mut YccPicture,
    params: &FrameParams,
    passes: usize,
    lattice: &NoiseLattice,
    rng: &mut impl Rng,
) -> Result<(), SecamError> {
    noise::apply_grain(frame, lattice, params.noise);
    for _ in 0..passes {
        let overlay = params.effect.render_overlay(frame, rng);
        compositor::merge(frame, &overlay)?;
    }
    Ok(())
}

/// Render `frames` independent frames from `template` in parallel and hand
/// each decoded RGB buffer to `emit`.
fn render_frames<F>(
    template: &YccPicture,
    frames: usize,
    effects: &EffectArgs,
    run: &Run<'_>,
    rng: &mut StdRng,
    emit: F,
) -> Result<()>
where
    F: Fn(usize, Vec<u8>) -> Result<()> + Sync,
{
    let seeds: Vec<u64> = (0..frames).map(|_| rng.random()).collect();
    let pb = make_progress_bar(frames, run.quiet);

    seeds
        .par_iter()
        .enumerate()
        .try_for_each_init(
            || template.clone(),
            |frame, (i, &seed)| -> Result<()> {
                frame.copy_from(template);
                let mut rng = StdRng::seed_from_u64(seed);
                let params = effects.sample(&mut rng);
                effects.log_sampled(i, &params);

                process_frame(frame, &params, effects.passes, run.lattice, &mut rng)?;
                emit(i, frame.to_rgb())?;
                pb.inc(1);
                Ok(())
            },
        )?;

    pb.finish_and_clear();
    Ok(())
}

fn cmd_image(
    input: &Path,
    output: &Path,
    frames: usize,
    force_480p: bool,
    effects: &EffectArgs,
    run: &Run<'_>,
    rng: &mut StdRng,
) -> Result<()> {
    let format = OutputFormat::resolve(output, effects.format.as_deref())?;
    let t0 = Instant::now();

    let source = codec::load_rgb(input)?;
    let src = (source.width() as usize, source.height() as usize);
    info!("Input: {} ({}x{})", input.display(), src.0, src.1);

    let work = working_size(src.0, src.1, force_480p)?;
    let out = if force_480p { work } else { src };
    if work != src {
        debug!("Working resolution {}x{}", work.0, work.1);
    }
    let working = scale_rgb(source.into_raw(), src, work)?;
    let template = YccPicture::from_rgb(&working, work.0, work.1)?;

    info!(
        "Rendering {} frame(s), {} pass(es) each...",
        frames, effects.passes
    );
    render_frames(&template, frames, effects, run, rng, |i, rgb| {
        let rgb = scale_rgb(rgb, work, out)?;
        let path = if frames == 1 {
            output.to_path_buf()
        } else {
            codec::numbered_path(output, i)
        };
        codec::save_rgb(&path, &rgb, out.0, out.1, format)
            .with_context(|| format!("Cannot save image '{}'", path.display()))?;
        debug!("Wrote {}", path.display());
        Ok(())
    })?;

    info!(
        "Output: {} ({}x{}) in {:.1} ms",
        output.display(),
        out.0,
        out.1,
        t0.elapsed().as_secs_f64() * 1000.0
    );
    Ok(())
}

fn cmd_colorbars(
    output: &Path,
    width: usize,
    height: usize,
    effects: &EffectArgs,
    run: &Run<'_>,
    rng: &mut StdRng,
) -> Result<()> {
    let format = OutputFormat::resolve(output, effects.format.as_deref())?;
    info!("Generating SECAM color bars ({}x{})...", width, height);
    let bars = colorbars::generate(width, height)?;

    render_frames(&bars, 1, effects, run, rng, |_, rgb| {
        codec::save_rgb(output, &rgb, width, height, format)
            .with_context(|| format!("Cannot save image '{}'", output.display()))?;
        Ok(())
    })?;

    info!("Output: {} ({}x{})", output.display(), width, height);
    Ok(())
}

fn make_progress_bar(total_frames: usize, quiet: bool) -> ProgressBar {
    if quiet || total_frames <= 1 {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total_frames as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "Frames {bar:40.cyan/blue} {pos}/{len} [{elapsed_precise}<{eta_precise}]",
        )
        .expect("progress template is valid")
        .progress_chars("##-"),
    );
    pb
}
