// ============================================================================
// iGANKit CLI — headless latent sampling and brush recoloring
// ============================================================================
//
// Usage examples:
//   igankit sample --mode sweep --level 2 --dims 100,100,100 --batch-size 64 -o z.lsd
//   igankit sample --mode indexed --level 0 --dim 5 --seed 7
//   igankit fusion --config igan.toml -o fused.lsd
//   igankit inspect z.lsd
//   igankit paint -i photo.png --points "10,10;40,32" --color ff3300 --width 8 -o out.png
//   igankit paint -i "shots/*.png" --points "5,5" --color 00ff00 --output-dir painted/
//
// All processing runs synchronously on the current thread, apart from the
// per-row HSV merge.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use image::Rgb;

use crate::components::color_tool::ColorTool;
use crate::config::{AppConfig, SamplerConfig};
use crate::error::{IganError, Result};
use crate::io::{load_samples, save_samples};
use crate::latent::{self, LatentSamples, Mode};
use crate::{log_err, log_info};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// iGANKit headless tools.
#[derive(Parser, Debug)]
#[command(
    name = "igankit",
    version,
    about = "Latent sampling and brush recoloring for pyramid GAN editors",
    long_about = "Build latent-sample dictionaries for a hierarchical generator and\n\
                  recolor images with hue/saturation brush strokes, without a GUI.\n\n\
                  Example:\n  \
                  igankit sample --mode sweep --level 1 --dims 100,100,100 -o z.lsd\n  \
                  igankit paint -i photo.png --points \"10,10;40,32\" --color ff3300 -o out.png"
)]
pub struct CliArgs {
    /// TOML configuration file ([sampler] and [brush] sections).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the session log here instead of the platform data directory.
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Print per-level summaries and per-file timing.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a latent dictionary in one of the sampling modes.
    Sample(SampleArgs),
    /// Build a mode-5 dictionary and compose the fusion rows.
    Fusion(FusionArgs),
    /// Print the summary of a saved .lsd file.
    Inspect {
        #[arg(value_name = "FILE.lsd")]
        file: PathBuf,
    },
    /// Recolor images along a brush stroke, keeping their luminance.
    Paint(PaintArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct SamplerOverrides {
    /// Batch size (overrides config).
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Comma-separated latent widths per pyramid level (overrides config).
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub dims: Option<Vec<usize>>,

    /// Sample a flat (non-pyramid) generator with this latent width.
    #[arg(long, value_name = "Z_DIM")]
    pub flat: Option<usize>,

    /// RNG seed for reproducible dictionaries.
    #[arg(long)]
    pub seed: Option<u64>,
}

impl SamplerOverrides {
    fn apply(&self, mut cfg: SamplerConfig) -> SamplerConfig {
        if let Some(b) = self.batch_size {
            cfg.batch_size = b;
        }
        if let Some(dims) = &self.dims {
            cfg.dims = dims.clone();
            cfg.use_z_pyramid = true;
        }
        if let Some(z) = self.flat {
            cfg.z_dim = z;
            cfg.use_z_pyramid = false;
        }
        if self.seed.is_some() {
            cfg.seed = self.seed;
        }
        cfg
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Random,
    Replicated,
    Sweep,
    Indexed,
    Fusion,
}

#[derive(Args, Debug)]
pub struct SampleArgs {
    #[arg(short, long, value_enum, default_value_t = ModeArg::Random)]
    pub mode: ModeArg,

    /// Pyramid level to sweep (sweep / indexed modes).
    #[arg(long)]
    pub level: Option<usize>,

    /// Latent component to sweep (indexed mode).
    #[arg(long)]
    pub dim: Option<usize>,

    #[command(flatten)]
    pub sampler: SamplerOverrides,

    /// Save the dictionary as a bincode .lsd file.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct FusionArgs {
    #[command(flatten)]
    pub sampler: SamplerOverrides,

    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct PaintArgs {
    /// Input image(s). Glob patterns accepted (e.g. "*.png").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Stroke points in display coordinates: "x,y;x,y;...".
    #[arg(short, long)]
    pub points: String,

    /// Stroke color as hex RRGGBB (leading '#' optional).
    #[arg(short, long)]
    pub color: String,

    /// Brush width in display pixels (overrides config).
    #[arg(short, long)]
    pub width: Option<i32>,

    /// Display-to-image scale factor (overrides config).
    #[arg(short, long)]
    pub scale: Option<f32>,

    /// Output file path. Only valid for single-file input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run one command and return an OS exit code.
pub fn run(args: CliArgs) -> ExitCode {
    let config = match &args.config {
        Some(path) => match AppConfig::load_from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("error: could not load config '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => AppConfig::default(),
    };

    let result = match &args.command {
        Command::Sample(a) => run_sample(a, &config, args.verbose),
        Command::Fusion(a) => run_fusion(a, &config, args.verbose),
        Command::Inspect { file } => load_samples(file).map(|z| print_summary(&z)),
        Command::Paint(a) => run_paint(a, &config, args.verbose),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log_err!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Sampling commands
// ============================================================================

/// Map the CLI mode plus its optional level/dim to a [`Mode`].
pub fn resolve_mode(mode: ModeArg, level: Option<usize>, dim: Option<usize>) -> Result<Mode> {
    let need_level = || {
        level.ok_or_else(|| IganError::InvalidConfiguration("this mode needs --level".into()))
    };
    Ok(match mode {
        ModeArg::Random => Mode::FullRandom,
        ModeArg::Fusion => Mode::Fusion,
        ModeArg::Replicated => Mode::Replicated,
        ModeArg::Sweep => match level {
            Some(level) => Mode::SharedSweep { level },
            None => Mode::Replicated,
        },
        ModeArg::Indexed => Mode::IndexedSweep {
            level: need_level()?,
            dim: dim.ok_or_else(|| {
                IganError::InvalidConfiguration("indexed mode needs --dim".into())
            })?,
        },
    })
}

fn run_sample(args: &SampleArgs, config: &AppConfig, verbose: bool) -> Result<()> {
    let cfg = args.sampler.apply(config.sampler.clone());
    let mode = resolve_mode(args.mode, args.level, args.dim)?;
    let mut rng = cfg.rng();
    let z = latent::sample(&mut rng, &cfg.layout(), cfg.batch_size, mode)?;
    finish_dictionary(&z, args.output.as_deref(), verbose)
}

fn run_fusion(args: &FusionArgs, config: &AppConfig, verbose: bool) -> Result<()> {
    let cfg = args.sampler.apply(config.sampler.clone());
    let mut rng = cfg.rng();
    let z = latent::fusion(&mut rng, &cfg.layout(), cfg.batch_size)?;
    finish_dictionary(&z, args.output.as_deref(), verbose)
}

fn finish_dictionary(z: &LatentSamples, output: Option<&Path>, verbose: bool) -> Result<()> {
    if verbose || output.is_none() {
        print_summary(z);
    }
    if let Some(path) = output {
        save_samples(z, path)?;
        println!("  → {}", path.display());
    }
    Ok(())
}

fn print_summary(z: &LatentSamples) {
    println!("batch size {}, {} entr{}", z.batch_size(), z.len(), if z.len() == 1 { "y" } else { "ies" });
    for s in z.summary() {
        println!(
            "  {:<9} {:>4} x {:<5} min {:+.4}  max {:+.4}  mean {:+.4}",
            s.key.to_string(),
            s.rows,
            s.cols,
            s.min,
            s.max,
            s.mean
        );
    }
}

// ============================================================================
// Paint command
// ============================================================================

fn run_paint(args: &PaintArgs, config: &AppConfig, verbose: bool) -> Result<()> {
    let points = parse_points(&args.points)?;
    let color = parse_color(&args.color)?;
    let brush_width = args.width.unwrap_or(config.brush.brush_width);
    let scale = args.scale.unwrap_or(config.brush.scale);

    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        return Err(IganError::InvalidConfiguration(
            "no input files matched the given pattern(s)".into(),
        ));
    }
    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        return Err(IganError::InvalidConfiguration(format!(
            "{} input files given but --output only accepts a single file path; use --output-dir",
            inputs.len()
        )));
    }
    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir)?;
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut failures = 0usize;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }
        let start = Instant::now();
        let output_path =
            build_output_path(input_path, args.output.as_deref(), args.output_dir.as_deref());

        match paint_one(input_path, &output_path, &points, color, brush_width, scale) {
            Ok(()) => {
                if verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                log_err!("{}: {}", input_path.display(), e);
                eprintln!("  error: {}", e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        return Err(IganError::InvalidConfiguration(format!(
            "{} of {} file(s) failed",
            failures, total
        )));
    }
    Ok(())
}

fn paint_one(
    input: &Path,
    output: &Path,
    points: &[(f32, f32)],
    color: Rgb<u8>,
    brush_width: i32,
    scale: f32,
) -> Result<()> {
    let img = image::open(input)?;
    let tool = ColorTool::new(img.width() as i64, img.height() as i64, brush_width, scale)?;
    if img.color().has_alpha() {
        tool.paint_rgba(&img.to_rgba8(), points, color)?.save(output)?;
    } else {
        tool.paint(&img.to_rgb8(), points, color)?.save(output)?;
    }
    log_info!("painted {} → {}", input.display(), output.display());
    Ok(())
}

/// Parse `"x,y;x,y"` into display-space points.
pub fn parse_points(text: &str) -> Result<Vec<(f32, f32)>> {
    text.split(';')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|pair| {
            let (x, y) = pair.split_once(',').ok_or_else(|| {
                IganError::InvalidConfiguration(format!("point '{}' is not 'x,y'", pair))
            })?;
            let parse = |v: &str| {
                v.trim().parse::<f32>().map_err(|_| {
                    IganError::InvalidConfiguration(format!("bad coordinate '{}'", v.trim()))
                })
            };
            Ok((parse(x)?, parse(y)?))
        })
        .collect()
}

/// Parse `RRGGBB` / `#RRGGBB`.
pub fn parse_color(hex: &str) -> Result<Rgb<u8>> {
    let hex = hex.trim().trim_start_matches('#');
    let bad = || IganError::InvalidConfiguration(format!("color '{}' is not RRGGBB", hex));
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(bad());
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| bad());
    Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);
        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Output path for one input:
/// 1. `--output` when given,
/// 2. `--output-dir/<file name>`,
/// 3. `<stem>_painted.<ext>` next to the input.
fn build_output_path(input: &Path, output: Option<&Path>, output_dir: Option<&Path>) -> PathBuf {
    if let Some(out) = output {
        return out.to_path_buf();
    }
    let file_name = input
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "painted.png".into());
    if let Some(dir) = output_dir {
        return dir.join(file_name);
    }

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let ext = input
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "png".to_string());
    input
        .parent()
        .unwrap_or(Path::new("."))
        .join(format!("{}_painted.{}", stem, ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_parse_and_reject() {
        assert_eq!(parse_points("1,2; 3.5,4").unwrap(), vec![(1.0, 2.0), (3.5, 4.0)]);
        assert_eq!(parse_points("").unwrap(), vec![]);
        assert!(parse_points("1;2").is_err());
        assert!(parse_points("a,2").is_err());
    }

    #[test]
    fn colors_parse() {
        assert_eq!(parse_color("#ff3300").unwrap(), Rgb([255, 51, 0]));
        assert_eq!(parse_color("00FF00").unwrap(), Rgb([0, 255, 0]));
        assert!(parse_color("fff").is_err());
        assert!(parse_color("gg0000").is_err());
    }

    #[test]
    fn modes_resolve() {
        assert_eq!(resolve_mode(ModeArg::Sweep, Some(2), None).unwrap(), Mode::SharedSweep { level: 2 });
        assert_eq!(resolve_mode(ModeArg::Sweep, None, None).unwrap(), Mode::Replicated);
        assert!(resolve_mode(ModeArg::Indexed, Some(0), None).is_err());
        assert_eq!(
            resolve_mode(ModeArg::Indexed, Some(1), Some(3)).unwrap(),
            Mode::IndexedSweep { level: 1, dim: 3 }
        );
    }

    #[test]
    fn output_path_fallbacks() {
        let input = Path::new("shots/cat.jpg");
        assert_eq!(build_output_path(input, None, None), PathBuf::from("shots/cat_painted.jpg"));
        assert_eq!(
            build_output_path(input, None, Some(Path::new("out"))),
            PathBuf::from("out/cat.jpg")
        );
        assert_eq!(
            build_output_path(input, Some(Path::new("x.png")), Some(Path::new("out"))),
            PathBuf::from("x.png")
        );
    }

    #[test]
    fn overrides_switch_layout() {
        let o = SamplerOverrides { flat: Some(12), seed: Some(1), ..Default::default() };
        let cfg = o.apply(SamplerConfig::default());
        assert!(!cfg.use_z_pyramid);
        assert_eq!(cfg.z_dim, 12);
        assert_eq!(cfg.seed, Some(1));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        CliArgs::command().debug_assert();
    }

    #[test]
    fn sample_args_parse() {
        let args = CliArgs::try_parse_from([
            "igankit", "sample", "--mode", "indexed", "--level", "1", "--dim", "4",
            "--dims", "8,8,8", "-b", "16",
        ])
        .unwrap();
        match args.command {
            Command::Sample(s) => {
                assert_eq!(s.mode, ModeArg::Indexed);
                assert_eq!(s.sampler.dims, Some(vec![8, 8, 8]));
                assert_eq!(s.sampler.batch_size, Some(16));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
