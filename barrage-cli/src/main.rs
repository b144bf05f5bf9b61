//! Barrage CLI Tool
//!
//! Command-line interface for inspecting comment files, simulating overlay
//! playback and rendering preview frames.

use anyhow::{bail, Context, Result};
use barrage_core::{
    ClockSignal, Engine, EngineConfig, EventKind, EventStore, SeekStrategy, Viewport,
};
use barrage_render::FrameCompositor;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "barrage")]
#[command(about = "Barrage - time-synchronised comment overlays for video playback")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show statistics about a comment file
    Info {
        /// Input comment file (.xml or JSON)
        input: PathBuf,
    },

    /// Simulate frame-by-frame playback and report what the engine did
    Play {
        /// Input comment file (.xml or JSON)
        input: PathBuf,

        /// Playback start in seconds
        #[arg(long, default_value = "0")]
        from: f64,

        /// Playback end in seconds (default: 10s after the last comment)
        #[arg(long)]
        to: Option<f64>,

        /// Frames per second
        #[arg(long, default_value = "60")]
        fps: f64,

        /// Seek during playback, as AT:TO seconds (repeatable)
        #[arg(long = "jump", value_parser = parse_jump)]
        jumps: Vec<Jump>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Render the overlay at a point in time to an image
    Snapshot {
        /// Input comment file (.xml or JSON)
        input: PathBuf,

        /// Time in seconds to render
        #[arg(long)]
        at: f64,

        /// Output image path (format follows the extension)
        #[arg(short, long)]
        output: PathBuf,

        /// Frame width in pixels
        #[arg(long, default_value = "1280")]
        width: u32,

        /// Frame height in pixels
        #[arg(long, default_value = "720")]
        height: u32,

        /// Frames per second
        #[arg(long, default_value = "60")]
        fps: f64,

        /// Seconds of playback simulated before the snapshot
        #[arg(long, default_value = "10")]
        lookback: f64,

        #[command(flatten)]
        engine: EngineArgs,
    },
}

#[derive(Args)]
struct EngineArgs {
    /// Engine configuration file (JSON); flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum concurrent comments on screen
    #[arg(long)]
    capacity: Option<usize>,

    /// Seed for vertical placement
    #[arg(long)]
    seed: Option<u64>,
}

impl EngineArgs {
    fn resolve(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                serde_json::from_str(&text).context("Failed to parse config file")?
            }
            None => EngineConfig::default(),
        };
        if let Some(capacity) = self.capacity {
            config.capacity = capacity;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config.validate().context("Invalid engine configuration")?;
        Ok(config)
    }
}

/// A scripted seek: when playback reaches `at`, the playhead moves to `to`
#[derive(Debug, Clone, Copy)]
struct Jump {
    at: f64,
    to: f64,
}

fn parse_jump(value: &str) -> std::result::Result<Jump, String> {
    let (at, to) = value
        .split_once(':')
        .ok_or_else(|| format!("expected AT:TO, got '{}'", value))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<f64>()
            .ok()
            .filter(|t| t.is_finite() && *t >= 0.0)
            .ok_or_else(|| format!("'{}' is not a valid time", s))
    };
    Ok(Jump {
        at: parse(at)?,
        to: parse(to)?,
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Info { input } => show_info(&input)?,

        Commands::Play {
            input,
            from,
            to,
            fps,
            jumps,
            engine,
        } => play(&input, from, to, fps, jumps, &engine)?,

        Commands::Snapshot {
            input,
            at,
            output,
            width,
            height,
            fps,
            lookback,
            engine,
        } => {
            let viewport = Viewport::new(width as f32, height as f32);
            snapshot(&input, at, &output, viewport, fps, lookback, &engine)?
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load(input: &Path) -> Result<Arc<EventStore>> {
    let store = barrage_loader::load_file(input)
        .with_context(|| format!("Failed to load comments from {}", input.display()))?;
    Ok(Arc::new(store))
}

fn frame_step(fps: f64) -> Result<f64> {
    if !fps.is_finite() || fps <= 0.0 {
        bail!("fps must be a positive number, got {}", fps);
    }
    Ok(1.0 / fps)
}

#[derive(Debug, Default)]
struct PlaybackStats {
    ticks: u64,
    dispatched: usize,
    spawned: usize,
    dropped: usize,
    expired: usize,
    peak_live: usize,
    sequential_seeks: u64,
    binary_seeks: u64,
}

fn play(
    input: &Path,
    from: f64,
    to: Option<f64>,
    fps: f64,
    mut jumps: Vec<Jump>,
    args: &EngineArgs,
) -> Result<()> {
    let step = frame_step(fps)?;
    let store = load(input)?;
    let config = args.resolve()?;
    let mut engine = Engine::new(Arc::clone(&store), config, Viewport::default())
        .context("Failed to create engine")?;

    let end = to.unwrap_or_else(|| store.last_due().unwrap_or(0.0) + 10.0);
    if !from.is_finite() || !end.is_finite() || end < from {
        bail!("Invalid playback range {}..{}", from, end);
    }

    // applied in order of the moment they trigger
    jumps.sort_by(|a, b| a.at.total_cmp(&b.at));
    let mut pending = jumps.into_iter().peekable();

    println!(
        "Playing {} comments from {:.2}s to {:.2}s at {} fps",
        store.len(),
        from,
        end,
        fps
    );

    let mut stats = PlaybackStats::default();
    let mut time = from;
    // starting mid-video is a seek, not a backlog
    let mut jumped = from > 0.0;

    while time <= end {
        let report = engine.tick(ClockSignal {
            time,
            paused: false,
            jumped,
        });
        jumped = false;

        stats.ticks += 1;
        stats.dispatched += report.dispatched;
        stats.spawned += report.spawned;
        stats.dropped += report.dropped;
        stats.expired += report.expired;
        stats.peak_live = stats.peak_live.max(report.live);
        match report.seek.map(|s| s.strategy) {
            Some(SeekStrategy::Sequential) => stats.sequential_seeks += 1,
            Some(SeekStrategy::Binary) => stats.binary_seeks += 1,
            _ => {}
        }

        if let Some(jump) = pending.next_if(|jump| jump.at <= time) {
            info!(from = time, to = jump.to, "Seeking");
            time = jump.to;
            jumped = true;
        } else {
            time += step;
        }
    }

    println!("\n=== Playback Summary ===");
    println!("Ticks: {}", stats.ticks);
    println!("Dispatched: {}", stats.dispatched);
    println!("Spawned: {}", stats.spawned);
    println!(
        "Dropped (capacity {}): {}",
        engine.config().capacity,
        stats.dropped
    );
    println!("Expired: {}", stats.expired);
    println!("Peak on screen: {}", stats.peak_live);
    println!(
        "Re-syncs: {} sequential, {} binary",
        stats.sequential_seeks, stats.binary_seeks
    );
    println!("Still on screen: {}", engine.instance_manager().len());

    Ok(())
}

fn snapshot(
    input: &Path,
    at: f64,
    output: &Path,
    viewport: Viewport,
    fps: f64,
    lookback: f64,
    args: &EngineArgs,
) -> Result<()> {
    let step = frame_step(fps)?;
    if !at.is_finite() || at < 0.0 || !lookback.is_finite() || lookback < 0.0 {
        bail!("Snapshot time and lookback must be non-negative numbers");
    }

    let store = load(input)?;
    let config = args.resolve()?;
    let compositor =
        FrameCompositor::for_viewport(viewport).context("Invalid snapshot dimensions")?;
    let mut engine = Engine::new(store, config, viewport).context("Failed to create engine")?;

    let start = (at - lookback).max(0.0);
    let frames = ((at - start) / step).round() as u64;
    println!(
        "Simulating {} frames from {:.2}s to {:.2}s",
        frames + 1,
        start,
        at
    );

    engine.tick(ClockSignal {
        time: start,
        paused: false,
        jumped: start > 0.0,
    });
    for frame in 1..=frames {
        let time = (start + frame as f64 * step).min(at);
        engine.tick(ClockSignal::playing(time));
    }

    compositor
        .save_frame(engine.instances(), output)
        .context("Failed to save snapshot")?;

    println!(
        "Saved {} comments at {:.2}s to {}",
        engine.instances().count(),
        at,
        output.display()
    );

    Ok(())
}

fn show_info(input: &Path) -> Result<()> {
    let store = load(input)?;

    println!("\n=== Comment File Information ===");
    println!("Comments: {}", store.len());
    match (store.first_due(), store.last_due()) {
        (Some(first), Some(last)) => {
            println!("Span: {:.2}s to {:.2}s ({:.2} seconds)", first, last, last - first)
        }
        _ => println!("Span: empty"),
    }

    let count = |kind: EventKind| store.iter().filter(|e| e.kind == kind).count();
    println!(
        "Kinds: {} scroll, {} top, {} bottom",
        count(EventKind::Scroll),
        count(EventKind::Top),
        count(EventKind::Bottom)
    );

    let total_chars: usize = store.iter().map(|e| e.char_len()).sum();
    println!("Total text: {} characters", total_chars);

    println!("\n=== Comments (first 10) ===");
    for (i, event) in store.iter().take(10).enumerate() {
        println!(
            "  [{}] {:>8.2}s {:?} {} {}px: {}",
            i, event.due_time, event.kind, event.color, event.font_size, event.text
        );
    }
    if store.len() > 10 {
        println!("  ... and {} more comments", store.len() - 10);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_jump() {
        let jump = parse_jump("12.5:3").unwrap();
        assert_eq!(jump.at, 12.5);
        assert_eq!(jump.to, 3.0);

        assert!(parse_jump("12.5").is_err());
        assert!(parse_jump("a:1").is_err());
        assert!(parse_jump("1:-2").is_err());
    }

    #[test]
    fn test_cli_parses_play_flags() {
        let cli = Cli::try_parse_from([
            "barrage", "-v", "play", "c.json", "--fps", "30", "--jump", "5:60", "--jump", "70:1",
            "--capacity", "5",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Play {
                fps, jumps, engine, ..
            } => {
                assert_eq!(fps, 30.0);
                assert_eq!(jumps.len(), 2);
                assert_eq!(engine.capacity, Some(5));
            }
            _ => panic!("expected play"),
        }
    }

    #[test]
    fn test_engine_args_override_defaults() {
        let args = EngineArgs {
            config: None,
            capacity: Some(7),
            seed: Some(3),
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.capacity, 7);
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.base_speed, EngineConfig::default().base_speed);
    }

    #[test]
    fn test_frame_step_rejects_bad_fps() {
        assert!(frame_step(0.0).is_err());
        assert!(frame_step(f64::NAN).is_err());
        assert_eq!(frame_step(50.0).unwrap(), 0.02);
    }
}
