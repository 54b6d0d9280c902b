use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use qr_scan::{
    CameraConfig, Detector, DetectorConfig, Facing, Frame, ReplayCamera, ScanAction, ScanConfig,
    ScanError, ScanHit, Scanner, SourceConfig, Sources,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "qrscan", version, about = "Scan QR codes from photos or a replayed camera")]
struct Cli {
    /// Skip the inverted-polarity retry
    #[arg(long, global = true)]
    no_inverted: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode each photo as its own scan session
    Photo {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Replay images as a camera stream until a code is found
    Replay {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Pause between frames
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Give up after this many frames (0 scans until a code is found)
        #[arg(long)]
        max_attempts: Option<u64>,
        /// Start again from the first image when the list runs out
        #[arg(long = "loop")]
        looping: bool,
        #[arg(long, value_enum, default_value_t = FacingArg::Environment)]
        facing: FacingArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FacingArg {
    User,
    Environment,
}

impl From<FacingArg> for Facing {
    fn from(arg: FacingArg) -> Self {
        match arg {
            FacingArg::User => Facing::User,
            FacingArg::Environment => Facing::Environment,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut detector_config = DetectorConfig::from_env();
    if cli.no_inverted {
        detector_config.try_inverted = false;
    }
    let detector = Detector::new(detector_config);

    match cli.command {
        Command::Photo { files } => photo_cmd(detector, &files),
        Command::Replay {
            files,
            interval_ms,
            max_attempts,
            looping,
            facing,
        } => {
            let mut config = ScanConfig::from_env();
            if let Some(ms) = interval_ms {
                config = config.with_interval(Duration::from_millis(ms));
            }
            if let Some(n) = max_attempts {
                config = config.with_max_attempts(n);
            }
            replay_cmd(detector, config, &files, looping, facing.into())
        }
    }
}

fn load(path: &Path) -> Result<Frame> {
    Frame::open(path).with_context(|| format!("cannot load {}", path.display()))
}

fn photo_cmd(detector: Detector, files: &[PathBuf]) -> Result<()> {
    let scanner = Scanner::new(Sources::photo_only()).with_decoder(detector);
    let mut missed = 0usize;
    for path in files {
        let frame = load(path)?;
        match scanner.scan_blocking(SourceConfig::Photo(frame)) {
            Ok(hit) => report(&path.display().to_string(), &hit),
            Err(ScanError::NotFound) => {
                println!("{}: no QR code found", path.display());
                missed += 1;
            }
            Err(err) => return Err(err).with_context(|| format!("scanning {}", path.display())),
        }
    }
    if missed == files.len() {
        bail!("no QR code found in {} file(s)", missed);
    }
    Ok(())
}

fn replay_cmd(
    detector: Detector,
    config: ScanConfig,
    files: &[PathBuf],
    looping: bool,
    facing: Facing,
) -> Result<()> {
    let frames = files.iter().map(|p| load(p)).collect::<Result<Vec<_>>>()?;
    let mut camera = ReplayCamera::new(frames);
    if looping {
        camera = camera.looping();
    }
    let scanner = Scanner::new(Sources::with_camera(camera))
        .with_decoder(detector)
        .with_config(config);

    let hit = scanner
        .scan_blocking(SourceConfig::Camera(CameraConfig::new(facing)))
        .context("replay scan failed")?;
    report(&format!("frame {}", hit.frame_sequence), &hit);
    Ok(())
}

fn report(origin: &str, hit: &ScanHit) {
    let code = &hit.code;
    println!(
        "{origin}: {} (version {}, {:?}, mask {:?}, {} attempt(s), {:.1?})",
        code.content,
        code.version.number(),
        code.error_correction,
        code.mask_pattern,
        hit.attempts,
        hit.elapsed
    );
    match ScanAction::from_payload(&code.content) {
        ScanAction::OpenUrl(url) => println!("  open {url}"),
        action @ ScanAction::Lookup(_) => {
            if let Some(path) = action.lookup_path() {
                println!("  lookup {path}");
            }
        }
        ScanAction::Empty => println!("  empty payload"),
    }
}
