//! Captcha solver CLI
//!
//! Runs the solver chain on a folder of recorded captcha screenshots
//! (`screenshot_000.png`, `screenshot_001.png`, ...) and prints the log to tap.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use growcastle_captcha::captcha::{analyze_frame, TiltParams, TiltSolver};
use growcastle_captcha::config::SolverSettings;
use growcastle_captcha::vision::debug::write_debug_artifacts;
use growcastle_captcha::vision::{FrameSource, SessionFolder};
use growcastle_captcha::LogCaptcha;

#[derive(Debug, Parser)]
#[command(name = "captcha-solve", about = "Solve a recorded Grow Castle log captcha")]
struct Args {
    /// Folder holding the captcha screenshots
    session_dir: PathBuf,

    /// Number of frames to use (default: all contiguous frames)
    #[arg(long)]
    frames: Option<usize>,

    /// Settings file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write an annotated overlay (and a .json report) of the deciding frame
    #[arg(long)]
    debug_out: Option<PathBuf>,

    /// Seed for the random fallback and tap jitter
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> ExitCode {
    let env = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(env).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let settings = match &args.config {
        Some(path) => SolverSettings::from_json_file(path)?,
        None => SolverSettings::default(),
    };

    let session = SessionFolder::new(&args.session_dir).with_region(settings.capture_region);
    let frame_count = args.frames.unwrap_or_else(|| session.count_frames());
    log::info!(
        "Solving captcha in {} ({} frames)",
        session.dir().display(),
        frame_count
    );

    let mut captcha = match args.seed {
        Some(seed) => LogCaptcha::with_seed(settings, seed),
        None => LogCaptcha::new(settings),
    };
    log::debug!("Strategies: {:?}", captcha.chain().strategy_names());

    let answer = captcha.solve(&session, frame_count)?;
    println!("log {} (solved by {})", answer.slot, answer.strategy);
    if let Some((x, y)) = answer.tap {
        println!("tap {} {}", x, y);
    }

    if let Some(path) = &args.debug_out {
        write_debug_frame(path, &session, frame_count, &captcha.settings)?;
    }

    Ok(())
}

/// Overlay the frame the tilt solver trusted, or the newest frame if none
fn write_debug_frame(
    path: &std::path::Path,
    session: &SessionFolder,
    frame_count: usize,
    settings: &SolverSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let solver = TiltSolver::new(TiltParams::from(settings));

    let (frame, analysis) = match solver.scan(session, frame_count) {
        Some(hit) => (hit.frame, hit.analysis),
        None => {
            let frame = session.load(frame_count.saturating_sub(1))?;
            let analysis = analyze_frame(&frame, solver.params());
            (frame, analysis)
        }
    };

    write_debug_artifacts(
        path,
        &frame,
        &analysis.features,
        analysis.winner,
        &analysis.positions,
    )?;
    println!("debug overlay written to {}", path.display());
    Ok(())
}
