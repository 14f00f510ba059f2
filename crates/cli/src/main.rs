use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use clap::Parser;
use crossbeam_channel::Receiver;

use qrhint_core::analysis::analysis_executor::ConcurrencyPolicy;
use qrhint_core::analysis::analysis_logger::StatsAnalysisLogger;
use qrhint_core::analysis::qr_analyzer::{DetectorBackends, FrameDisposition, QrAnalyzer};
use qrhint_core::analysis::report::{AnalysisOutcome, ChannelReportSink};
use qrhint_core::capture::domain::frame_source::FrameSource;
use qrhint_core::capture::frame_gatekeeper::CooldownMode;
use qrhint_core::capture::infrastructure::image_sequence_reader::ImageSequenceReader;
use qrhint_core::shared::settings::AnalyzerSettings;

/// Flags QR codes that are visible but unreadable in an image sequence.
#[derive(Parser)]
#[command(name = "qrhint")]
struct Cli {
    /// Input image file or directory of images.
    input: PathBuf,

    /// Settings file (defaults to the user config directory if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frame rate used to timestamp the image sequence.
    #[arg(long, default_value = "30")]
    fps: f64,

    /// Minimum time between analyzed frames, in milliseconds.
    #[arg(long)]
    cooldown_ms: Option<u64>,

    /// Never re-arm the cooldown (every frame is analyzed).
    #[arg(long)]
    literal_cooldown: bool,

    /// Maximum analyses queued or running at once.
    #[arg(long, conflicts_with = "unbounded")]
    max_in_flight: Option<usize>,

    /// Spawn one analysis per accepted frame with no cap.
    #[arg(long)]
    unbounded: bool,

    /// Score each unreadable candidate and report a verdict.
    #[arg(long)]
    assess: bool,

    /// Minimum candidate side (0.0-1.0) used by --assess.
    #[arg(long, requires = "assess")]
    min_size: Option<f64>,

    /// Quality score below which --assess reports a candidate as blurry.
    #[arg(long, requires = "assess")]
    min_quality: Option<f64>,

    /// Also assess rectangle candidates.
    #[arg(long, requires = "assess")]
    include_rectangles: bool,

    /// Print one JSON object per outcome.
    #[arg(long)]
    json: bool,

    /// Replay frames in real time instead of as fast as possible.
    #[arg(long)]
    pace: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let settings = build_settings(&cli, existing_default_settings())?;

    let mut reader = ImageSequenceReader::new(cli.fps);
    let metadata = reader.open(&cli.input)?;
    log::info!(
        "Analyzing {} frames at {} fps (cooldown {}ms)",
        metadata.total_samples,
        metadata.fps,
        settings.cooldown_ms
    );

    let (sink, outcomes) = ChannelReportSink::unbounded();
    let stats = StatsAnalysisLogger::shared();
    let mut analyzer = QrAnalyzer::from_settings(
        &settings,
        DetectorBackends::default(),
        Arc::new(sink),
        stats.clone(),
    )?;
    let printer = spawn_printer(outcomes, cli.json);

    let started = Instant::now();
    let mut busy = 0usize;
    for (sample, timestamp) in reader.samples() {
        if cli.pace {
            if let Some(wait) = timestamp.checked_sub(started.elapsed()) {
                std::thread::sleep(wait);
            }
        }
        if analyzer.on_sample(&sample, timestamp) == FrameDisposition::Busy {
            busy += 1;
        }
    }
    reader.close();

    analyzer.shutdown();
    let gate = analyzer.gatekeeper_stats();
    drop(analyzer);

    let prompts = printer
        .join()
        .map_err(|_| "report printer panicked")?;

    eprintln!(
        "{} frames: {} analyzed, {} throttled, {} unconvertible, {} dropped busy; {} need a prompt",
        metadata.total_samples,
        (gate.accepted as usize).saturating_sub(busy),
        gate.throttled,
        gate.unconvertible,
        busy,
        prompts
    );
    if let Ok(stats) = stats.lock() {
        if let Some(summary) = stats.summary_string() {
            eprintln!("{summary}");
        }
    }
    Ok(())
}

/// Prints outcomes as they arrive; returns how many frames need a prompt.
fn spawn_printer(outcomes: Receiver<AnalysisOutcome>, json: bool) -> JoinHandle<usize> {
    std::thread::spawn(move || {
        let mut prompts = 0;
        for outcome in outcomes {
            if let AnalysisOutcome::Completed(report) = &outcome {
                if report.needs_user_prompt() {
                    prompts += 1;
                }
            }
            if json {
                match serde_json::to_string(&outcome) {
                    Ok(line) => println!("{line}"),
                    Err(e) => log::warn!("Could not serialize outcome: {e}"),
                }
            } else {
                println!("{}", describe(&outcome));
            }
        }
        prompts
    })
}

fn describe(outcome: &AnalysisOutcome) -> String {
    match outcome {
        AnalysisOutcome::Completed(report) => {
            let mut line = format!(
                "{:>8.3}s  unreadable QR: {}  rectangles: {}",
                report.timestamp.as_secs_f64(),
                report.unreadable_qr.len(),
                report.rectangles.len()
            );
            for assessment in &report.assessments {
                let score = assessment
                    .quality
                    .map_or_else(|| "-".to_string(), |q| format!("{:.4}", q.value));
                line.push_str(&format!(
                    "\n           {:?} at ({:.2}, {:.2}) score {score}",
                    assessment.verdict,
                    assessment.candidate.bounding_box.x,
                    assessment.candidate.bounding_box.y
                ));
            }
            line
        }
        AnalysisOutcome::Failed {
            timestamp, message, ..
        } => format!("{:>8.3}s  failed: {message}", timestamp.as_secs_f64()),
    }
}

/// Loads `--config`, else `default_path`, else defaults, then applies flags.
fn build_settings(
    cli: &Cli,
    default_path: Option<PathBuf>,
) -> Result<AnalyzerSettings, Box<dyn std::error::Error>> {
    let mut settings = match cli.config.clone().or(default_path) {
        Some(path) => {
            log::info!("Loading settings from {}", path.display());
            AnalyzerSettings::load(&path)?
        }
        None => AnalyzerSettings::default(),
    };

    if let Some(ms) = cli.cooldown_ms {
        settings.cooldown_ms = ms;
    }
    if cli.literal_cooldown {
        settings.cooldown_mode = CooldownMode::Literal;
    }
    if cli.unbounded {
        settings.concurrency = ConcurrencyPolicy::Unbounded;
    } else if let Some(max_in_flight) = cli.max_in_flight {
        settings.concurrency = ConcurrencyPolicy::DropIfBusy { max_in_flight };
    }
    if cli.assess {
        let mut check = settings.quality_check.take().unwrap_or_default();
        if let Some(min_size) = cli.min_size {
            check.min_relative_size = min_size;
        }
        if cli.min_quality.is_some() {
            check.min_quality_score = cli.min_quality;
        }
        check.include_rectangles |= cli.include_rectangles;
        settings.quality_check = Some(check);
    }

    settings.validate()?;
    Ok(settings)
}

fn existing_default_settings() -> Option<PathBuf> {
    AnalyzerSettings::default_path().filter(|p| p.exists())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input not found: {}", cli.input.display()).into());
    }
    if !(cli.fps.is_finite() && cli.fps > 0.0) {
        return Err(format!("Frame rate must be positive, got {}", cli.fps).into());
    }
    Ok(())
}
