mod display;
mod prompt;
mod settings;

use std::io;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;

use facegate_core::capture::infrastructure::ffmpeg_camera_source::FfmpegCameraSource;
use facegate_core::detection::domain::region_detector::RegionDetector;
use facegate_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use facegate_core::detection::infrastructure::skip_frame_detector::SkipFrameDetector;
use facegate_core::identity::infrastructure::sqlite_identity_store::SqliteIdentityStore;
use facegate_core::pipeline::identity_session_use_case::{
    IdentitySessionUseCase, SessionOptions, SessionReport,
};
use facegate_core::pipeline::session_logger::LogSessionLogger;
use facegate_core::shared::model_resolver::{
    self, ModelSpec, ProgressFn, FACE_DETECTOR_MODEL, FACE_EMBEDDING_MODEL,
};
use facegate_core::verification::domain::verifier::Verifier;
use facegate_core::verification::infrastructure::{embedding_verifier, histogram_verifier};

use display::SdlDisplay;
use settings::{Settings, VerifierKind};

/// Enroll a face from a live camera, or verify against an enrolled one.
///
/// With no one enrolled the captured face becomes the reference; after that
/// each capture is compared against the reference stored under the name.
/// Press 's' in the preview window to capture, 'q' to quit.
#[derive(Parser)]
#[command(name = "facegate")]
struct Cli {
    /// Camera device path or index (0 = /dev/video0). Video files work too.
    #[arg(long)]
    device: Option<String>,

    /// SQLite database holding enrolled identities.
    #[arg(long)]
    database: Option<PathBuf>,

    /// Identity name; prompted for when omitted.
    #[arg(long)]
    name: Option<String>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Face comparison backend.
    #[arg(long, value_enum)]
    verifier: Option<VerifierKind>,

    /// Similarity at or above which a capture is verified (0.0-1.0).
    #[arg(long)]
    threshold: Option<f64>,

    /// Run detection every Nth frame (1 = every frame).
    #[arg(long)]
    detect_every: Option<usize>,

    /// Longest wait for a key press between frames, in milliseconds.
    #[arg(long)]
    poll_ms: Option<u64>,

    /// Skip the side-by-side comparison window after verifying.
    #[arg(long)]
    no_compare: bool,
}

impl Cli {
    /// Layers the command-line flags over `settings`.
    fn apply_to(&self, settings: &mut Settings) {
        if let Some(device) = &self.device {
            settings.device = device.clone();
        }
        if let Some(database) = &self.database {
            settings.database = Some(database.clone());
        }
        if let Some(confidence) = self.confidence {
            settings.confidence = confidence;
        }
        if let Some(verifier) = self.verifier {
            settings.verifier = verifier;
        }
        if self.threshold.is_some() {
            settings.threshold = self.threshold;
        }
        if let Some(n) = self.detect_every {
            settings.detect_every = n;
        }
        if let Some(ms) = self.poll_ms {
            settings.poll_ms = ms;
        }
        if self.no_compare {
            settings.show_comparison = false;
        }
    }
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
    let mut settings = Settings::load();
    cli.apply_to(&mut settings);
    settings.validate()?;

    let store = SqliteIdentityStore::open(&settings.database_path())?;
    log::info!("Using identity store {}", store.location());

    let detector = build_detector(&settings)?;
    let verifier = build_verifier(&settings)?;
    let display = SdlDisplay::new("FaceGate")?;

    let mut use_case = IdentitySessionUseCase::new(
        Box::new(store),
        detector,
        verifier,
        Box::new(display),
        Box::new(LogSessionLogger::new()),
        SessionOptions {
            poll_interval: Duration::from_millis(settings.poll_ms),
            show_comparison: settings.show_comparison,
        },
    );

    let name = match cli.name {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => {
            let first = use_case.is_first_enrollment()?;
            prompt::read_name(&mut io::stdin().lock(), &mut io::stdout(), first)?
        }
    };

    let source = FfmpegCameraSource::new(&settings.device);
    log::info!("Opening camera {}", source.device());
    let report = use_case.execute(&name, Box::new(source))?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &SessionReport) {
    match report {
        SessionReport::Enrolled { name } => println!("Enrolled '{name}'."),
        SessionReport::Verified { name, verdict } => {
            let outcome = if verdict.verified {
                "verified"
            } else {
                "not verified"
            };
            println!(
                "'{name}' {outcome} (similarity {:.3}, threshold {:.3})",
                verdict.similarity, verdict.threshold
            );
        }
        SessionReport::Aborted => println!("No face captured."),
    }
}

fn build_detector(
    settings: &Settings,
) -> Result<Box<dyn RegionDetector>, Box<dyn std::error::Error>> {
    let model_path = resolve_model(&FACE_DETECTOR_MODEL, "face detection")?;
    let base: Box<dyn RegionDetector> =
        Box::new(OnnxYoloDetector::new(&model_path, settings.confidence)?);

    if settings.detect_every > 1 {
        Ok(Box::new(SkipFrameDetector::new(
            base,
            settings.detect_every,
        )?))
    } else {
        Ok(base)
    }
}

fn build_verifier(settings: &Settings) -> Result<Box<dyn Verifier>, Box<dyn std::error::Error>> {
    match settings.verifier {
        VerifierKind::Embedding => {
            let model_path = resolve_model(&FACE_EMBEDDING_MODEL, "face embedding")?;
            let threshold = settings
                .threshold
                .unwrap_or(embedding_verifier::DEFAULT_THRESHOLD);
            Ok(Box::new(embedding_verifier::EmbeddingVerifier::new(
                &model_path,
                threshold,
            )?))
        }
        VerifierKind::Histogram => {
            let threshold = settings
                .threshold
                .unwrap_or(histogram_verifier::DEFAULT_THRESHOLD);
            Ok(Box::new(histogram_verifier::HistogramVerifier::new(
                threshold,
            )))
        }
    }
}

fn resolve_model(
    spec: &ModelSpec,
    label: &'static str,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {}", spec.name);
    let progress: ProgressFn = Box::new(move |downloaded, total| {
        download_progress(label, downloaded, total)
    });
    let path = model_resolver::resolve(spec, None, Some(progress))?;
    Ok(path)
}

fn download_progress(label: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {label} model... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading {label} model... {downloaded} bytes");
    }
}
