use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, ValueEnum};

use facecount_core::annotation::infrastructure::box_annotator::BoxAnnotator;
use facecount_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use facecount_core::embedding::infrastructure::onnx_arcface_embedder::OnnxArcFaceEmbedder;
use facecount_core::pipeline::count_faces_use_case::CountFacesUseCase;
use facecount_core::pipeline::count_report::CountReport;
use facecount_core::pipeline::infrastructure::sequential_pipeline_executor::SequentialPipelineExecutor;
use facecount_core::pipeline::infrastructure::threaded_pipeline_executor::ThreadedPipelineExecutor;
use facecount_core::pipeline::pipeline_executor::PipelineExecutor;
use facecount_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use facecount_core::pipeline::settings::{OutputMode, PipelineSettings};
use facecount_core::shared::model_resolver::{
    self, ModelSpec, FACE_DETECTOR_MODEL, FACE_EMBEDDING_MODEL,
};
use facecount_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use facecount_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;
use facecount_core::video::infrastructure::image_file_writer::ImageFileWriter;

/// Count the unique faces in a video and write an annotated copy.
#[derive(Parser)]
#[command(name = "facecount")]
struct Cli {
    /// Input video file.
    input: PathBuf,

    /// Annotated output video.
    output: PathBuf,

    /// JSON settings file; command-line flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Missed samples before a track is dropped.
    #[arg(long)]
    max_age: Option<u32>,

    /// Hits required before a face is counted.
    #[arg(long)]
    n_init: Option<u32>,

    /// Appearance gate on cosine distance (0.0-2.0).
    #[arg(long)]
    max_cosine_distance: Option<f64>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// hold: each sampled frame fills its whole interval; passthrough:
    /// every source frame is written once.
    #[arg(long, value_enum)]
    output_mode: Option<OutputModeArg>,

    /// Decode and encode on separate threads.
    #[arg(long)]
    threaded: bool,

    /// Save one thumbnail per counted face to this directory.
    #[arg(long)]
    faces_dir: Option<PathBuf>,

    /// Format of the report printed to stdout.
    #[arg(long, value_enum, default_value = "text")]
    report: ReportFormat,

    /// Use this face detector model instead of the cached download.
    #[arg(long)]
    detector_model: Option<PathBuf>,

    /// Use this face embedding model instead of the cached download.
    #[arg(long)]
    embedder_model: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputModeArg {
    Hold,
    Passthrough,
}

impl From<OutputModeArg> for OutputMode {
    fn from(arg: OutputModeArg) -> Self {
        match arg {
            OutputModeArg::Hold => OutputMode::Hold,
            OutputModeArg::Passthrough => OutputMode::Passthrough,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    if !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    let settings = build_settings(&cli)?;

    let detector_path = resolve_model(FACE_DETECTOR_MODEL, cli.detector_model.as_deref())?;
    let embedder_path = resolve_model(FACE_EMBEDDING_MODEL, cli.embedder_model.as_deref())?;
    let detector = OnnxYoloDetector::new(&detector_path, settings.detector_confidence)?;
    let embedder = OnnxArcFaceEmbedder::new(&embedder_path)?;

    let executor: Box<dyn PipelineExecutor> = if cli.threaded {
        Box::new(ThreadedPipelineExecutor::new())
    } else {
        Box::new(SequentialPipelineExecutor::new())
    };

    let mut use_case = CountFacesUseCase::new(
        Box::new(FfmpegReader::new()),
        Box::new(FfmpegWriter::new()),
        Box::new(detector),
        Box::new(embedder),
        Box::new(BoxAnnotator::new(settings.annotation.clone())?),
        executor,
        settings,
    )
    .with_logger(Box::new(StdoutPipelineLogger::default()));
    if let Some(dir) = cli.faces_dir.clone() {
        use_case = use_case.with_face_export(Box::new(ImageFileWriter::new()), dir);
    }

    let report = use_case.execute(&cli.input, &cli.output)?;
    log::info!("Output written to {}", cli.output.display());
    print_report(&report, cli.report)
}

/// Settings file (or defaults) with command-line overrides applied.
fn build_settings(cli: &Cli) -> Result<PipelineSettings, Box<dyn std::error::Error>> {
    let mut settings = match &cli.config {
        Some(path) => PipelineSettings::load(path)?,
        None => PipelineSettings::default(),
    };

    if let Some(max_age) = cli.max_age {
        settings.tracker.max_age = max_age;
    }
    if let Some(n_init) = cli.n_init {
        settings.tracker.n_init = n_init;
    }
    if let Some(distance) = cli.max_cosine_distance {
        settings.tracker.max_cosine_distance = distance;
    }
    if let Some(confidence) = cli.confidence {
        settings.detector_confidence = confidence;
    }
    if let Some(mode) = cli.output_mode {
        settings.output_mode = mode.into();
    }

    settings.validate()?;
    Ok(settings)
}

fn resolve_model(
    spec: ModelSpec,
    override_path: Option<&Path>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if override_path.is_none() {
        log::info!("Resolving model: {}", spec.name);
    }
    let path = model_resolver::resolve(spec, override_path, None, Some(Box::new(download_progress)))?;
    Ok(path)
}

fn print_report(report: &CountReport, format: ReportFormat) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        ReportFormat::Text => println!("{report}"),
        ReportFormat::Json => println!("{}", report.to_json()?),
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading model... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading model... {downloaded} bytes");
    }
}
