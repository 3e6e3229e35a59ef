mod console_logger;

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

use vt_core::dataset::domain::frame_dataset::FrameDataset;
use vt_core::dataset::infrastructure::lerobot_dataset::{default_root, LeRobotDataset};
use vt_core::encoding::mask_video_sink::MaskVideoSink;
use vt_core::inference::domain::inference_pipeline::InferencePipeline;
use vt_core::inference::infrastructure::threaded_inference_pipeline::ThreadedInferencePipeline;
use vt_core::inference::infrastructure::workflow_client::{WorkflowClient, WorkflowConfig};
use vt_core::pipeline::segment_batch_use_case::{format_elapsed, SegmentBatchUseCase};
use vt_core::pipeline::segment_video_use_case::{PreviewConfig, SegmentVideoUseCase};
use vt_core::pipeline::validate_frames_use_case::ValidateFramesUseCase;
use vt_core::shared::constants::{
    API_KEY_ENV, DEFAULT_API_URL, DEFAULT_CODEC, DEFAULT_CRF, DEFAULT_DATASET_REPO,
    DEFAULT_INPUT_FILE, DEFAULT_MAX_FPS, DEFAULT_OUTPUT_FPS, DEFAULT_PRESET, DEFAULT_WORKFLOW_ID,
    DEFAULT_WORKSPACE, INPUT_DIR_ENV, MASK_FIELD, OUTPUT_DIR_ENV, TIMESTAMP_TOLERANCE_S,
};
use vt_core::shared::encoding_profile::EncodingProfile;
use vt_core::video::domain::image_writer::ImageWriter;
use vt_core::video::domain::video_writer::VideoWriter;
use vt_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use vt_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;
use vt_core::video::infrastructure::image_file_writer::ImageFileWriter;

use crate::console_logger::ConsoleLogger;

/// Robotics dataset tooling: frame validation and segmentation re-encoding.
#[derive(Parser)]
#[command(name = "vt", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load every frame of a LeRobot dataset and report the ones that fail.
    Validate(ValidateArgs),
    /// Re-encode videos as segmentation mask overlays.
    Segment(SegmentArgs),
}

#[derive(Args)]
struct ValidateArgs {
    /// Dataset repository id, used to locate the local cache.
    #[arg(long, default_value = DEFAULT_DATASET_REPO)]
    repo_id: String,

    /// Dataset root directory (overrides the cache location of --repo-id).
    #[arg(long)]
    root: Option<PathBuf>,

    /// Allowed distance in seconds between requested and decoded timestamps.
    #[arg(long, default_value_t = TIMESTAMP_TOLERANCE_S)]
    tolerance: f64,

    /// Disable the progress bar.
    #[arg(long)]
    no_progress: bool,
}

#[derive(Args)]
struct SegmentArgs {
    /// Video file names inside the input directory, processed in order.
    #[arg(default_value = DEFAULT_INPUT_FILE)]
    files: Vec<String>,

    /// Directory containing the input videos.
    #[arg(long, env = INPUT_DIR_ENV)]
    input_dir: PathBuf,

    /// Directory for the re-encoded videos (created if missing).
    #[arg(long, env = OUTPUT_DIR_ENV)]
    output_dir: PathBuf,

    /// API key for the hosted workflow.
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    api_key: String,

    /// Workspace that owns the workflow.
    #[arg(long, default_value = DEFAULT_WORKSPACE)]
    workspace: String,

    /// Workflow id.
    #[arg(long, default_value = DEFAULT_WORKFLOW_ID)]
    workflow: String,

    /// Inference API base URL.
    #[arg(long, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Maximum frames per second sent to inference (0 = no limit).
    #[arg(long, default_value_t = DEFAULT_MAX_FPS)]
    max_fps: f64,

    /// Prediction field holding the mask overlay image.
    #[arg(long, default_value = MASK_FIELD)]
    mask_field: String,

    /// Output encoder name.
    #[arg(long, default_value = DEFAULT_CODEC)]
    codec: String,

    /// Output frame rate.
    #[arg(long, default_value_t = DEFAULT_OUTPUT_FPS)]
    fps: u32,

    /// Constant rate factor.
    #[arg(long, default_value_t = DEFAULT_CRF)]
    crf: u32,

    /// Encoder speed preset.
    #[arg(long, default_value_t = DEFAULT_PRESET)]
    preset: u32,

    /// Rewrite a preview PNG next to the output every N frames.
    #[arg(long, value_name = "N")]
    preview: Option<usize>,
}

fn main() {
    let dotenv = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match dotenv {
        Ok(path) => log::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => log::warn!("Ignoring .env: {e}"),
    }

    match run() {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when the command ran but found problems.
fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Validate(args) => run_validate(&args),
        Command::Segment(args) => run_segment(&args).map(|()| true),
    }
}

fn run_validate(args: &ValidateArgs) -> Result<bool, Box<dyn std::error::Error>> {
    validate_tolerance(args.tolerance)?;
    let root = match &args.root {
        Some(root) => root.clone(),
        None => default_root(&args.repo_id)?,
    };
    if !root.is_dir() {
        return Err(format!("Dataset not found: {}", root.display()).into());
    }

    println!("Loading dataset from {}", root.display());
    let dataset = LeRobotDataset::open(&root)?.with_tolerance(args.tolerance);
    println!("Dataset loaded: {} frames", dataset.len());

    let logger = ConsoleLogger::new(dataset.len(), !args.no_progress);
    let mut use_case = ValidateFramesUseCase::new(Box::new(dataset), Box::new(logger));
    let report = use_case.execute();

    println!("{}", report.render());
    Ok(report.is_clean())
}

fn run_segment(args: &SegmentArgs) -> Result<(), Box<dyn std::error::Error>> {
    validate_segment(args)?;

    let profile = EncodingProfile::default()
        .with_codec(&args.codec)
        .with_fps(args.fps)
        .with_crf(args.crf)
        .with_preset(args.preset);

    let client = WorkflowClient::new(WorkflowConfig::new(
        &args.api_url,
        &args.workspace,
        &args.workflow,
        &args.api_key,
    ))?;
    let max_fps = (args.max_fps > 0.0).then_some(args.max_fps);
    let pipeline: Box<dyn InferencePipeline<MaskVideoSink>> = Box::new(
        ThreadedInferencePipeline::new(Box::new(FfmpegReader::new()), Box::new(client), max_fps),
    );

    let make_writer = Box::new(|| -> Box<dyn VideoWriter> { Box::new(FfmpegWriter::new()) });
    let mut single = SegmentVideoUseCase::new(pipeline, make_writer, profile, &args.mask_field);
    if let Some(every) = args.preview {
        single = single.with_preview(PreviewConfig {
            make_writer: Box::new(|| -> Box<dyn ImageWriter> { Box::new(ImageFileWriter::new()) }),
            every,
        });
    }

    let mut batch = SegmentBatchUseCase::new(single);
    let summary = batch.execute(&args.files, &args.input_dir, &args.output_dir, |i, file| {
        println!();
        println!("Processing complete ({}/{})", i + 1, args.files.len());
        println!("Total frames processed: {}", file.frames);
        match &file.output {
            Some(output) => println!("Output saved to: {}", output.display()),
            None => println!("No mask frames produced; no output written"),
        }
        println!("Elapsed: {}", format_elapsed(file.elapsed));
    })?;

    if args.files.len() > 1 {
        println!();
        println!(
            "All videos complete: {} files, {} frames in {}",
            summary.files.len(),
            summary.total_frames(),
            format_elapsed(summary.total_elapsed())
        );
    }
    Ok(())
}

fn validate_tolerance(tolerance: f64) -> Result<(), Box<dyn std::error::Error>> {
    if tolerance.is_nan() || tolerance <= 0.0 {
        return Err(format!("Tolerance must be positive, got {tolerance}").into());
    }
    Ok(())
}

fn validate_segment(args: &SegmentArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !args.input_dir.is_dir() {
        return Err(format!("Input directory not found: {}", args.input_dir.display()).into());
    }
    for name in &args.files {
        let input = args.input_dir.join(name);
        if !input.is_file() {
            return Err(format!("Input file not found: {}", input.display()).into());
        }
    }
    if args.api_key.trim().is_empty() {
        return Err(format!("API key is empty; set --api-key or {API_KEY_ENV}").into());
    }
    if args.max_fps < 0.0 {
        return Err(format!("max-fps must not be negative, got {}", args.max_fps).into());
    }
    if args.fps == 0 {
        return Err("fps must be positive".into());
    }
    if args.crf > 63 {
        return Err(format!("CRF must be between 0 and 63, got {}", args.crf).into());
    }
    Ok(())
}
