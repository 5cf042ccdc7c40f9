use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;

use facet_core::detection::domain::face_detector::FaceDetector;
use facet_core::detection::infrastructure::embedding_face_detector::EmbeddingFaceDetector;
use facet_core::detection::infrastructure::onnx_yolo_detector::{
    OnnxYoloDetector, DEFAULT_CONFIDENCE,
};
use facet_core::identity::domain::signature_store::SignatureStore;
use facet_core::identity::domain::similarity_matcher::SearchResponse;
use facet_core::identity::infrastructure::json_signature_store::JsonSignatureStore;
use facet_core::pipeline::analyze_video_use_case::AnalyzeVideoUseCase;
use facet_core::pipeline::pipeline_logger::LogPipelineLogger;
use facet_core::pipeline::search_face_use_case::SearchFaceUseCase;
use facet_core::shared::constants::IMAGE_EXTENSIONS;
use facet_core::shared::model_resolver::{
    self, ModelSpec, ProgressFn, FACE_DETECTION_MODEL, FACE_EMBEDDING_MODEL,
};
use facet_core::video::domain::video_reader::VideoReader;
use facet_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use facet_core::video::infrastructure::image_file_reader::ImageFileReader;

/// Index the faces in videos and find when a person appears.
#[derive(Parser)]
#[command(name = "facet", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding pre-provisioned model files (checked before the cache).
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    /// Minimum face detection confidence (0.0-1.0).
    #[arg(long, global = true, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f64,
}

#[derive(Subcommand)]
enum Command {
    /// Track every face in a video and store one signature per track.
    Analyze {
        /// Input video (or still image).
        video: PathBuf,

        /// Id to store the results under. Defaults to the file stem.
        #[arg(long)]
        video_id: Option<String>,

        /// Signature store file; created if missing.
        #[arg(long)]
        store: PathBuf,
    },
    /// Look for the face in a photo among a video's stored signatures.
    Search {
        video_id: String,

        /// Query photo; the first detected face is used.
        image: PathBuf,

        #[arg(long)]
        store: PathBuf,
    },
    /// List indexed videos and their track counts.
    List {
        #[arg(long)]
        store: PathBuf,
    },
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

    match &cli.command {
        Command::Analyze {
            video,
            video_id,
            store,
        } => {
            let video_id = match video_id {
                Some(id) => id.clone(),
                None => default_video_id(video)?,
            };
            run_analyze(&cli, video, &video_id, store)
        }
        Command::Search {
            video_id,
            image,
            store,
        } => run_search(&cli, video_id, image, store),
        Command::List { store } => {
            let store = JsonSignatureStore::open(store)?;
            print_json(&store.videos()?)
        }
    }
}

fn run_analyze(
    cli: &Cli,
    video: &Path,
    video_id: &str,
    store_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(JsonSignatureStore::open(store_path)?);
    let detector = build_detector(cli)?;

    let mut use_case = AnalyzeVideoUseCase::new(video, open_reader(video), detector, store.clone())
        .with_logger(Box::new(LogPipelineLogger::default()));
    let report = use_case.execute(video_id)?;
    log::info!("Indexed '{video_id}' into {}", store.path().display());
    print_json(&report)
}

fn run_search(
    cli: &Cli,
    video_id: &str,
    image: &Path,
    store_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let store: Arc<dyn SignatureStore> = Arc::new(JsonSignatureStore::open(store_path)?);
    let query = ImageFileReader::load_frame(image)?;
    let detector = build_detector(cli)?;

    let outcome = SearchFaceUseCase::new(detector, store).execute(video_id, &query);
    print_json(&SearchResponse::from(&outcome))
}

fn build_detector(cli: &Cli) -> Result<Arc<dyn FaceDetector>, Box<dyn std::error::Error>> {
    let detection_path = resolve_model(FACE_DETECTION_MODEL, cli.model_dir.as_deref())?;
    let embedding_path = resolve_model(FACE_EMBEDDING_MODEL, cli.model_dir.as_deref())?;

    let yolo = OnnxYoloDetector::new(&detection_path, cli.confidence)?;
    Ok(Arc::new(EmbeddingFaceDetector::new(yolo, &embedding_path)?))
}

fn resolve_model(
    spec: ModelSpec,
    model_dir: Option<&Path>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {}", spec.name);
    let progress: ProgressFn = Box::new(move |downloaded: u64, total: u64| {
        if total > 0 {
            let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
            eprint!("\rDownloading {}... {pct}%", spec.name);
        } else {
            eprint!("\rDownloading {}... {downloaded} bytes", spec.name);
        }
    });
    Ok(model_resolver::resolve(spec, model_dir, Some(progress))?)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    let input = match &cli.command {
        Command::Analyze { video, .. } => Some(video),
        Command::Search { image, .. } => Some(image),
        Command::List { .. } => None,
    };
    if let Some(path) = input {
        if !path.exists() {
            return Err(format!("Input file not found: {}", path.display()).into());
        }
    }
    if let Command::Search { video_id, .. } = &cli.command {
        if video_id.trim().is_empty() {
            return Err("Video id must not be empty".into());
        }
    }
    Ok(())
}

fn default_video_id(video: &Path) -> Result<String, Box<dyn std::error::Error>> {
    video
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            format!(
                "Cannot derive a video id from {}; pass --video-id",
                video.display()
            )
            .into()
        })
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn open_reader(input: &Path) -> Box<dyn VideoReader> {
    if is_image(input) {
        Box::new(ImageFileReader::new())
    } else {
        Box::new(FfmpegReader::new())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
