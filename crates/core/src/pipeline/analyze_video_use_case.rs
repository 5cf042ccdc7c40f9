use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::detection::domain::face_detector::FaceDetector;
use crate::identity::domain::sample::{Sample, SampleCollector};
use crate::identity::domain::signature_store::SignatureStore;
use crate::identity::domain::track_aggregator::TrackAggregator;
use crate::quality::domain::heuristic_quality_scorer::HeuristicQualityScorer;
use crate::quality::domain::quality_scorer::QualityScorer;
use crate::shared::video_metadata::VideoMetadata;
use crate::tracking::domain::face_tracker::{Detection, FaceTracker, TrackedBox};
use crate::tracking::domain::landmark_recovery::LandmarkRecoveryMatcher;
use crate::tracking::infrastructure::bytetrack_tracker::{ByteTracker, TrackerConfig};
use crate::video::domain::video_reader::VideoReader;

use super::frame_sampler::FrameSampler;
use super::pipeline_error::PipelineError;
use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};

/// Builds a fresh tracker for a video given its frame rate.
pub type TrackerFactory = Box<dyn Fn(f64) -> Box<dyn FaceTracker> + Send>;

pub fn bytetrack_factory() -> TrackerFactory {
    Box::new(|fps: f64| -> Box<dyn FaceTracker> {
        Box::new(ByteTracker::new(TrackerConfig::with_frame_rate(fps)))
    })
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub video_id: String,
    pub frames_read: usize,
    pub frames_analyzed: usize,
    /// Tracks that produced at least one sample.
    pub tracks_seen: usize,
    /// Tracks that ended up with a signature in the store.
    pub tracks_finalized: usize,
}

struct FrameLoopOutput {
    collector: SampleCollector,
    frames_read: usize,
    frames_analyzed: usize,
}

/// Turns one video into stored per-track identity signatures.
///
/// Frames are decoded in order, sampled, run through detection and
/// tracking, and each actively tracked face is scored and collected. When
/// the video ends every track is aggregated and the whole set replaces the
/// video's entry in the store in a single write. Any failure before that
/// write leaves the store untouched.
///
/// Single-use: `execute` consumes the reader, so a second call fails with
/// [`PipelineError::AlreadyExecuted`].
pub struct AnalyzeVideoUseCase {
    source: PathBuf,
    reader: Option<Box<dyn VideoReader>>,
    detector: Arc<dyn FaceDetector>,
    store: Arc<dyn SignatureStore>,
    scorer: Box<dyn QualityScorer>,
    tracker_factory: TrackerFactory,
    aggregator: TrackAggregator,
    logger: Box<dyn PipelineLogger>,
}

impl AnalyzeVideoUseCase {
    pub fn new(
        source: &Path,
        reader: Box<dyn VideoReader>,
        detector: Arc<dyn FaceDetector>,
        store: Arc<dyn SignatureStore>,
    ) -> Self {
        Self {
            source: source.to_path_buf(),
            reader: Some(reader),
            detector,
            store,
            scorer: Box::new(HeuristicQualityScorer::new()),
            tracker_factory: bytetrack_factory(),
            aggregator: TrackAggregator::default(),
            logger: Box::new(NullPipelineLogger),
        }
    }

    pub fn with_scorer(mut self, scorer: Box<dyn QualityScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_tracker_factory(mut self, factory: TrackerFactory) -> Self {
        self.tracker_factory = factory;
        self
    }

    pub fn with_aggregator(mut self, aggregator: TrackAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn execute(&mut self, video_id: &str) -> Result<AnalysisReport, PipelineError> {
        let mut reader = self.reader.take().ok_or(PipelineError::AlreadyExecuted)?;

        let metadata = match reader.open(&self.source) {
            Ok(m) => m,
            Err(e) => {
                reader.close();
                return Err(PipelineError::Decode(e.to_string()));
            }
        };
        log::info!(
            "Analyzing {} as '{video_id}': {}x{} @ {:.2} fps, {} frames",
            self.source.display(),
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.total_frames
        );

        let result = self.run_frames(reader.as_mut(), &metadata);
        reader.close();
        let output = result?;

        let tracks_seen = output.collector.track_count();
        let finalized = self.aggregator.finalize_all(output.collector);
        self.store.save_video(video_id, &finalized)?;

        self.logger.info(&format!(
            "Stored {} of {tracks_seen} tracks for '{video_id}'",
            finalized.len()
        ));
        self.logger.summary();

        Ok(AnalysisReport {
            video_id: video_id.to_string(),
            frames_read: output.frames_read,
            frames_analyzed: output.frames_analyzed,
            tracks_seen,
            tracks_finalized: finalized.len(),
        })
    }

    fn run_frames(
        &mut self,
        reader: &mut dyn VideoReader,
        metadata: &VideoMetadata,
    ) -> Result<FrameLoopOutput, PipelineError> {
        let mut tracker = (self.tracker_factory)(metadata.fps);
        let mut sampler = FrameSampler::new(metadata.fps);
        let mut collector = SampleCollector::new();
        let mut frames_read = 0;
        let mut frames_analyzed = 0;

        for frame in reader.frames() {
            let frame = frame.map_err(|e| PipelineError::Decode(e.to_string()))?;
            frames_read += 1;
            self.logger.progress(frames_read, metadata.total_frames);

            if !sampler.should_analyze() {
                continue;
            }
            frames_analyzed += 1;

            let t0 = Instant::now();
            let records = self
                .detector
                .detect(&frame)
                .map_err(|e| PipelineError::Detect {
                    frame: frame.index(),
                    message: e.to_string(),
                })?;
            self.logger.timing("detect", elapsed_ms(t0));
            self.logger.metric("faces_per_frame", records.len() as f64);

            // The tracker must see empty frames too, or lost tracks never age out
            let t0 = Instant::now();
            let detections: Vec<Detection> = records.iter().map(Detection::from).collect();
            let alive = tracker.update(&detections);
            // Lost tracks keep the sampler on every frame so their miss count
            // is measured in video frames, not analyzed ones
            let alive_count = alive.len();
            let active: Vec<TrackedBox> = alive.into_iter().filter(TrackedBox::is_tracked).collect();
            self.logger.timing("track", elapsed_ms(t0));

            let t0 = Instant::now();
            let timestamp = metadata.timestamp_of(frame.index());
            let matcher = LandmarkRecoveryMatcher::new(frame.width(), frame.height());
            for face in matcher.recover(&active, &records) {
                let Some(crop) = frame.crop(&face.crop_box) else {
                    continue;
                };
                let landmarks = face
                    .record
                    .landmarks
                    .as_ref()
                    .map(|l| l.translated(face.crop_box.x1, face.crop_box.y1));
                collector.push(
                    face.track_id,
                    Sample {
                        timestamp,
                        quality: self.scorer.score(&crop, landmarks.as_ref()),
                        embedding: face.record.embedding.clone(),
                    },
                );
            }
            self.logger.timing("score", elapsed_ms(t0));

            sampler.record(alive_count);
        }

        self.logger
            .metric("skipped_frames", sampler.skipped_frames() as f64);
        log::debug!(
            "Decoded {frames_read} frames, analyzed {frames_analyzed}, {} samples over {} tracks",
            collector.sample_count(),
            collector.track_count()
        );

        Ok(FrameLoopOutput {
            collector,
            frames_read,
            frames_analyzed,
        })
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
