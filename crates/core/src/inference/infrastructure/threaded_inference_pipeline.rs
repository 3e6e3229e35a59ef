use std::path::Path;
use std::thread::JoinHandle;

use crate::inference::domain::inference_pipeline::{InferencePipeline, PredictionSink};
use crate::inference::domain::segmentation_model::SegmentationModel;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

type SendError = Box<dyn std::error::Error + Send + Sync>;

/// Admits frames so that consecutive emitted timestamps are at least
/// `1 / max_fps` seconds apart.
#[derive(Clone, Debug)]
pub struct FrameRateLimiter {
    min_interval: Option<f64>,
    last_emitted: Option<f64>,
}

impl FrameRateLimiter {
    /// `None` or a non-positive rate admits every frame.
    pub fn new(max_fps: Option<f64>) -> Self {
        Self {
            min_interval: max_fps.filter(|fps| *fps > 0.0).map(|fps| 1.0 / fps),
            last_emitted: None,
        }
    }

    pub fn admit(&mut self, timestamp: f64) -> bool {
        let admitted = match (self.min_interval, self.last_emitted) {
            (Some(interval), Some(last)) => timestamp - last >= interval - 1e-9,
            _ => true,
        };
        if admitted {
            self.last_emitted = Some(timestamp);
        }
        admitted
    }
}

/// Counts reported by the decode thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub decoded: usize,
    pub dropped: usize,
}

type DecodeOutcome = (Box<dyn VideoReader>, Result<DecodeStats, SendError>);
type WorkerOutcome<S> = (Box<dyn SegmentationModel>, S, Result<usize, SendError>);

struct Running<S> {
    decode: JoinHandle<DecodeOutcome>,
    worker: JoinHandle<WorkerOutcome<S>>,
}

/// Runs a segmentation model over a video with dedicated threads.
///
/// Layout: `decode [rate limit] → worker [infer → sink]`
///
/// The reader and model are lent to the threads for the duration of one
/// run and returned on [`join`](InferencePipeline::join), so a single
/// pipeline can process several files in turn.
pub struct ThreadedInferencePipeline<S> {
    reader: Option<Box<dyn VideoReader>>,
    model: Option<Box<dyn SegmentationModel>>,
    max_fps: Option<f64>,
    channel_capacity: usize,
    running: Option<Running<S>>,
    last_stats: DecodeStats,
}

impl<S: PredictionSink + 'static> ThreadedInferencePipeline<S> {
    pub fn new(
        reader: Box<dyn VideoReader>,
        model: Box<dyn SegmentationModel>,
        max_fps: Option<f64>,
    ) -> Self {
        Self {
            reader: Some(reader),
            model: Some(model),
            max_fps,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            running: None,
            last_stats: DecodeStats::default(),
        }
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Decode counts from the most recently joined run.
    pub fn last_stats(&self) -> DecodeStats {
        self.last_stats
    }
}

impl<S: PredictionSink + 'static> InferencePipeline<S> for ThreadedInferencePipeline<S> {
    fn start(&mut self, source: &Path, sink: S) -> Result<(), Box<dyn std::error::Error>> {
        if self.running.is_some() {
            return Err("inference pipeline is already running".into());
        }
        let (Some(mut reader), Some(model)) = (self.reader.take(), self.model.take()) else {
            return Err("inference pipeline lost its reader or model in a previous run".into());
        };

        let metadata = match reader.open(source) {
            Ok(metadata) => metadata,
            Err(e) => {
                self.reader = Some(reader);
                self.model = Some(model);
                return Err(e);
            }
        };
        log::info!(
            "Starting inference on {}: {}x{} @ {:.2} fps, {} frames, max_fps {}",
            source.display(),
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.total_frames,
            self.max_fps
                .map(|fps| format!("{fps:.1}"))
                .unwrap_or_else(|| "unlimited".into())
        );

        let (frame_tx, frame_rx) =
            crossbeam_channel::bounded::<Result<Frame, SendError>>(self.channel_capacity);
        let decode = spawn_decoder(reader, metadata, self.max_fps, frame_tx);
        let worker = spawn_worker(model, sink, frame_rx);
        self.running = Some(Running { decode, worker });
        Ok(())
    }

    fn join(&mut self) -> Result<S, Box<dyn std::error::Error>> {
        let Running { decode, worker } = self
            .running
            .take()
            .ok_or("inference pipeline was not started")?;

        let worker_outcome = worker.join();
        let decode_outcome = decode.join();

        let mut first_error: Option<Box<dyn std::error::Error>> = None;
        let sink = match worker_outcome {
            Ok((model, sink, result)) => {
                self.model = Some(model);
                match result {
                    Ok(processed) => log::debug!("Worker processed {processed} frames"),
                    Err(e) => first_error = Some(e.to_string().into()),
                }
                Some(sink)
            }
            Err(_) => {
                first_error = Some("Inference worker thread panicked".into());
                None
            }
        };

        match decode_outcome {
            Ok((mut reader, result)) => {
                reader.close();
                self.reader = Some(reader);
                match result {
                    Ok(stats) => {
                        log::info!(
                            "Decoded {} frames, dropped {} over the rate limit",
                            stats.decoded,
                            stats.dropped
                        );
                        self.last_stats = stats;
                    }
                    Err(e) if first_error.is_none() => first_error = Some(e.to_string().into()),
                    Err(_) => {}
                }
            }
            Err(_) => {
                if first_error.is_none() {
                    first_error = Some("Decode thread panicked".into());
                }
            }
        }

        match (first_error, sink) {
            (None, Some(sink)) => Ok(sink),
            (Some(e), _) => Err(e),
            (None, None) => Err("inference worker returned no sink".into()),
        }
    }
}

fn spawn_decoder(
    mut reader: Box<dyn VideoReader>,
    metadata: VideoMetadata,
    max_fps: Option<f64>,
    frame_tx: crossbeam_channel::Sender<Result<Frame, SendError>>,
) -> JoinHandle<DecodeOutcome> {
    std::thread::spawn(move || {
        let mut limiter = FrameRateLimiter::new(max_fps);
        let mut stats = DecodeStats::default();
        let mut result: Result<(), SendError> = Ok(());

        for frame_result in reader.frames() {
            match frame_result {
                Ok(frame) => {
                    stats.decoded += 1;
                    let timestamp = frame
                        .timestamp()
                        .or_else(|| metadata.timestamp_of(frame.index()));
                    // Frames with no known time are never dropped.
                    let admitted = match timestamp {
                        Some(ts) => limiter.admit(ts),
                        None => true,
                    };
                    if !admitted {
                        stats.dropped += 1;
                        continue;
                    }
                    if frame_tx.send(Ok(frame)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let message = e.to_string();
                    // The worker reports the failure; the copy here covers a
                    // worker that already hung up.
                    let _ = frame_tx.send(Err(message.clone().into()));
                    result = Err(message.into());
                    break;
                }
            }
        }
        drop(frame_tx);
        (reader, result.map(|()| stats))
    })
}

fn spawn_worker<S: PredictionSink + 'static>(
    mut model: Box<dyn SegmentationModel>,
    mut sink: S,
    frame_rx: crossbeam_channel::Receiver<Result<Frame, SendError>>,
) -> JoinHandle<WorkerOutcome<S>> {
    std::thread::spawn(move || {
        let mut processed = 0usize;
        for frame_result in frame_rx {
            let step = frame_result.and_then(|frame| {
                let prediction = model
                    .infer(&frame)
                    .map_err(|e| -> SendError { format!("inference failed: {e}").into() })?;
                sink.on_prediction(&prediction, &frame)
            });
            if let Err(e) = step {
                return (model, sink, Err(e));
            }
            processed += 1;
        }
        (model, sink, Ok(processed))
    })
}
