use std::path::Path;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};

use crate::pipeline::frame_processor::{elapsed_ms, FrameProcessor, ProcessedFrame};
use crate::pipeline::pipeline_executor::{PipelineError, PipelineExecutor, ProgressCallback};
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

type SendError = Box<dyn std::error::Error + Send + Sync>;

/// Write durations in milliseconds, one per processed frame.
type WriterOutcome = Result<(Box<dyn VideoWriter>, Vec<f64>), SendError>;

/// Executes the pipeline with dedicated threads for decoding and encoding.
///
/// Layout: `reader → main [sample/detect/track/annotate] → writer`
///
/// Tracking is inherently sequential, so all processing stays on the
/// calling thread; the bounded channels let decoding and encoding overlap
/// with it.
pub struct ThreadedPipelineExecutor {
    channel_capacity: usize,
}

impl ThreadedPipelineExecutor {
    pub fn new() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn with_channel_capacity(capacity: usize) -> Self {
        Self {
            channel_capacity: capacity.max(1),
        }
    }
}

impl Default for ThreadedPipelineExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineExecutor for ThreadedPipelineExecutor {
    fn execute(
        &self,
        mut reader: Box<dyn VideoReader>,
        mut writer: Box<dyn VideoWriter>,
        processor: &mut FrameProcessor,
        metadata: &VideoMetadata,
        output_path: &Path,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<(), PipelineError> {
        if let Err(e) = writer.open(output_path, metadata) {
            reader.close();
            return Err(PipelineError::sink(e));
        }

        let cap = self.channel_capacity;
        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Result<Frame, SendError>>(cap);
        let (write_tx, write_rx) = crossbeam_channel::bounded::<ProcessedFrame>(cap);

        let reader_handle = spawn_reader(reader, frame_tx);
        let writer_handle = spawn_writer(writer, write_rx);

        let main_result = run_main_loop(
            frame_rx,
            &write_tx,
            processor,
            metadata.total_frames,
            on_progress,
        );

        drop(write_tx);

        join_threads(reader_handle, writer_handle, main_result, processor)
    }
}

fn spawn_reader(
    mut reader: Box<dyn VideoReader>,
    frame_tx: Sender<Result<Frame, SendError>>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for frame_result in reader.frames() {
            let failed = frame_result.is_err();
            let mapped = frame_result.map_err(|e| -> SendError { e.to_string().into() });
            if frame_tx.send(mapped).is_err() || failed {
                break;
            }
        }
        reader.close();
    })
}

fn spawn_writer(
    mut writer: Box<dyn VideoWriter>,
    write_rx: Receiver<ProcessedFrame>,
) -> JoinHandle<WriterOutcome> {
    std::thread::spawn(move || {
        let mut durations = Vec::new();
        for processed in write_rx {
            let start = Instant::now();
            if let Err(e) = processed.write_to(writer.as_mut()) {
                // Closing flushes what was written so far; the write error wins.
                let _ = writer.close();
                return Err(e.to_string().into());
            }
            durations.push(elapsed_ms(start));
        }
        Ok((writer, durations))
    })
}

/// Receives decoded frames, processes them in order and forwards output
/// to the writer. A closed writer channel means the writer failed; that
/// error surfaces when its thread is joined.
fn run_main_loop(
    frame_rx: Receiver<Result<Frame, SendError>>,
    write_tx: &Sender<ProcessedFrame>,
    processor: &mut FrameProcessor,
    total_frames: usize,
    on_progress: Option<&ProgressCallback>,
) -> Result<(), PipelineError> {
    for (n, frame_result) in frame_rx.into_iter().enumerate() {
        let frame = frame_result.map_err(PipelineError::source)?;

        if let Some(processed) = processor.process(frame) {
            if write_tx.send(processed).is_err() {
                return Ok(());
            }
        }

        processor.logger_mut().progress(n + 1, total_frames);
        if let Some(callback) = on_progress {
            callback(n + 1, total_frames);
        }
    }
    Ok(())
}

/// Joins both I/O threads and coalesces the first error encountered.
fn join_threads(
    reader_handle: JoinHandle<()>,
    writer_handle: JoinHandle<WriterOutcome>,
    main_result: Result<(), PipelineError>,
    processor: &mut FrameProcessor,
) -> Result<(), PipelineError> {
    let mut first_error = main_result.err();
    let mut set_if_none = |err: PipelineError| {
        if first_error.is_none() {
            first_error = Some(err);
        }
    };

    if reader_handle.join().is_err() {
        set_if_none(PipelineError::ThreadPanicked("reader"));
    }

    match writer_handle.join() {
        Ok(Ok((mut writer, durations))) => {
            for ms in durations {
                processor.logger_mut().timing("write", ms);
            }
            if let Err(e) = writer.close() {
                set_if_none(PipelineError::sink(e));
            }
        }
        Ok(Err(e)) => set_if_none(PipelineError::sink(e)),
        Err(_) => set_if_none(PipelineError::ThreadPanicked("writer")),
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
