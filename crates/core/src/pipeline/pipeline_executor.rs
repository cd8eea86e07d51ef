use std::path::Path;

use thiserror::Error;

use crate::pipeline::frame_processor::FrameProcessor;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

/// Called with `(frames_read, total_frames)` after every source frame.
/// `total_frames` is 0 when the container does not report a count.
pub type ProgressCallback = Box<dyn Fn(usize, usize) + Send>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to read input video: {0}")]
    Source(String),
    #[error("failed to write output: {0}")]
    Sink(String),
    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
    #[error("pipeline has already been executed")]
    AlreadyExecuted,
}

impl PipelineError {
    pub(crate) fn source(e: impl std::fmt::Display) -> Self {
        Self::Source(e.to_string())
    }

    pub(crate) fn sink(e: impl std::fmt::Display) -> Self {
        Self::Sink(e.to_string())
    }
}

/// Drives frames from the reader through the processor into the writer.
///
/// This is a port. Infrastructure provides the single-threaded and the
/// threaded implementation. Either way the processor sees every frame
/// exactly once and in source order, and the writer receives its output
/// in that same order.
pub trait PipelineExecutor: Send {
    fn execute(
        &self,
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        processor: &mut FrameProcessor,
        metadata: &VideoMetadata,
        output_path: &Path,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<(), PipelineError>;
}
