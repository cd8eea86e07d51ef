use std::path::Path;
use std::time::Instant;

use crate::pipeline::frame_processor::{elapsed_ms, FrameProcessor};
use crate::pipeline::pipeline_executor::{PipelineError, PipelineExecutor, ProgressCallback};
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

/// Reads, processes and writes every frame on the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct SequentialPipelineExecutor;

impl SequentialPipelineExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineExecutor for SequentialPipelineExecutor {
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

        let result = run_loop(
            reader.as_mut(),
            writer.as_mut(),
            processor,
            metadata.total_frames,
            on_progress,
        );
        reader.close();
        let closed = writer.close().map_err(PipelineError::sink);
        result.and(closed)
    }
}

fn run_loop(
    reader: &mut dyn VideoReader,
    writer: &mut dyn VideoWriter,
    processor: &mut FrameProcessor,
    total_frames: usize,
    on_progress: Option<&ProgressCallback>,
) -> Result<(), PipelineError> {
    for (n, frame_result) in reader.frames().enumerate() {
        let frame = frame_result.map_err(PipelineError::source)?;

        if let Some(processed) = processor.process(frame) {
            let start = Instant::now();
            processed.write_to(writer).map_err(PipelineError::sink)?;
            processor.logger_mut().timing("write", elapsed_ms(start));
        }

        processor.logger_mut().progress(n + 1, total_frames);
        if let Some(callback) = on_progress {
            callback(n + 1, total_frames);
        }
    }
    Ok(())
}
