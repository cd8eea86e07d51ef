use std::path::{Path, PathBuf};

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::detection::domain::face_detector::FaceDetector;
use crate::embedding::domain::face_embedder::FaceEmbedder;
use crate::shared::frame::Frame;
use crate::tracking::domain::track::TrackId;
use crate::video::domain::image_writer::ImageWriter;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

use super::count_report::CountReport;
use super::frame_processor::FrameProcessor;
use super::frame_sampler::FrameSampler;
use super::pipeline_executor::{PipelineError, PipelineExecutor, ProgressCallback};
use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use super::settings::PipelineSettings;

struct FaceExport {
    writer: Box<dyn ImageWriter>,
    dir: PathBuf,
}

/// Counts the distinct faces in one video and writes the annotated copy.
///
/// Wires the collaborators into a `FrameProcessor` and delegates the frame
/// loop to a `PipelineExecutor`. Single-use: `execute` consumes the owned
/// components, so a second call returns `PipelineError::AlreadyExecuted`.
/// A read failure during the frame loop deletes the partial output.
pub struct CountFacesUseCase {
    reader: Option<Box<dyn VideoReader>>,
    writer: Option<Box<dyn VideoWriter>>,
    detector: Option<Box<dyn FaceDetector>>,
    embedder: Option<Box<dyn FaceEmbedder>>,
    annotator: Option<Box<dyn FrameAnnotator>>,
    executor: Box<dyn PipelineExecutor>,
    settings: PipelineSettings,
    logger: Option<Box<dyn PipelineLogger>>,
    on_progress: Option<ProgressCallback>,
    face_export: Option<FaceExport>,
}

impl CountFacesUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        detector: Box<dyn FaceDetector>,
        embedder: Box<dyn FaceEmbedder>,
        annotator: Box<dyn FrameAnnotator>,
        executor: Box<dyn PipelineExecutor>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            reader: Some(reader),
            writer: Some(writer),
            detector: Some(detector),
            embedder: Some(embedder),
            annotator: Some(annotator),
            executor,
            settings,
            logger: None,
            on_progress: None,
            face_export: None,
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    /// Save the largest crop of every counted face as `<dir>/<id>.jpg`.
    pub fn with_face_export(mut self, writer: Box<dyn ImageWriter>, dir: PathBuf) -> Self {
        self.face_export = Some(FaceExport { writer, dir });
        self
    }

    pub fn execute(
        &mut self,
        input_path: &Path,
        output_path: &Path,
    ) -> Result<CountReport, PipelineError> {
        let mut reader = self.reader.take().ok_or(PipelineError::AlreadyExecuted)?;
        let writer = self.writer.take().ok_or(PipelineError::AlreadyExecuted)?;
        let detector = self.detector.take().ok_or(PipelineError::AlreadyExecuted)?;
        let embedder = self.embedder.take().ok_or(PipelineError::AlreadyExecuted)?;
        let annotator = self.annotator.take().ok_or(PipelineError::AlreadyExecuted)?;
        let logger = self
            .logger
            .take()
            .unwrap_or_else(|| Box::new(NullPipelineLogger));

        let metadata = reader.open(input_path).map_err(PipelineError::source)?;
        let sampler = FrameSampler::new(metadata.effective_fps());
        log::info!(
            "Input {}x{} @ {:.2} fps, {} frames; sampling every {} frames",
            metadata.width,
            metadata.height,
            metadata.effective_fps(),
            metadata.total_frames,
            sampler.interval()
        );

        let mut processor =
            FrameProcessor::new(sampler, detector, embedder, annotator, &self.settings)
                .with_logger(logger);
        if self.face_export.is_some() {
            processor = processor.collecting_faces();
        }

        let run = self.executor.execute(
            reader,
            writer,
            &mut processor,
            &metadata,
            output_path,
            self.on_progress.as_ref(),
        );
        if let Err(e) = run {
            if matches!(e, PipelineError::Source(_)) {
                discard_partial_output(output_path);
            }
            return Err(e);
        }

        let report = processor.report();
        if let Some(export) = self.face_export.take() {
            let faces = processor.take_best_faces();
            save_faces(&export, &faces, self.settings.thumbnail_size)?;
            processor
                .logger_mut()
                .info(&format!("Saved {} face thumbnails to {}", faces.len(), export.dir.display()));
        }

        processor
            .logger_mut()
            .info(&format!("Counted {} unique faces", report.unique_faces));
        processor.logger_mut().summary();
        Ok(report)
    }
}

/// A video cut short by a decode failure is not a valid result.
fn discard_partial_output(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => log::warn!("Removed partial output {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Could not remove partial output {}: {e}", path.display()),
    }
}

fn save_faces(
    export: &FaceExport,
    faces: &[(TrackId, Frame)],
    max_side: u32,
) -> Result<(), PipelineError> {
    if faces.is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(&export.dir).map_err(PipelineError::sink)?;
    for (id, crop) in faces {
        let path = export.dir.join(format!("{id}.jpg"));
        export
            .writer
            .write(&path, crop, Some(max_side))
            .map_err(PipelineError::sink)?;
    }
    Ok(())
}
