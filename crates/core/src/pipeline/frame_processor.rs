use std::collections::BTreeMap;
use std::time::Instant;

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::annotation::domain::unique_face_registry::UniqueFaceRegistry;
use crate::detection::domain::detection::Detection;
use crate::detection::domain::detection_assembler::DetectionAssembler;
use crate::detection::domain::face_detector::FaceDetector;
use crate::embedding::domain::face_embedder::FaceEmbedder;
use crate::shared::frame::Frame;
use crate::tracking::domain::track::TrackId;
use crate::tracking::domain::track_manager::{TrackManager, TrackSnapshot};
use crate::video::domain::video_writer::VideoWriter;

use super::count_report::CountReport;
use super::frame_sampler::FrameSampler;
use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use super::settings::{OutputMode, PipelineSettings};

/// A frame ready for the writer, to be written `repeats` times in a row.
#[derive(Clone, Debug)]
pub struct ProcessedFrame {
    pub frame: Frame,
    pub repeats: usize,
}

impl ProcessedFrame {
    pub fn write_to(&self, writer: &mut dyn VideoWriter) -> Result<(), Box<dyn std::error::Error>> {
        for _ in 0..self.repeats {
            writer.write(&self.frame)?;
        }
        Ok(())
    }
}

/// Runs the per-frame work in source order: sampling, then for sampled
/// frames detection, embedding, tracking, registry update and annotation.
///
/// Owns all mutable run state (live tracks, registry, counters), so it
/// must stay on a single thread and see frames in order.
pub struct FrameProcessor {
    sampler: FrameSampler,
    detector: Box<dyn FaceDetector>,
    embedder: Box<dyn FaceEmbedder>,
    assembler: DetectionAssembler,
    tracker: TrackManager,
    annotator: Box<dyn FrameAnnotator>,
    registry: UniqueFaceRegistry,
    output_mode: OutputMode,
    logger: Box<dyn PipelineLogger>,
    best_faces: Option<BTreeMap<TrackId, (i64, Frame)>>,
    report: CountReport,
}

impl FrameProcessor {
    pub fn new(
        sampler: FrameSampler,
        detector: Box<dyn FaceDetector>,
        embedder: Box<dyn FaceEmbedder>,
        annotator: Box<dyn FrameAnnotator>,
        settings: &PipelineSettings,
    ) -> Self {
        Self {
            sampler,
            detector,
            embedder,
            assembler: DetectionAssembler::new(settings.assembler.clone()),
            tracker: TrackManager::new(settings.tracker.clone()),
            annotator,
            registry: UniqueFaceRegistry::new(),
            output_mode: settings.output_mode,
            logger: Box::new(NullPipelineLogger),
            best_faces: None,
            report: CountReport {
                sampling_interval: sampler.interval(),
                ..CountReport::default()
            },
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Keep the largest crop of every confirmed face for thumbnails.
    pub fn collecting_faces(mut self) -> Self {
        self.best_faces = Some(BTreeMap::new());
        self
    }

    pub fn logger_mut(&mut self) -> &mut dyn PipelineLogger {
        self.logger.as_mut()
    }

    /// Returns what to write for this source frame, if anything.
    pub fn process(&mut self, frame: Frame) -> Option<ProcessedFrame> {
        self.report.frames_read += 1;
        if !self.sampler.should_process(frame.index()) {
            return match self.output_mode {
                OutputMode::Hold => None,
                OutputMode::Passthrough => Some(self.emit(frame, 1)),
            };
        }

        let mut frame = frame;
        self.report.frames_sampled += 1;
        let (detections, tracks) = self.analyze(&frame);
        self.keep_best_faces(&frame, &detections, &tracks);

        let start = Instant::now();
        if let Err(e) = self.annotator.annotate(&mut frame, &detections, &tracks) {
            log::warn!("Frame {}: annotation failed: {e}", frame.index());
        }
        self.logger.timing("annotate", elapsed_ms(start));

        let repeats = match self.output_mode {
            OutputMode::Hold => self.sampler.interval(),
            OutputMode::Passthrough => 1,
        };
        Some(self.emit(frame, repeats))
    }

    /// Detection, embedding and one tracker step for a sampled frame.
    fn analyze(&mut self, frame: &Frame) -> (Vec<Detection>, Vec<TrackSnapshot>) {
        let start = Instant::now();
        let raw_faces = self.detector.detect(frame).unwrap_or_else(|e| {
            log::warn!("Frame {}: detection failed, treating as empty: {e}", frame.index());
            Vec::new()
        });
        self.logger.timing("detect", elapsed_ms(start));

        let start = Instant::now();
        let detections = self
            .assembler
            .assemble(frame, &raw_faces, self.embedder.as_mut());
        self.logger.timing("embed", elapsed_ms(start));

        let start = Instant::now();
        let tracks = self.tracker.update(&detections);
        self.logger.timing("track", elapsed_ms(start));

        for (id, so_far) in self.registry.record(&tracks) {
            log::info!("Frame {}: new face #{id} ({so_far} so far)", frame.index());
        }

        self.report.detections += detections.len();
        self.logger.metric("detections", detections.len() as f64);
        self.logger.metric("confirmed_tracks", tracks.len() as f64);
        log::debug!(
            "Frame {}: {} raw, {} valid, {} confirmed",
            frame.index(),
            raw_faces.len(),
            detections.len(),
            tracks.len()
        );
        (detections, tracks)
    }

    fn keep_best_faces(&mut self, frame: &Frame, detections: &[Detection], tracks: &[TrackSnapshot]) {
        let Some(best) = self.best_faces.as_mut() else {
            return;
        };
        for track in tracks {
            let Some(det) = track.detection.and_then(|di| detections.get(di)) else {
                continue;
            };
            let area = det.bbox.area();
            if best.get(&track.id).is_some_and(|(kept, _)| *kept >= area) {
                continue;
            }
            if let Some(crop) = frame.crop(&det.bbox) {
                best.insert(track.id, (area, crop));
            }
        }
    }

    fn emit(&mut self, frame: Frame, repeats: usize) -> ProcessedFrame {
        self.report.frames_written += repeats;
        ProcessedFrame { frame, repeats }
    }

    /// Counters and the registry contents so far.
    pub fn report(&self) -> CountReport {
        CountReport {
            unique_faces: self.registry.count(),
            track_ids: self.registry.ids(),
            ..self.report.clone()
        }
    }

    /// Largest crop per confirmed identity, ascending by ID. Empty unless
    /// built with [`collecting_faces`](Self::collecting_faces).
    pub fn take_best_faces(&mut self) -> Vec<(TrackId, Frame)> {
        self.best_faces
            .as_mut()
            .map(std::mem::take)
            .unwrap_or_default()
            .into_iter()
            .map(|(id, (_, crop))| (id, crop))
            .collect()
    }
}

pub(crate) fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_detector::RawFace;
    use crate::embedding::domain::embedding::Embedding;
    use crate::embedding::domain::face_embedder::EmbeddingError;

    /// Yields one face per call, growing by 2 px each time.
    struct GrowingDetector {
        side: i32,
    }

    impl FaceDetector for GrowingDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<RawFace>, Box<dyn std::error::Error>> {
            self.side += 2;
            Ok(vec![RawFace::new(5, 5, self.side, self.side)])
        }
    }

    struct ConstantEmbedder;

    impl FaceEmbedder for ConstantEmbedder {
        fn embed(&mut self, _crop: &Frame) -> Result<Embedding, EmbeddingError> {
            Embedding::new(vec![0.0, 1.0]).ok_or(EmbeddingError::EmptyOutput)
        }
    }

    /// Paints the whole frame white, so tests can tell annotated frames.
    struct FillAnnotator;

    impl FrameAnnotator for FillAnnotator {
        fn annotate(
            &self,
            frame: &mut Frame,
            _detections: &[Detection],
            _tracks: &[TrackSnapshot],
        ) -> Result<(), Box<dyn std::error::Error>> {
            frame.data_mut().fill(255);
            Ok(())
        }
    }

    fn processor(fps: f64, mode: OutputMode) -> FrameProcessor {
        let settings = PipelineSettings {
            output_mode: mode,
            ..PipelineSettings::default()
        };
        FrameProcessor::new(
            FrameSampler::new(fps),
            Box::new(GrowingDetector { side: 18 }),
            Box::new(ConstantEmbedder),
            Box::new(FillAnnotator),
            &settings,
        )
    }

    fn frame(index: usize) -> Frame {
        Frame::new(vec![0; 80 * 80 * 3], 80, 80, 3, index)
    }

    #[test]
    fn test_hold_mode_drops_skipped_frames() {
        let mut p = processor(4.0, OutputMode::Hold);
        let sampled = p.process(frame(0)).unwrap();
        assert_eq!(sampled.repeats, 4);
        assert!(p.process(frame(1)).is_none());
        assert!(p.process(frame(3)).is_none());
    }

    #[test]
    fn test_passthrough_leaves_skipped_frames_untouched() {
        let mut p = processor(4.0, OutputMode::Passthrough);
        let sampled = p.process(frame(0)).unwrap();
        let skipped = p.process(frame(1)).unwrap();

        assert_eq!(sampled.repeats, 1);
        assert!(sampled.frame.data().iter().all(|&v| v == 255));
        assert_eq!(skipped.repeats, 1);
        assert!(skipped.frame.data().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_report_counts_frames() {
        let mut p = processor(2.0, OutputMode::Hold);
        for i in 0..5 {
            p.process(frame(i));
        }
        let report = p.report();

        assert_eq!(report.frames_read, 5);
        assert_eq!(report.frames_sampled, 3);
        assert_eq!(report.frames_written, 6);
        assert_eq!(report.detections, 3);
        assert_eq!(report.unique_faces, 1);
        assert_eq!(report.track_ids, vec![1]);
    }

    #[test]
    fn test_keeps_largest_unannotated_crop() {
        let mut p = processor(1.0, OutputMode::Hold).collecting_faces();
        for i in 0..3 {
            p.process(frame(i));
        }
        let faces = p.take_best_faces();

        assert_eq!(faces.len(), 1);
        let (id, crop) = &faces[0];
        assert_eq!(*id, 1);
        assert_eq!((crop.width(), crop.height()), (24, 24));
        assert!(crop.data().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_faces_not_collected_by_default() {
        let mut p = processor(1.0, OutputMode::Hold);
        p.process(frame(0));
        assert!(p.take_best_faces().is_empty());
    }
}
