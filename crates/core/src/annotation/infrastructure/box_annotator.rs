use std::path::PathBuf;

use ab_glyph::{FontArc, InvalidFont, PxScale};
use image::{ImageBuffer, Rgb};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::detection::domain::detection::Detection;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;
use crate::tracking::domain::track_manager::TrackSnapshot;

/// Gap between the top of a track's box and the bottom of its label.
const LABEL_OFFSET: i32 = 10;

static DEFAULT_FONT: &[u8] = include_bytes!("../../../assets/fonts/DejaVuSansMono-Bold.ttf");

type RgbView<'a> = ImageBuffer<Rgb<u8>, &'a mut [u8]>;

#[derive(Error, Debug)]
pub enum AnnotatorError {
    #[error("failed to read font {path}: {source}")]
    FontRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid font data: {0}")]
    InvalidFont(#[from] InvalidFont),
}

/// What gets drawn and how.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationStyle {
    pub draw_detections: bool,
    pub draw_tracks: bool,
    pub detection_color: [u8; 3],
    pub track_color: [u8; 3],
    pub thickness: u32,
    /// Label glyph height in pixels.
    pub label_height: f32,
    /// TrueType/OpenType font for labels; the bundled DejaVu Sans Mono
    /// Bold when unset.
    pub font_path: Option<PathBuf>,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            draw_detections: true,
            draw_tracks: true,
            detection_color: [0, 255, 0],
            track_color: [255, 200, 0],
            thickness: 2,
            label_height: 20.0,
            font_path: None,
        }
    }
}

/// Draws raw detection boxes and labelled confirmed-track boxes directly
/// into the RGB buffer.
pub struct BoxAnnotator {
    style: AnnotationStyle,
    font: FontArc,
}

impl BoxAnnotator {
    pub fn new(style: AnnotationStyle) -> Result<Self, AnnotatorError> {
        let font = match &style.font_path {
            Some(path) => {
                let bytes = std::fs::read(path).map_err(|source| AnnotatorError::FontRead {
                    path: path.clone(),
                    source,
                })?;
                FontArc::try_from_vec(bytes)?
            }
            None => FontArc::try_from_slice(DEFAULT_FONT)?,
        };
        Ok(Self { style, font })
    }

    fn label_scale(&self) -> PxScale {
        PxScale::from(self.style.label_height.max(1.0))
    }

    /// Text whose bottom edge sits `LABEL_OFFSET` pixels above the box,
    /// pushed down to the top of the frame when there is no room.
    fn draw_label(&self, canvas: &mut RgbView<'_>, text: &str, bbox: &BoundingBox) {
        let scale = self.label_scale();
        let (_, text_h) = text_size(scale, &self.font, text);
        let top = (bbox.y1 - LABEL_OFFSET - text_h as i32).max(0);
        draw_text_mut(
            canvas,
            Rgb(self.style.track_color),
            bbox.x1,
            top,
            scale,
            &self.font,
            text,
        );
    }
}

/// Outline drawn inward from the box edges, one 1px ring per unit of
/// thickness.
fn draw_box(canvas: &mut RgbView<'_>, bbox: &BoundingBox, color: [u8; 3], thickness: u32) {
    for inset in 0..thickness.max(1) as i32 {
        let width = bbox.width() - 2 * inset;
        let height = bbox.height() - 2 * inset;
        if width <= 0 || height <= 0 {
            break;
        }
        let rect = Rect::at(bbox.x1 + inset, bbox.y1 + inset).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(canvas, rect, Rgb(color));
    }
}

impl FrameAnnotator for BoxAnnotator {
    fn annotate(
        &self,
        frame: &mut Frame,
        detections: &[Detection],
        tracks: &[TrackSnapshot],
    ) -> Result<(), Box<dyn std::error::Error>> {
        if frame.channels() != 3 {
            return Err(format!("cannot annotate {}-channel frame", frame.channels()).into());
        }
        let (width, height) = (frame.width(), frame.height());
        let mut canvas: RgbView<'_> = ImageBuffer::from_raw(width, height, frame.data_mut())
            .ok_or("frame buffer does not match its dimensions")?;

        if self.style.draw_detections {
            for det in detections {
                draw_box(&mut canvas, &det.bbox, self.style.detection_color, self.style.thickness);
            }
        }
        if self.style.draw_tracks {
            for track in tracks {
                draw_box(&mut canvas, &track.bbox, self.style.track_color, 1);
                self.draw_label(&mut canvas, &format!("ID {}", track.id), &track.bbox);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::domain::embedding::Embedding;

    const GREEN: [u8; 3] = [0, 255, 0];

    fn annotator() -> BoxAnnotator {
        BoxAnnotator::new(AnnotationStyle::default()).unwrap()
    }

    fn black_frame(w: u32, h: u32) -> Frame {
        Frame::new(vec![0u8; (w * h * 3) as usize], w, h, 3, 0)
    }

    fn pixel(frame: &Frame, x: usize, y: usize) -> [u8; 3] {
        let offset = (y * frame.width() as usize + x) * 3;
        let d = frame.data();
        [d[offset], d[offset + 1], d[offset + 2]]
    }

    fn det(x1: i32, y1: i32, x2: i32, y2: i32) -> Detection {
        Detection {
            bbox: BoundingBox::new(x1, y1, x2, y2).unwrap(),
            confidence: 0.99,
            embedding: Embedding::new(vec![1.0]).unwrap(),
            label: "face",
        }
    }

    fn snap(id: u64, x1: i32, y1: i32, x2: i32, y2: i32) -> TrackSnapshot {
        TrackSnapshot {
            id,
            bbox: BoundingBox::new(x1, y1, x2, y2).unwrap(),
            estimate: None,
            detection: None,
            hit_count: 1,
            time_since_update: 0,
        }
    }

    fn lit_pixels(frame: &Frame, x1: usize, y1: usize, x2: usize, y2: usize) -> usize {
        let mut n = 0;
        for y in y1..y2 {
            for x in x1..x2 {
                if pixel(frame, x, y) != [0, 0, 0] {
                    n += 1;
                }
            }
        }
        n
    }

    #[test]
    fn test_detection_box_outline_only() {
        let mut frame = black_frame(100, 100);
        annotator()
            .annotate(&mut frame, &[det(10, 10, 50, 50)], &[])
            .unwrap();

        assert_eq!(pixel(&frame, 10, 10), GREEN);
        assert_eq!(pixel(&frame, 11, 30), GREEN);
        assert_eq!(pixel(&frame, 49, 49), GREEN);
        assert_eq!(pixel(&frame, 30, 30), [0, 0, 0]);
        assert_eq!(pixel(&frame, 50, 50), [0, 0, 0]);
    }

    #[test]
    fn test_track_label_drawn_above_box() {
        let a = annotator();
        let (_, text_h) = text_size(a.label_scale(), &a.font, "ID 7");
        let label_bottom = 100 - LABEL_OFFSET as usize;
        let label_top = label_bottom - text_h as usize;

        let mut frame = black_frame(200, 200);
        a.annotate(&mut frame, &[], &[snap(7, 20, 100, 80, 160)])
            .unwrap();

        assert!(lit_pixels(&frame, 20, label_top, 200, label_bottom + 1) > 0);
        assert_eq!(lit_pixels(&frame, 0, 0, 200, label_top.saturating_sub(1)), 0);
        assert_eq!(lit_pixels(&frame, 0, label_bottom + 2, 200, 100), 0);
        assert_eq!(lit_pixels(&frame, 0, 0, 19, 100), 0);
    }

    #[test]
    fn test_label_clamped_to_top_edge() {
        let mut frame = black_frame(100, 100);
        annotator()
            .annotate(&mut frame, &[], &[snap(3, 10, 8, 60, 60)])
            .unwrap();
        assert!(lit_pixels(&frame, 10, 0, 60, 8) > 0);
    }

    #[test]
    fn test_labels_render_every_digit() {
        let mut a = black_frame(200, 100);
        let mut b = black_frame(200, 100);
        annotator()
            .annotate(&mut a, &[], &[snap(1234, 10, 60, 190, 90)])
            .unwrap();
        annotator()
            .annotate(&mut b, &[], &[snap(5678, 10, 60, 190, 90)])
            .unwrap();

        assert!(lit_pixels(&a, 0, 0, 200, 50) > 0);
        assert_ne!(a.data(), b.data());
    }

    #[test]
    fn test_styles_differ_between_detections_and_tracks() {
        let style = AnnotationStyle::default();
        let mut frame = black_frame(200, 200);
        BoxAnnotator::new(style.clone())
            .unwrap()
            .annotate(
                &mut frame,
                &[det(10, 100, 60, 150)],
                &[snap(1, 120, 100, 170, 150)],
            )
            .unwrap();
        assert_eq!(pixel(&frame, 10, 100), style.detection_color);
        assert_eq!(pixel(&frame, 120, 100), style.track_color);
    }

    #[test]
    fn test_disabled_layers_leave_frame_untouched() {
        let style = AnnotationStyle {
            draw_detections: false,
            draw_tracks: false,
            ..AnnotationStyle::default()
        };
        let mut frame = black_frame(64, 64);
        BoxAnnotator::new(style)
            .unwrap()
            .annotate(&mut frame, &[det(0, 0, 20, 20)], &[snap(1, 0, 0, 20, 20)])
            .unwrap();
        assert_eq!(lit_pixels(&frame, 0, 0, 64, 64), 0);
    }

    #[test]
    fn test_boxes_past_frame_edge_are_clipped() {
        let mut frame = black_frame(50, 50);
        annotator()
            .annotate(&mut frame, &[det(40, 40, 90, 90)], &[snap(12, -5, -5, 10, 10)])
            .unwrap();
        assert_eq!(pixel(&frame, 40, 40), GREEN);
    }

    #[test]
    fn test_rejects_grayscale_frame() {
        let mut frame = Frame::new(vec![0u8; 16], 4, 4, 1, 0);
        assert!(annotator().annotate(&mut frame, &[], &[]).is_err());
    }

    #[test]
    fn test_missing_font_file_is_an_error() {
        let style = AnnotationStyle {
            font_path: Some(PathBuf::from("/nonexistent/label.ttf")),
            ..AnnotationStyle::default()
        };
        assert!(matches!(
            BoxAnnotator::new(style),
            Err(AnnotatorError::FontRead { .. })
        ));
    }

    #[test]
    fn test_garbage_font_file_is_an_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"not a font").unwrap();
        let style = AnnotationStyle {
            font_path: Some(file.path().to_path_buf()),
            ..AnnotationStyle::default()
        };
        assert!(matches!(
            BoxAnnotator::new(style),
            Err(AnnotatorError::InvalidFont(_))
        ));
    }
}
