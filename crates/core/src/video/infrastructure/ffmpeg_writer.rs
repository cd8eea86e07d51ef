use std::path::Path;

use ffmpeg_next::format::context::Output;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video as VideoFrame;
use ffmpeg_next::Rational;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

const VIDEO_STREAM: usize = 0;

/// Encodes RGB frames to MPEG-4 Part 2 via ffmpeg-next, one frame per tick
/// of the source frame rate.
pub struct FfmpegWriter {
    session: Option<EncodeSession>,
}

struct EncodeSession {
    octx: Output,
    encoder: ffmpeg_next::codec::encoder::video::Encoder,
    scaler: scaling::Context,
    width: u32,
    height: u32,
    time_base: Rational,
    next_pts: i64,
}

// Safety: the writer is moved between threads but never shared; ffmpeg
// contexts are only touched by whichever thread currently owns it.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self { session: None }
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoWriter for FfmpegWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        if metadata.width == 0 || metadata.height == 0 {
            return Err(format!(
                "cannot encode {}x{} video",
                metadata.width, metadata.height
            )
            .into());
        }

        let mut octx = ffmpeg_next::format::output(path)?;
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4)
            .ok_or("MPEG4 encoder not found")?;
        let mut ost = octx.add_stream(Some(codec))?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;
        let fps = (metadata.effective_fps().round() as i32).max(1);
        let time_base = Rational(1, fps);
        encoder_ctx.set_width(metadata.width);
        encoder_ctx.set_height(metadata.height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(time_base);
        encoder_ctx.set_frame_rate(Some(Rational(fps, 1)));
        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx.open_with(ffmpeg_next::Dictionary::new())?;
        ost.set_parameters(&encoder);
        octx.write_header()?;

        let scaler = scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            metadata.width,
            metadata.height,
            ffmpeg_next::format::Pixel::YUV420P,
            metadata.width,
            metadata.height,
            scaling::Flags::BILINEAR,
        )?;
        log::debug!(
            "Encoding {} at {}x{} @ {fps} fps",
            path.display(),
            metadata.width,
            metadata.height
        );

        self.session = Some(EncodeSession {
            octx,
            encoder,
            scaler,
            width: metadata.width,
            height: metadata.height,
            time_base,
            next_pts: 0,
        });
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let session = self.session.as_mut().ok_or("FfmpegWriter: not opened")?;
        if frame.width() != session.width
            || frame.height() != session.height
            || frame.channels() != 3
        {
            return Err(format!(
                "frame {} is {}x{}x{}, writer expects {}x{}x3",
                frame.index(),
                frame.width(),
                frame.height(),
                frame.channels(),
                session.width,
                session.height
            )
            .into());
        }

        let mut rgb = VideoFrame::new(
            ffmpeg_next::format::Pixel::RGB24,
            session.width,
            session.height,
        );
        let stride = rgb.stride(0);
        let row_bytes = session.width as usize * 3;
        let dst = rgb.data_mut(0);
        for (row, src_row) in frame.data().chunks_exact(row_bytes).enumerate() {
            dst[row * stride..row * stride + row_bytes].copy_from_slice(src_row);
        }

        let mut yuv = VideoFrame::empty();
        session.scaler.run(&rgb, &mut yuv)?;
        yuv.set_pts(Some(session.next_pts));
        session.next_pts += 1;

        session.encoder.send_frame(&yuv)?;
        session.drain()
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        session.encoder.send_eof()?;
        session.drain()?;
        session.octx.write_trailer()?;
        log::debug!("Encoder closed after {} frames", session.next_pts);
        Ok(())
    }
}

impl EncodeSession {
    fn drain(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let stream_time_base = self
            .octx
            .stream(VIDEO_STREAM)
            .ok_or("output stream missing")?
            .time_base();
        let mut packet = ffmpeg_next::Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(VIDEO_STREAM);
            packet.rescale_ts(self.time_base, stream_time_base);
            packet.write_interleaved(&mut self.octx)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::domain::video_reader::VideoReader;
    use crate::video::infrastructure::ffmpeg_reader::FfmpegReader;

    fn metadata(w: u32, h: u32, fps: f64) -> VideoMetadata {
        VideoMetadata {
            width: w,
            height: h,
            fps,
            total_frames: 0,
            codec: String::new(),
            source_path: None,
        }
    }

    fn solid_frame(index: usize, w: u32, h: u32, value: u8) -> Frame {
        Frame::new(vec![value; (w * h * 3) as usize], w, h, 3, index)
    }

    #[test]
    fn test_write_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");

        let mut writer = FfmpegWriter::new();
        writer.open(&path, &metadata(160, 120, 30.0)).unwrap();
        for i in 0..3 {
            writer.write(&solid_frame(i, 160, 120, 128)).unwrap();
        }
        writer.close().unwrap();

        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_write_without_open_is_error() {
        let mut writer = FfmpegWriter::new();
        assert!(writer.write(&solid_frame(0, 160, 120, 128)).is_err());
    }

    #[test]
    fn test_write_rejects_wrong_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = FfmpegWriter::new();
        writer
            .open(&dir.path().join("out.mp4"), &metadata(160, 120, 30.0))
            .unwrap();
        assert!(writer.write(&solid_frame(0, 80, 60, 0)).is_err());
    }

    #[test]
    fn test_unknown_fps_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");

        let mut writer = FfmpegWriter::new();
        writer.open(&path, &metadata(64, 48, 0.0)).unwrap();
        for i in 0..10 {
            writer.write(&solid_frame(i, 64, 48, 10)).unwrap();
        }
        writer.close().unwrap();

        let mut reader = FfmpegReader::new();
        let meta = reader.open(&path).unwrap();
        assert!((meta.effective_fps() - 25.0).abs() < 0.5);
    }

    #[test]
    fn test_close_twice() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = FfmpegWriter::new();
        writer
            .open(&dir.path().join("out.mp4"), &metadata(64, 48, 30.0))
            .unwrap();
        writer.write(&solid_frame(0, 64, 48, 0)).unwrap();
        writer.close().unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn test_roundtrip_preserves_brightness() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.mp4");

        let mut writer = FfmpegWriter::new();
        writer.open(&path, &metadata(160, 120, 30.0)).unwrap();
        for i in 0..3 {
            writer.write(&solid_frame(i, 160, 120, 128)).unwrap();
        }
        writer.close().unwrap();

        let mut reader = FfmpegReader::new();
        reader.open(&path).unwrap();
        let frames: Vec<Frame> = reader.frames().map(|f| f.unwrap()).collect();
        assert_eq!(frames.len(), 3);

        // Lossy codec: compare mean brightness only.
        let first = &frames[0];
        let avg = first.data().iter().map(|&b| b as f64).sum::<f64>() / first.data().len() as f64;
        assert!((avg - 128.0).abs() < 40.0, "mean {avg} too far from 128");
    }
}
