use ndarray::ArrayView3;

use super::bounding_box::BoundingBox;

/// A single video frame: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only; the domain layer
/// treats pixel data as opaque. `index` is the frame's position in the
/// source sequence.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Copies the pixels inside `bbox` (half-open `[x1, x2) x [y1, y2)`)
    /// into a new frame. Returns `None` when the box does not intersect
    /// the frame.
    pub fn crop(&self, bbox: &BoundingBox) -> Option<Frame> {
        let x1 = bbox.x1.max(0) as usize;
        let y1 = bbox.y1.max(0) as usize;
        let x2 = (bbox.x2.max(0) as usize).min(self.width as usize);
        let y2 = (bbox.y2.max(0) as usize).min(self.height as usize);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        let channels = self.channels as usize;
        let row_len = (x2 - x1) * channels;
        let mut data = Vec::with_capacity(row_len * (y2 - y1));
        for row in y1..y2 {
            let start = (row * self.width as usize + x1) * channels;
            data.extend_from_slice(&self.data[start..start + row_len]);
        }

        Some(Frame::new(
            data,
            (x2 - x1) as u32,
            (y2 - y1) as u32,
            self.channels,
            self.index,
        ))
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(width: u32, height: u32) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[x as u8, y as u8, 0]);
            }
        }
        Frame::new(data, width, height, 3, 7)
    }

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12];
        let frame = Frame::new(data.clone(), 2, 2, 3, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(vec![0u8; 10], 2, 2, 3, 0);
    }

    #[test]
    fn test_crop_copies_region() {
        let frame = gradient_frame(20, 20);
        let crop = frame.crop(&BoundingBox::new(5, 6, 15, 16).unwrap()).unwrap();
        assert_eq!(crop.width(), 10);
        assert_eq!(crop.height(), 10);
        assert_eq!(crop.index(), 7);
        let arr = crop.as_ndarray();
        assert_eq!(arr[[0, 0, 0]], 5);
        assert_eq!(arr[[0, 0, 1]], 6);
        assert_eq!(arr[[9, 9, 0]], 14);
        assert_eq!(arr[[9, 9, 1]], 15);
    }

    #[test]
    fn test_crop_clamps_to_frame() {
        let frame = gradient_frame(20, 20);
        let crop = frame
            .crop(&BoundingBox::new(15, 15, 40, 40).unwrap())
            .unwrap();
        assert_eq!(crop.width(), 5);
        assert_eq!(crop.height(), 5);
    }

    #[test]
    fn test_crop_outside_frame_is_none() {
        let frame = gradient_frame(20, 20);
        assert!(frame
            .crop(&BoundingBox::new(30, 30, 40, 40).unwrap())
            .is_none());
    }
}
