use serde::Serialize;

/// Integer pixel rectangle `(x1, y1, x2, y2)` with `x2 > x1` and `y2 > y1`.
///
/// Coordinates are half-open: the box covers columns `x1..x2` and rows
/// `y1..y2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    /// Returns `None` for degenerate boxes.
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Option<Self> {
        if x2 > x1 && y2 > y1 {
            Some(Self { x1, y1, x2, y2 })
        } else {
            None
        }
    }

    /// Rounds a floating-point `[x1, y1, x2, y2]` box to pixels.
    pub fn from_ltrb(ltrb: [f64; 4]) -> Option<Self> {
        if ltrb.iter().any(|v| !v.is_finite()) {
            return None;
        }
        Self::new(
            ltrb[0].round() as i32,
            ltrb[1].round() as i32,
            ltrb[2].round() as i32,
            ltrb[3].round() as i32,
        )
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> i64 {
        self.width() as i64 * self.height() as i64
    }

    /// Center x, center y, aspect ratio (w/h), height.
    pub fn to_xyah(&self) -> [f64; 4] {
        let w = self.width() as f64;
        let h = self.height() as f64;
        [
            self.x1 as f64 + w / 2.0,
            self.y1 as f64 + h / 2.0,
            w / h,
            h,
        ]
    }

    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let inter = (ix2 - ix1).max(0) as f64 * (iy2 - iy1).max(0) as f64;
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() as f64 + other.area() as f64 - inter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn bbox(x1: i32, y1: i32, x2: i32, y2: i32) -> BoundingBox {
        BoundingBox::new(x1, y1, x2, y2).unwrap()
    }

    #[rstest]
    #[case::zero_width(10, 10, 10, 20)]
    #[case::zero_height(10, 10, 20, 10)]
    #[case::inverted(20, 20, 10, 10)]
    fn test_degenerate_boxes_rejected(
        #[case] x1: i32,
        #[case] y1: i32,
        #[case] x2: i32,
        #[case] y2: i32,
    ) {
        assert!(BoundingBox::new(x1, y1, x2, y2).is_none());
    }

    #[test]
    fn test_dimensions() {
        let b = bbox(5, 5, 15, 25);
        assert_eq!(b.width(), 10);
        assert_eq!(b.height(), 20);
        assert_eq!(b.area(), 200);
    }

    #[test]
    fn test_xyah() {
        let [cx, cy, a, h] = bbox(0, 0, 50, 100).to_xyah();
        assert_relative_eq!(cx, 25.0);
        assert_relative_eq!(cy, 50.0);
        assert_relative_eq!(a, 0.5);
        assert_relative_eq!(h, 100.0);
    }

    #[test]
    fn test_from_ltrb_rounds() {
        let b = BoundingBox::from_ltrb([1.4, 1.6, 10.5, 20.2]).unwrap();
        assert_eq!(b, bbox(1, 2, 11, 20));
        assert!(BoundingBox::from_ltrb([0.0, 0.0, f64::NAN, 1.0]).is_none());
    }

    #[test]
    fn test_iou_identical() {
        let a = bbox(10, 10, 110, 110);
        assert_relative_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn test_iou_partial_overlap() {
        let a = bbox(0, 0, 100, 100);
        let b = bbox(50, 0, 150, 100);
        assert_relative_eq!(a.iou(&b), 5000.0 / 15000.0);
    }

    #[test]
    fn test_iou_touching_edges() {
        let a = bbox(0, 0, 50, 50);
        let b = bbox(50, 0, 100, 50);
        assert_relative_eq!(a.iou(&b), 0.0);
    }
}
