/// A rectangular face candidate within a frame, in pixel coordinates.
///
/// Detectors may report regions that extend past the frame edges;
/// [`Region::clamp_to`] yields the visible part.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a region from corner coordinates, rounding to whole pixels.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let x = x1.round() as i32;
        let y = y1.round() as i32;
        Self {
            x,
            y,
            width: (x2.round() as i32 - x).max(0),
            height: (y2.round() as i32 - y).max(0),
        }
    }

    /// Intersection with the `frame_w` x `frame_h` canvas, or `None` if empty.
    pub fn clamp_to(&self, frame_w: u32, frame_h: u32) -> Option<Region> {
        let x1 = self.x.max(0);
        let y1 = self.y.max(0);
        let x2 = (self.x + self.width).min(frame_w as i32);
        let y2 = (self.y + self.height).min(frame_h as i32);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Region::new(x1, y1, x2 - x1, y2 - y1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_from_corners_rounds() {
        let r = Region::from_corners(9.6, 10.2, 60.4, 59.5);
        assert_eq!(r, Region::new(10, 10, 50, 50));
    }

    #[test]
    fn test_from_corners_inverted_is_empty() {
        let r = Region::from_corners(50.0, 50.0, 10.0, 10.0);
        assert_eq!((r.width, r.height), (0, 0));
    }

    #[rstest]
    #[case::inside(Region::new(10, 10, 50, 50), Some(Region::new(10, 10, 50, 50)))]
    #[case::left_edge(Region::new(-20, 10, 50, 50), Some(Region::new(0, 10, 30, 50)))]
    #[case::bottom_right(Region::new(80, 70, 50, 50), Some(Region::new(80, 70, 20, 10)))]
    #[case::outside(Region::new(200, 200, 10, 10), None)]
    #[case::zero_width(Region::new(10, 10, 0, 10), None)]
    fn test_clamp_to(#[case] region: Region, #[case] expected: Option<Region>) {
        assert_eq!(region.clamp_to(100, 80), expected);
    }
}
