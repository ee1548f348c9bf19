use crate::detection::domain::region_detector::RegionDetector;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Decorator that runs detection every N calls, repeating the last result
/// in between.
///
/// Keeps the live preview responsive when inference is slower than the
/// display loop. A failed detection clears the cached regions, and
/// `detect_fresh` always runs the inner detector and restarts the interval.
pub struct SkipFrameDetector {
    inner: Box<dyn RegionDetector>,
    skip_interval: usize,
    call_count: usize,
    last_regions: Vec<Region>,
}

impl SkipFrameDetector {
    pub fn new(inner: Box<dyn RegionDetector>, skip_interval: usize) -> Result<Self, &'static str> {
        if skip_interval < 1 {
            return Err("skip_interval must be >= 1");
        }
        Ok(Self {
            inner,
            skip_interval,
            call_count: 0,
            last_regions: Vec::new(),
        })
    }
}

impl RegionDetector for SkipFrameDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
        let due = self.call_count % self.skip_interval == 0;
        self.call_count += 1;
        if due {
            self.last_regions.clear();
            self.last_regions = self.inner.detect(frame)?;
        }
        Ok(self.last_regions.clone())
    }

    fn detect_fresh(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
        self.last_regions.clear();
        self.call_count = 1;
        self.last_regions = self.inner.detect(frame)?;
        Ok(self.last_regions.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeDetector {
        results: Vec<Result<Vec<Region>, &'static str>>,
        call_count: usize,
    }

    impl FakeDetector {
        fn new(results: Vec<Result<Vec<Region>, &'static str>>) -> Self {
            Self {
                results,
                call_count: 0,
            }
        }
    }

    impl RegionDetector for FakeDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
            let result = self.results[self.call_count % self.results.len()].clone();
            self.call_count += 1;
            result.map_err(|e| e.into())
        }
    }

    fn frame(index: usize) -> Frame {
        Frame::filled(100, 100, [0, 0, 0], index)
    }

    fn region(x: i32) -> Region {
        Region::new(x, 20, 50, 50)
    }

    #[test]
    fn test_interval_1_delegates_every_call() {
        let inner = FakeDetector::new(vec![Ok(vec![region(10)]), Ok(vec![region(30)])]);
        let mut detector = SkipFrameDetector::new(Box::new(inner), 1).unwrap();

        assert_eq!(detector.detect(&frame(0)).unwrap(), vec![region(10)]);
        assert_eq!(detector.detect(&frame(1)).unwrap(), vec![region(30)]);
        assert_eq!(detector.detect(&frame(2)).unwrap(), vec![region(10)]);
    }

    #[test]
    fn test_interval_3_repeats_last_result() {
        let inner = FakeDetector::new(vec![Ok(vec![region(10)]), Ok(vec![region(40)])]);
        let mut detector = SkipFrameDetector::new(Box::new(inner), 3).unwrap();

        let xs: Vec<i32> = (0..6)
            .map(|i| detector.detect(&frame(i)).unwrap()[0].x)
            .collect();
        assert_eq!(xs, vec![10, 10, 10, 40, 40, 40]);
    }

    #[test]
    fn test_skip_interval_0_errors() {
        let inner = FakeDetector::new(vec![Ok(vec![])]);
        assert!(SkipFrameDetector::new(Box::new(inner), 0).is_err());
    }

    #[test]
    fn test_fresh_detection_bypasses_cache_and_restarts_interval() {
        let inner = FakeDetector::new(vec![
            Ok(vec![region(10)]),
            Ok(vec![region(40)]),
            Ok(vec![region(70)]),
        ]);
        let mut detector = SkipFrameDetector::new(Box::new(inner), 3).unwrap();

        assert_eq!(detector.detect(&frame(0)).unwrap(), vec![region(10)]);
        assert_eq!(detector.detect_fresh(&frame(1)).unwrap(), vec![region(40)]);
        assert_eq!(detector.detect(&frame(2)).unwrap(), vec![region(40)]);
        assert_eq!(detector.detect(&frame(3)).unwrap(), vec![region(40)]);
        assert_eq!(detector.detect(&frame(4)).unwrap(), vec![region(70)]);
    }

    #[test]
    fn test_failed_detection_clears_cached_regions() {
        let inner = FakeDetector::new(vec![Ok(vec![region(10)]), Err("inference failed")]);
        let mut detector = SkipFrameDetector::new(Box::new(inner), 2).unwrap();

        detector.detect(&frame(0)).unwrap();
        detector.detect(&frame(1)).unwrap();
        assert!(detector.detect(&frame(2)).is_err());
        assert!(detector.detect(&frame(3)).unwrap().is_empty());
    }
}
