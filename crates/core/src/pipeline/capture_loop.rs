use std::time::{Duration, Instant};

use crate::capture::domain::frame_buffer::FrameBuffer;
use crate::detection::domain::region_detector::RegionDetector;
use crate::pipeline::identity_session_use_case::SessionError;
use crate::pipeline::overlay::draw_regions;
use crate::pipeline::session_display::{Command, SessionDisplay};
use crate::pipeline::session_logger::SessionLogger;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// How a capture loop ended.
#[derive(Clone, Debug, PartialEq)]
pub enum CaptureOutcome {
    /// The user quit without capturing.
    Quit,
    /// The face crop taken from the frame that was on screen at capture time.
    Captured(Frame),
}

/// Consumer side of a capture session: show the freshest frame with its
/// detected regions and wait for the user to quit or capture.
///
/// Every tick reads the buffer once, so detection, the annotated render and
/// a capture in the same tick all refer to the same frame. The crop uses a
/// fresh detection on that frame, never regions cached from an earlier one.
/// A capture with no region in view does nothing and the loop keeps going.
pub struct CaptureLoop<'a> {
    buffer: &'a FrameBuffer,
    detector: &'a mut dyn RegionDetector,
    display: &'a mut dyn SessionDisplay,
    logger: &'a mut dyn SessionLogger,
    poll_interval: Duration,
}

impl<'a> CaptureLoop<'a> {
    pub fn new(
        buffer: &'a FrameBuffer,
        detector: &'a mut dyn RegionDetector,
        display: &'a mut dyn SessionDisplay,
        logger: &'a mut dyn SessionLogger,
        poll_interval: Duration,
    ) -> Self {
        Self {
            buffer,
            detector,
            display,
            logger,
            poll_interval,
        }
    }

    pub fn run(&mut self) -> Result<CaptureOutcome, SessionError> {
        loop {
            let frame = self.buffer.latest();
            if let Some(frame) = &frame {
                self.show(frame)?;
            }

            let command = self
                .display
                .poll_command(self.poll_interval)
                .map_err(|e| SessionError::Display(e.to_string()))?;

            match command {
                Some(Command::Quit) => {
                    self.logger.info("Quit requested");
                    return Ok(CaptureOutcome::Quit);
                }
                Some(Command::Capture) => {
                    let crop = frame.as_ref().and_then(|f| {
                        let regions = self.fresh_regions(f);
                        first_crop(f, &regions)
                    });
                    match crop {
                        Some(crop) => {
                            self.logger.info(&format!(
                                "Captured {}x{} face from frame {}",
                                crop.width(),
                                crop.height(),
                                frame.as_ref().map_or(0, Frame::index)
                            ));
                            return Ok(CaptureOutcome::Captured(crop));
                        }
                        None => self.logger.info("No face in view, capture ignored"),
                    }
                }
                None => {}
            }
        }
    }

    /// Detects, annotates a copy of `frame` and renders it.
    fn show(&mut self, frame: &Frame) -> Result<(), SessionError> {
        let t0 = Instant::now();
        let regions = match self.detector.detect(frame) {
            Ok(regions) => regions,
            Err(e) => {
                log::warn!("Detection failed on frame {}: {e}", frame.index());
                Vec::new()
            }
        };
        self.logger
            .timing("detect", t0.elapsed().as_secs_f64() * 1000.0);
        self.logger.metric("regions", regions.len() as f64);

        let mut annotated = frame.clone();
        draw_regions(&mut annotated, &regions);

        let t0 = Instant::now();
        self.display
            .render(&annotated)
            .map_err(|e| SessionError::Display(e.to_string()))?;
        self.logger
            .timing("render", t0.elapsed().as_secs_f64() * 1000.0);
        self.logger.frame_rendered();

        Ok(())
    }

    fn fresh_regions(&mut self, frame: &Frame) -> Vec<Region> {
        self.detector.detect_fresh(frame).unwrap_or_else(|e| {
            log::warn!("Detection failed on frame {}: {e}", frame.index());
            Vec::new()
        })
    }
}

/// Crop of the first region, in detector order, that overlaps the frame.
fn first_crop(frame: &Frame, regions: &[Region]) -> Option<Frame> {
    regions.iter().find_map(|r| frame.crop(r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::overlay::REGION_COLOR;
    use crate::pipeline::session_logger::NullSessionLogger;
    use std::collections::VecDeque;

    struct FixedDetector {
        regions: Vec<Region>,
        /// Answered by `detect` instead of `regions`, like a stale cache.
        cached: Option<Vec<Region>>,
        fail: bool,
        frames_seen: Vec<usize>,
        fresh_calls: usize,
    }

    impl FixedDetector {
        fn new(regions: Vec<Region>) -> Self {
            Self {
                regions,
                cached: None,
                fail: false,
                frames_seen: Vec::new(),
                fresh_calls: 0,
            }
        }
    }

    impl RegionDetector for FixedDetector {
        fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
            self.frames_seen.push(frame.index());
            if self.fail {
                return Err("model crashed".into());
            }
            Ok(self.cached.clone().unwrap_or_else(|| self.regions.clone()))
        }

        fn detect_fresh(
            &mut self,
            frame: &Frame,
        ) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
            self.fresh_calls += 1;
            self.cached = None;
            self.detect(frame)
        }
    }

    /// Replays scripted commands, one per poll, then quits.
    #[derive(Default)]
    struct ScriptedDisplay {
        commands: VecDeque<Option<Command>>,
        rendered: Vec<Frame>,
        polls: usize,
        fail_render: bool,
    }

    impl ScriptedDisplay {
        fn new(commands: Vec<Option<Command>>) -> Self {
            Self {
                commands: commands.into(),
                ..Default::default()
            }
        }
    }

    impl SessionDisplay for ScriptedDisplay {
        fn render(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            if self.fail_render {
                return Err("window lost".into());
            }
            self.rendered.push(frame.clone());
            Ok(())
        }

        fn poll_command(
            &mut self,
            _timeout: Duration,
        ) -> Result<Option<Command>, Box<dyn std::error::Error>> {
            self.polls += 1;
            Ok(self.commands.pop_front().unwrap_or(Some(Command::Quit)))
        }

        fn show_comparison(
            &mut self,
            _reference: &Frame,
            _candidate: &Frame,
        ) -> Result<(), Box<dyn std::error::Error>> {
            Ok(())
        }

        fn close(&mut self) {}
    }

    fn buffer_with(frame: Frame) -> FrameBuffer {
        let buffer = FrameBuffer::new();
        buffer.publish(frame);
        buffer
    }

    fn run(
        buffer: &FrameBuffer,
        detector: &mut FixedDetector,
        display: &mut ScriptedDisplay,
    ) -> Result<CaptureOutcome, SessionError> {
        let mut logger = NullSessionLogger;
        CaptureLoop::new(
            buffer,
            detector,
            display,
            &mut logger,
            Duration::from_millis(1),
        )
        .run()
    }

    #[test]
    fn test_capture_crops_region_from_clean_frame() {
        let buffer = buffer_with(Frame::filled(100, 100, [200, 200, 200], 3));
        let mut detector = FixedDetector::new(vec![Region::new(10, 10, 50, 50)]);
        let mut display = ScriptedDisplay::new(vec![Some(Command::Capture)]);

        let outcome = run(&buffer, &mut detector, &mut display).unwrap();

        assert_eq!(
            outcome,
            CaptureOutcome::Captured(Frame::filled(50, 50, [200, 200, 200], 3))
        );
        // The rendered copy carries the outline, the crop does not.
        let rendered = &display.rendered[0];
        assert_eq!(&rendered.data()[(10 * 100 + 10) * 3..][..3], &REGION_COLOR);
    }

    #[test]
    fn test_capture_uses_first_region() {
        let buffer = buffer_with(Frame::filled(100, 100, [1, 2, 3], 0));
        let mut detector = FixedDetector::new(vec![
            Region::new(0, 0, 20, 30),
            Region::new(50, 50, 40, 40),
        ]);
        let mut display = ScriptedDisplay::new(vec![Some(Command::Capture)]);

        let CaptureOutcome::Captured(crop) = run(&buffer, &mut detector, &mut display).unwrap()
        else {
            panic!("expected a capture");
        };
        assert_eq!((crop.width(), crop.height()), (20, 30));
    }

    #[test]
    fn test_capture_skips_region_outside_frame() {
        let buffer = buffer_with(Frame::filled(100, 100, [1, 2, 3], 0));
        let mut detector = FixedDetector::new(vec![
            Region::new(300, 300, 20, 20),
            Region::new(90, 90, 40, 40),
        ]);
        let mut display = ScriptedDisplay::new(vec![Some(Command::Capture)]);

        let CaptureOutcome::Captured(crop) = run(&buffer, &mut detector, &mut display).unwrap()
        else {
            panic!("expected a capture");
        };
        assert_eq!((crop.width(), crop.height()), (10, 10));
    }

    #[test]
    fn test_capture_ignores_regions_cached_from_earlier_frames() {
        let buffer = buffer_with(Frame::filled(100, 100, [1, 2, 3], 0));
        let mut detector = FixedDetector::new(vec![Region::new(60, 60, 30, 30)]);
        detector.cached = Some(vec![Region::new(0, 0, 20, 20)]);
        let mut display = ScriptedDisplay::new(vec![None, Some(Command::Capture)]);

        let CaptureOutcome::Captured(crop) = run(&buffer, &mut detector, &mut display).unwrap()
        else {
            panic!("expected a capture");
        };
        assert_eq!((crop.width(), crop.height()), (30, 30));
        assert_eq!(detector.fresh_calls, 1);
    }

    #[test]
    fn test_stale_face_gone_from_fresh_detection_is_not_captured() {
        let buffer = buffer_with(Frame::filled(100, 100, [1, 2, 3], 0));
        let mut detector = FixedDetector::new(Vec::new());
        detector.cached = Some(vec![Region::new(0, 0, 20, 20)]);
        let mut display = ScriptedDisplay::new(vec![Some(Command::Capture)]);

        let outcome = run(&buffer, &mut detector, &mut display).unwrap();

        assert_eq!(outcome, CaptureOutcome::Quit);
    }

    #[test]
    fn test_capture_without_region_is_ignored() {
        let buffer = buffer_with(Frame::filled(64, 64, [0, 0, 0], 0));
        let mut detector = FixedDetector::new(Vec::new());
        let mut display =
            ScriptedDisplay::new(vec![Some(Command::Capture), None, Some(Command::Quit)]);

        let outcome = run(&buffer, &mut detector, &mut display).unwrap();

        assert_eq!(outcome, CaptureOutcome::Quit);
        assert_eq!(display.polls, 3);
        assert_eq!(display.rendered.len(), 3);
    }

    #[test]
    fn test_capture_before_first_frame_is_ignored() {
        let buffer = FrameBuffer::new();
        let mut detector = FixedDetector::new(vec![Region::new(0, 0, 10, 10)]);
        let mut display = ScriptedDisplay::new(vec![Some(Command::Capture)]);

        let outcome = run(&buffer, &mut detector, &mut display).unwrap();

        assert_eq!(outcome, CaptureOutcome::Quit);
        assert!(display.rendered.is_empty());
        assert!(detector.frames_seen.is_empty());
    }

    #[test]
    fn test_detection_error_counts_as_no_regions() {
        let buffer = buffer_with(Frame::filled(32, 32, [5, 5, 5], 0));
        let mut detector = FixedDetector::new(vec![Region::new(0, 0, 10, 10)]);
        detector.fail = true;
        let mut display = ScriptedDisplay::new(vec![Some(Command::Capture)]);

        let outcome = run(&buffer, &mut detector, &mut display).unwrap();

        assert_eq!(outcome, CaptureOutcome::Quit);
        assert_eq!(display.rendered[0], Frame::filled(32, 32, [5, 5, 5], 0));
    }

    #[test]
    fn test_render_error_ends_loop() {
        let buffer = buffer_with(Frame::filled(8, 8, [0, 0, 0], 0));
        let mut detector = FixedDetector::new(Vec::new());
        let mut display = ScriptedDisplay::new(Vec::new());
        display.fail_render = true;

        let result = run(&buffer, &mut detector, &mut display);

        assert!(matches!(result, Err(SessionError::Display(_))));
        assert_eq!(display.polls, 0);
    }

    #[test]
    fn test_each_tick_detects_the_latest_frame() {
        let buffer = buffer_with(Frame::filled(8, 8, [0, 0, 0], 7));
        let mut detector = FixedDetector::new(Vec::new());
        let mut display = ScriptedDisplay::new(vec![None, None]);

        run(&buffer, &mut detector, &mut display).unwrap();

        assert_eq!(detector.frames_seen, vec![7, 7, 7]);
    }
}
