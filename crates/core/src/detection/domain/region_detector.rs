use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Finds face candidates in a single frame.
///
/// The returned order is preserved for rendering; callers that pick one
/// region take the first. Implementations may keep state across frames,
/// hence `&mut self`.
pub trait RegionDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>>;

    /// Like [`detect`](Self::detect), but never answers with regions found
    /// on an earlier frame.
    fn detect_fresh(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
        self.detect(frame)
    }
}
