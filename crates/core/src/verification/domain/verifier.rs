use crate::shared::frame::Frame;

/// Outcome of comparing a candidate face against a reference.
#[derive(Clone, Debug, PartialEq)]
pub struct Verdict {
    pub verified: bool,
    /// Backend-specific score; higher means more alike.
    pub similarity: f64,
    /// Score at or above which `verified` is true.
    pub threshold: f64,
}

impl Verdict {
    pub fn from_similarity(similarity: f64, threshold: f64) -> Self {
        Self {
            verified: similarity >= threshold,
            similarity,
            threshold,
        }
    }
}

/// Domain interface for deciding whether two face crops show the same person.
pub trait Verifier: Send {
    fn verify(
        &self,
        reference: &Frame,
        candidate: &Frame,
    ) -> Result<Verdict, Box<dyn std::error::Error>>;
}
