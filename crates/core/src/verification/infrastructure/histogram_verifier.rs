/// HSV histogram-based face verifier.
///
/// Compares two face crops by their color distribution using 2D
/// Hue-Saturation histograms and Pearson correlation. Needs no model,
/// which makes it the offline fallback to [`super::embedding_verifier`].
use crate::shared::frame::Frame;
use crate::verification::domain::verifier::{Verdict, Verifier};

pub const DEFAULT_THRESHOLD: f64 = 0.7;

const HUE_BINS: usize = 32;
const SAT_BINS: usize = 32;

pub struct HistogramVerifier {
    threshold: f64,
}

impl HistogramVerifier {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Default for HistogramVerifier {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl Verifier for HistogramVerifier {
    fn verify(
        &self,
        reference: &Frame,
        candidate: &Frame,
    ) -> Result<Verdict, Box<dyn std::error::Error>> {
        let a = compute_histogram(reference)?;
        let b = compute_histogram(candidate)?;
        Ok(Verdict::from_similarity(
            pearson_correlation(&a, &b),
            self.threshold,
        ))
    }
}

fn compute_histogram(frame: &Frame) -> Result<Vec<f64>, Box<dyn std::error::Error>> {
    if frame.channels() != 3 {
        return Err(format!("expected an RGB frame, got {} channels", frame.channels()).into());
    }
    if frame.data().is_empty() {
        return Err("cannot build a histogram of an empty frame".into());
    }

    let mut hist = vec![0.0f64; HUE_BINS * SAT_BINS];
    let pixels = frame.data().chunks_exact(3);
    let count = pixels.len() as f64;

    for px in pixels {
        let (h, s, _v) = rgb_to_hsv(
            px[0] as f64 / 255.0,
            px[1] as f64 / 255.0,
            px[2] as f64 / 255.0,
        );
        let h_bin = ((h / 360.0) * HUE_BINS as f64).min(HUE_BINS as f64 - 1.0) as usize;
        let s_bin = (s * SAT_BINS as f64).min(SAT_BINS as f64 - 1.0) as usize;
        hist[h_bin * SAT_BINS + s_bin] += 1.0;
    }

    for v in &mut hist {
        *v /= count;
    }
    Ok(hist)
}

fn rgb_to_hsv(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let s = if max > 0.0 { delta / max } else { 0.0 };

    let h = if delta == 0.0 {
        0.0
    } else if (max - r).abs() < f64::EPSILON {
        60.0 * (((g - b) / delta) % 6.0)
    } else if (max - g).abs() < f64::EPSILON {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    (if h < 0.0 { h + 360.0 } else { h }, s, max)
}

/// Pearson correlation coefficient.
///
/// 1.0 when both inputs have zero variance (identical distributions),
/// 0.0 when only one does.
fn pearson_correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }

    let mean_a = a[..n].iter().sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().sum::<f64>() / n as f64;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        let da = x - mean_a;
        let db = y - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    let denom = (var_a * var_b).sqrt();
    if denom < f64::EPSILON {
        return if var_a < f64::EPSILON && var_b < f64::EPSILON {
            1.0
        } else {
            0.0
        };
    }
    cov / denom
}
