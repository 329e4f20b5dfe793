//! Exponential low-pass smoothing of raw sensor axes

use nalgebra::Vector3;

/// Per-axis exponential smoothing filter
///
/// Suppresses high-frequency sensor noise before it reaches the estimator.
/// The first sample seeds the filter directly, so there is no startup
/// transient toward zero.
///
/// `alpha` is used as given: values outside `[0, 1]` would invert the
/// smoothing, so callers validate it first (the
/// [`FusionService`](crate::FusionService) setters clamp).
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use accelmagiq::LowPassFilter;
///
/// let mut filter = LowPassFilter::new(0.5);
/// let first = filter.update(Vector3::new(0.0, 0.0, 1.0));
/// assert_eq!(first, Vector3::new(0.0, 0.0, 1.0)); // seeded
///
/// let next = filter.update(Vector3::new(0.0, 0.0, 0.0));
/// assert_eq!(next.z, 0.5);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LowPassFilter {
    /// Weight of the new sample
    alpha: f32,
    /// Precomputed `1 - alpha`
    one_minus_alpha: f32,
    /// Smoothed value, `None` until the first sample
    smoothed: Option<Vector3<f32>>,
}

impl LowPassFilter {
    /// Create an unseeded filter with the given coefficient
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha,
            one_minus_alpha: 1.0 - alpha,
            smoothed: None,
        }
    }

    /// Feed a raw sample and return the smoothed value
    ///
    /// `smoothed = alpha * raw + (1 - alpha) * previous`
    pub fn update(&mut self, raw: Vector3<f32>) -> Vector3<f32> {
        let smoothed = match self.smoothed {
            Some(previous) => raw * self.alpha + previous * self.one_minus_alpha,
            None => raw,
        };
        self.smoothed = Some(smoothed);
        smoothed
    }

    /// Replace the coefficient, keeping the accumulated state
    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha;
        self.one_minus_alpha = 1.0 - alpha;
    }

    /// Current coefficient
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Current smoothed value, `None` before the first sample
    pub fn value(&self) -> Option<Vector3<f32>> {
        self.smoothed
    }

    /// Whether a sample has been seen since construction or the last reset
    pub fn is_seeded(&self) -> bool {
        self.smoothed.is_some()
    }

    /// Drop the accumulated state; the next sample seeds the filter again
    pub fn reset(&mut self) {
        self.smoothed = None;
    }
}
