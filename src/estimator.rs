//! Closed-form attitude estimation from gravity and magnetic field vectors

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use crate::compass::horizontal_north;
use crate::math::{QuaternionExt, normalize, normalize_quaternion};
use crate::types::{Degeneracy, TiltMethod};

/// Below this half-angle scalar the device is treated as inverted and the
/// `1 / 2w` terms are not evaluated.
const SINGULARITY_EPSILON: f32 = 1e-3;

/// Quaternion that rotates the measured up direction onto world +Z
///
/// Half-angle construction from a single vector: with the normalized
/// canonical `(ax, ay, az)`,
///
/// ```text
/// w = sqrt((az + 1) / 2)
/// x = ay / 2w,   y = -ax / 2w,   z = 0
/// ```
///
/// Gravity alone constrains roll and pitch only, so `z` is always exactly
/// zero.
///
/// # Errors
/// - [`Degeneracy::Acceleration`] when `up` is zero or not finite
/// - [`Degeneracy::Inverted`] when `az` is within reach of -1
/// - [`Degeneracy::Quaternion`] when the result cannot be normalized
///
/// # Example
/// ```
/// use nalgebra::{UnitQuaternion, Vector3};
/// use accelmagiq::tilt_quaternion;
///
/// let q = tilt_quaternion(Vector3::new(0.0, 0.0, 9.81)).unwrap();
/// assert_eq!(q, UnitQuaternion::identity());
/// ```
pub fn tilt_quaternion(up: Vector3<f32>) -> Result<UnitQuaternion<f32>, Degeneracy> {
    let a = normalize(up).ok_or(Degeneracy::Acceleration)?;

    // az + 1 can round to a tiny negative
    let w = ((a.z + 1.0).max(0.0) / 2.0).sqrt();
    if w < SINGULARITY_EPSILON {
        return Err(Degeneracy::Inverted);
    }

    let two_w = 2.0 * w;
    let q = Quaternion::new(w, a.y / two_w, -a.x / two_w, 0.0);

    normalize_quaternion(q).ok_or(Degeneracy::Quaternion)
}

/// Rotation about world +Z by `yaw` radians
pub fn yaw_quaternion(yaw: f32) -> UnitQuaternion<f32> {
    UnitQuaternion::from_axis_angle(&Vector3::z_axis(), yaw)
}

/// Yaw that turns the levelled magnetic north onto world +X
///
/// `q_tilt` must already map `up` onto +Z.
fn resolve_yaw(
    q_tilt: &UnitQuaternion<f32>,
    up: Vector3<f32>,
    magnetometer: Vector3<f32>,
) -> Option<f32> {
    let north = horizontal_north(up, magnetometer)?;
    let levelled = q_tilt * north;

    Some(-levelled.y.atan2(levelled.x))
}

/// Fast Accelerometer-Magnetometer Combination
///
/// Closed-form attitude from one gravity and one magnetic field
/// observation, after Liu & Wu, "A Simplified Analytic Attitude
/// Determination Algorithm Using Accelerometer and Magnetometer". The
/// result uses the same frame as [`tilt_quaternion`] composed with
/// [`yaw_quaternion`] (body to North-West-Up), with `w >= 0`.
///
/// The solver divides by pivots that vanish as the rotation approaches a
/// half-turn (`w -> 0`), so single precision degrades there. An exactly
/// inverted device is such a half-turn.
///
/// # Errors
/// - [`Degeneracy::Acceleration`] when `up` cannot be normalized
/// - [`Degeneracy::MagneticField`] when `magnetometer` cannot be normalized
/// - [`Degeneracy::Quaternion`] when an intermediate pivot vanishes
pub fn famc_quaternion(
    up: Vector3<f32>,
    magnetometer: Vector3<f32>,
) -> Result<UnitQuaternion<f32>, Degeneracy> {
    let a = normalize(up).ok_or(Degeneracy::Acceleration)?;
    let m = normalize(magnetometer).ok_or(Degeneracy::MagneticField)?;

    // Magnetic reference in the world frame: (m_n, 0, m_d)
    let m_d = a.dot(&m);
    let m_n = (1.0 - m_d * m_d).max(0.0).sqrt();

    let b11 = m_n * m.x / 2.0;
    let b13 = a.x / 2.0 + m_d * m.x / 2.0;
    let b21 = m_n * m.y / 2.0;
    let b23 = a.y / 2.0 + m_d * m.y / 2.0;
    let b31 = m_n * m.z / 2.0;
    let b33 = a.z / 2.0 + m_d * m.z / 2.0;

    let tau = b13 + b31;

    let p1 = b33 - b11 + 1.0;
    let a11 = -1.0 / p1;
    let a12 = b21 / p1;
    let a13 = tau / p1;

    let p2 = -b21 * b21 / p1 + b11 + b33 + 1.0;
    let a21 = -b21 / (p1 * p2);
    let a22 = -1.0 / p2;
    let a23 = (b23 + b21 * tau / p1) / p2;

    let p3 = p1 - 2.0 + tau * tau / p1 + a23 * a23 * p2;
    let a31 = (tau / p1 + b21 * a23 / p1) / p3;
    let a32 = a23 / p3;
    let a33 = 1.0 / p3;

    let skew = b13 - b31;
    let x = b23 * (a11 + a12 * (a21 + a23 * a31) + a13 * a31) - skew * (a21 + a23 * a31) - a31 * b21;
    let y = b23 * (a12 * (a22 + a23 * a32) + a13 * a32) - skew * (a22 + a23 * a32) - a32 * b21;
    let z = b23 * (a13 * a33 + a12 * a23 * a33) - a33 * b21 - a23 * a33 * skew;

    normalize_quaternion(Quaternion::new(-1.0, x, y, z))
        .map(|q| q.with_positive_scalar())
        .ok_or(Degeneracy::Quaternion)
}

/// Attitude estimator state
///
/// Holds the last published orientation and the last resolved yaw. Every
/// update either replaces the orientation with a new unit quaternion or
/// leaves it untouched (last-known-good), so [`quaternion`](Self::quaternion)
/// is always valid.
///
/// Inputs are canonical-frame vectors, i.e. already remapped by
/// [`CoordinateSystem::remap`](crate::CoordinateSystem::remap).
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use accelmagiq::{AttitudeEstimator, Degeneracy};
///
/// let mut estimator = AttitudeEstimator::new();
/// estimator.update(Vector3::new(0.1, 0.0, 0.99)).unwrap();
/// let tilted = estimator.quaternion();
///
/// // Free-fall: the previous orientation is kept
/// assert_eq!(estimator.update(Vector3::zeros()), Err(Degeneracy::Acceleration));
/// assert_eq!(estimator.quaternion(), tilted);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AttitudeEstimator {
    /// Published orientation, body to world
    quaternion: UnitQuaternion<f32>,
    /// Last resolved yaw in radians
    yaw: f32,
}

impl AttitudeEstimator {
    /// Start at the identity orientation with zero yaw
    pub fn new() -> Self {
        Self {
            quaternion: UnitQuaternion::identity(),
            yaw: 0.0,
        }
    }

    /// Last published orientation
    pub fn quaternion(&self) -> UnitQuaternion<f32> {
        self.quaternion
    }

    /// Last resolved yaw in radians, held when the magnetic field degenerates
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Return to identity and zero yaw
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Accelerometer-only update (RAW and BASIC)
    ///
    /// On error the published orientation is unchanged.
    pub fn update(&mut self, up: Vector3<f32>) -> Result<(), Degeneracy> {
        self.quaternion = tilt_quaternion(up)?;
        Ok(())
    }

    /// Accelerometer and magnetometer update (TILT)
    ///
    /// Resolves yaw from the magnetic field with the selected method. When
    /// the horizontal field is unusable the tilt is still refreshed and
    /// composed with the previous yaw; that case reports
    /// [`Degeneracy::MagneticField`] although the orientation changed. Every
    /// other error leaves the orientation unchanged.
    pub fn update_with_field(
        &mut self,
        up: Vector3<f32>,
        magnetometer: Vector3<f32>,
        method: TiltMethod,
    ) -> Result<(), Degeneracy> {
        if horizontal_north(up, magnetometer).is_none() {
            let q_tilt = tilt_quaternion(up)?;
            self.publish(yaw_quaternion(self.yaw) * q_tilt)?;
            return Err(Degeneracy::MagneticField);
        }

        match method {
            TiltMethod::Composed => {
                let q_tilt = tilt_quaternion(up)?;
                let yaw = resolve_yaw(&q_tilt, up, magnetometer).ok_or(Degeneracy::MagneticField)?;
                self.publish(yaw_quaternion(yaw) * q_tilt)?;
                self.yaw = yaw;
            }
            TiltMethod::Famc => {
                self.publish(famc_quaternion(up, magnetometer)?)?;
                // Keep the held yaw in step for later fallbacks
                if let Some(yaw) = tilt_quaternion(up)
                    .ok()
                    .and_then(|q_tilt| resolve_yaw(&q_tilt, up, magnetometer))
                {
                    self.yaw = yaw;
                }
            }
        }
        Ok(())
    }

    /// Renormalize and store
    fn publish(&mut self, q: UnitQuaternion<f32>) -> Result<(), Degeneracy> {
        self.quaternion = normalize_quaternion(q.into_inner()).ok_or(Degeneracy::Quaternion)?;
        Ok(())
    }
}

impl Default for AttitudeEstimator {
    fn default() -> Self {
        Self::new()
    }
}
