//! Guarded vector and quaternion math built on nalgebra

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

/// Mathematical constants
pub const DEG_TO_RAD: f32 = core::f32::consts::PI / 180.0;
pub const RAD_TO_DEG: f32 = 180.0 / core::f32::consts::PI;

/// Normalize a 3-vector.
///
/// Returns `None` when the norm is zero or not finite, which is the case for
/// free-fall accelerometer readings, for any NaN/Inf component and for
/// glitch readings whose norm overflows. Every
/// normalization in this crate goes through this guard.
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use accelmagiq::normalize;
///
/// let unit = normalize(Vector3::new(3.0, 4.0, 0.0)).unwrap();
/// assert!((unit.x - 0.6).abs() < 1e-6);
///
/// assert!(normalize(Vector3::zeros()).is_none());
/// assert!(normalize(Vector3::new(f32::NAN, 0.0, 1.0)).is_none());
/// ```
pub fn normalize(v: Vector3<f32>) -> Option<Vector3<f32>> {
    let norm = v.magnitude();
    if norm.is_finite() && norm > 0.0 {
        Some(v * (1.0 / norm))
    } else {
        None
    }
}

/// Normalize a quaternion, with the same contract as [`normalize`].
pub fn normalize_quaternion(q: Quaternion<f32>) -> Option<UnitQuaternion<f32>> {
    let norm = (q.w * q.w + q.i * q.i + q.j * q.j + q.k * q.k).sqrt();
    if norm.is_finite() && norm > 0.0 {
        Some(UnitQuaternion::new_unchecked(q * (1.0 / norm)))
    } else {
        None
    }
}

/// Extension trait for Vector3 operations
pub trait Vector3Ext {
    /// True when every component is finite
    fn is_finite(&self) -> bool;

    /// Convert degrees to radians
    fn deg_to_rad(&self) -> Vector3<f32>;

    /// Convert radians to degrees
    fn rad_to_deg(&self) -> Vector3<f32>;
}

impl Vector3Ext for Vector3<f32> {
    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    fn deg_to_rad(&self) -> Vector3<f32> {
        *self * DEG_TO_RAD
    }

    fn rad_to_deg(&self) -> Vector3<f32> {
        *self * RAD_TO_DEG
    }
}

/// Extension trait for UnitQuaternion operations
///
/// Euler angles are `(roll, pitch, yaw)` about the world X, Y and Z axes,
/// the derived view published alongside the quaternion.
pub trait QuaternionExt {
    /// Convert quaternion to Euler angles (roll, pitch, yaw) in radians
    fn to_euler(&self) -> Vector3<f32>;

    /// Convert quaternion to Euler angles in degrees
    fn to_euler_degrees(&self) -> Vector3<f32>;

    /// Create quaternion from Euler angles in radians
    fn from_euler(roll: f32, pitch: f32, yaw: f32) -> UnitQuaternion<f32>;

    /// Create quaternion from Euler angles in degrees
    fn from_euler_degrees(roll: f32, pitch: f32, yaw: f32) -> UnitQuaternion<f32>;

    /// Flip the sign if needed so that `w >= 0`. `q` and `-q` describe the
    /// same orientation.
    fn with_positive_scalar(&self) -> UnitQuaternion<f32>;
}

impl QuaternionExt for UnitQuaternion<f32> {
    fn to_euler(&self) -> Vector3<f32> {
        let (roll, pitch, yaw) = self.euler_angles();
        Vector3::new(roll, pitch, yaw)
    }

    fn to_euler_degrees(&self) -> Vector3<f32> {
        self.to_euler().rad_to_deg()
    }

    fn from_euler(roll: f32, pitch: f32, yaw: f32) -> UnitQuaternion<f32> {
        UnitQuaternion::from_euler_angles(roll, pitch, yaw)
    }

    fn from_euler_degrees(roll: f32, pitch: f32, yaw: f32) -> UnitQuaternion<f32> {
        let euler_rad = Vector3::new(roll, pitch, yaw).deg_to_rad();
        Self::from_euler(euler_rad.x, euler_rad.y, euler_rad.z)
    }

    fn with_positive_scalar(&self) -> UnitQuaternion<f32> {
        if self.as_ref().w < 0.0 {
            UnitQuaternion::new_unchecked(-self.into_inner())
        } else {
            *self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_guards() {
        let v = Vector3::new(3.0f32, 4.0, 0.0);
        let unit = normalize(v).unwrap();
        assert!((unit.magnitude() - 1.0).abs() < 1e-6);

        assert!(normalize(Vector3::zeros()).is_none());
        assert!(normalize(Vector3::new(f32::NAN, 1.0, 0.0)).is_none());
        assert!(normalize(Vector3::new(f32::INFINITY, 1.0, 0.0)).is_none());
        assert!(normalize(Vector3::repeat(f32::MAX)).is_none());

        // Tiny but non-zero vectors still normalize
        let tiny = normalize(Vector3::new(1e-10, 1e-10, 1e-10)).unwrap();
        assert!((tiny.magnitude() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_vector_helpers() {
        assert!(Vector3::new(1.0f32, -2.0, 3.0).is_finite());
        assert!(!Vector3::new(0.0, f32::NAN, 0.0).is_finite());
        assert!(!Vector3::new(0.0, 0.0, f32::NEG_INFINITY).is_finite());

        let degrees = Vector3::new(180.0f32, -90.0, 45.0);
        let radians = degrees.deg_to_rad();
        assert!((radians.x - core::f32::consts::PI).abs() < 1e-6);
        assert!((radians.rad_to_deg() - degrees).norm() < 1e-4);
    }

    #[test]
    fn test_normalize_quaternion() {
        let q = normalize_quaternion(Quaternion::new(2.0, 0.0, 0.0, 0.0)).unwrap();
        assert_eq!(q, UnitQuaternion::identity());

        let q = normalize_quaternion(Quaternion::new(1.0, 1.0, 1.0, 1.0)).unwrap();
        assert!((q.as_ref().norm() - 1.0).abs() < 1e-6);

        assert!(normalize_quaternion(Quaternion::new(0.0, 0.0, 0.0, 0.0)).is_none());
        assert!(normalize_quaternion(Quaternion::new(f32::NAN, 0.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_quaternion_euler_conversion() {
        let euler = Vector3::new(30.0, 45.0, 60.0);
        let quat = UnitQuaternion::from_euler_degrees(euler.x, euler.y, euler.z);
        let recovered = quat.to_euler_degrees();

        assert!((euler - recovered).magnitude() < 1e-3);
    }

    #[test]
    fn test_positive_scalar() {
        let q = UnitQuaternion::from_euler(0.1, 0.2, 0.3);
        let flipped = UnitQuaternion::new_unchecked(-q.into_inner());
        assert!(flipped.as_ref().w < 0.0);

        let canonical = flipped.with_positive_scalar();
        assert!((canonical.as_ref() - q.as_ref()).norm() < 1e-6);
        assert_eq!(q.with_positive_scalar(), q);
    }
}
