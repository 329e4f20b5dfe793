//! Axis remapping between the sensor package and the user-facing conventions
//!
//! Each [`CoordinateSystem`] maps a sensor reading `(x, y, z)` into the
//! estimator's canonical frame `(ax, ay, az)`, where `az` points up when the
//! device rests in the convention's reference pose.
//!
//! | System | Canonical axes | Heading zero |
//! |--------|----------------|--------------|
//! | RAW    | `( x,  y,  z)` | button-A marking |
//! | BASIC  | `( y,  x, -z)` | logo marking |
//! | TILT   | `( z,  x,  y)` | back side |
//!
//! # Example
//! ```
//! use nalgebra::Vector3;
//! use accelmagiq::CoordinateSystem;
//!
//! // Board lying face up: gravity reads as -Z on the package
//! let sensor = Vector3::new(0.0, 0.0, -1.0);
//!
//! let canonical = CoordinateSystem::Basic.remap(sensor);
//! assert_eq!(canonical, Vector3::new(0.0, 0.0, 1.0)); // up
//! ```

use nalgebra::Vector3;

use crate::types::CoordinateSystem;

impl CoordinateSystem {
    /// Remap a sensor-frame vector into the canonical estimation frame.
    ///
    /// Every remap is a signed permutation with determinant +1, so lengths
    /// and handedness are preserved.
    #[inline]
    pub fn remap(self, sensor: Vector3<f32>) -> Vector3<f32> {
        match self {
            CoordinateSystem::Raw => sensor,
            CoordinateSystem::Basic => Vector3::new(sensor.y, sensor.x, -sensor.z),
            CoordinateSystem::Tilt => Vector3::new(sensor.z, sensor.x, sensor.y),
        }
    }

    /// Whether this convention fuses the magnetometer
    #[inline]
    pub fn uses_magnetometer(self) -> bool {
        matches!(self, CoordinateSystem::Tilt)
    }
}
