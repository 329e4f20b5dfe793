//! Core types and settings for the AccelMagiQ estimator

use nalgebra::UnitQuaternion;

use crate::error::ConfigError;

/// User-facing coordinate convention
///
/// Selects how the sensor axes are remapped before estimation and whether
/// the magnetometer takes part. The numeric values match the ids used by
/// block front-ends (see [`CoordinateSystem::try_from`]).
///
/// # Conventions
/// - **RAW**: sensor axes as sampled. North is the button-A marking and a
///   device lying face up reads as upside-down.
/// - **BASIC**: north is the logo marking. Heading is not tilt compensated,
///   so tilting the device biases it.
/// - **TILT**: north is the back side of the board. Heading is resolved from
///   the magnetometer and stays put under tilt.
///
/// # Example
/// ```
/// use accelmagiq::{CoordinateSystem, FusionSettings};
///
/// let settings = FusionSettings {
///     coordinate_system: CoordinateSystem::Tilt,
///     ..Default::default()
/// };
/// assert!(settings.coordinate_system.uses_magnetometer());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum CoordinateSystem {
    /// Raw package axes
    Raw = 0,
    /// Logo-mark north, accelerometer only
    #[default]
    Basic = 1,
    /// Back-side north, tilt compensated with the magnetometer
    Tilt = 2,
}

impl TryFrom<u8> for CoordinateSystem {
    type Error = ConfigError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(CoordinateSystem::Raw),
            1 => Ok(CoordinateSystem::Basic),
            2 => Ok(CoordinateSystem::Tilt),
            other => Err(ConfigError::UnknownCoordinateSystem(other)),
        }
    }
}

impl From<CoordinateSystem> for u8 {
    fn from(system: CoordinateSystem) -> Self {
        system as u8
    }
}

/// Solver used to resolve heading in [`CoordinateSystem::Tilt`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TiltMethod {
    /// Gravity half-angle tilt composed with a yaw rotation taken from the
    /// levelled horizontal magnetic field: `q = q_yaw ⊗ q_tilt`
    #[default]
    Composed,
    /// Fast Accelerometer-Magnetometer Combination (Liu & Wu), solving the
    /// whole attitude from the gravity and field pair in closed form
    Famc,
}

/// Estimator configuration
///
/// # Example
/// ```
/// use accelmagiq::{CoordinateSystem, FusionSettings, TiltMethod};
///
/// let settings = FusionSettings {
///     coordinate_system: CoordinateSystem::Tilt,
///     alpha: 0.1,                     // heavy smoothing
///     tilt_method: TiltMethod::Famc,
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionSettings {
    /// Active coordinate convention
    pub coordinate_system: CoordinateSystem,
    /// Low-pass filter coefficient in `[0, 1]` (typically 0.3)
    ///
    /// Larger values follow new samples faster but pass more noise.
    /// Out-of-range values are clamped when applied.
    pub alpha: f32,
    /// Heading solver for TILT mode
    pub tilt_method: TiltMethod,
}

impl Default for FusionSettings {
    fn default() -> Self {
        Self {
            coordinate_system: CoordinateSystem::default(),
            alpha: 0.3,
            tilt_method: TiltMethod::default(),
        }
    }
}

/// Reason an estimate could not be refreshed from the current samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degeneracy {
    /// Accelerometer vector was zero or not finite (free-fall, glitch)
    Acceleration,
    /// Device is upside-down relative to the canonical up axis, where the
    /// half-angle construction is singular
    Inverted,
    /// Horizontal magnetic field vanished (field parallel to gravity,
    /// zero or non-finite magnetometer). Tilt was updated, yaw was held.
    MagneticField,
    /// The resulting quaternion could not be normalized
    Quaternion,
}

/// Outcome of a single estimation tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimateStatus {
    /// Orientation was recomputed from the current samples
    Fresh,
    /// Samples were unusable; see [`Degeneracy`] for what was held
    Degenerate(Degeneracy),
    /// The sensor collaborator failed to deliver a sample
    SensorFault,
}

/// Published orientation together with the status of the tick that produced it
///
/// The quaternion is always a valid unit quaternion, even when `status`
/// reports a held value.
///
/// # Example
/// ```
/// use accelmagiq::{FusionService, MotionSensor};
/// use nalgebra::Vector3;
///
/// struct Level;
///
/// impl MotionSensor for Level {
///     type Error = ();
///     fn read_acceleration(&mut self) -> Result<Vector3<f32>, ()> {
///         Ok(Vector3::new(0.0, 0.0, -1.0))
///     }
///     fn read_magnetic_field(&mut self) -> Result<Vector3<f32>, ()> {
///         Ok(Vector3::new(0.0, 30.0, -20.0))
///     }
/// }
///
/// let mut fusion = FusionService::new(Level);
/// let estimate = fusion.estimate();
/// if estimate.is_stale() {
///     println!("holding previous orientation: {:?}", estimate.status);
/// }
/// let [w, x, y, z] = estimate.components();
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    /// Current orientation, body frame to North-West-Up world frame
    pub quaternion: UnitQuaternion<f32>,
    /// How this tick went
    pub status: EstimateStatus,
}

impl Estimate {
    /// Quaternion components in `[w, x, y, z]` order
    pub fn components(&self) -> [f32; 4] {
        let q = self.quaternion.as_ref();
        [q.w, q.i, q.j, q.k]
    }

    /// True when the quaternion was held over from an earlier tick, fully or
    /// in part
    pub fn is_stale(&self) -> bool {
        self.status != EstimateStatus::Fresh
    }
}
