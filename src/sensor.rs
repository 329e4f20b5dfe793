//! Sensor collaborator interface
//!
//! The estimator does not talk to hardware. A driver, a simulator or a test
//! double implements [`MotionSensor`] and hands it to
//! [`FusionService`](crate::FusionService), which pulls one sample per
//! [`estimate`](crate::FusionService::estimate) call.
//!
//! Readings are taken as delivered: any axis convention, any scale, and
//! whatever calibration state the driver maintains. The
//! [`CoordinateSystem`](crate::CoordinateSystem) remap is defined relative to
//! the driver's own axes.

use nalgebra::Vector3;

/// Source of raw accelerometer and magnetometer samples
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use accelmagiq::MotionSensor;
///
/// /// Replays a fixed reading, e.g. for a bench fixture
/// struct Fixed {
///     acceleration: Vector3<f32>,
///     field: Vector3<f32>,
/// }
///
/// impl MotionSensor for Fixed {
///     type Error = core::convert::Infallible;
///
///     fn read_acceleration(&mut self) -> Result<Vector3<f32>, Self::Error> {
///         Ok(self.acceleration)
///     }
///
///     fn read_magnetic_field(&mut self) -> Result<Vector3<f32>, Self::Error> {
///         Ok(self.field)
///     }
/// }
/// ```
pub trait MotionSensor {
    /// Driver error, reported through the log when a read fails
    type Error: core::fmt::Debug;

    /// Read the accelerometer, in g (any consistent scale works)
    fn read_acceleration(&mut self) -> Result<Vector3<f32>, Self::Error>;

    /// Read the magnetometer. Only called in
    /// [`CoordinateSystem::Tilt`](crate::CoordinateSystem::Tilt).
    fn read_magnetic_field(&mut self) -> Result<Vector3<f32>, Self::Error>;
}

impl<S: MotionSensor + ?Sized> MotionSensor for &mut S {
    type Error = S::Error;

    fn read_acceleration(&mut self) -> Result<Vector3<f32>, Self::Error> {
        (**self).read_acceleration()
    }

    fn read_magnetic_field(&mut self) -> Result<Vector3<f32>, Self::Error> {
        (**self).read_magnetic_field()
    }
}
