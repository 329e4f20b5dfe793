//! Per-tick orchestration: sample, smooth, remap, estimate, publish

use nalgebra::{UnitQuaternion, Vector3};

use crate::compass::calculate_heading;
use crate::error::ConfigError;
use crate::estimator::AttitudeEstimator;
use crate::filter::LowPassFilter;
use crate::math::{QuaternionExt, normalize};
use crate::sensor::MotionSensor;
use crate::types::{
    CoordinateSystem, Degeneracy, Estimate, EstimateStatus, FusionSettings, TiltMethod,
};

/// Clamp alpha into `[0, 1]`; NaN has no sensible clamp and is rejected
fn validate_alpha(alpha: f32) -> Result<f32, ConfigError> {
    if alpha.is_nan() {
        log::warn!("rejecting NaN low-pass filter alpha");
        return Err(ConfigError::NonFiniteAlpha);
    }

    let clamped = alpha.clamp(0.0, 1.0);
    if clamped != alpha {
        log::warn!("low-pass filter alpha {} clamped to {}", alpha, clamped);
    }
    Ok(clamped)
}

/// Accelerometer/magnetometer attitude service
///
/// Owns the sensor handle, one low-pass filter per sensor, the estimator
/// state and the active configuration. Each [`estimate`](Self::estimate)
/// call pulls one sample set, smooths it in the sensor frame, remaps it
/// into the active [`CoordinateSystem`] and refreshes the orientation.
/// Nothing runs between calls; the caller sets the cadence and should keep
/// it roughly uniform for the filter's time constant to mean anything.
///
/// The published quaternion is always unit-norm. Unusable samples leave the
/// previous orientation in place and are reported through
/// [`Estimate::status`].
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use accelmagiq::{CoordinateSystem, FusionService, MotionSensor};
///
/// struct Board;
///
/// impl MotionSensor for Board {
///     type Error = ();
///     fn read_acceleration(&mut self) -> Result<Vector3<f32>, ()> {
///         Ok(Vector3::new(0.0, 0.0, -1.0)) // replace with driver reads
///     }
///     fn read_magnetic_field(&mut self) -> Result<Vector3<f32>, ()> {
///         Ok(Vector3::new(0.0, 0.0, 0.0))
///     }
/// }
///
/// let mut fusion = FusionService::new(Board);
/// fusion.set_coordinate_system(CoordinateSystem::Basic);
/// fusion.set_low_pass_filter_alpha(0.3).unwrap();
///
/// let [w, x, y, z] = fusion.estimate().components();
/// assert!((w - 1.0).abs() < 1e-6);
/// ```
pub struct FusionService<S> {
    /// External sample source
    sensor: S,
    /// Active configuration, alpha already validated
    settings: FusionSettings,
    /// Smoothing for raw accelerometer samples (sensor frame)
    accelerometer_filter: LowPassFilter,
    /// Smoothing for raw magnetometer samples (sensor frame)
    magnetometer_filter: LowPassFilter,
    /// Published orientation and held yaw
    estimator: AttitudeEstimator,
    /// Status of the most recent tick
    status: EstimateStatus,
}

impl<S: MotionSensor> FusionService<S> {
    /// Create a service with default settings
    pub fn new(sensor: S) -> Self {
        Self::with_settings(sensor, FusionSettings::default())
    }

    /// Create a service with the given settings
    ///
    /// An out-of-range alpha is clamped; a NaN alpha falls back to the
    /// default.
    pub fn with_settings(sensor: S, settings: FusionSettings) -> Self {
        let alpha = validate_alpha(settings.alpha).unwrap_or(FusionSettings::default().alpha);
        let settings = FusionSettings { alpha, ..settings };

        Self {
            sensor,
            settings,
            accelerometer_filter: LowPassFilter::new(alpha),
            magnetometer_filter: LowPassFilter::new(alpha),
            estimator: AttitudeEstimator::new(),
            status: EstimateStatus::Fresh,
        }
    }

    /// Pull one sample set from the sensor and refresh the orientation
    ///
    /// The magnetometer is only read in [`CoordinateSystem::Tilt`]. A failed
    /// read drops the tick and reports [`EstimateStatus::SensorFault`].
    pub fn estimate(&mut self) -> Estimate {
        let acceleration = match self.sensor.read_acceleration() {
            Ok(acceleration) => acceleration,
            Err(error) => {
                log::warn!("accelerometer read failed: {:?}", error);
                return self.hold(EstimateStatus::SensorFault);
            }
        };

        let magnetic_field = if self.settings.coordinate_system.uses_magnetometer() {
            match self.sensor.read_magnetic_field() {
                Ok(field) => Some(field),
                Err(error) => {
                    log::warn!("magnetometer read failed: {:?}", error);
                    return self.hold(EstimateStatus::SensorFault);
                }
            }
        } else {
            None
        };

        self.update(acceleration, magnetic_field)
    }

    /// Refresh the orientation from samples the caller already has
    ///
    /// `magnetic_field` is smoothed whenever given, so its history is warm
    /// when switching to TILT. In TILT a missing field resolves tilt only
    /// and holds yaw.
    ///
    /// Samples with a zero, non-finite or overflowing norm never enter the
    /// filters. An unusable acceleration holds the whole tick with both
    /// filters untouched; an unusable field counts as missing.
    pub fn update(
        &mut self,
        acceleration: Vector3<f32>,
        magnetic_field: Option<Vector3<f32>>,
    ) -> Estimate {
        if normalize(acceleration).is_none() {
            return self.hold(EstimateStatus::Degenerate(Degeneracy::Acceleration));
        }

        let magnetic_field = magnetic_field
            .filter(|field| normalize(*field).is_some())
            .map(|field| self.magnetometer_filter.update(field));
        let acceleration = self.accelerometer_filter.update(acceleration);

        let system = self.settings.coordinate_system;
        let up = system.remap(acceleration);
        let result = if system.uses_magnetometer() {
            let field = system.remap(magnetic_field.unwrap_or_else(Vector3::zeros));
            self.estimator
                .update_with_field(up, field, self.settings.tilt_method)
        } else {
            self.estimator.update(up)
        };

        match result {
            Ok(()) => {
                self.status = EstimateStatus::Fresh;
                log::trace!("orientation {:?}", self.estimator.quaternion());
                self.current()
            }
            Err(degeneracy) => self.hold(EstimateStatus::Degenerate(degeneracy)),
        }
    }

    /// Select the coordinate convention for the following ticks
    ///
    /// Filter history and orientation are kept.
    pub fn set_coordinate_system(&mut self, system: CoordinateSystem) {
        if self.settings.coordinate_system != system {
            log::debug!(
                "coordinate system {:?} -> {:?}",
                self.settings.coordinate_system,
                system
            );
        }
        self.settings.coordinate_system = system;
    }

    /// Select the coordinate convention by front-end id (0 RAW, 1 BASIC,
    /// 2 TILT). Unknown ids leave the active convention in place.
    pub fn set_coordinate_system_id(&mut self, id: u8) -> Result<(), ConfigError> {
        let system = CoordinateSystem::try_from(id).inspect_err(|error| {
            log::warn!(
                "{}; keeping {:?}",
                error,
                self.settings.coordinate_system
            );
        })?;
        self.set_coordinate_system(system);
        Ok(())
    }

    /// Set the low-pass filter coefficient for both sensors
    ///
    /// Values outside `[0, 1]` are clamped and the applied value is
    /// returned. NaN is rejected and the previous alpha stays active.
    /// Accumulated smoothing is kept.
    pub fn set_low_pass_filter_alpha(&mut self, alpha: f32) -> Result<f32, ConfigError> {
        let alpha = validate_alpha(alpha)?;
        self.settings.alpha = alpha;
        self.accelerometer_filter.set_alpha(alpha);
        self.magnetometer_filter.set_alpha(alpha);
        Ok(alpha)
    }

    /// Select the TILT heading solver
    pub fn set_tilt_method(&mut self, method: TiltMethod) {
        self.settings.tilt_method = method;
    }

    /// Replace all settings at once
    ///
    /// Validated like the individual setters; on error nothing changes.
    pub fn set_settings(&mut self, settings: FusionSettings) -> Result<(), ConfigError> {
        self.set_low_pass_filter_alpha(settings.alpha)?;
        self.set_coordinate_system(settings.coordinate_system);
        self.set_tilt_method(settings.tilt_method);
        Ok(())
    }

    /// Current settings
    pub fn settings(&self) -> FusionSettings {
        self.settings
    }

    /// Active coordinate convention
    pub fn coordinate_system(&self) -> CoordinateSystem {
        self.settings.coordinate_system
    }

    /// Active low-pass filter coefficient
    pub fn alpha(&self) -> f32 {
        self.settings.alpha
    }

    /// Published orientation, body to North-West-Up world
    pub fn quaternion(&self) -> UnitQuaternion<f32> {
        self.estimator.quaternion()
    }

    /// Published orientation as `[w, x, y, z]`
    pub fn components(&self) -> [f32; 4] {
        self.current().components()
    }

    /// Status of the most recent tick
    pub fn status(&self) -> EstimateStatus {
        self.status
    }

    /// Published orientation as (roll, pitch, yaw) in radians
    pub fn euler_angles(&self) -> Vector3<f32> {
        self.estimator.quaternion().to_euler()
    }

    /// Published orientation as (roll, pitch, yaw) in degrees
    pub fn euler_angles_degrees(&self) -> Vector3<f32> {
        self.estimator.quaternion().to_euler_degrees()
    }

    /// Tilt-compensated compass heading in degrees from the smoothed
    /// samples, in the active convention
    ///
    /// `None` until both sensors have been sampled or while the horizontal
    /// field is degenerate.
    pub fn compass_heading(&self) -> Option<f32> {
        let system = self.settings.coordinate_system;
        let up = system.remap(self.accelerometer_filter.value()?);
        let field = system.remap(self.magnetometer_filter.value()?);
        calculate_heading(up, field)
    }

    /// Smoothed accelerometer sample in the sensor frame
    pub fn filtered_acceleration(&self) -> Option<Vector3<f32>> {
        self.accelerometer_filter.value()
    }

    /// Smoothed magnetometer sample in the sensor frame
    pub fn filtered_magnetic_field(&self) -> Option<Vector3<f32>> {
        self.magnetometer_filter.value()
    }

    /// Back to identity with unseeded filters; settings are kept
    pub fn reset(&mut self) {
        self.accelerometer_filter.reset();
        self.magnetometer_filter.reset();
        self.estimator.reset();
        self.status = EstimateStatus::Fresh;
    }

    /// Shared access to the sensor
    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    /// Exclusive access to the sensor, e.g. to run a driver calibration
    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    /// Consume the service and hand back the sensor
    pub fn release(self) -> S {
        self.sensor
    }

    // Private helper methods

    fn current(&self) -> Estimate {
        Estimate {
            quaternion: self.estimator.quaternion(),
            status: self.status,
        }
    }

    fn hold(&mut self, status: EstimateStatus) -> Estimate {
        log::debug!("orientation held: {:?}", status);
        self.status = status;
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sensor double returning whatever was last stored
    struct Scripted {
        acceleration: Result<Vector3<f32>, &'static str>,
        field: Result<Vector3<f32>, &'static str>,
        field_reads: usize,
    }

    impl Scripted {
        fn level() -> Self {
            // Face up: package -Z is down
            Self {
                acceleration: Ok(Vector3::new(0.0, 0.0, -1.0)),
                field: Ok(Vector3::new(0.3, 0.0, 0.0)),
                field_reads: 0,
            }
        }
    }

    impl MotionSensor for Scripted {
        type Error = &'static str;

        fn read_acceleration(&mut self) -> Result<Vector3<f32>, Self::Error> {
            self.acceleration
        }

        fn read_magnetic_field(&mut self) -> Result<Vector3<f32>, Self::Error> {
            self.field_reads += 1;
            self.field
        }
    }

    #[test]
    fn test_new_service() {
        let fusion = FusionService::new(Scripted::level());
        assert_eq!(fusion.quaternion(), UnitQuaternion::identity());
        assert_eq!(fusion.status(), EstimateStatus::Fresh);
        assert_eq!(fusion.settings(), FusionSettings::default());
        assert_eq!(fusion.filtered_acceleration(), None);
    }

    #[test]
    fn test_basic_level_is_identity() {
        let mut fusion = FusionService::new(Scripted::level());
        let estimate = fusion.estimate();
        assert_eq!(estimate.status, EstimateStatus::Fresh);
        assert_eq!(estimate.components(), [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_raw_level_is_inverted() {
        let settings = FusionSettings {
            coordinate_system: CoordinateSystem::Raw,
            ..Default::default()
        };
        let mut fusion = FusionService::with_settings(Scripted::level(), settings);

        let estimate = fusion.estimate();
        assert_eq!(estimate.status, EstimateStatus::Degenerate(Degeneracy::Inverted));
        assert_eq!(estimate.quaternion, UnitQuaternion::identity());
    }

    #[test]
    fn test_magnetometer_only_read_in_tilt() {
        let mut fusion = FusionService::new(Scripted::level());
        fusion.estimate();
        assert_eq!(fusion.sensor().field_reads, 0);

        fusion.set_coordinate_system(CoordinateSystem::Tilt);
        fusion.estimate();
        assert_eq!(fusion.sensor().field_reads, 1);
    }

    #[test]
    fn test_sensor_fault_holds() {
        let mut fusion = FusionService::new(Scripted::level());
        fusion.sensor_mut().acceleration = Ok(Vector3::new(0.0, 0.4, -0.9));
        let previous = fusion.estimate();

        fusion.sensor_mut().acceleration = Err("i2c nack");
        let estimate = fusion.estimate();
        assert_eq!(estimate.status, EstimateStatus::SensorFault);
        assert_eq!(estimate.quaternion, previous.quaternion);

        fusion.set_coordinate_system(CoordinateSystem::Tilt);
        fusion.sensor_mut().acceleration = Ok(Vector3::new(0.0, 1.0, 0.0));
        fusion.sensor_mut().field = Err("mag not ready");
        let estimate = fusion.estimate();
        assert_eq!(estimate.status, EstimateStatus::SensorFault);
        assert_eq!(estimate.quaternion, previous.quaternion);
    }

    #[test]
    fn test_non_finite_sample_does_not_poison_filter() {
        let mut fusion = FusionService::new(Scripted::level());
        fusion.estimate();
        let seeded = fusion.filtered_acceleration();

        let estimate = fusion.update(Vector3::new(f32::NAN, 0.0, -1.0), None);
        assert_eq!(estimate.status, EstimateStatus::Degenerate(Degeneracy::Acceleration));
        assert_eq!(fusion.filtered_acceleration(), seeded);

        assert_eq!(fusion.estimate().status, EstimateStatus::Fresh);
    }

    #[test]
    fn test_free_fall_holds_at_default_alpha() {
        let mut fusion = FusionService::new(Scripted::level());
        let previous = fusion.update(Vector3::new(0.31, -0.2, -0.93), None);
        let seeded = fusion.filtered_acceleration();

        let estimate = fusion.update(Vector3::zeros(), None);
        assert_eq!(estimate.status, EstimateStatus::Degenerate(Degeneracy::Acceleration));
        assert_eq!(estimate.quaternion, previous.quaternion);
        assert_eq!(fusion.filtered_acceleration(), seeded);
    }

    #[test]
    fn test_held_tick_leaves_both_filters() {
        let settings = FusionSettings {
            coordinate_system: CoordinateSystem::Tilt,
            alpha: 0.5,
            ..Default::default()
        };
        let mut fusion = FusionService::with_settings(Scripted::level(), settings);
        fusion.update(Vector3::new(0.0, 1.0, 0.0), Some(Vector3::new(10.0, 0.0, 0.0)));
        let acceleration = fusion.filtered_acceleration();
        let field = fusion.filtered_magnetic_field();

        for bad in [Vector3::new(f32::NAN, 0.0, 0.0), Vector3::zeros()] {
            let estimate = fusion.update(bad, Some(Vector3::new(-10.0, 0.0, 0.0)));
            assert_eq!(estimate.status, EstimateStatus::Degenerate(Degeneracy::Acceleration));
            assert_eq!(fusion.filtered_acceleration(), acceleration);
            assert_eq!(fusion.filtered_magnetic_field(), field);
        }
    }

    #[test]
    fn test_overflowing_sample_is_rejected() {
        let mut fusion = FusionService::new(Scripted::level());
        fusion.update(Vector3::new(0.0, 0.0, -1.0), Some(Vector3::new(0.0, 0.3, 0.0)));
        let acceleration = fusion.filtered_acceleration();
        let field = fusion.filtered_magnetic_field();

        let glitch = Vector3::repeat(f32::MAX);
        let estimate = fusion.update(glitch, Some(glitch));
        assert_eq!(estimate.status, EstimateStatus::Degenerate(Degeneracy::Acceleration));
        assert_eq!(fusion.filtered_acceleration(), acceleration);

        // A glitching field alone is dropped and the tick goes ahead
        let estimate = fusion.update(Vector3::new(0.0, 0.0, -1.0), Some(glitch));
        assert_eq!(estimate.status, EstimateStatus::Fresh);
        assert_eq!(fusion.filtered_magnetic_field(), field);
    }

    #[test]
    fn test_alpha_validation() {
        let mut fusion = FusionService::new(Scripted::level());

        assert_eq!(fusion.set_low_pass_filter_alpha(0.5), Ok(0.5));
        assert_eq!(fusion.set_low_pass_filter_alpha(1.2), Ok(1.0));
        assert_eq!(fusion.set_low_pass_filter_alpha(-0.1), Ok(0.0));
        assert_eq!(fusion.alpha(), 0.0);

        assert_eq!(
            fusion.set_low_pass_filter_alpha(f32::NAN),
            Err(ConfigError::NonFiniteAlpha)
        );
        assert_eq!(fusion.alpha(), 0.0);

        let fusion = FusionService::with_settings(
            Scripted::level(),
            FusionSettings {
                alpha: f32::NAN,
                ..Default::default()
            },
        );
        assert_eq!(fusion.alpha(), FusionSettings::default().alpha);
    }

    #[test]
    fn test_coordinate_system_id_validation() {
        let mut fusion = FusionService::new(Scripted::level());
        assert_eq!(fusion.set_coordinate_system_id(2), Ok(()));
        assert_eq!(fusion.coordinate_system(), CoordinateSystem::Tilt);

        assert_eq!(
            fusion.set_coordinate_system_id(7),
            Err(ConfigError::UnknownCoordinateSystem(7))
        );
        assert_eq!(fusion.coordinate_system(), CoordinateSystem::Tilt);
    }

    #[test]
    fn test_set_settings_is_atomic_on_error() {
        let mut fusion = FusionService::new(Scripted::level());
        let rejected = FusionSettings {
            coordinate_system: CoordinateSystem::Raw,
            alpha: f32::NAN,
            tilt_method: TiltMethod::Famc,
        };
        assert!(fusion.set_settings(rejected).is_err());
        assert_eq!(fusion.settings(), FusionSettings::default());

        let accepted = FusionSettings {
            alpha: 0.8,
            ..rejected
        };
        fusion.set_settings(accepted).unwrap();
        assert_eq!(fusion.settings(), accepted);
    }

    #[test]
    fn test_tilt_without_field_holds_yaw() {
        let settings = FusionSettings {
            coordinate_system: CoordinateSystem::Tilt,
            alpha: 1.0,
            ..Default::default()
        };
        let mut fusion = FusionService::with_settings(Scripted::level(), settings);

        // Standing on edge, package +Y up
        let estimate = fusion.update(Vector3::new(0.0, 1.0, 0.0), None);
        assert_eq!(
            estimate.status,
            EstimateStatus::Degenerate(Degeneracy::MagneticField)
        );
        assert_eq!(estimate.quaternion, UnitQuaternion::identity());
    }

    #[test]
    fn test_compass_heading() {
        let mut fusion = FusionService::new(Scripted::level());
        assert_eq!(fusion.compass_heading(), None);

        // BASIC canonical X is package Y; field along package Y is north
        fusion.update(Vector3::new(0.0, 0.0, -1.0), Some(Vector3::new(0.0, 0.3, 0.0)));
        let heading = fusion.compass_heading().unwrap();
        assert!(heading.abs() < 1e-3, "got {}", heading);
    }

    #[test]
    fn test_reset_keeps_settings() {
        let mut fusion = FusionService::new(Scripted::level());
        fusion.set_low_pass_filter_alpha(0.9).unwrap();
        fusion.sensor_mut().acceleration = Ok(Vector3::new(0.3, 0.0, -0.9));
        fusion.estimate();

        fusion.reset();
        assert_eq!(fusion.quaternion(), UnitQuaternion::identity());
        assert_eq!(fusion.filtered_acceleration(), None);
        assert_eq!(fusion.alpha(), 0.9);
    }

    #[test]
    fn test_release_returns_sensor() {
        let mut fusion = FusionService::new(Scripted::level());
        fusion.set_coordinate_system(CoordinateSystem::Tilt);
        fusion.estimate();
        let sensor = fusion.release();
        assert_eq!(sensor.field_reads, 1);
    }
}
