#![no_std]

//! AccelMagiQ - attitude estimation from an accelerometer and a magnetometer
//!
//! Turns low-rate, noisy accelerometer and magnetometer samples into a unit
//! quaternion, in closed form and without heap allocation, for small
//! microcontroller boards. There is no gyroscope and no integration: every
//! tick is solved from the current (smoothed) samples alone.
//!
//! # Features
//!
//! - Exponential low-pass smoothing seeded from the first sample
//! - Half-angle tilt quaternion from gravity (roll and pitch)
//! - Tilt-compensated heading from the magnetometer, composed as
//!   `q_yaw ⊗ q_tilt`, or the FAMC closed-form solver
//! - Three board conventions: RAW, BASIC and TILT
//! - Last-known-good output: zero, NaN or singular inputs never produce a
//!   non-unit quaternion
//! - `#![no_std]` compatible for embedded systems
//!
//! # Quick Start
//!
//! ```rust
//! use nalgebra::Vector3;
//! use accelmagiq::{CoordinateSystem, FusionService, MotionSensor};
//!
//! struct Board;
//!
//! impl MotionSensor for Board {
//!     type Error = ();
//!
//!     fn read_acceleration(&mut self) -> Result<Vector3<f32>, ()> {
//!         Ok(Vector3::new(0.0, 1.0, 0.0))     // g, from the driver
//!     }
//!
//!     fn read_magnetic_field(&mut self) -> Result<Vector3<f32>, ()> {
//!         Ok(Vector3::new(-20.0, 5.0, 30.0))  // raw compass units
//!     }
//! }
//!
//! let mut fusion = FusionService::new(Board);
//! fusion.set_coordinate_system(CoordinateSystem::Tilt);
//! fusion.set_low_pass_filter_alpha(0.3).unwrap();
//!
//! // Call at the sensor rate
//! let estimate = fusion.estimate();
//! let [w, x, y, z] = estimate.components();
//!
//! // Derived Euler angles (roll, pitch, yaw) in degrees
//! let euler = fusion.euler_angles_degrees();
//! ```

pub mod compass;
mod coordinates;
mod error;
mod estimator;
mod filter;
mod fusion;
mod math;
mod sensor;
mod types;

// Re-export all public types and functions
pub use error::ConfigError;
pub use estimator::{AttitudeEstimator, famc_quaternion, tilt_quaternion, yaw_quaternion};
pub use filter::LowPassFilter;
pub use fusion::FusionService;
pub use math::{
    DEG_TO_RAD, QuaternionExt, RAD_TO_DEG, Vector3Ext, normalize, normalize_quaternion,
};
pub use sensor::MotionSensor;
pub use types::*;
