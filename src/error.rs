//! Configuration error types

use core::fmt;

/// Rejected configuration values.
///
/// Returned by the configuration mutators on
/// [`FusionService`](crate::FusionService). A rejected value never replaces
/// the active configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// Coordinate system id outside `0..=2`
    UnknownCoordinateSystem(u8),
    /// Low-pass filter alpha was NaN
    NonFiniteAlpha,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownCoordinateSystem(id) => {
                write!(f, "unknown coordinate system id {id}")
            }
            ConfigError::NonFiniteAlpha => write!(f, "low-pass filter alpha is not a number"),
        }
    }
}

impl core::error::Error for ConfigError {}
