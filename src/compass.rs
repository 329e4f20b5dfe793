//! Tilt-compensated magnetic north and heading

use nalgebra::Vector3;

use crate::math::{RAD_TO_DEG, normalize};

/// Smallest usable `sin` of the angle between gravity and the magnetic
/// field. Below this the field is effectively vertical and carries no
/// heading information.
pub const MIN_HORIZONTAL_FIELD: f32 = 1e-3;

/// Direction of magnetic north projected into the horizontal plane
///
/// Returns the unit component of `magnetometer` orthogonal to `up`, built
/// with the cross products `west = up × m` and `north = west × up`, all in
/// the canonical estimation frame (`up` is the measured gravity-up
/// direction). `None` when either vector cannot be normalized or the field
/// is within [`MIN_HORIZONTAL_FIELD`] of vertical.
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use accelmagiq::compass::horizontal_north;
///
/// let up = Vector3::new(0.0, 0.0, 1.0);
/// let field = Vector3::new(20.0, 0.0, -40.0); // dipping north
/// let north = horizontal_north(up, field).unwrap();
/// assert!((north - Vector3::new(1.0, 0.0, 0.0)).magnitude() < 1e-6);
/// ```
pub fn horizontal_north(up: Vector3<f32>, magnetometer: Vector3<f32>) -> Option<Vector3<f32>> {
    let up = normalize(up)?;
    let magnetometer = normalize(magnetometer)?;

    let west = up.cross(&magnetometer);
    if west.magnitude() < MIN_HORIZONTAL_FIELD {
        return None;
    }

    normalize(west.cross(&up))
}

/// Calculate tilt-compensated magnetic heading
///
/// Heading of the canonical X axis in degrees, counter-clockwise from
/// magnetic north (North-West-Up), range -180° to +180°. `None` when the
/// horizontal field is degenerate (see [`horizontal_north`]).
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use accelmagiq::compass::calculate_heading;
///
/// let up = Vector3::new(0.0, 0.0, 1.0);       // level
/// let field = Vector3::new(1.0, 0.0, 0.0);    // X points north
/// let heading = calculate_heading(up, field).unwrap();
/// assert!(heading.abs() < 1.0);
/// ```
pub fn calculate_heading(up: Vector3<f32>, magnetometer: Vector3<f32>) -> Option<f32> {
    let north = horizontal_north(up, magnetometer)?;
    let west = normalize(up)?.cross(&north);

    Some(west.x.atan2(north.x) * RAD_TO_DEG)
}
