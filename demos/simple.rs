use accelmagiq::{CoordinateSystem, FusionService, MotionSensor};
use nalgebra::Vector3;

const SAMPLE_PERIOD: f32 = 0.02; // 20 ms sample period

/// Board standing on its edge, rocking slowly while facing north-east
struct SimulatedBoard {
    time: f32,
}

impl MotionSensor for SimulatedBoard {
    type Error = core::convert::Infallible;

    fn read_acceleration(&mut self) -> Result<Vector3<f32>, Self::Error> {
        // replace this with actual accelerometer data in g
        self.time += SAMPLE_PERIOD;
        let rock = 0.3 * (self.time * 2.0).sin();
        Ok(Vector3::new(0.0, rock.cos(), rock.sin()))
    }

    fn read_magnetic_field(&mut self) -> Result<Vector3<f32>, Self::Error> {
        // replace this with actual magnetometer data
        Ok(Vector3::new(-14.0, -35.0, 14.0))
    }
}

fn main() {
    env_logger::init();

    let mut fusion = FusionService::new(SimulatedBoard { time: 0.0 });
    fusion.set_coordinate_system(CoordinateSystem::Tilt);
    if let Err(error) = fusion.set_low_pass_filter_alpha(0.3) {
        eprintln!("{}", error);
        return;
    }

    for _ in 0..10 {
        // this loop should repeat each time new sensor data is available
        let estimate = fusion.estimate();
        let [w, x, y, z] = estimate.components();
        let euler = fusion.euler_angles_degrees();

        println!(
            "q = ({:.3}, {:.3}, {:.3}, {:.3})  Roll: {:.2}, Pitch: {:.2}, Yaw: {:.2}{}",
            w,
            x,
            y,
            z,
            euler.x,
            euler.y,
            euler.z,
            if estimate.is_stale() { "  (held)" } else { "" }
        );
    }
}
