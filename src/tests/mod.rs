#[cfg(feature = "log")]
use log::LevelFilter;

use core::cell::{Cell, RefCell};

use crate::data_handling::{Axis, DataSink, Sample};
use crate::state_estimation::VerticalKinematics;


pub fn init_logger() {
    #[cfg(feature = "log")]
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Warn)
        .filter(Some("flight_events_core"), LevelFilter::Trace)
        .is_test(true)
        .try_init();
}

/// In-memory sink used by channel and state-machine tests.
#[derive(Default)]
pub struct RecordingSink {
    pub records: RefCell<Vec<(Sample, u8)>>,
    pub post_launch: Cell<bool>,
    /// When set, `save` reports this code instead of success.
    pub fail_with: Cell<Option<i32>>,
}

impl RecordingSink {
    /// Samples recorded on one channel id, in arrival order.
    pub fn channel(&self, sensor_id: u8) -> Vec<Sample> {
        self.records
            .borrow()
            .iter()
            .filter(|(_, id)| *id == sensor_id)
            .map(|(sample, _)| *sample)
            .collect()
    }
}

/// Fixed-value stand-in for the vertical velocity estimator.
#[derive(Default)]
pub struct StubKinematics {
    pub altitude: f32,
    pub velocity: f32,
    pub acceleration: f32,
    pub timestamp_ms: u32,
}

impl StubKinematics {
    pub fn set(&mut self, velocity: f32, acceleration: f32, altitude: f32, timestamp_ms: u32) {
        self.velocity = velocity;
        self.acceleration = acceleration;
        self.altitude = altitude;
        self.timestamp_ms = timestamp_ms;
    }
}

impl VerticalKinematics for StubKinematics {
    fn altitude(&self) -> f32 {
        self.altitude
    }

    fn velocity(&self) -> f32 {
        self.velocity
    }

    fn inertial_vertical_acceleration(&self) -> f32 {
        self.acceleration
    }

    fn timestamp(&self) -> u32 {
        self.timestamp_ms
    }

    fn vertical_axis(&self) -> Option<Axis> {
        Some(Axis::Z)
    }

    fn vertical_direction(&self) -> i8 {
        1
    }
}

impl DataSink for RecordingSink {
    fn save(&self, sample: Sample, sensor_id: u8) -> i32 {
        self.records.borrow_mut().push((sample, sensor_id));
        self.fail_with.get().unwrap_or(0)
    }

    fn set_post_launch_mode(&self, enabled: bool) {
        self.post_launch.set(enabled);
    }

    fn clear_post_launch_mode(&self) {
        self.post_launch.set(false);
    }
}
