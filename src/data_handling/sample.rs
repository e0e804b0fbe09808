use serde::{Deserialize, Serialize};

/// One timestamped scalar from a sensor channel.
///
/// Timestamps are milliseconds since boot and are expected to be monotonic
/// non-decreasing per channel; out-of-order samples are reported by the
/// consuming component, not silently dropped here.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct Sample {
    pub timestamp_ms: u32,
    pub value: f32,
}

impl Sample {
    pub const fn new(timestamp_ms: u32, value: f32) -> Self {
        Sample {
            timestamp_ms,
            value,
        }
    }
}

/// Accelerometer body axis.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Three proper-acceleration components sharing one timestamp.
///
/// Units are m/s^2 of sensed acceleration: a vehicle at rest reads about
/// +1 g along the vertical body axis.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default)]
pub struct AccelerationTriplet {
    pub timestamp_ms: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl AccelerationTriplet {
    pub const fn new(timestamp_ms: u32, x: f32, y: f32, z: f32) -> Self {
        AccelerationTriplet {
            timestamp_ms,
            x,
            y,
            z,
        }
    }

    pub fn component(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// |a|^2, used by both launch detectors so no square root is needed.
    pub fn magnitude_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }
}
