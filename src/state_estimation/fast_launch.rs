use crate::data_handling::AccelerationTriplet;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastLaunchStatus {
    NoLaunch,
    LaunchDetected,
    AlreadyLaunched,
}

/// Single-sample launch detector.
///
/// Latches on the first |a|² at or above the squared threshold so logging
/// can switch to full rate with one sample of latency. The state machine
/// treats the result as tentative: unless the windowed detector confirms
/// within the confirmation window, it calls [`reset`](Self::reset) and the
/// detection is dropped.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone)]
pub struct FastLaunchDetector {
    threshold_squared: f32,
    confirmation_window_ms: u32,
    launched: bool,
    launched_time_ms: u32,
}

impl FastLaunchDetector {
    pub fn new(threshold_mps2: f32, confirmation_window_ms: u32) -> Self {
        Self {
            threshold_squared: threshold_mps2 * threshold_mps2,
            confirmation_window_ms,
            launched: false,
            launched_time_ms: 0,
        }
    }

    pub fn update(&mut self, accel: &AccelerationTriplet) -> FastLaunchStatus {
        if self.launched {
            return FastLaunchStatus::AlreadyLaunched;
        }
        if accel.magnitude_squared() >= self.threshold_squared {
            self.launched = true;
            self.launched_time_ms = accel.timestamp_ms;
            log_info!("tentative launch at {} ms", self.launched_time_ms);
            return FastLaunchStatus::LaunchDetected;
        }
        FastLaunchStatus::NoLaunch
    }

    pub fn is_launched(&self) -> bool {
        self.launched
    }

    pub fn launched_time_ms(&self) -> u32 {
        self.launched_time_ms
    }

    pub fn confirmation_window_ms(&self) -> u32 {
        self.confirmation_window_ms
    }

    pub fn reset(&mut self) {
        self.launched = false;
        self.launched_time_ms = 0;
    }
}
