use serde::{Deserialize, Serialize};

pub mod apogee_detector;
pub mod apogee_predictor;
pub mod fast_launch;
pub mod ground_level;
pub mod launch_detector;
pub mod state_machine;
pub mod vertical_velocity;

pub use apogee_detector::ApogeeDetector;
pub use apogee_predictor::ApogeePredictor;
pub use fast_launch::{FastLaunchDetector, FastLaunchStatus};
pub use ground_level::GroundLevelEstimator;
pub use launch_detector::{LaunchDetector, LaunchUpdateStatus};
pub use state_machine::{FlightEvent, FlightState, FlightStateMachine};
pub use vertical_velocity::{NoiseVariances, VerticalKinematics, VerticalVelocityEstimator};

/// Every tuning parameter of the core, overridable at construction.
///
/// The defaults are the flight-proven values for a mid-power vehicle at a
/// 25 Hz sample rate; `landing_*` and `apogee_margin_m` in particular
/// should be recalibrated against flight data for anything unusual.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FlightProfile {
    /// m/s^2; sustained |a| above this over the window means launch
    pub launch_threshold_mps2: f32,
    /// ms of history the windowed launch detector keeps
    pub launch_window_ms: u32,
    /// ms between samples the window was tuned for
    pub launch_window_interval_ms: u32,
    /// m/s^2 single-sample threshold; `None` disables the fast detector
    /// (and with it the SoftAscent state)
    pub fast_launch_threshold_mps2: Option<f32>,
    /// ms the windowed detector gets to confirm a fast detection
    pub confirmation_window_ms: u32,
    pub noise: NoiseVariances,
    /// deceleration smoothing factor of the apogee predictor
    pub predictor_alpha: f32,
    /// m/s; below this the apogee prediction is not considered valid
    pub min_climb_velocity_mps: f32,
    /// m the estimated altitude must fall below its peak to latch apogee
    pub apogee_margin_m: f32,
    /// m/s; |velocity| bound for the landing check
    pub landing_velocity_mps: f32,
    /// consecutive samples the landing check must hold
    pub landing_sample_count: u32,
    /// m; |AGL| bound for the landing check
    pub landing_altitude_agl_m: f32,
}

impl Default for FlightProfile {
    fn default() -> Self {
        Self {
            launch_threshold_mps2: 30.0,
            launch_window_ms: 1000,
            launch_window_interval_ms: 40,
            fast_launch_threshold_mps2: None,
            confirmation_window_ms: 2000,
            noise: NoiseVariances::default(),
            predictor_alpha: apogee_predictor::DEFAULT_ALPHA,
            min_climb_velocity_mps: apogee_predictor::DEFAULT_MIN_CLIMB_VELOCITY_MPS,
            apogee_margin_m: apogee_detector::DEFAULT_MARGIN_M,
            landing_velocity_mps: 2.0,
            landing_sample_count: 50,
            landing_altitude_agl_m: 30.0,
        }
    }
}
