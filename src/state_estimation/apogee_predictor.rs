#[allow(unused_imports)]
use micromath::F32Ext;

use crate::state_estimation::vertical_velocity::VerticalKinematics;
use crate::utils::GRAVITY_MPS2;

pub const DEFAULT_ALPHA: f32 = 0.2;
pub const DEFAULT_MIN_CLIMB_VELOCITY_MPS: f32 = 1.0;

/// Lumped drag coefficient bounds, 1/m. The lower bound keeps the drag
/// model strictly dissipative; the upper bound rejects estimates no
/// subsonic airframe can produce.
const DRAG_K_MIN: f32 = 1e-6;
const DRAG_K_MAX: f32 = 1e-2;

/// Guard against division by a vanishing deceleration.
const MIN_DECELERATION_MPS2: f32 = 1e-3;

/// Projects the remaining coast to the altitude where vertical velocity
/// reaches zero.
///
/// The observed inertial deceleration is smoothed through a single-pole
/// IIR before projecting, so one noisy accelerometer sample cannot swing
/// the commanded drag surface. Two projection kernels are available:
///
/// - [`update`](Self::update): constant-deceleration kinematics,
///   `t = v/D`, `Δh = v·t − ½·D·t²`. D already contains the current drag
///   deceleration, which only shrinks toward apogee, so the prediction is
///   a tight upper bound that converges from above.
/// - [`analytic_update`](Self::analytic_update): closed form of
///   `dv/dt = −g − k·v·|v|` with `k` recovered from the smoothed
///   deceleration, `t = atan(v·√(k/g))/√(g·k)`,
///   `Δh = ln(1 + (k/g)·v²)/(2k)`.
///
/// Predictions are only recomputed while the vehicle is climbing faster
/// than the configured minimum; leaving validity keeps the last snapshot.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone)]
pub struct ApogeePredictor {
    alpha: f32,
    min_climb_velocity_mps: f32,
    filtered_deceleration: f32,
    seeded: bool,
    drag_coefficient: f32,
    valid: bool,
    predicted_altitude_m: f32,
    predicted_timestamp_ms: u32,
    time_to_apogee_s: f32,
}

impl Default for ApogeePredictor {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA, DEFAULT_MIN_CLIMB_VELOCITY_MPS)
    }
}

impl ApogeePredictor {
    pub fn new(alpha: f32, min_climb_velocity_mps: f32) -> Self {
        Self {
            alpha,
            min_climb_velocity_mps,
            filtered_deceleration: 0.0,
            seeded: false,
            drag_coefficient: DRAG_K_MIN,
            valid: false,
            predicted_altitude_m: 0.0,
            predicted_timestamp_ms: 0,
            time_to_apogee_s: 0.0,
        }
    }

    /// Constant-deceleration projection from the estimator's current state.
    pub fn update(&mut self, vve: &impl VerticalKinematics) {
        let velocity = self.observe(vve);
        if !self.valid {
            return;
        }

        let deceleration = self.filtered_deceleration.max(MIN_DECELERATION_MPS2);
        let time_to_apogee = velocity / deceleration;
        let gain = velocity * time_to_apogee - 0.5 * deceleration * time_to_apogee * time_to_apogee;
        self.cache_prediction(vve, time_to_apogee, gain);
    }

    /// Drag-aware projection: closed form of `dv/dt = -g - k·v·|v|`.
    pub fn analytic_update(&mut self, vve: &impl VerticalKinematics) {
        let velocity = self.observe(vve);
        if !self.valid {
            return;
        }

        let k = self.drag_coefficient;
        let sqrt_gk = (GRAVITY_MPS2 * k).sqrt();
        let time_to_apogee = (velocity * (k / GRAVITY_MPS2).sqrt()).atan() / sqrt_gk;
        let gain = (1.0 + (k / GRAVITY_MPS2) * velocity * velocity).ln() / (2.0 * k);
        self.cache_prediction(vve, time_to_apogee, gain);
    }

    /// Smooth the observed deceleration, refresh the drag estimate, and
    /// re-evaluate the validity gate. Returns the current velocity.
    fn observe(&mut self, vve: &impl VerticalKinematics) -> f32 {
        let velocity = vve.velocity();
        let deceleration = vve.inertial_vertical_acceleration().abs();

        if self.seeded {
            self.filtered_deceleration =
                self.alpha * deceleration + (1.0 - self.alpha) * self.filtered_deceleration;
        } else {
            self.filtered_deceleration = deceleration;
            self.seeded = true;
        }

        self.drag_coefficient =
            if velocity > self.min_climb_velocity_mps && self.filtered_deceleration > GRAVITY_MPS2 {
                ((self.filtered_deceleration - GRAVITY_MPS2) / (velocity * velocity))
                    .clamp(DRAG_K_MIN, DRAG_K_MAX)
            } else {
                DRAG_K_MIN
            };

        self.valid = velocity >= self.min_climb_velocity_mps;
        velocity
    }

    fn cache_prediction(&mut self, vve: &impl VerticalKinematics, time_to_apogee: f32, gain: f32) {
        self.time_to_apogee_s = time_to_apogee;
        self.predicted_altitude_m = vve.altitude() + gain;
        self.predicted_timestamp_ms = vve.timestamp() + (time_to_apogee * 1000.0 + 0.5) as u32;
    }

    /// False until the first observation, and whenever the vehicle is not
    /// climbing faster than the configured minimum.
    pub fn is_prediction_valid(&self) -> bool {
        self.valid
    }

    /// m ASL, from the most recent valid snapshot.
    pub fn predicted_apogee_altitude_m(&self) -> f32 {
        self.predicted_altitude_m
    }

    pub fn predicted_apogee_timestamp_ms(&self) -> u32 {
        self.predicted_timestamp_ms
    }

    pub fn time_to_apogee_s(&self) -> f32 {
        self.time_to_apogee_s
    }

    /// m/s², IIR-smoothed |inertial acceleration|.
    pub fn filtered_deceleration(&self) -> f32 {
        self.filtered_deceleration
    }

    /// 1/m, clamped lumped drag coefficient recovered from the smoothed
    /// deceleration.
    pub fn drag_coefficient(&self) -> f32 {
        self.drag_coefficient
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.alpha, self.min_climb_velocity_mps);
    }
}
