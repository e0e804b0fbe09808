#[allow(unused_imports)]
use micromath::F32Ext;
use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

use crate::data_handling::{AccelerationTriplet, Axis, Sample};
use crate::utils::GRAVITY_MPS2;

/// Read-only view of the vertical kinematic state.
///
/// The apogee detector and predictor consume this instead of the concrete
/// estimator so tests can substitute a stub reporting fixed values.
pub trait VerticalKinematics {
    /// m ASL
    fn altitude(&self) -> f32;
    /// m/s, positive up
    fn velocity(&self) -> f32;
    /// m/s^2 along the vertical body axis with the 1 g bias removed
    fn inertial_vertical_acceleration(&self) -> f32;
    fn timestamp(&self) -> u32;
    /// `None` until the second update has chosen the axis
    fn vertical_axis(&self) -> Option<Axis>;
    /// +1, -1, or 0 while undetermined
    fn vertical_direction(&self) -> i8;
}

/// Process / measurement noise of the vertical-velocity filter.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NoiseVariances {
    /// (m/s^2)^2 accelerometer noise driving the process covariance
    pub accel: f32,
    /// m^2 barometric altitude noise
    pub baro: f32,
}

impl Default for NoiseVariances {
    fn default() -> Self {
        Self {
            accel: 1.05,
            baro: 10.0,
        }
    }
}

const MIN_DT_S: f32 = 0.001;
const MAX_DT_S: f32 = 1.0;

/// Two-state Kalman filter fusing inertial vertical acceleration with
/// barometric altitude.
///
/// State vector x = [ altitude, vertical_velocity ]ᵀ (m, m/s).
///
/// Transition over dt with acceleration input a:
///     altitude ← altitude + velocity·dt + ½·a·dt²
///     velocity ← velocity + a·dt
/// Measurement z = barometric altitude, H = [1 0].
///
/// The first update only seeds the state from the altimeter; the second
/// picks the vertical body axis as the component with the largest |a| and
/// fixes its sign. Both stay fixed until `reset()`.
#[derive(Debug, Clone)]
pub struct VerticalVelocityEstimator {
    x: Vector2<f32>,
    p: Matrix2<f32>,
    noise: NoiseVariances,
    timestamp_ms: u32,
    inertial_acceleration: f32,
    vertical_axis: Option<Axis>,
    vertical_direction: i8,
    seeded: bool,
}

impl Default for VerticalVelocityEstimator {
    fn default() -> Self {
        Self::new(NoiseVariances::default())
    }
}

impl VerticalVelocityEstimator {
    pub fn new(noise: NoiseVariances) -> Self {
        Self {
            x: Vector2::zeros(),
            p: Matrix2::identity() * 0.1,
            noise,
            timestamp_ms: 0,
            inertial_acceleration: 0.0,
            vertical_axis: None,
            vertical_direction: 0,
            seeded: false,
        }
    }

    /// Fuse one accelerometer triplet and one barometric altitude sample.
    ///
    /// A timestamp that is not strictly newer than the stored one runs the
    /// filter with the minimum dt instead of rejecting the sample.
    pub fn update(&mut self, accel: &AccelerationTriplet, baro: Sample) {
        if !self.seeded {
            self.x = Vector2::new(baro.value, 0.0);
            self.p = Matrix2::identity() * 0.1;
            self.timestamp_ms = accel.timestamp_ms;
            self.seeded = true;
            return;
        }

        if self.vertical_axis.is_none() {
            self.select_vertical_axis(accel);
        }

        let dt = if accel.timestamp_ms > self.timestamp_ms {
            (((accel.timestamp_ms - self.timestamp_ms) as f32) / 1000.0).clamp(MIN_DT_S, MAX_DT_S)
        } else {
            MIN_DT_S
        };

        let a = self.inertial_acceleration_of(accel);

        // Predict: x̂₋ = F x̂ + B a
        let f = Matrix2::new(1.0, dt, 0.0, 1.0);
        self.x = f * self.x + Vector2::new(0.5 * a * dt * dt, a * dt);

        // P₋ = F P Fᵀ + Q, Q = dt · diag(σ_acc², σ_acc²)
        let q = Matrix2::new(self.noise.accel, 0.0, 0.0, self.noise.accel) * dt;
        self.p = f * self.p * f.transpose() + q;
        self.p = 0.5 * (self.p + self.p.transpose());

        // Measurement update with the barometric altitude, H = [1 0].
        // Scalar innovation, so the inverse is a guarded division.
        let y = baro.value - self.x[0];
        let s = self.p[(0, 0)] + self.noise.baro;
        let s_inv = if s.abs() > 1e-9 {
            1.0 / s
        } else {
            1.0 / (s + 1e-6)
        };
        let k = Vector2::new(self.p[(0, 0)], self.p[(1, 0)]) * s_inv;

        self.x += k * y;

        let i = Matrix2::identity();
        let kh = Matrix2::new(k[0], 0.0, k[1], 0.0);
        self.p = (i - kh) * self.p;
        self.p = 0.5 * (self.p + self.p.transpose());

        self.inertial_acceleration = a;
        self.timestamp_ms = accel.timestamp_ms;
    }

    fn select_vertical_axis(&mut self, accel: &AccelerationTriplet) {
        let mut axis = Axis::X;
        let mut best = accel.x.abs();
        if accel.y.abs() > best {
            axis = Axis::Y;
            best = accel.y.abs();
        }
        if accel.z.abs() > best {
            axis = Axis::Z;
        }

        let component = accel.component(axis);
        self.vertical_axis = Some(axis);
        self.vertical_direction = if component > 0.0 {
            1
        } else if component < 0.0 {
            -1
        } else {
            0
        };
        log_debug!("vertical axis selected, direction {}", self.vertical_direction);
    }

    fn inertial_acceleration_of(&self, accel: &AccelerationTriplet) -> f32 {
        match self.vertical_axis {
            Some(axis) => {
                (self.vertical_direction as f32) * accel.component(axis) - GRAVITY_MPS2
            }
            None => 0.0,
        }
    }

    pub fn estimated_altitude(&self) -> f32 {
        self.x[0]
    }

    pub fn estimated_velocity(&self) -> f32 {
        self.x[1]
    }

    pub fn inertial_acceleration_estimate(&self) -> f32 {
        self.inertial_acceleration
    }

    pub fn last_timestamp(&self) -> u32 {
        self.timestamp_ms
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.noise.clone());
    }
}

impl VerticalKinematics for VerticalVelocityEstimator {
    fn altitude(&self) -> f32 {
        self.estimated_altitude()
    }

    fn velocity(&self) -> f32 {
        self.estimated_velocity()
    }

    fn inertial_vertical_acceleration(&self) -> f32 {
        self.inertial_acceleration_estimate()
    }

    fn timestamp(&self) -> u32 {
        self.last_timestamp()
    }

    fn vertical_axis(&self) -> Option<Axis> {
        self.vertical_axis
    }

    fn vertical_direction(&self) -> i8 {
        self.vertical_direction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn accel(ts: u32, x: f32, y: f32, z: f32) -> AccelerationTriplet {
        AccelerationTriplet::new(ts, x, y, z)
    }

    #[test]
    fn default_state_is_zeroed_and_undetermined() {
        let vve = VerticalVelocityEstimator::default();
        assert_eq!(vve.estimated_altitude(), 0.0);
        assert_eq!(vve.estimated_velocity(), 0.0);
        assert_eq!(vve.last_timestamp(), 0);
        assert_eq!(vve.vertical_axis(), None);
        assert_eq!(vve.vertical_direction(), 0);
    }

    #[test]
    fn second_update_selects_axis_and_direction() {
        let mut vve = VerticalVelocityEstimator::default();

        vve.update(&accel(1000, 0.0, 0.0, 9.81), Sample::new(1000, 0.0));
        assert_eq!(vve.last_timestamp(), 1000);
        assert_eq!(vve.vertical_axis(), None);

        vve.update(&accel(1010, 0.0, 0.0, 9.81), Sample::new(1010, 0.0));
        assert_eq!(vve.vertical_axis(), Some(Axis::Z));
        assert_eq!(vve.vertical_direction(), 1);
        assert_eq!(vve.last_timestamp(), 1010);
        assert_relative_eq!(vve.estimated_altitude(), 0.0, epsilon = 0.05);
        assert_relative_eq!(vve.estimated_velocity(), 0.0, epsilon = 0.05);
        assert_relative_eq!(
            vve.inertial_acceleration_estimate(),
            0.0,
            epsilon = 1e-4
        );
    }

    #[test]
    fn negative_direction_axis_selection() {
        let mut vve = VerticalVelocityEstimator::default();
        vve.update(&accel(2000, -9.81, 0.0, 0.0), Sample::new(2000, 0.0));
        vve.update(&accel(2010, -9.81, 0.0, 0.0), Sample::new(2010, 0.0));
        assert_eq!(vve.vertical_axis(), Some(Axis::X));
        assert_eq!(vve.vertical_direction(), -1);
        assert_relative_eq!(
            vve.inertial_acceleration_estimate(),
            0.0,
            epsilon = 1e-4
        );
    }

    #[test]
    fn hover_keeps_altitude_and_zero_velocity() {
        let mut vve = VerticalVelocityEstimator::default();
        let mut ts = 1000;
        vve.update(&accel(ts, 0.0, 0.0, 9.81), Sample::new(ts, 10.0));
        for _ in 0..1000 {
            ts += 10;
            vve.update(&accel(ts, 0.0, 0.0, 9.81), Sample::new(ts, 10.0));
        }
        assert_relative_eq!(vve.estimated_altitude(), 10.0, epsilon = 0.3);
        assert_relative_eq!(vve.estimated_velocity(), 0.0, epsilon = 0.15);
    }

    #[test]
    fn constant_acceleration_ascent_tracks_truth() {
        let mut vve = VerticalVelocityEstimator::default();
        let mut ts = 1000;
        let dt = 0.01;

        vve.update(&accel(ts, 0.0, 0.0, 9.81), Sample::new(ts, 0.0));

        let mut true_vel = 0.0f32;
        let mut true_alt = 0.0f32;
        for _ in 0..100 {
            ts += 10;
            // sensed +g + 10 → inertial +10 m/s^2
            vve.update(&accel(ts, 0.0, 0.0, 19.81), Sample::new(ts, true_alt));
            true_vel += 10.0 * dt;
            true_alt += true_vel * dt;
        }

        assert_relative_eq!(vve.estimated_altitude(), true_alt, epsilon = 1.0);
        assert_relative_eq!(vve.estimated_velocity(), true_vel, epsilon = 1.0);
    }

    #[test]
    fn old_timestamp_uses_minimum_dt() {
        let mut vve = VerticalVelocityEstimator::default();
        vve.update(&accel(3000, 0.0, 0.0, 9.81), Sample::new(3000, 5.0));
        vve.update(&accel(3010, 0.0, 0.0, 9.81), Sample::new(3010, 5.0));
        let alt_before = vve.estimated_altitude();

        vve.update(&accel(2900, 0.0, 0.0, 9.81), Sample::new(2900, 5.0));

        assert!(vve.estimated_altitude().is_finite());
        assert!(vve.estimated_velocity().is_finite());
        assert!(vve.estimated_altitude() >= alt_before - 0.5);
    }

    #[test]
    fn identical_input_twice_is_stable() {
        let mut vve = VerticalVelocityEstimator::default();
        vve.update(&accel(1000, 0.0, 0.0, 9.81), Sample::new(1000, 100.0));
        vve.update(&accel(1010, 0.0, 0.0, 9.81), Sample::new(1010, 100.0));

        vve.update(&accel(1020, 0.0, 0.0, 9.81), Sample::new(1020, 100.0));
        let alt_first = vve.estimated_altitude();
        let vel_first = vve.estimated_velocity();

        // repeated identical sample runs at MIN_DT and must stay put
        vve.update(&accel(1020, 0.0, 0.0, 9.81), Sample::new(1020, 100.0));
        assert_relative_eq!(vve.estimated_altitude(), alt_first, epsilon = 1e-3);
        assert_relative_eq!(vve.estimated_velocity(), vel_first, epsilon = 1e-3);
    }

    #[test]
    fn stationary_estimate_rejects_sensor_noise() {
        use crate::tests::sim::gaussian;
        use rand::{rngs::SmallRng, SeedableRng};

        let mut rng = SmallRng::seed_from_u64(4);
        let mut vve = VerticalVelocityEstimator::default();
        let mut ts = 4000;
        let true_alt = 20.0;

        vve.update(&accel(ts, 0.0, 0.0, 9.81), Sample::new(ts, true_alt));
        for _ in 0..500 {
            ts += 10;
            vve.update(
                &accel(ts, 0.0, 0.0, 9.81 + gaussian(&mut rng, 0.05)),
                Sample::new(ts, true_alt + gaussian(&mut rng, 0.5)),
            );
        }

        assert_relative_eq!(vve.estimated_altitude(), true_alt, epsilon = 1.0);
        assert_relative_eq!(vve.estimated_velocity(), 0.0, epsilon = 0.3);
    }

    #[test]
    fn outputs_stay_finite_under_extreme_input() {
        let mut vve = VerticalVelocityEstimator::default();
        vve.update(&accel(0, 0.0, 0.0, 9.81), Sample::new(0, 0.0));
        vve.update(&accel(10, 1e6, -1e6, 1e7), Sample::new(10, 1e7));
        // huge dt gap gets clamped to one second
        vve.update(&accel(3_600_000, 0.0, 0.0, -1e7), Sample::new(3_600_000, -1e7));
        assert!(vve.estimated_altitude().is_finite());
        assert!(vve.estimated_velocity().is_finite());
        assert!(vve.inertial_acceleration_estimate().is_finite());
    }

    #[test]
    fn reset_restores_construction_state() {
        let mut vve = VerticalVelocityEstimator::default();
        vve.update(&accel(1000, 0.0, 0.0, 9.81), Sample::new(1000, 50.0));
        vve.update(&accel(1010, 0.0, 0.0, 9.81), Sample::new(1010, 50.0));
        vve.reset();
        assert_eq!(vve.estimated_altitude(), 0.0);
        assert_eq!(vve.vertical_axis(), None);
        assert_eq!(vve.last_timestamp(), 0);
    }
}
