use heapless::Vec;
#[allow(unused_imports)]
use micromath::F32Ext;
use serde::{Deserialize, Serialize};

use crate::data_handling::sensor_channel::FLIGHT_STATE_CHANNEL;
use crate::data_handling::{AccelerationTriplet, DataSink, Sample};
use crate::state_estimation::{
    ApogeeDetector, ApogeePredictor, FastLaunchDetector, FastLaunchStatus, FlightProfile,
    GroundLevelEstimator, LaunchDetector, LaunchUpdateStatus, VerticalVelocityEstimator,
};

/// Flight phases in strictly increasing order.
///
/// `SoftAscent` is only reachable when the fast launch detector is
/// configured; it marks a tentative launch awaiting confirmation by the
/// windowed detector.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum FlightState {
    Armed = 0,
    SoftAscent = 1,
    Ascent = 2,
    Descent = 3,
    Landed = 4,
}

/// Events published to subscribers over one tick.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum FlightEvent {
    StateTransition {
        timestamp_ms: u32,
        state: FlightState,
    },
    /// `confirmed` is false for the fast detector's tentative call and
    /// true for the windowed detector's.
    LaunchDetected {
        timestamp_ms: u32,
        confirmed: bool,
    },
    ApogeeDetected {
        timestamp_ms: u32,
        altitude_m: f32,
    },
    /// Emitted at the tick rate while the apogee prediction is valid.
    PredictedApogee {
        timestamp_ms: u32,
        altitude_m: f32,
    },
}

pub const MAX_EVENTS_PER_TICK: usize = 4;

/// Sequences the flight from pad to landing.
///
/// Owns every estimator and detector; per tick it updates estimators
/// before the detectors that consult them, applies the detector decisions
/// to the state, and re-parameterizes downstream components on each
/// transition. `W` is the windowed launch detector's capacity,
/// `launch_window_ms / launch_window_interval_ms` of the profile.
pub struct FlightStateMachine<'a, S: DataSink, const W: usize> {
    state: FlightState,
    sink: &'a S,
    profile: FlightProfile,
    ground_level: GroundLevelEstimator,
    launch_detector: LaunchDetector<W>,
    fast_launch: Option<FastLaunchDetector>,
    vve: VerticalVelocityEstimator,
    apogee_detector: ApogeeDetector,
    apogee_predictor: ApogeePredictor,
    tentative_launch_ms: u32,
    landed_streak: u32,
}

impl<'a, S: DataSink, const W: usize> FlightStateMachine<'a, S, W> {
    pub fn new(sink: &'a S, profile: FlightProfile) -> Self {
        let launch_detector = LaunchDetector::new(
            profile.launch_threshold_mps2,
            profile.launch_window_ms,
            profile.launch_window_interval_ms,
        );
        let fast_launch = profile
            .fast_launch_threshold_mps2
            .map(|threshold| FastLaunchDetector::new(threshold, profile.confirmation_window_ms));
        Self {
            state: FlightState::Armed,
            sink,
            ground_level: GroundLevelEstimator::new(),
            launch_detector,
            fast_launch,
            vve: VerticalVelocityEstimator::new(profile.noise.clone()),
            apogee_detector: ApogeeDetector::new(profile.apogee_margin_m),
            apogee_predictor: ApogeePredictor::new(
                profile.predictor_alpha,
                profile.min_climb_velocity_mps,
            ),
            profile,
            tentative_launch_ms: 0,
            landed_streak: 0,
        }
    }

    /// Feed one tick of sensor data and collect the events it produced.
    pub fn update(
        &mut self,
        accel: &AccelerationTriplet,
        baro: Sample,
    ) -> Vec<FlightEvent, MAX_EVENTS_PER_TICK> {
        let mut events = Vec::new();

        // Ground level first: detectors and the landing check read AGL.
        let agl = self.ground_level.update(baro.value);

        match self.state {
            FlightState::Armed => {
                let windowed = self.launch_detector.update(accel);
                let mut fast_fired_at = None;
                if let Some(fast) = self.fast_launch.as_mut() {
                    if fast.update(accel) == FastLaunchStatus::LaunchDetected {
                        fast_fired_at = Some(fast.launched_time_ms());
                    }
                }

                if let Some(tentative_ms) = fast_fired_at {
                    self.tentative_launch_ms = tentative_ms;
                    self.ground_level.launch_detected();
                    self.sink.set_post_launch_mode(true);
                    push_event(
                        &mut events,
                        FlightEvent::LaunchDetected {
                            timestamp_ms: self.tentative_launch_ms,
                            confirmed: false,
                        },
                    );
                    self.enter(FlightState::SoftAscent, accel.timestamp_ms, &mut events);
                } else if windowed == LaunchUpdateStatus::LaunchDetected {
                    self.ground_level.launch_detected();
                    self.sink.set_post_launch_mode(true);
                    push_event(
                        &mut events,
                        FlightEvent::LaunchDetected {
                            timestamp_ms: self.launch_detector.launched_time_ms(),
                            confirmed: true,
                        },
                    );
                    self.enter(FlightState::Ascent, accel.timestamp_ms, &mut events);
                }
            }
            FlightState::SoftAscent => {
                self.vve.update(accel, baro);
                let _ = self.launch_detector.update(accel);

                if self.launch_detector.is_launched() {
                    push_event(
                        &mut events,
                        FlightEvent::LaunchDetected {
                            timestamp_ms: self.launch_detector.launched_time_ms(),
                            confirmed: true,
                        },
                    );
                    self.enter(FlightState::Ascent, accel.timestamp_ms, &mut events);
                } else {
                    let window = self
                        .fast_launch
                        .as_ref()
                        .map(|fast| fast.confirmation_window_ms())
                        .unwrap_or(0);
                    let waited = accel.timestamp_ms.saturating_sub(self.tentative_launch_ms);
                    if waited > window {
                        log_warn!("tentative launch not confirmed after {} ms, reverting", waited);
                        if let Some(fast) = self.fast_launch.as_mut() {
                            fast.reset();
                        }
                        self.ground_level.launch_aborted();
                        self.sink.clear_post_launch_mode();
                        self.tentative_launch_ms = 0;
                        self.enter(FlightState::Armed, accel.timestamp_ms, &mut events);
                    }
                }
            }
            FlightState::Ascent => {
                self.vve.update(accel, baro);
                self.apogee_detector.update(&self.vve);
                self.apogee_predictor.update(&self.vve);

                if self.apogee_predictor.is_prediction_valid() {
                    push_event(
                        &mut events,
                        FlightEvent::PredictedApogee {
                            timestamp_ms: accel.timestamp_ms,
                            altitude_m: self.apogee_predictor.predicted_apogee_altitude_m(),
                        },
                    );
                }

                if self.apogee_detector.is_apogee_detected() {
                    let apogee = self.apogee_detector.get_apogee();
                    push_event(
                        &mut events,
                        FlightEvent::ApogeeDetected {
                            timestamp_ms: apogee.timestamp_ms,
                            altitude_m: apogee.value,
                        },
                    );
                    self.enter(FlightState::Descent, accel.timestamp_ms, &mut events);
                }
            }
            FlightState::Descent => {
                self.vve.update(accel, baro);

                let slow = self.vve.estimated_velocity().abs() < self.profile.landing_velocity_mps;
                let near_ground = agl.abs() < self.profile.landing_altitude_agl_m;
                if slow && near_ground {
                    self.landed_streak += 1;
                    if self.landed_streak >= self.profile.landing_sample_count {
                        self.enter(FlightState::Landed, accel.timestamp_ms, &mut events);
                        self.sink.clear_post_launch_mode();
                    }
                } else {
                    self.landed_streak = 0;
                }
            }
            FlightState::Landed => {}
        }

        events
    }

    fn enter(
        &mut self,
        state: FlightState,
        timestamp_ms: u32,
        events: &mut Vec<FlightEvent, MAX_EVENTS_PER_TICK>,
    ) {
        self.state = state;
        log_info!("flight state -> {} at {} ms", state as u8, timestamp_ms);
        // Telemetry readers downstream key on this channel to interpret
        // the rest of the stream.
        let _ = self
            .sink
            .save(Sample::new(timestamp_ms, state as u8 as f32), FLIGHT_STATE_CHANNEL);
        push_event(
            events,
            FlightEvent::StateTransition {
                timestamp_ms,
                state,
            },
        );
    }

    pub fn state(&self) -> FlightState {
        self.state
    }

    pub fn vertical_velocity_estimator(&self) -> &VerticalVelocityEstimator {
        &self.vve
    }

    pub fn launch_detector(&self) -> &LaunchDetector<W> {
        &self.launch_detector
    }

    pub fn fast_launch_detector(&self) -> Option<&FastLaunchDetector> {
        self.fast_launch.as_ref()
    }

    pub fn apogee_detector(&self) -> &ApogeeDetector {
        &self.apogee_detector
    }

    pub fn apogee_predictor(&self) -> &ApogeePredictor {
        &self.apogee_predictor
    }

    pub fn ground_level_estimator(&self) -> &GroundLevelEstimator {
        &self.ground_level
    }

    /// Back to `Armed` with every owned component reinitialized.
    pub fn reset(&mut self) {
        self.state = FlightState::Armed;
        self.ground_level.reset();
        self.launch_detector.reset();
        if let Some(fast) = self.fast_launch.as_mut() {
            fast.reset();
        }
        self.vve.reset();
        self.apogee_detector.reset();
        self.apogee_predictor.reset();
        self.tentative_launch_ms = 0;
        self.landed_streak = 0;
        self.sink.clear_post_launch_mode();
    }
}

fn push_event(events: &mut Vec<FlightEvent, MAX_EVENTS_PER_TICK>, event: FlightEvent) {
    if events.push(event).is_err() {
        log_error!("event list overflow");
    }
}
