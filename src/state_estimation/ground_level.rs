/// Exponential moving average of the pad's above-sea-level altitude.
///
/// Pre-launch the estimate tracks barometric drift; once
/// [`launch_detected`](Self::launch_detected) is called the estimate is
/// frozen and `update` starts returning altitude above ground level, which
/// may go negative when the vehicle lands below the pad.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Default)]
pub struct GroundLevelEstimator {
    egl: f32,
    seeded: bool,
    launched: bool,
}

const ALPHA: f32 = 0.1;

impl GroundLevelEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one above-sea-level altitude reading (m).
    ///
    /// Returns 0 until launch is signaled, then `asl - EGL`.
    pub fn update(&mut self, asl: f32) -> f32 {
        if self.launched {
            return asl - self.egl;
        }

        if self.seeded {
            self.egl = ALPHA * asl + (1.0 - ALPHA) * self.egl;
        } else {
            self.egl = asl;
            self.seeded = true;
        }
        0.0
    }

    /// Freeze the ground level estimate at its current value.
    pub fn launch_detected(&mut self) {
        self.launched = true;
        log_info!("ground level frozen at {} m ASL", self.egl);
    }

    /// Revert a tentative launch signal: resume pre-launch averaging from
    /// the frozen value without discarding it.
    pub fn launch_aborted(&mut self) {
        self.launched = false;
    }

    pub fn get_egl(&self) -> f32 {
        self.egl
    }

    pub fn is_launched(&self) -> bool {
        self.launched
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
