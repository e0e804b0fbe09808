use crate::data_handling::Sample;
use crate::state_estimation::vertical_velocity::VerticalKinematics;

pub const DEFAULT_MARGIN_M: f32 = 2.0;

/// Latches the trajectory peak once the estimated altitude has fallen a
/// sustained margin below it while the estimated velocity is negative.
///
/// The margin and the velocity-sign gate together keep a single-sample
/// altitude dip from latching early. Once latched, the record is immutable
/// until `reset()`.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone)]
pub struct ApogeeDetector {
    margin_m: f32,
    peak: Option<Sample>,
    apogee: Option<Sample>,
}

impl Default for ApogeeDetector {
    fn default() -> Self {
        Self::new(DEFAULT_MARGIN_M)
    }
}

impl ApogeeDetector {
    pub fn new(margin_m: f32) -> Self {
        Self {
            margin_m,
            peak: None,
            apogee: None,
        }
    }

    /// Consume the estimator's current altitude and velocity. The caller
    /// updates the estimator first.
    pub fn update(&mut self, vve: &impl VerticalKinematics) {
        if self.apogee.is_some() {
            return;
        }

        let altitude = vve.altitude();
        let timestamp_ms = vve.timestamp();

        let peak = match self.peak {
            Some(peak) if peak.value >= altitude => peak,
            _ => {
                let peak = Sample::new(timestamp_ms, altitude);
                self.peak = Some(peak);
                peak
            }
        };

        if peak.value - altitude > self.margin_m && vve.velocity() < 0.0 {
            log_info!("apogee {} m at {} ms", peak.value, peak.timestamp_ms);
            self.apogee = Some(peak);
        }
    }

    pub fn is_apogee_detected(&self) -> bool {
        self.apogee.is_some()
    }

    /// The latched apogee, or a zeroed sample while none is latched.
    pub fn get_apogee(&self) -> Sample {
        self.apogee.unwrap_or_default()
    }

    pub fn reset(&mut self) {
        self.peak = None;
        self.apogee = None;
    }
}
