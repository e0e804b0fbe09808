use crate::data_handling::{AccelerationTriplet, RingBuffer, Sample};

/// Outcome of feeding one acceleration triplet to [`LaunchDetector`].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchUpdateStatus {
    /// Window not yet full; sample stored, no decision possible
    InitialPopulation,
    /// Sample is older than the newest stored one; ignored
    YoungerTimestamp,
    /// Sample arrived faster than the tuned cadence allows; ignored
    DataTooFast,
    /// Sample arrived so late the window went stale; window restarted
    WindowDataStale,
    /// Stored span shorter than the tuned window; no decision possible
    WindowTimeRangeTooSmall,
    /// Median |a|² below threshold
    AclTooLow,
    /// Median |a|² at or above threshold; launch latched
    LaunchDetected,
    /// Already latched; input ignored
    AlreadyLaunched,
}

/// Windowed launch detector.
///
/// Keeps the last `W` values of |a|² and declares launch when their median
/// clears the squared threshold. The median makes a single-sample impulse
/// (ignition spike, a drop, a hand tap) invisible; only sustained thrust
/// across the whole window can move it. Cadence validation rejects samples
/// arriving off the interval the threshold was tuned for, so the median is
/// always built from the assumed timing.
///
/// `W` must equal `window_size_ms / window_interval_ms`.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone)]
pub struct LaunchDetector<const W: usize> {
    window: RingBuffer<Sample, W>,
    window_size_ms: u32,
    window_interval_ms: u32,
    threshold_squared: f32,
    launched: bool,
    launched_time_ms: u32,
}

impl<const W: usize> LaunchDetector<W> {
    /// `threshold_mps2` is in m/s² of |a|; the comparison happens against
    /// its square so the hot path never takes a square root.
    pub fn new(threshold_mps2: f32, window_size_ms: u32, window_interval_ms: u32) -> Self {
        assert!(
            window_interval_ms > 0
                && window_size_ms % window_interval_ms == 0
                && (window_size_ms / window_interval_ms) as usize == W,
            "window capacity must match window_size_ms / window_interval_ms"
        );
        Self {
            window: RingBuffer::new(),
            window_size_ms,
            window_interval_ms,
            threshold_squared: threshold_mps2 * threshold_mps2,
            launched: false,
            launched_time_ms: 0,
        }
    }

    pub fn update(&mut self, accel: &AccelerationTriplet) -> LaunchUpdateStatus {
        if self.launched {
            return LaunchUpdateStatus::AlreadyLaunched;
        }

        let ts = accel.timestamp_ms;
        let sample = Sample::new(ts, accel.magnitude_squared());

        // Cadence is validated against timestamp 0 while the window is
        // empty, so the chain starts deterministically.
        let head_ts = if self.window.is_empty() {
            0
        } else {
            self.window.get_from_head(0).timestamp_ms
        };

        if ts < head_ts {
            log_trace!("launch window: younger sample {} < {}", ts, head_ts);
            return LaunchUpdateStatus::YoungerTimestamp;
        }

        let dt = ts - head_ts;
        let slack = self.window_interval_ms / 5;
        if dt <= self.window_interval_ms - slack {
            return LaunchUpdateStatus::DataTooFast;
        }
        if dt >= self.window_interval_ms + slack {
            // Stale history would corrupt the median; restart the window
            // from this sample.
            log_trace!("launch window stale after {} ms, restarting", dt);
            self.window.clear();
            self.window.push(sample);
            return LaunchUpdateStatus::WindowDataStale;
        }

        self.window.push(sample);

        if !self.window.is_full() {
            return LaunchUpdateStatus::InitialPopulation;
        }

        let span = self.window.get_from_head(0).timestamp_ms
            - self.window.get_from_head(W - 1).timestamp_ms;
        if span < self.window_size_ms - self.window_size_ms / 10 {
            return LaunchUpdateStatus::WindowTimeRangeTooSmall;
        }

        let median = self.window.median_by_value();
        if median.value < self.threshold_squared {
            return LaunchUpdateStatus::AclTooLow;
        }

        // The median crosses once half the window carries thrust, so this
        // sample sits at the temporal midpoint of the thrust onset.
        self.launched = true;
        self.launched_time_ms = ts;
        log_info!("launch detected at {} ms", self.launched_time_ms);
        LaunchUpdateStatus::LaunchDetected
    }

    pub fn is_launched(&self) -> bool {
        self.launched
    }

    /// Timestamp of the sample whose arrival pushed the median over the
    /// threshold, 0 before launch. For a clean thrust step this lands half
    /// a window after motor ignition.
    pub fn launched_time_ms(&self) -> u32 {
        self.launched_time_ms
    }

    /// Median |a|² currently in the window; diagnostic only.
    pub fn median_acceleration_squared(&self) -> f32 {
        self.window.median_by_value().value
    }

    pub fn window_interval_ms(&self) -> u32 {
        self.window_interval_ms
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.launched = false;
        self.launched_time_ms = 0;
    }
}
