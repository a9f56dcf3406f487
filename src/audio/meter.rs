//! Windowed loudness meter.
//!
//! Loudness is the mean of `|sample|` over a window, scaled by a gain
//! (1000 by default) so that thresholds read as small whole numbers.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AmplitudeMeter {
    gain: f32,
    window: Duration,
    sum: f32,
    count: usize,
    window_start: Duration,
}

impl AmplitudeMeter {
    pub fn new(window: Duration, gain: f32) -> Self {
        Self {
            gain,
            window,
            sum: 0.0,
            count: 0,
            window_start: Duration::ZERO,
        }
    }

    /// Accumulate one mono sample.
    #[inline]
    pub fn push(&mut self, sample: f32) {
        if sample.is_finite() {
            self.sum += sample.abs();
            self.count += 1;
        }
    }

    /// Accumulate the first channel of every interleaved frame in `data`.
    pub fn push_interleaved(&mut self, data: &[f32], channels: usize) {
        for frame in data.chunks(channels.max(1)) {
            self.push(frame[0]);
        }
    }

    /// Loudness of the samples seen so far in this window, without closing it.
    pub fn level(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f32 * self.gain
        }
    }

    /// Close the window if `now` is at least one window past its start,
    /// returning its loudness.
    pub fn poll(&mut self, now: Duration) -> Option<f32> {
        if now.saturating_sub(self.window_start) < self.window {
            return None;
        }
        let level = self.level();
        self.sum = 0.0;
        self.count = 0;
        self.window_start = now;
        Some(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_is_scaled_mean_absolute_value() {
        let mut meter = AmplitudeMeter::new(Duration::from_millis(100), 1000.0);
        for s in [0.01, -0.01, 0.02, -0.02] {
            meter.push(s);
        }
        assert!((meter.level() - 15.0).abs() < 1e-3);
    }

    #[test]
    fn poll_emits_once_per_window() {
        let mut meter = AmplitudeMeter::new(Duration::from_millis(100), 1000.0);
        meter.push(0.005);
        assert_eq!(meter.poll(Duration::from_millis(50)), None);
        let level = meter.poll(Duration::from_millis(100)).unwrap();
        assert!((level - 5.0).abs() < 1e-3);

        // Window restarted: empty and not yet due.
        assert_eq!(meter.poll(Duration::from_millis(150)), None);
        assert_eq!(meter.poll(Duration::from_millis(200)), Some(0.0));
    }

    #[test]
    fn interleaved_frames_use_first_channel() {
        let mut meter = AmplitudeMeter::new(Duration::from_millis(100), 1.0);
        meter.push_interleaved(&[0.5, 9.0, -0.5, 9.0], 2);
        assert!((meter.level() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn non_finite_samples_are_skipped() {
        let mut meter = AmplitudeMeter::new(Duration::from_millis(100), 1.0);
        meter.push(f32::NAN);
        meter.push(0.25);
        assert!((meter.level() - 0.25).abs() < 1e-6);
    }
}
