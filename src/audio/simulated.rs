//! Random "voice" for playing without a microphone.
//!
//! Alternates bursts of loud readings with stretches of quiet, on a
//! background thread at the sampling cadence.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{AmplitudeSource, AudioError, SampleSink};

/// Shape of the simulated voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceProfile {
    /// Loudness range while "speaking".
    pub loud: (f32, f32),
    /// Loudness range while quiet.
    pub quiet: (f32, f32),
    /// Chance per sample of switching between speaking and quiet.
    pub switch_chance: f64,
}

impl Default for VoiceProfile {
    fn default() -> Self {
        Self {
            loud: (18.0, 40.0),
            quiet: (0.0, 3.0),
            switch_chance: 0.08,
        }
    }
}

/// Stateful generator behind [`SimulatedSource`]; usable on its own.
#[derive(Debug)]
pub struct VoiceGenerator {
    profile: VoiceProfile,
    speaking: bool,
    rng: StdRng,
}

impl VoiceGenerator {
    pub fn new(profile: VoiceProfile, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            profile,
            speaking: true,
            rng,
        }
    }

    pub fn next_value(&mut self) -> f32 {
        if self.rng.gen_bool(self.profile.switch_chance.clamp(0.0, 1.0)) {
            self.speaking = !self.speaking;
        }
        let (lo, hi) = if self.speaking { self.profile.loud } else { self.profile.quiet };
        if hi > lo { self.rng.gen_range(lo..hi) } else { lo }
    }
}

struct Worker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

pub struct SimulatedSource {
    profile: VoiceProfile,
    seed: Option<u64>,
    worker: Option<Worker>,
}

impl SimulatedSource {
    pub fn new(profile: VoiceProfile, seed: Option<u64>) -> Self {
        Self {
            profile,
            seed,
            worker: None,
        }
    }
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new(VoiceProfile::default(), None)
    }
}

impl AmplitudeSource for SimulatedSource {
    fn start(&mut self, interval: Duration, sink: SampleSink) -> Result<(), AudioError> {
        if self.worker.is_some() {
            return Ok(());
        }
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let mut voice = VoiceGenerator::new(self.profile, self.seed);

        let handle = thread::Builder::new()
            .name("voicestars-sim".into())
            .spawn(move || {
                let started = Instant::now();
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    if !sink.send(started.elapsed(), voice.next_value()) {
                        debug!("simulated voice: consumer gone");
                        break;
                    }
                }
            })
            .map_err(|e| AudioError::Unavailable(format!("cannot spawn simulator thread: {e}")))?;

        info!("simulated voice started");
        self.worker = Some(Worker { stop_tx, handle });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            let _ = worker.handle.join();
            info!("simulated voice stopped");
        }
    }

    fn is_active(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for SimulatedSource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_stays_in_profile_ranges() {
        let profile = VoiceProfile::default();
        let mut voice = VoiceGenerator::new(profile, Some(42));
        for _ in 0..500 {
            let v = voice.next_value();
            let in_loud = v >= profile.loud.0 && v < profile.loud.1;
            let in_quiet = v >= profile.quiet.0 && v < profile.quiet.1;
            assert!(in_loud || in_quiet, "value {v} outside both ranges");
        }
    }

    #[test]
    fn seeded_generators_agree() {
        let mut a = VoiceGenerator::new(VoiceProfile::default(), Some(7));
        let mut b = VoiceGenerator::new(VoiceProfile::default(), Some(7));
        for _ in 0..50 {
            assert_eq!(a.next_value(), b.next_value());
        }
    }

    #[test]
    fn thread_delivers_samples_and_stops() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut source = SimulatedSource::new(VoiceProfile::default(), Some(1));
        source
            .start(Duration::from_millis(5), SampleSink::new(2, tx))
            .unwrap();
        let sample = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(sample.generation, 2);
        source.stop();
        assert!(!source.is_active());
        // Sender dropped with the thread.
        while rx.try_recv().is_ok() {}
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }
}
