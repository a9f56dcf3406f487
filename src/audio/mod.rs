//! Amplitude sources: the producer side of a game session.
//!
//! A source runs on its own thread and pushes [`AmplitudeSample`]s into the
//! [`SampleSink`] it was started with. The session controller is the single
//! consumer on the other end of the channel.

use std::time::Duration;

use crossbeam_channel::Sender;

pub mod meter;
pub mod microphone;
pub mod scripted;
pub mod simulated;

pub use meter::AmplitudeMeter;
pub use microphone::MicrophoneSource;
pub use scripted::ScriptedSource;
pub use simulated::SimulatedSource;

/// Scale applied to the mean absolute sample to get game amplitude units.
pub const DEFAULT_AMPLITUDE_GAIN: f32 = 1000.0;

/// The microphone could not be used. Every variant means the same thing to the
/// game (stay idle, offer a retry); they only differ in the message.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AudioError {
    #[error("audio input unavailable: {0}")]
    Unavailable(String),
    #[error("no audio input device found")]
    NoInputDevice,
    #[error("audio stream error: {0}")]
    Stream(String),
}

/// One loudness reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmplitudeSample {
    /// Detection run this sample belongs to.
    pub generation: u64,
    /// Time since the source started producing for this generation.
    pub timestamp: Duration,
    /// Non-negative loudness.
    pub value: f32,
}

/// Sending half handed to a source on start; tags every sample with the
/// generation it was opened for.
#[derive(Debug, Clone)]
pub struct SampleSink {
    generation: u64,
    tx: Sender<AmplitudeSample>,
}

impl SampleSink {
    pub fn new(generation: u64, tx: Sender<AmplitudeSample>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Push a reading. Returns `false` once the consumer has gone away, which
    /// is the producer's cue to stop.
    pub fn send(&self, timestamp: Duration, value: f32) -> bool {
        self.tx
            .send(AmplitudeSample {
                generation: self.generation,
                timestamp,
                value: value.max(0.0),
            })
            .is_ok()
    }
}

/// External collaborator producing amplitude readings.
pub trait AmplitudeSource {
    /// Begin producing samples roughly every `interval`. Calling this while
    /// already running must not acquire the device twice.
    fn start(&mut self, interval: Duration, sink: SampleSink) -> Result<(), AudioError>;

    /// Stop producing and release the device. Safe to call repeatedly.
    fn stop(&mut self);

    fn is_active(&self) -> bool;
}

impl<T: AmplitudeSource + ?Sized> AmplitudeSource for Box<T> {
    fn start(&mut self, interval: Duration, sink: SampleSink) -> Result<(), AudioError> {
        (**self).start(interval, sink)
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn is_active(&self) -> bool {
        (**self).is_active()
    }
}
