//! Deterministic source replaying a fixed list of readings.
//!
//! Used by tests and demos: everything queued is delivered immediately on
//! `start`, stamped as if it had arrived at the sampling cadence.

use std::time::Duration;

use super::{AmplitudeSource, AudioError, SampleSink};

#[derive(Debug, Default)]
pub struct ScriptedSource {
    queued: Vec<f32>,
    failure: Option<AudioError>,
    sink: Option<SampleSink>,
    interval: Duration,
    sent: u32,
    starts: usize,
    stops: usize,
}

impl ScriptedSource {
    /// A source that will replay `values` on its next start.
    pub fn new(values: impl IntoIterator<Item = f32>) -> Self {
        Self {
            queued: values.into_iter().collect(),
            ..Self::default()
        }
    }

    /// A source whose start always fails, like a denied microphone.
    pub fn unavailable(reason: &str) -> Self {
        Self {
            failure: Some(AudioError::Unavailable(reason.to_string())),
            ..Self::default()
        }
    }

    /// Queue more readings; delivered at once if the source is running.
    pub fn push(&mut self, values: impl IntoIterator<Item = f32>) {
        self.queued.extend(values);
        self.flush();
    }

    /// Make later starts succeed (or fail) from now on.
    pub fn set_failure(&mut self, failure: Option<AudioError>) {
        self.failure = failure;
    }

    /// Times the device was actually acquired.
    pub fn starts(&self) -> usize { self.starts }

    /// Times the device was actually released.
    pub fn stops(&self) -> usize { self.stops }

    fn flush(&mut self) {
        let Some(sink) = &self.sink else {
            return;
        };
        for value in self.queued.drain(..) {
            self.sent += 1;
            sink.send(self.interval * self.sent, value);
        }
    }
}

impl AmplitudeSource for ScriptedSource {
    fn start(&mut self, interval: Duration, sink: SampleSink) -> Result<(), AudioError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        if self.sink.is_some() {
            return Ok(());
        }
        self.starts += 1;
        self.interval = interval;
        self.sent = 0;
        self.sink = Some(sink);
        self.flush();
        Ok(())
    }

    fn stop(&mut self) {
        if self.sink.take().is_some() {
            self.stops += 1;
        }
    }

    fn is_active(&self) -> bool {
        self.sink.is_some()
    }
}
