//! Microphone capture through cpal.
//!
//! cpal streams are not `Send` on every platform, so the stream is built and
//! owned by a dedicated capture thread. The thread reports whether setup
//! worked, then parks until it is told to stop; dropping the stream there
//! releases the device.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, Sender};
use dasp_sample::ToSample;
use log::{debug, info, warn};

use super::{AmplitudeMeter, AmplitudeSource, AudioError, SampleSink, DEFAULT_AMPLITUDE_GAIN};

struct Capture {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Default (or named) input device, metered into amplitude samples.
pub struct MicrophoneSource {
    device_name: Option<String>,
    gain: f32,
    capture: Option<Capture>,
}

impl MicrophoneSource {
    pub fn new(device_name: Option<String>, gain: f32) -> Self {
        Self {
            device_name,
            gain,
            capture: None,
        }
    }

    /// Names of the input devices on the default host.
    pub fn input_device_names() -> Result<Vec<String>, AudioError> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|e| AudioError::Unavailable(e.to_string()))?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }
}

impl Default for MicrophoneSource {
    fn default() -> Self {
        Self::new(None, DEFAULT_AMPLITUDE_GAIN)
    }
}

impl AmplitudeSource for MicrophoneSource {
    fn start(&mut self, interval: Duration, sink: SampleSink) -> Result<(), AudioError> {
        if self.capture.is_some() {
            debug!("microphone already capturing");
            return Ok(());
        }

        let (ready_tx, ready_rx) = bounded::<Result<(), AudioError>>(1);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let device_name = self.device_name.clone();
        let gain = self.gain;

        let handle = thread::Builder::new()
            .name("voicestars-mic".into())
            .spawn(move || {
                let stream = match open_stream(device_name.as_deref(), interval, gain, sink) {
                    Ok(stream) => stream,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                // Returns on an explicit stop or when the owner is gone.
                let _ = stop_rx.recv();
                drop(stream);
            })
            .map_err(|e| AudioError::Unavailable(format!("cannot spawn capture thread: {e}")))?;

        let setup = ready_rx.recv().unwrap_or_else(|_| {
            Err(AudioError::Unavailable("capture thread exited during setup".into()))
        });
        match setup {
            Ok(()) => {
                info!("microphone capture started");
                self.capture = Some(Capture { stop_tx, handle });
                Ok(())
            }
            Err(err) => {
                let _ = handle.join();
                Err(err)
            }
        }
    }

    fn stop(&mut self) {
        let Some(capture) = self.capture.take() else {
            return;
        };
        let _ = capture.stop_tx.send(());
        if capture.handle.join().is_err() {
            warn!("microphone capture thread panicked");
        }
        info!("microphone released");
    }

    fn is_active(&self) -> bool {
        self.capture.is_some()
    }
}

impl Drop for MicrophoneSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn open_stream(
    device_name: Option<&str>,
    interval: Duration,
    gain: f32,
    sink: SampleSink,
) -> Result<cpal::Stream, AudioError> {
    let host = cpal::default_host();
    let device = match device_name {
        Some(wanted) => host
            .input_devices()
            .map_err(|e| AudioError::Unavailable(e.to_string()))?
            .find(|d| d.name().map(|n| n == wanted).unwrap_or(false)),
        None => host.default_input_device(),
    }
    .ok_or(AudioError::NoInputDevice)?;

    let supported = device
        .default_input_config()
        .map_err(|e| AudioError::Unavailable(e.to_string()))?;
    let channels = supported.channels() as usize;
    let format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();
    info!(
        "input '{}': {} Hz, {channels} channel(s), {format:?}",
        device.name().unwrap_or_else(|_| "unknown".into()),
        config.sample_rate.0
    );

    let meter = AmplitudeMeter::new(interval, gain);
    let stream = match format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, channels, meter, sink),
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, channels, meter, sink),
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, channels, meter, sink),
        other => {
            return Err(AudioError::Unavailable(format!(
                "unsupported sample format {other:?}"
            )))
        }
    }
    .map_err(|e| AudioError::Stream(e.to_string()))?;

    stream.play().map_err(|e| AudioError::Stream(e.to_string()))?;
    Ok(stream)
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    mut meter: AmplitudeMeter,
    sink: SampleSink,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + ToSample<f32>,
{
    let started = Instant::now();
    let mut scratch: Vec<f32> = Vec::new();
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            scratch.clear();
            scratch.extend(data.iter().map(|&s| ToSample::<f32>::to_sample_(s)));
            meter.push_interleaved(&scratch, channels);
            let now = started.elapsed();
            if let Some(level) = meter.poll(now) {
                sink.send(now, level);
            }
        },
        |err| warn!("microphone stream error: {err}"),
        None,
    )
}
