//! Session controller: the single owner of the live `GameState`.
//!
//! Amplitude sources push samples from their own threads into a channel; the
//! controller drains that channel on the caller's thread (`pump` or
//! `wait_for_samples`) so every state mutation happens in one place.
//! Observers get snapshots through [`StateSubscription`]s.

use std::sync::{Arc, Weak};
use std::time::Duration;

use crossbeam_channel::{
    bounded, unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError, TryIter,
};
use log::{debug, info, warn};

use crate::audio::{AmplitudeSample, AmplitudeSource, AudioError, SampleSink};
use crate::difficulty::{DifficultyError, DifficultyProfile, DifficultyRegistry};
use crate::engine;
use crate::settings::SettingsStore;
use crate::GameState;

/// Inputs the presentation layer (or a replay) can feed the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    SpeakingChanged { amplitude: f32, elapsed: Duration },
    LevelReached { level: usize },
    Reset,
}

/// Snapshots a subscription holds before the oldest ones are discarded.
pub const SUBSCRIPTION_BACKLOG: usize = 64;

/// Receiving end of a state-change subscription. Dropping it unsubscribes.
///
/// At most [`SUBSCRIPTION_BACKLOG`] snapshots are buffered; a subscriber that
/// falls further behind loses the oldest ones but always keeps the newest.
#[derive(Debug)]
pub struct StateSubscription {
    rx: Receiver<GameState>,
    _alive: Arc<()>,
}

impl StateSubscription {
    /// Next pending snapshot, if any.
    pub fn try_next(&self) -> Option<GameState> {
        self.rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next snapshot.
    pub fn next_timeout(&self, timeout: Duration) -> Option<GameState> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Discard everything pending except the most recent snapshot.
    pub fn latest(&self) -> Option<GameState> {
        self.rx.try_iter().last()
    }

    pub fn try_iter(&self) -> TryIter<'_, GameState> {
        self.rx.try_iter()
    }

    pub fn unsubscribe(self) {}
}

struct Subscriber {
    tx: Sender<GameState>,
    /// Publisher-side handle used to evict the oldest snapshot when full.
    backlog: Receiver<GameState>,
    alive: Weak<()>,
}

impl Subscriber {
    fn deliver(&self, snapshot: &GameState) -> bool {
        if self.alive.strong_count() == 0 {
            return false;
        }
        let mut pending = snapshot.clone();
        loop {
            match self.tx.try_send(pending) {
                Ok(()) => return true,
                Err(TrySendError::Full(back)) => {
                    let _ = self.backlog.try_recv();
                    pending = back;
                }
                Err(TrySendError::Disconnected(_)) => return false,
            }
        }
    }
}

pub struct SessionController<A: AmplitudeSource, S: SettingsStore> {
    state: GameState,
    /// Name of the chosen difficulty; what `reset` goes back to.
    selected: String,
    source: A,
    settings: S,
    registry: DifficultyRegistry,
    /// Bumped on every start and stop; samples from older runs are dropped.
    generation: u64,
    samples: Option<Receiver<AmplitudeSample>>,
    last_timestamp: Option<Duration>,
    subscribers: Vec<Subscriber>,
    audio_error: Option<AudioError>,
}

impl<A: AmplitudeSource, S: SettingsStore> SessionController<A, S> {
    /// New idle session using the persisted difficulty (or `easy`).
    pub fn new(source: A, settings: S, registry: DifficultyRegistry) -> Self {
        let difficulty = registry.resolve_or_default(settings.load().as_deref());
        info!("new session on '{}'", difficulty.name);
        Self {
            selected: difficulty.name.clone(),
            state: engine::reset(difficulty),
            source,
            settings,
            registry,
            generation: 0,
            samples: None,
            last_timestamp: None,
            subscribers: Vec::new(),
            audio_error: None,
        }
    }

    #[inline]
    pub fn state(&self) -> &GameState { &self.state }

    #[inline]
    pub fn is_detecting(&self) -> bool { self.state.is_detecting }

    pub fn generation(&self) -> u64 { self.generation }

    pub fn registry(&self) -> &DifficultyRegistry { &self.registry }

    pub fn settings(&self) -> &S { &self.settings }

    pub fn source(&self) -> &A { &self.source }

    pub fn source_mut(&mut self) -> &mut A { &mut self.source }

    /// The last time the microphone could not be opened, until a start succeeds.
    pub fn last_audio_error(&self) -> Option<&AudioError> {
        self.audio_error.as_ref()
    }

    /// Subscribe to state changes. The current state is delivered first.
    pub fn subscribe(&mut self) -> StateSubscription {
        let (tx, rx) = bounded(SUBSCRIPTION_BACKLOG);
        let alive = Arc::new(());
        let subscriber = Subscriber {
            tx,
            backlog: rx.clone(),
            alive: Arc::downgrade(&alive),
        };
        subscriber.deliver(&self.state);
        self.subscribers.push(subscriber);
        StateSubscription { rx, _alive: alive }
    }

    /// Live subscriptions as of the last published change.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Start sampling. A no-op while already detecting; on failure the session
    /// stays idle and the error is kept for [`Self::last_audio_error`].
    pub fn start(&mut self) -> Result<(), AudioError> {
        if self.state.is_detecting {
            debug!("start ignored: already detecting");
            return Ok(());
        }

        self.generation += 1;
        let (tx, rx) = unbounded();
        let sink = SampleSink::new(self.generation, tx);
        let interval = self.state.difficulty.check_interval();

        if let Err(err) = self.source.start(interval, sink) {
            warn!("cannot start detection: {err}");
            self.source.stop();
            self.audio_error = Some(err.clone());
            return Err(err);
        }

        self.samples = Some(rx);
        self.last_timestamp = None;
        self.audio_error = None;
        info!(
            "detection started (generation {}, every {:?})",
            self.generation, interval
        );

        let mut next = self.state.clone();
        next.is_detecting = true;
        self.set_state(next);
        Ok(())
    }

    /// Stop sampling and release the source. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if !self.halt_detection() {
            return;
        }
        let mut next = self.state.clone();
        next.is_detecting = false;
        self.set_state(next);
    }

    /// Apply one reading covering `elapsed`. Ignored while idle.
    pub fn on_amplitude_sample(&mut self, value: f32, elapsed: Duration) {
        if !self.state.is_detecting {
            debug!("dropping amplitude {value:.2}: not detecting");
            return;
        }
        let next = engine::apply_amplitude(&self.state, value, elapsed.as_secs_f32());
        debug!(
            "amplitude {value:.2} -> height {:.3}, level {}",
            next.position_y, next.current_level_index
        );
        self.set_state(next);
    }

    /// Star tapped in the UI. Only the current level counts; anything else is
    /// dropped.
    pub fn on_star_manually_collected(&mut self, level: usize) {
        match engine::complete_level(&self.state, level) {
            Ok(next) => self.set_state(next),
            Err(stale) => debug!("{stale}; ignored"),
        }
    }

    /// Clear the one-shot star animation trigger. Returns whether it was set.
    pub fn consume_star_animation(&mut self) -> bool {
        if !self.state.should_play_star_animation {
            return false;
        }
        let mut next = self.state.clone();
        next.should_play_star_animation = false;
        self.set_state(next);
        true
    }

    /// Select `profile`, persist it as the preferred difficulty and restart the
    /// game with it. A failed save keeps the selection for this session.
    pub fn set_difficulty(&mut self, profile: DifficultyProfile) -> Result<(), DifficultyError> {
        self.registry.register(profile.clone())?;
        if let Err(err) = self.settings.save(&profile.name) {
            warn!("could not persist difficulty '{}': {err}", profile.name);
        }
        info!("difficulty set to '{}'", profile.name);
        self.selected = profile.name.clone();
        self.reset_with(profile);
        Ok(())
    }

    pub fn set_difficulty_by_name(&mut self, name: &str) -> Result<(), DifficultyError> {
        let profile = self.registry.resolve(name)?;
        self.set_difficulty(profile)
    }

    /// Back to a fresh game on the selected difficulty. Detection stops.
    pub fn reset(&mut self) {
        let profile = self.registry.resolve_or_default(Some(&self.selected));
        self.reset_with(profile);
    }

    pub fn process_event(&mut self, event: GameEvent) {
        match event {
            GameEvent::SpeakingChanged { amplitude, elapsed } => {
                self.on_amplitude_sample(amplitude, elapsed)
            }
            GameEvent::LevelReached { level } => self.on_star_manually_collected(level),
            GameEvent::Reset => self.reset(),
        }
    }

    /// Apply every sample already delivered, without blocking.
    /// Returns the number of samples applied.
    pub fn pump(&mut self) -> usize {
        let Some(rx) = &self.samples else {
            return 0;
        };
        let mut batch = Vec::new();
        let mut disconnected = false;
        loop {
            match rx.try_recv() {
                Ok(sample) => batch.push(sample),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }

        let mut applied = 0;
        for sample in batch {
            if self.accept(sample) {
                applied += 1;
            }
        }
        if disconnected {
            self.source_lost();
        }
        applied
    }

    /// Block up to `timeout` for the first sample, then drain the rest.
    pub fn wait_for_samples(&mut self, timeout: Duration) -> usize {
        let received = match &self.samples {
            Some(rx) => rx.recv_timeout(timeout),
            None => return 0,
        };
        match received {
            Ok(first) => usize::from(self.accept(first)) + self.pump(),
            Err(RecvTimeoutError::Timeout) => 0,
            Err(RecvTimeoutError::Disconnected) => {
                self.source_lost();
                0
            }
        }
    }

    fn accept(&mut self, sample: AmplitudeSample) -> bool {
        if sample.generation != self.generation || !self.state.is_detecting {
            debug!("dropping stale sample from generation {}", sample.generation);
            return false;
        }
        let elapsed = match self.last_timestamp {
            Some(previous) => sample.timestamp.saturating_sub(previous),
            None => self.state.difficulty.check_interval(),
        };
        self.last_timestamp = Some(sample.timestamp);
        self.on_amplitude_sample(sample.value, elapsed);
        true
    }

    fn source_lost(&mut self) {
        warn!("amplitude source went away; stopping detection");
        self.audio_error = Some(AudioError::Stream("amplitude source stopped".into()));
        self.stop();
    }

    /// Release the source and close the sample channel.
    /// Returns `false` if nothing was running.
    fn halt_detection(&mut self) -> bool {
        let was_running =
            self.state.is_detecting || self.samples.is_some() || self.source.is_active();
        self.source.stop();
        self.samples = None;
        self.last_timestamp = None;
        if was_running {
            self.generation += 1;
            info!("detection stopped");
        }
        was_running
    }

    fn reset_with(&mut self, profile: DifficultyProfile) {
        self.halt_detection();
        info!("game reset on '{}'", profile.name);
        self.set_state(engine::reset(profile));
    }

    fn set_state(&mut self, next: GameState) {
        if next == self.state {
            return;
        }
        self.state = next;
        self.publish();
    }

    fn publish(&mut self) {
        let snapshot = &self.state;
        self.subscribers.retain(|sub| sub.deliver(snapshot));
    }
}

impl<A: AmplitudeSource, S: SettingsStore> Drop for SessionController<A, S> {
    fn drop(&mut self) {
        self.source.stop();
    }
}
