//! The player state machine.
//!
//! `PlayerEngine` owns the audio handle, the track list and the widget
//! state. Every mutation goes through it; the control surface only reads
//! [`PlayerView`] frames pushed to the claimed listener.

use super::media::{MediaEvent, MediaHandle};
use super::model::{
    format_time, progress_percent, volume_label, PlayerSnapshot, PlayerState, PlayerView,
    SurfaceMode, Track,
};
use super::timing::{Spawner, Timer};
use super::tracklist::{load_tracks_or_fallback, TrackSource};
use super::{PlayerConfig, PlayerError};
use crate::db::SnapshotStore;
use dioxus::logger::tracing::{debug, error, info, warn};
use futures_util::future::{self, FutureExt, LocalBoxFuture};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Volumes this close to a bound are treated as the bound, so repeated
/// steps land exactly on silent or full.
const VOLUME_SNAP: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Fresh,
    Initializing,
    Ready,
    TornDown,
}

#[derive(Debug, Clone, Copy)]
struct Progress {
    elapsed: f64,
    duration: f64,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            elapsed: 0.0,
            duration: f64::NAN,
        }
    }
}

/// Identifies the control surface currently allowed to render the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceToken(u64);

pub type ViewListener = Rc<dyn Fn(PlayerView)>;

struct SurfaceBinding {
    token: SurfaceToken,
    listener: ViewListener,
}

/// A load that was issued but whose source may not be ready yet.
pub struct PendingLoad {
    ticket: u64,
    started: LocalBoxFuture<'static, ()>,
    /// Playback was running when the load was issued.
    pub resume: bool,
}

pub struct PlayerEngine {
    config: PlayerConfig,
    media: Option<Rc<dyn MediaHandle>>,
    store: Rc<dyn SnapshotStore>,
    timer: Rc<dyn Timer>,
    spawner: Rc<dyn Spawner>,
    state: RefCell<PlayerState>,
    tracks: RefCell<Rc<Vec<Track>>>,
    progress: Cell<Progress>,
    load_ticket: Cell<u64>,
    error_epoch: Cell<u64>,
    error_indicator: Cell<bool>,
    recovery_attempts: Cell<u32>,
    lifecycle: Cell<Lifecycle>,
    surface: RefCell<Option<SurfaceBinding>>,
    next_surface: Cell<u64>,
}

impl PlayerEngine {
    pub fn new(
        config: PlayerConfig,
        media: Option<Rc<dyn MediaHandle>>,
        store: Rc<dyn SnapshotStore>,
        timer: Rc<dyn Timer>,
        spawner: Rc<dyn Spawner>,
    ) -> Rc<Self> {
        let state = PlayerState::with_volume(config.default_volume);
        Rc::new(Self {
            config,
            media,
            store,
            timer,
            spawner,
            state: RefCell::new(state),
            tracks: RefCell::new(Rc::new(Vec::new())),
            progress: Cell::new(Progress::default()),
            load_ticket: Cell::new(0),
            error_epoch: Cell::new(0),
            error_indicator: Cell::new(false),
            recovery_attempts: Cell::new(0),
            lifecycle: Cell::new(Lifecycle::Fresh),
            surface: RefCell::new(None),
            next_surface: Cell::new(0),
        })
    }

    /// Route media element events into the engine. The handler only holds
    /// a weak reference so a discarded engine is not kept alive by its
    /// audio element.
    pub fn bind_media_events(self: &Rc<Self>) {
        let Some(media) = &self.media else {
            return;
        };
        let weak = Rc::downgrade(self);
        media.set_event_handler(Rc::new(move |event| {
            if let Some(engine) = weak.upgrade() {
                engine.dispatch(event);
            }
        }));
    }

    fn dispatch(self: &Rc<Self>, event: MediaEvent) {
        match event {
            MediaEvent::TimeUpdate => self.on_time_update(),
            MediaEvent::MetadataLoaded => self.on_metadata_loaded(),
            MediaEvent::Ended => self.spawner.spawn(self.clone().next_track().boxed_local()),
            MediaEvent::Error(message) => self
                .spawner
                .spawn(self.clone().recover_from_error(message).boxed_local()),
        }
    }

    /// Restore persisted state, fetch the track list and load the current
    /// track without playing it. Runs at most once per engine.
    pub async fn initialize(self: Rc<Self>, source: Rc<dyn TrackSource>) {
        if self.lifecycle.get() != Lifecycle::Fresh {
            debug!("Player already initialized, skipping");
            return;
        }
        self.lifecycle.set(Lifecycle::Initializing);

        self.restore_state();
        self.notify();

        let tracks = load_tracks_or_fallback(source.as_ref()).await;
        if self.lifecycle.get() == Lifecycle::TornDown {
            debug!("Player discarded while the track list was loading");
            return;
        }

        let index = {
            let mut state = self.state.borrow_mut();
            if state.current_track >= tracks.len() {
                warn!(
                    "Restored track {} is out of range for {} tracks, starting from the first",
                    state.current_track,
                    tracks.len()
                );
                state.current_track = 0;
            }
            state.is_playing = false;
            state.current_track
        };
        let count = tracks.len();
        *self.tracks.borrow_mut() = Rc::new(tracks);
        self.lifecycle.set(Lifecycle::Ready);

        // Initial load never resumes playback.
        let _ = self.load_track(index);
        info!("Player ready with {count} tracks at index {index}");
        self.notify();
    }

    fn restore_state(&self) {
        let defaults = PlayerSnapshot::defaults(self.config.default_volume);
        let snapshot = match self.store.load() {
            Ok(Some(stored)) => PlayerSnapshot::merge_over(&defaults, &stored),
            Ok(None) => defaults,
            Err(err) => {
                warn!("Ignoring stored player state: {}", PlayerError::from(err));
                defaults
            }
        };

        self.state.borrow_mut().apply_snapshot(&snapshot);
        if let Some(media) = &self.media {
            media.set_volume(snapshot.volume);
        }
    }

    /// Write the persisted subset of the state.
    pub fn persist(&self) {
        let snapshot = self.state.borrow().snapshot();
        if let Err(err) = self.store.save(&snapshot) {
            warn!("Could not save player state: {}", PlayerError::from(err));
        }
    }

    fn notify(&self) {
        let listener = self
            .surface
            .borrow()
            .as_ref()
            .map(|binding| binding.listener.clone());
        if let Some(listener) = listener {
            listener(self.view());
        }
    }

    fn update(&self, change: impl FnOnce(&mut PlayerState)) {
        change(&mut self.state.borrow_mut());
        self.persist();
        self.notify();
    }

    pub fn view(&self) -> PlayerView {
        let state = self.state.borrow().clone();
        let tracks = self.tracks.borrow().clone();
        let progress = self.progress.get();

        let (title, artist) = match tracks.get(state.current_track) {
            Some(track) => (
                track.display_title().to_string(),
                track.display_artist().to_string(),
            ),
            None => ("Loading tracks...".to_string(), String::new()),
        };

        PlayerView {
            volume_label: volume_label(state.volume),
            elapsed: format_time(progress.elapsed),
            duration: format_time(progress.duration),
            percent: progress_percent(progress.elapsed, progress.duration),
            error_indicator: self.error_indicator.get(),
            ready: self.lifecycle.get() == Lifecycle::Ready,
            state,
            tracks,
            title,
            artist,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> PlayerState {
        self.state.borrow().clone()
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.lifecycle.get() != Lifecycle::Fresh
    }

    /// The audio handle is currently producing sound.
    pub fn is_live(&self) -> bool {
        self.lifecycle.get() != Lifecycle::TornDown
            && self.media.as_ref().is_some_and(|media| !media.is_paused())
    }

    /// Point the audio handle at `tracks[index]` and force a reload.
    ///
    /// Returns the pending load so callers can resume playback once the
    /// new source started loading. Invalid indices and a missing audio
    /// handle leave the state untouched.
    pub fn load_track(&self, index: usize) -> Option<PendingLoad> {
        let track = {
            let tracks = self.tracks.borrow();
            match tracks.get(index) {
                Some(track) => track.clone(),
                None => {
                    warn!(
                        "Ignoring load of track {index}: only {} tracks",
                        tracks.len()
                    );
                    return None;
                }
            }
        };
        let Some(media) = &self.media else {
            warn!("Cannot load track {index}: {}", PlayerError::MissingMedia);
            return None;
        };

        let ticket = self.load_ticket.get() + 1;
        self.load_ticket.set(ticket);

        let resume = {
            let mut state = self.state.borrow_mut();
            if state.current_track != index {
                self.recovery_attempts.set(0);
            }
            state.current_track = index;
            state.is_playing
        };
        self.progress.set(Progress::default());

        media.set_source(&track.src);
        let started = media.load_started();
        media.reload();

        self.persist();
        info!(
            "Loaded track {index}: {} - {}",
            track.display_title(),
            track.display_artist()
        );
        self.notify();

        Some(PendingLoad {
            ticket,
            started,
            resume,
        })
    }

    /// Load `index` and keep playing if playback was running.
    pub async fn change_track(self: Rc<Self>, index: usize) {
        if let Some(pending) = self.load_track(index) {
            if pending.resume {
                self.play_when_current(pending).await;
            }
        }
    }

    /// Start playback once `pending` began loading, unless a newer load
    /// replaced it in the meantime.
    async fn play_when_current(self: Rc<Self>, pending: PendingLoad) {
        pending.started.await;
        if self.load_ticket.get() != pending.ticket {
            debug!(
                "Dropping resume for superseded load {} (current {})",
                pending.ticket,
                self.load_ticket.get()
            );
            return;
        }
        if self.lifecycle.get() == Lifecycle::TornDown {
            return;
        }
        self.play().await;
    }

    /// Load `index` and start it regardless of the previous play state.
    pub async fn play_track(self: Rc<Self>, index: usize) {
        if let Some(pending) = self.load_track(index) {
            self.play_when_current(pending).await;
        }
    }

    pub async fn toggle_play(self: Rc<Self>) {
        if self.state.borrow().is_playing {
            self.pause();
        } else {
            self.play().await;
        }
    }

    pub fn pause(&self) {
        let Some(media) = &self.media else {
            warn!("Cannot pause: {}", PlayerError::MissingMedia);
            return;
        };
        if let Err(err) = media.pause() {
            error!("Pause failed: {err}");
        }
        self.state.borrow_mut().is_playing = false;
        self.notify();
    }

    /// Ask the audio handle to start. A refusal is retried exactly once.
    pub async fn play(self: Rc<Self>) {
        let Some(media) = self.media.clone() else {
            warn!("Cannot play: {}", PlayerError::MissingMedia);
            return;
        };

        let err = match media.play().await {
            Ok(()) => {
                self.mark_started();
                return;
            }
            Err(err) => err,
        };

        warn!("Playback did not start: {err}");
        self.state.borrow_mut().is_playing = false;
        self.notify();

        self.timer.sleep(self.config.play_retry_delay_ms).await;
        if self.lifecycle.get() == Lifecycle::TornDown || self.state.borrow().is_playing {
            return;
        }
        match media.play().await {
            Ok(()) => {
                info!("Playback started on retry");
                self.mark_started();
            }
            Err(err) => error!("Playback retry failed: {err}"),
        }
    }

    fn mark_started(&self) {
        self.state.borrow_mut().is_playing = true;
        self.recovery_attempts.set(0);
        self.notify();
    }

    /// Advance to the next track, or restart the current one when looping.
    pub async fn next_track(self: Rc<Self>) {
        let (looping, playing, current) = {
            let state = self.state.borrow();
            (state.is_looping, state.is_playing, state.current_track)
        };

        if looping {
            let Some(media) = &self.media else {
                warn!("Cannot restart track: {}", PlayerError::MissingMedia);
                return;
            };
            media.set_current_time(0.0);
            if playing {
                self.play().await;
            }
            return;
        }

        let count = self.tracks.borrow().len();
        if count == 0 {
            warn!("No tracks to advance to");
            return;
        }
        self.change_track((current + 1) % count).await;
    }

    pub async fn prev_track(self: Rc<Self>) {
        let current = self.state.borrow().current_track;
        let count = self.tracks.borrow().len();
        if count == 0 {
            warn!("No tracks to go back to");
            return;
        }
        let index = if current == 0 { count - 1 } else { current - 1 };
        self.change_track(index).await;
    }

    /// Nudge the volume by `delta`, clamped to [0, 1].
    pub fn adjust_volume(&self, delta: f64) {
        if !delta.is_finite() {
            warn!("Ignoring non-finite volume step {delta}");
            return;
        }
        let volume = {
            let mut state = self.state.borrow_mut();
            let stepped = (state.volume + delta).clamp(0.0, 1.0);
            state.volume = if stepped < VOLUME_SNAP {
                0.0
            } else if stepped > 1.0 - VOLUME_SNAP {
                1.0
            } else {
                stepped
            };
            state.volume
        };
        match &self.media {
            Some(media) => media.set_volume(volume),
            None => debug!("Volume {volume} not applied: no audio handle"),
        }
        self.persist();
        self.notify();
    }

    pub fn toggle_minimize(&self) {
        self.update(|state| {
            state.surface = match state.surface {
                SurfaceMode::Normal => SurfaceMode::Minimized,
                SurfaceMode::Minimized => SurfaceMode::Normal,
            };
        });
    }

    /// Click on the collapsed surface.
    pub fn restore_surface(&self) {
        if self.state.borrow().surface == SurfaceMode::Normal {
            return;
        }
        self.update(|state| state.surface = SurfaceMode::Normal);
    }

    pub fn toggle_playlist(&self) {
        self.update(|state| state.playlist_visible = !state.playlist_visible);
    }

    pub fn toggle_loop(&self) {
        self.update(|state| state.is_looping = !state.is_looping);
    }

    /// Jump to `fraction` of the track. Needs a known duration.
    pub fn seek_fraction(&self, fraction: f64) {
        let Some(media) = &self.media else {
            warn!("Cannot seek: {}", PlayerError::MissingMedia);
            return;
        };
        let duration = media.duration();
        if !duration.is_finite() || duration <= 0.0 {
            debug!("Seek ignored until the duration is known");
            return;
        }
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let target = fraction * duration;
        media.set_current_time(target);
        self.progress.set(Progress {
            elapsed: target,
            duration,
        });
        self.notify();
    }

    fn on_time_update(&self) {
        let Some(media) = &self.media else {
            return;
        };
        let duration = media.duration();
        if !duration.is_finite() {
            return;
        }
        self.progress.set(Progress {
            elapsed: media.current_time(),
            duration,
        });
        self.notify();
    }

    fn on_metadata_loaded(&self) {
        let Some(media) = &self.media else {
            return;
        };
        let mut progress = self.progress.get();
        progress.duration = media.duration();
        self.progress.set(progress);
        self.notify();
    }

    /// Show the error glyph, reload the current track after a pause and
    /// revert the glyph unless a newer error arrived.
    pub async fn recover_from_error(self: Rc<Self>, message: String) {
        let index = self.state.borrow().current_track;
        error!("Media error on track {index}: {}", PlayerError::MediaFailure(message));

        let epoch = self.error_epoch.get() + 1;
        self.error_epoch.set(epoch);
        self.error_indicator.set(true);
        let attempt = self.recovery_attempts.get() + 1;
        self.recovery_attempts.set(attempt);
        self.notify();

        let reload = {
            let engine = self.clone();
            async move {
                engine.timer.sleep(engine.config.recovery_delay_ms).await;
                if engine.lifecycle.get() == Lifecycle::TornDown {
                    return;
                }
                if attempt > engine.config.max_recovery_attempts {
                    warn!(
                        "Giving up on automatic reloads after {} attempts",
                        engine.config.max_recovery_attempts
                    );
                    return;
                }
                let index = engine.state.borrow().current_track;
                info!("Reloading track {index} after media error (attempt {attempt})");
                engine.change_track(index).await;
            }
        };

        let revert = {
            let engine = self.clone();
            async move {
                engine.timer.sleep(engine.config.error_indicator_ms).await;
                if engine.error_epoch.get() == epoch {
                    engine.error_indicator.set(false);
                    engine.notify();
                }
            }
        };

        future::join(reload, revert).await;
    }

    /// Page visibility changed. Coming back re-syncs the play flag.
    pub fn on_visibility_change(&self, hidden: bool) {
        debug!("Page visibility changed, hidden: {hidden}");
        if hidden {
            return;
        }
        let playing = self.media.as_ref().is_some_and(|media| !media.is_paused());
        if playing && !self.state.borrow().is_playing {
            self.state.borrow_mut().is_playing = true;
            self.notify();
        }
    }

    /// Attach a control surface. Any previous surface is told once that
    /// it lost ownership.
    pub fn claim_surface(&self, listener: ViewListener) -> SurfaceToken {
        let token = SurfaceToken(self.next_surface.get() + 1);
        self.next_surface.set(token.0);

        let previous = self
            .surface
            .borrow_mut()
            .replace(SurfaceBinding { token, listener });
        if let Some(previous) = previous {
            debug!("Control surface {:?} superseded by {:?}", previous.token, token);
            (previous.listener)(self.view());
        }
        token
    }

    pub fn release_surface(&self, token: SurfaceToken) {
        let mut surface = self.surface.borrow_mut();
        if surface.as_ref().is_some_and(|binding| binding.token == token) {
            surface.take();
        }
    }

    pub fn owns_surface(&self, token: SurfaceToken) -> bool {
        self.surface
            .borrow()
            .as_ref()
            .is_some_and(|binding| binding.token == token)
    }

    /// Stop the session for good: pause, unbind media events and save.
    pub fn teardown(&self) {
        if self.lifecycle.get() == Lifecycle::TornDown {
            return;
        }
        self.lifecycle.set(Lifecycle::TornDown);
        if let Some(media) = &self.media {
            if let Err(err) = media.pause() {
                debug!("Pause during teardown failed: {err}");
            }
            media.clear_event_handler();
        }
        self.state.borrow_mut().is_playing = false;
        self.persist();
        self.surface.borrow_mut().take();
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::db::{NullStore, SqliteStore};
    use crate::playback::media::testing::FakeMedia;
    use crate::playback::model::fallback_tracks;
    use crate::playback::timing::testing::{InlineSpawner, RecordingTimer};
    use crate::playback::tracklist::testing::StaticTrackSource;
    use futures_util::task::noop_waker;
    use futures_util::FutureExt;
    use std::task::Context;

    struct Harness {
        engine: Rc<PlayerEngine>,
        media: Rc<FakeMedia>,
        timer: Rc<RecordingTimer>,
        spawner: Rc<InlineSpawner>,
    }

    fn tracks(count: usize) -> Vec<Track> {
        (0..count)
            .map(|i| {
                Track::new(
                    &format!("Track {i}"),
                    &format!("Artist {i}"),
                    &format!("music/{i}.mp3"),
                )
            })
            .collect()
    }

    fn harness_with(store: Rc<dyn SnapshotStore>, source: StaticTrackSource) -> Harness {
        let media = Rc::new(FakeMedia::default());
        let timer = Rc::new(RecordingTimer::default());
        let spawner = Rc::new(InlineSpawner::default());
        let engine = PlayerEngine::new(
            PlayerConfig::default(),
            Some(media.clone() as Rc<dyn MediaHandle>),
            store,
            timer.clone(),
            spawner.clone(),
        );
        engine.bind_media_events();
        engine
            .clone()
            .initialize(Rc::new(source))
            .now_or_never()
            .unwrap();
        Harness {
            engine,
            media,
            timer,
            spawner,
        }
    }

    fn harness(count: usize) -> Harness {
        harness_with(Rc::new(NullStore), StaticTrackSource::with(tracks(count)))
    }

    fn run<F: std::future::Future<Output = ()>>(fut: F) {
        fut.now_or_never().unwrap();
    }

    #[test]
    fn initialize_loads_first_track_without_playing() {
        let h = harness(3);
        assert_eq!(*h.media.source.borrow(), "music/0.mp3");
        assert_eq!(h.media.reloads.get(), 1);
        assert_eq!(h.media.play_calls.get(), 0);
        assert!(!h.engine.state().is_playing);
        assert!(h.engine.view().ready);
    }

    #[test]
    fn initialize_twice_is_a_no_op() {
        let h = harness(3);
        run(h
            .engine
            .clone()
            .initialize(Rc::new(StaticTrackSource::with(tracks(5)))));
        assert_eq!(h.media.reloads.get(), 1);
        assert_eq!(h.engine.view().tracks.len(), 3);
    }

    #[test]
    fn load_track_updates_index_and_display() {
        let h = harness(3);
        for index in 0..3 {
            assert!(h.engine.load_track(index).is_some());
            let view = h.engine.view();
            assert_eq!(view.state.current_track, index);
            assert_eq!(view.title, format!("Track {index}"));
            assert_eq!(view.artist, format!("Artist {index}"));
        }
    }

    #[test]
    fn load_track_rejects_out_of_range_index() {
        let h = harness(3);
        h.engine.load_track(1);
        let reloads = h.media.reloads.get();
        assert!(h.engine.load_track(3).is_none());
        assert_eq!(h.engine.state().current_track, 1);
        assert_eq!(h.media.reloads.get(), reloads);
    }

    #[test]
    fn missing_audio_handle_is_a_no_op() {
        let engine = PlayerEngine::new(
            PlayerConfig::default(),
            None,
            Rc::new(NullStore),
            Rc::new(RecordingTimer::default()),
            Rc::new(InlineSpawner::default()),
        );
        run(engine
            .clone()
            .initialize(Rc::new(StaticTrackSource::with(tracks(3)))));
        assert!(engine.load_track(2).is_none());
        assert_eq!(engine.state().current_track, 0);
        run(engine.clone().toggle_play());
        engine.seek_fraction(0.5);
        assert!(!engine.state().is_playing);
        assert!(!engine.is_live());
    }

    #[test]
    fn next_track_wraps_around() {
        let h = harness(3);
        run(h.engine.clone().next_track());
        run(h.engine.clone().next_track());
        assert_eq!(h.engine.state().current_track, 2);
        run(h.engine.clone().next_track());
        assert_eq!(h.engine.state().current_track, 0);
    }

    #[test]
    fn next_track_restarts_when_looping() {
        let h = harness(3);
        h.engine.load_track(1);
        h.engine.toggle_loop();
        h.media.time.set(42.0);
        run(h.engine.clone().next_track());
        assert_eq!(h.engine.state().current_track, 1);
        assert_eq!(h.media.time.get(), 0.0);
    }

    #[test]
    fn looping_restart_resumes_when_playing() {
        let h = harness(2);
        run(h.engine.clone().toggle_play());
        h.engine.toggle_loop();
        let plays = h.media.play_calls.get();
        run(h.engine.clone().next_track());
        assert_eq!(h.media.play_calls.get(), plays + 1);
        assert_eq!(h.engine.state().current_track, 0);
    }

    #[test]
    fn prev_track_wraps_to_last() {
        let h = harness(4);
        run(h.engine.clone().prev_track());
        assert_eq!(h.engine.state().current_track, 3);
        run(h.engine.clone().prev_track());
        assert_eq!(h.engine.state().current_track, 2);
    }

    #[test]
    fn volume_saturates_at_zero() {
        let h = harness(1);
        assert_eq!(h.engine.state().volume, 0.7);
        for _ in 0..7 {
            h.engine.adjust_volume(-0.1);
        }
        assert_eq!(h.engine.state().volume, 0.0);
        h.engine.adjust_volume(-0.1);
        assert_eq!(h.engine.state().volume, 0.0);
        assert_eq!(h.media.volume.get(), 0.0);
        assert_eq!(h.engine.view().volume_label, "0%");
    }

    #[test]
    fn small_volume_steps_are_not_rounded() {
        let h = harness(1);
        h.engine.adjust_volume(0.004);
        assert!((h.engine.state().volume - 0.704).abs() < 1e-12);
        assert!((h.media.volume.get() - 0.704).abs() < 1e-12);
        h.engine.adjust_volume(-0.004);
        assert!((h.engine.state().volume - 0.7).abs() < 1e-12);
    }

    #[test]
    fn volume_steps_land_on_full() {
        let h = harness(1);
        for _ in 0..3 {
            h.engine.adjust_volume(0.1);
        }
        assert_eq!(h.engine.state().volume, 1.0);
        assert_eq!(h.engine.view().volume_label, "100%");
    }

    #[test]
    fn volume_stays_in_range_for_large_steps() {
        let h = harness(1);
        h.engine.adjust_volume(5.0);
        assert_eq!(h.engine.state().volume, 1.0);
        h.engine.adjust_volume(5.0);
        assert_eq!(h.engine.state().volume, 1.0);
        h.engine.adjust_volume(-12.5);
        assert_eq!(h.engine.state().volume, 0.0);
        h.engine.adjust_volume(f64::NAN);
        assert_eq!(h.engine.state().volume, 0.0);
    }

    #[test]
    fn toggle_play_pauses_and_resumes() {
        let h = harness(2);
        run(h.engine.clone().toggle_play());
        assert!(h.engine.state().is_playing);
        assert!(h.engine.is_live());
        run(h.engine.clone().toggle_play());
        assert!(!h.engine.state().is_playing);
        assert!(h.media.paused.get());
    }

    #[test]
    fn refused_start_is_retried_once() {
        let h = harness(2);
        h.media.refuse_plays.set(1);
        run(h.engine.clone().toggle_play());
        assert_eq!(h.media.play_calls.get(), 2);
        assert_eq!(*h.timer.requested.borrow(), vec![1000]);
        assert!(h.engine.state().is_playing);
    }

    #[test]
    fn second_refusal_leaves_player_stopped() {
        let h = harness(2);
        h.media.refuse_plays.set(5);
        run(h.engine.clone().toggle_play());
        assert_eq!(h.media.play_calls.get(), 2);
        assert!(!h.engine.state().is_playing);
    }

    #[test]
    fn change_track_resumes_when_playing() {
        let h = harness(3);
        run(h.engine.clone().toggle_play());
        let plays = h.media.play_calls.get();
        run(h.engine.clone().change_track(2));
        assert_eq!(h.media.play_calls.get(), plays + 1);
        assert_eq!(*h.media.source.borrow(), "music/2.mp3");
        assert!(h.engine.state().is_playing);
    }

    #[test]
    fn play_track_starts_a_stopped_player() {
        let h = harness(3);
        run(h.engine.clone().play_track(1));
        assert_eq!(h.engine.state().current_track, 1);
        assert!(h.engine.state().is_playing);
    }

    #[test]
    fn superseded_resume_is_dropped() {
        let h = harness(3);
        run(h.engine.clone().toggle_play());
        h.media.hold_loads.set(true);
        let plays = h.media.play_calls.get();

        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut first = h.engine.clone().change_track(1).boxed_local();
        assert!(first.poll_unpin(&mut cx).is_pending());
        let mut second = h.engine.clone().change_track(2).boxed_local();
        assert!(second.poll_unpin(&mut cx).is_pending());

        h.media.finish_loads();
        assert!(first.poll_unpin(&mut cx).is_ready());
        assert_eq!(h.media.play_calls.get(), plays);
        assert!(second.poll_unpin(&mut cx).is_ready());
        assert_eq!(h.media.play_calls.get(), plays + 1);
        assert_eq!(*h.media.source.borrow(), "music/2.mp3");
        assert_eq!(h.engine.state().current_track, 2);
    }

    #[test]
    fn media_error_reloads_current_track() {
        let h = harness(3);
        h.engine.load_track(1);
        let reloads = h.media.reloads.get();
        run(h.engine.clone().recover_from_error("decode".to_string()));
        assert_eq!(h.media.reloads.get(), reloads + 1);
        assert_eq!(h.engine.state().current_track, 1);
        assert!(!h.engine.view().error_indicator);
        let requested = h.timer.requested.borrow();
        assert!(requested.contains(&2000));
        assert!(requested.contains(&3000));
    }

    #[test]
    fn ended_event_advances_to_next_track() {
        let h = harness(3);
        h.media.emit(MediaEvent::Ended);
        assert_eq!(h.engine.state().current_track, 1);
        assert_eq!(*h.media.source.borrow(), "music/1.mp3");
        assert_eq!(h.spawner.stalled.get(), 0);
    }

    #[test]
    fn ended_event_restarts_when_looping() {
        let h = harness(3);
        h.engine.load_track(2);
        h.engine.toggle_loop();
        let reloads = h.media.reloads.get();
        h.media.time.set(42.0);
        h.media.emit(MediaEvent::Ended);
        assert_eq!(h.engine.state().current_track, 2);
        assert_eq!(h.media.time.get(), 0.0);
        assert_eq!(h.media.reloads.get(), reloads);
        assert_eq!(h.spawner.stalled.get(), 0);
    }

    #[test]
    fn error_event_reloads_current_track() {
        let h = harness(3);
        h.engine.load_track(1);
        let reloads = h.media.reloads.get();
        h.media.emit(MediaEvent::Error("decode".to_string()));
        assert_eq!(h.media.reloads.get(), reloads + 1);
        assert_eq!(h.engine.state().current_track, 1);
        assert!(!h.engine.view().error_indicator);
        assert_eq!(h.spawner.stalled.get(), 0);
    }

    #[test]
    fn error_indicator_shows_until_reverted() {
        let h = harness(2);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        h.engine.claim_surface(Rc::new(move |view: PlayerView| {
            sink.borrow_mut().push(view.error_indicator);
        }));

        run(h.engine.clone().recover_from_error("network".to_string()));
        assert!(!h.engine.view().error_indicator);
        let seen = seen.borrow();
        assert_eq!(seen.first(), Some(&true));
        assert_eq!(seen.last(), Some(&false));
    }

    #[test]
    fn recovery_stops_after_repeated_failures() {
        let h = harness(2);
        let reloads = h.media.reloads.get();
        for _ in 0..5 {
            run(h.engine.clone().recover_from_error("decode".to_string()));
        }
        assert_eq!(h.media.reloads.get(), reloads + 3);
    }

    #[test]
    fn successful_start_resets_recovery_budget() {
        let h = harness(2);
        let reloads = h.media.reloads.get();
        for _ in 0..3 {
            run(h.engine.clone().recover_from_error("decode".to_string()));
        }
        run(h.engine.clone().toggle_play());
        run(h.engine.clone().recover_from_error("decode".to_string()));
        assert_eq!(h.media.reloads.get(), reloads + 4);
    }

    #[test]
    fn failed_fetch_uses_fallback_and_loads_first() {
        let h = harness_with(Rc::new(NullStore), StaticTrackSource::failing());
        let fallback = fallback_tracks();
        assert_eq!(h.engine.view().tracks.len(), fallback.len());
        assert_eq!(*h.media.source.borrow(), fallback[0].src);
        assert_eq!(h.engine.view().title, fallback[0].title);
    }

    #[test]
    fn malformed_saved_state_starts_from_defaults() {
        let store = Rc::new(SqliteStore::in_memory("musicPlayerState").unwrap());
        store.save_raw("{\"currentTrack\": 2,").unwrap();
        let h = harness_with(store, StaticTrackSource::with(tracks(3)));
        let state = h.engine.state();
        assert_eq!(state.current_track, 0);
        assert_eq!(state.volume, 0.7);
        assert!(!state.is_looping);
        assert_eq!(state.surface, SurfaceMode::Normal);
        assert!(!state.playlist_visible);
    }

    #[test]
    fn state_survives_a_new_session() {
        let store: Rc<dyn SnapshotStore> =
            Rc::new(SqliteStore::in_memory("musicPlayerState").unwrap());
        let first = harness_with(store.clone(), StaticTrackSource::with(tracks(4)));
        first.engine.load_track(3);
        first.engine.adjust_volume(-0.2);
        first.engine.toggle_loop();
        first.engine.toggle_minimize();
        first.engine.toggle_playlist();
        run(first.engine.clone().toggle_play());
        let volume = first.engine.state().volume;
        first.engine.teardown();

        let second = harness_with(store, StaticTrackSource::with(tracks(4)));
        let state = second.engine.state();
        assert_eq!(state.current_track, 3);
        assert!((state.volume - volume).abs() < 1e-12);
        assert!((state.volume - 0.5).abs() < 1e-9);
        assert!(state.is_looping);
        assert_eq!(state.surface, SurfaceMode::Minimized);
        assert!(state.playlist_visible);
        assert!(!state.is_playing);
        assert_eq!(second.media.volume.get(), state.volume);
        assert_eq!(*second.media.source.borrow(), "music/3.mp3");
    }

    #[test]
    fn restored_index_out_of_range_resets() {
        let store = Rc::new(SqliteStore::in_memory("musicPlayerState").unwrap());
        store.save_raw(r#"{"currentTrack": 9}"#).unwrap();
        let h = harness_with(store, StaticTrackSource::with(tracks(3)));
        assert_eq!(h.engine.state().current_track, 0);
    }

    #[test]
    fn minimized_surface_restores_on_click() {
        let h = harness(1);
        h.engine.toggle_minimize();
        assert_eq!(h.engine.state().surface, SurfaceMode::Minimized);
        h.engine.restore_surface();
        assert_eq!(h.engine.state().surface, SurfaceMode::Normal);
        h.engine.restore_surface();
        assert_eq!(h.engine.state().surface, SurfaceMode::Normal);
    }

    #[test]
    fn time_updates_wait_for_metadata() {
        let h = harness(1);
        h.media.time.set(30.0);
        h.media.emit(MediaEvent::TimeUpdate);
        assert_eq!(h.engine.view().percent, None);

        h.media.duration.set(120.0);
        h.media.emit(MediaEvent::MetadataLoaded);
        assert_eq!(h.engine.view().duration, "2:00");
        h.media.emit(MediaEvent::TimeUpdate);
        let view = h.engine.view();
        assert_eq!(view.percent, Some(25.0));
        assert_eq!(view.elapsed, "0:30");
    }

    #[test]
    fn seek_needs_known_duration() {
        let h = harness(1);
        h.media.time.set(5.0);
        h.engine.seek_fraction(0.5);
        assert_eq!(h.media.time.get(), 5.0);

        h.media.duration.set(200.0);
        h.engine.seek_fraction(0.25);
        assert_eq!(h.media.time.get(), 50.0);
        h.engine.seek_fraction(3.0);
        assert_eq!(h.media.time.get(), 200.0);
    }

    #[test]
    fn visible_page_resyncs_play_flag() {
        let h = harness(1);
        h.media.paused.set(false);
        h.engine.on_visibility_change(true);
        assert!(!h.engine.state().is_playing);
        h.engine.on_visibility_change(false);
        assert!(h.engine.state().is_playing);
    }

    #[test]
    fn newer_surface_supersedes_older() {
        let h = harness(1);
        let first_calls = Rc::new(Cell::new(0));
        let counter = first_calls.clone();
        let first = h
            .engine
            .claim_surface(Rc::new(move |_| counter.set(counter.get() + 1)));
        let second = h.engine.claim_surface(Rc::new(|_| {}));

        assert_eq!(first_calls.get(), 1);
        assert!(!h.engine.owns_surface(first));
        assert!(h.engine.owns_surface(second));

        h.engine.release_surface(first);
        assert!(h.engine.owns_surface(second));
        h.engine.toggle_loop();
        assert_eq!(first_calls.get(), 1);

        h.engine.release_surface(second);
        assert!(!h.engine.owns_surface(second));
    }

    #[test]
    fn teardown_unbinds_and_stops() {
        let h = harness(2);
        run(h.engine.clone().toggle_play());
        h.engine.teardown();
        assert!(h.media.paused.get());
        assert!(!h.media.has_handler());
        assert!(!h.engine.is_live());
        assert!(!h.engine.state().is_playing);
    }
}
