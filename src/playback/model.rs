use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::rc::Rc;

/// One playable item from the track list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    pub src: String,
}

impl Track {
    pub fn new(title: &str, artist: &str, src: &str) -> Self {
        Self {
            title: title.to_string(),
            artist: artist.to_string(),
            src: src.to_string(),
        }
    }

    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            "Unknown Title"
        } else {
            &self.title
        }
    }

    pub fn display_artist(&self) -> &str {
        if self.artist.trim().is_empty() {
            "Unknown Artist"
        } else {
            &self.artist
        }
    }
}

/// Shape of the `music.json` document.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackDocument {
    pub tracks: Vec<Track>,
}

/// Built-in list used whenever the track-list document cannot be loaded.
pub fn fallback_tracks() -> Vec<Track> {
    vec![
        Track::new(
            "Blue Archive Theme 242",
            "Blue Archive",
            "music/Blue Archive _ Theme 242 [10 Minutes Loop] [U8PWvarbgok].mp3",
        ),
        Track::new(
            "Blue Archive OST 135",
            "Blue Archive",
            "music/blue archive ost 135.mp3",
        ),
        Track::new(
            "Chatter Between Roots",
            "Genshin Impact",
            "music/Chatter Between Roots.mp3",
        ),
        Track::new(
            "Flows of Jade-Like Water",
            "Genshin Impact",
            "music/Flows of Jade-Like Water.mp3",
        ),
        Track::new(
            "Nightcore Gwai san neung",
            "Nightcore",
            "music/Nightcore Gwai san neung.mp3",
        ),
        Track::new(
            "Tsukihime Main Theme",
            "Tsukihime",
            "music/Tsukihime main theme.mp3",
        ),
        Track::new(
            "Guiding Ahead Lobby Theme",
            "Arknights",
            "music/アークナイツ BGM - Guiding Ahead Lobby Theme  Arknights明日方舟 吾导先路 OST.mp3",
        ),
        Track::new(
            "Invitation to Wine Lobby Theme",
            "Arknights",
            "music/アークナイツ BGM - Invitation to Wine Lobby Theme  Arknights明日方舟 将进酒 OST.mp3",
        ),
        Track::new(
            "安里屋ユンタ (沖ツラバージョン) M26",
            "Unknown",
            "music/安里屋ユンタ (沖ツラバージョン) M26.mp3",
        ),
        Track::new(
            "Frost Pillar - Another Side -",
            "Genshin Impact",
            "music/Frost Pillar - Another Side -.mp3",
        ),
        Track::new(
            "Frost Pillar (Scenario Version)",
            "Genshin Impact",
            "music/Frost Pillar (Scenario Version).mp3",
        ),
        Track::new("Frost Pillar", "Genshin Impact", "music/Frost Pillar.mp3"),
        Track::new(
            "Sān-Z Studio Theme Zenless Zone Zero 1.3",
            "Zenless Zone Zero",
            "music/Sān-Z Studio Theme  Zenless Zone Zero 1.3.mp3",
        ),
        Track::new(
            "Zenless Zone Zero Lumina Square Night OST",
            "Zenless Zone Zero",
            "music/Zenless Zone Zero Lumina Square Night OST  ZZZ.mp3",
        ),
    ]
}

/// Visual state of the control surface. Each mode owns its own bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfaceMode {
    #[default]
    Normal,
    Minimized,
}

/// Mutable widget state. Only the engine writes it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub current_track: usize,
    pub volume: f64,
    pub is_playing: bool,
    pub is_looping: bool,
    pub surface: SurfaceMode,
    pub playlist_visible: bool,
}

impl PlayerState {
    pub fn with_volume(volume: f64) -> Self {
        Self {
            current_track: 0,
            volume: volume.clamp(0.0, 1.0),
            is_playing: false,
            is_looping: false,
            surface: SurfaceMode::Normal,
            playlist_visible: false,
        }
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            current_track: self.current_track,
            volume: self.volume,
            is_looping: self.is_looping,
            is_minimized: self.surface == SurfaceMode::Minimized,
            playlist_visible: self.playlist_visible,
        }
    }

    /// Adopt persisted fields. `is_playing` is never restored.
    pub fn apply_snapshot(&mut self, snapshot: &PlayerSnapshot) {
        self.current_track = snapshot.current_track;
        self.volume = snapshot.volume.clamp(0.0, 1.0);
        self.is_looping = snapshot.is_looping;
        self.surface = if snapshot.is_minimized {
            SurfaceMode::Minimized
        } else {
            SurfaceMode::Normal
        };
        self.playlist_visible = snapshot.playlist_visible;
    }
}

/// Persisted subset of [`PlayerState`], stored as a single JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub current_track: usize,
    pub volume: f64,
    pub is_looping: bool,
    pub is_minimized: bool,
    pub playlist_visible: bool,
}

impl PlayerSnapshot {
    pub fn defaults(volume: f64) -> Self {
        PlayerState::with_volume(volume).snapshot()
    }

    /// Merge a stored document over `defaults` field by field. Fields that
    /// are missing or carry the wrong type keep their default.
    pub fn merge_over(defaults: &PlayerSnapshot, stored: &Value) -> Self {
        let mut merged = defaults.clone();
        let Some(object) = stored.as_object() else {
            return merged;
        };

        if let Some(index) = object.get("currentTrack").and_then(Value::as_u64) {
            if let Ok(index) = usize::try_from(index) {
                merged.current_track = index;
            }
        }
        if let Some(volume) = object.get("volume").and_then(Value::as_f64) {
            if volume.is_finite() && (0.0..=1.0).contains(&volume) {
                merged.volume = volume;
            }
        }
        if let Some(flag) = object.get("isLooping").and_then(Value::as_bool) {
            merged.is_looping = flag;
        }
        if let Some(flag) = object.get("isMinimized").and_then(Value::as_bool) {
            merged.is_minimized = flag;
        }
        if let Some(flag) = object.get("playlistVisible").and_then(Value::as_bool) {
            merged.playlist_visible = flag;
        }

        merged
    }
}

/// Everything the control surface needs to render one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerView {
    pub state: PlayerState,
    pub tracks: Rc<Vec<Track>>,
    pub title: String,
    pub artist: String,
    pub elapsed: String,
    pub duration: String,
    pub percent: Option<f64>,
    pub volume_label: String,
    pub error_indicator: bool,
    pub ready: bool,
}

/// `m:ss` with zero-padded seconds. Non-finite input renders as `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "0:00".to_string();
    }
    let whole = seconds.max(0.0).floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}

/// Playback progress in percent, or `None` until the duration is known.
pub fn progress_percent(current_time: f64, duration: f64) -> Option<f64> {
    if !duration.is_finite() || duration <= 0.0 {
        return None;
    }
    Some((current_time / duration * 100.0).clamp(0.0, 100.0))
}

pub fn volume_label(volume: f64) -> String {
    format!("{}%", (volume * 100.0).round() as i64)
}
