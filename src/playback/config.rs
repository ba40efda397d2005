/// Tunables for the floating player. Provided to the component tree as context.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    /// Track-list document, relative to the site root.
    pub tracklist_url: String,
    /// Key the player snapshot is stored under.
    pub storage_key: String,
    pub default_volume: f64,
    pub volume_step: f64,
    /// Backoff before the single retry of a refused start.
    pub play_retry_delay_ms: u32,
    /// Wait before reloading a track that raised a media error.
    pub recovery_delay_ms: u32,
    /// How long the error glyph replaces the play glyph.
    pub error_indicator_ms: u32,
    /// Consecutive automatic reloads allowed before giving up on a track.
    pub max_recovery_attempts: u32,
    /// Origin used to resolve `tracklist_url` outside the browser.
    #[cfg_attr(target_arch = "wasm32", allow(dead_code))]
    pub native_origin: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            tracklist_url: "music/music.json".to_string(),
            storage_key: "musicPlayerState".to_string(),
            default_volume: 0.7,
            volume_step: 0.1,
            play_retry_delay_ms: 1000,
            recovery_delay_ms: 2000,
            error_indicator_ms: 3000,
            max_recovery_attempts: 3,
            native_origin: "http://127.0.0.1:8080".to_string(),
        }
    }
}
