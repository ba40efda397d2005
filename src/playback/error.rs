use crate::db::DbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("audio element not available")]
    MissingMedia,
    #[error("player element `{0}` not found")]
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    MissingElement(&'static str),
    #[error("failed to load track list: {0}")]
    TrackList(String),
    #[error("track list is empty")]
    EmptyTrackList,
    #[error("playback was rejected: {0}")]
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    PlaybackRejected(String),
    #[error("media error: {0}")]
    MediaFailure(String),
    #[error(transparent)]
    Storage(#[from] DbError),
}
