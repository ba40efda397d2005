//! Floating audio player: state, audio handle, track list and session.

mod config;
mod engine;
mod error;
mod media;
mod model;
mod session;
mod timing;
mod tracklist;

pub use config::PlayerConfig;
pub use engine::{PlayerEngine, SurfaceToken};
pub use error::PlayerError;
pub use model::{PlayerSnapshot, PlayerView, SurfaceMode};
pub use session::{attach, create_platform_engine, Attach};
pub use timing::spawn_detached;
pub use tracklist::HttpTrackSource;
