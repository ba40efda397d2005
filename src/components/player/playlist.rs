use super::{PlayerHandle, PlayerViewSignal};
use crate::playback::spawn_detached;
use dioxus::prelude::*;

/// Track list panel. Items only exist, and only take clicks, while the
/// panel is shown.
#[component]
pub(super) fn PlaylistPanel() -> Element {
    let engine = use_context::<PlayerHandle>().0;
    let view = use_context::<PlayerViewSignal>().0;
    let frame = view();
    let visible = frame.state.playlist_visible;
    let current = frame.state.current_track;

    rsx! {
        div {
            id: "playlist-section",
            class: if visible { "playlist-section show" } else { "playlist-section" },
            div { class: "playlist-header", "Playlist" }
            div { id: "playlist-tracks", class: "playlist-tracks",
                if visible {
                    if frame.tracks.is_empty() {
                        div { class: "playlist-item", "Loading tracks..." }
                    }
                    for (index, track) in frame.tracks.iter().enumerate() {
                        div {
                            key: "{index}",
                            class: if index == current { "playlist-item active" } else { "playlist-item" },
                            "data-index": "{index}",
                            onclick: {
                                let engine = engine.clone();
                                move |_| spawn_detached(engine.clone().play_track(index))
                            },
                            div { class: "playlist-track-info",
                                div { class: "playlist-track-title", {track.display_title().to_string()} }
                                div { class: "playlist-track-artist", {track.display_artist().to_string()} }
                            }
                            div { class: "playlist-play-icon",
                                if index == current {
                                    "♪"
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
