use super::{PlayerHandle, PlayerViewSignal};
use crate::components::Icon;
use crate::playback::spawn_detached;
use dioxus::prelude::*;

/// Previous / play-pause / next.
#[component]
pub(super) fn TransportControls() -> Element {
    let engine = use_context::<PlayerHandle>().0;
    let view = use_context::<PlayerViewSignal>().0;
    let frame = view();

    let on_prev = {
        let engine = engine.clone();
        move |_| spawn_detached(engine.clone().prev_track())
    };
    let on_toggle = {
        let engine = engine.clone();
        move |_| spawn_detached(engine.clone().toggle_play())
    };
    let on_next = {
        let engine = engine.clone();
        move |_| spawn_detached(engine.clone().next_track())
    };

    let play_glyph = if frame.error_indicator {
        "alert"
    } else if frame.state.is_playing {
        "pause"
    } else {
        "play"
    };

    rsx! {
        div { class: "player-controls",
            button {
                id: "prev-btn",
                class: "control-btn",
                r#type: "button",
                title: "Previous",
                disabled: !frame.ready,
                onclick: on_prev,
                Icon { name: "prev".to_string(), class: "btn-icon".to_string() }
            }
            button {
                id: "play-btn",
                class: if frame.error_indicator { "control-btn play-btn error" } else { "control-btn play-btn" },
                r#type: "button",
                title: if frame.state.is_playing { "Pause" } else { "Play" },
                disabled: !frame.ready,
                onclick: on_toggle,
                Icon { name: play_glyph.to_string(), class: "btn-icon".to_string() }
            }
            button {
                id: "next-btn",
                class: "control-btn",
                r#type: "button",
                title: "Next",
                disabled: !frame.ready,
                onclick: on_next,
                Icon { name: "next".to_string(), class: "btn-icon".to_string() }
            }
        }
    }
}

/// Loop, playlist and minimize toggles.
#[component]
pub(super) fn PlayerActions() -> Element {
    let engine = use_context::<PlayerHandle>().0;
    let view = use_context::<PlayerViewSignal>().0;
    let state = view().state;

    let on_loop = {
        let engine = engine.clone();
        move |_| engine.toggle_loop()
    };
    let on_playlist = {
        let engine = engine.clone();
        move |_| engine.toggle_playlist()
    };
    let on_minimize = {
        let engine = engine.clone();
        move |_| engine.toggle_minimize()
    };

    rsx! {
        div { class: "player-actions",
            button {
                id: "loop-btn",
                class: if state.is_looping { "action-btn active" } else { "action-btn" },
                r#type: "button",
                title: "Loop current track",
                onclick: on_loop,
                Icon { name: "repeat".to_string(), class: "btn-icon".to_string() }
            }
            button {
                id: "playlist-toggle",
                class: if state.playlist_visible { "action-btn active" } else { "action-btn" },
                r#type: "button",
                title: "Playlist",
                onclick: on_playlist,
                Icon { name: "list".to_string(), class: "btn-icon".to_string() }
            }
            button {
                id: "minimize-btn",
                class: "action-btn",
                r#type: "button",
                title: "Minimize",
                onclick: on_minimize,
                Icon { name: "minimize".to_string(), class: "btn-icon".to_string() }
            }
        }
    }
}

/// Elapsed / total time and a seek bar once the duration is known.
#[component]
pub(super) fn ProgressSection() -> Element {
    let engine = use_context::<PlayerHandle>().0;
    let view = use_context::<PlayerViewSignal>().0;
    let frame = view();
    let percent = frame.percent.unwrap_or(0.0);

    let on_seek_input = {
        let engine = engine.clone();
        move |e: Event<FormData>| {
            if let Ok(percent) = e.value().parse::<f64>() {
                engine.seek_fraction(percent.clamp(0.0, 100.0) / 100.0);
            }
        }
    };

    rsx! {
        div { class: "progress-section",
            div { class: "progress-bar",
                div { class: "progress-fill", style: "width: {percent}%" }
                input {
                    r#type: "range",
                    class: "progress-input",
                    min: "0",
                    max: "100",
                    step: "0.1",
                    value: "{percent}",
                    disabled: frame.percent.is_none(),
                    oninput: on_seek_input,
                }
            }
            div { class: "time-display",
                span { id: "current-time", "{frame.elapsed}" }
                span { class: "time-separator", "/" }
                span { id: "duration", "{frame.duration}" }
            }
        }
    }
}

#[component]
pub(super) fn VolumeSection() -> Element {
    let engine = use_context::<PlayerHandle>().0;
    let view = use_context::<PlayerViewSignal>().0;
    let step = engine.config().volume_step;
    let label = view().volume_label;

    let on_down = {
        let engine = engine.clone();
        move |_| engine.adjust_volume(-step)
    };
    let on_up = {
        let engine = engine.clone();
        move |_| engine.adjust_volume(step)
    };

    rsx! {
        div { class: "volume-section",
            span { class: "volume-icon",
                Icon { name: "volume-up".to_string(), class: "btn-icon".to_string() }
            }
            button {
                id: "volume-down",
                class: "volume-btn",
                r#type: "button",
                title: "Volume down",
                onclick: on_down,
                "-"
            }
            span { id: "volume-display", class: "volume-display", "{label}" }
            button {
                id: "volume-up",
                class: "volume-btn",
                r#type: "button",
                title: "Volume up",
                onclick: on_up,
                "+"
            }
        }
    }
}
