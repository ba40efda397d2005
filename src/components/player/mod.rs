//! The floating player control surface.

use crate::components::{AppView, Icon};
use crate::playback::{
    attach, create_platform_engine, spawn_detached, Attach, HttpTrackSource, PlayerConfig,
    PlayerEngine, PlayerView, SurfaceMode,
};
use dioxus::core::{Runtime, RuntimeGuard};
use dioxus::prelude::*;
use std::rc::Rc;

mod controls;
mod playlist;

use controls::{PlayerActions, ProgressSection, TransportControls, VolumeSection};
use playlist::PlaylistPanel;

/// Session engine shared with the player's child components.
#[derive(Clone)]
pub struct PlayerHandle(pub Rc<PlayerEngine>);

impl PartialEq for PlayerHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Latest frame pushed by the engine.
#[derive(Clone, Copy)]
pub struct PlayerViewSignal(pub Signal<PlayerView>);

/// Attach to the player session for the current page and render its
/// controls. Only the most recently mounted player renders anything.
#[component]
pub fn FloatingPlayer() -> Element {
    let config = use_context::<PlayerConfig>();
    let page = use_route::<AppView>().to_string();

    let engine = use_hook(move || {
        let attached = attach(&page, || create_platform_engine(&config));
        if let Attach::Created(engine) = &attached {
            let source = Rc::new(HttpTrackSource::new(&config));
            spawn_detached(engine.clone().initialize(source));
        }
        attached.engine().clone()
    });

    let view = use_signal({
        let engine = engine.clone();
        move || engine.view()
    });

    let token = use_hook({
        let engine = engine.clone();
        move || {
            let runtime = Runtime::current();
            engine.claim_surface(Rc::new(move |frame: PlayerView| {
                let _guard = RuntimeGuard::new(runtime.clone());
                let mut target = view;
                if let Ok(mut current) = target.try_write() {
                    *current = frame;
                };
            }))
        }
    });

    use_drop({
        let engine = engine.clone();
        move || engine.release_surface(token)
    });

    use_context_provider({
        let engine = engine.clone();
        move || PlayerHandle(engine)
    });
    use_context_provider(|| PlayerViewSignal(view));

    if !engine.owns_surface(token) {
        return rsx! {};
    }

    let frame = view();
    match frame.state.surface {
        SurfaceMode::Minimized => {
            let on_restore = {
                let engine = engine.clone();
                move |_| engine.restore_surface()
            };
            rsx! {
                div {
                    id: "floating-music-player",
                    class: "music-player minimized",
                    title: "Show player",
                    onclick: on_restore,
                    Icon { name: "music".to_string(), class: "minimized-icon".to_string() }
                }
            }
        }
        SurfaceMode::Normal => rsx! {
            div { id: "floating-music-player", class: "music-player",
                div { class: "player-header",
                    div { class: "now-playing",
                        div { class: "track-info",
                            div { class: "track-title", "{frame.title}" }
                            div { class: "track-artist", "{frame.artist}" }
                        }
                        TransportControls {}
                    }
                    PlayerActions {}
                }
                ProgressSection {}
                VolumeSection {}
                PlaylistPanel {}
            }
        },
    }
}
