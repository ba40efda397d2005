//! Portfolio pages. Each one mounts its own player, which attaches to the
//! running session when there is one.

use crate::components::FloatingPlayer;
use dioxus::prelude::*;

#[component]
pub fn Home() -> Element {
    rsx! {
        section { class: "page",
            h1 { "Hi, welcome in" }
            p {
                "Pick a track from the player in the corner. It keeps going while you "
                "move between pages."
            }
        }
        FloatingPlayer {}
    }
}

#[component]
pub fn About() -> Element {
    rsx! {
        section { class: "page",
            h1 { "About" }
            p { "Software developer working mostly with Rust and web technologies." }
        }
        FloatingPlayer {}
    }
}

#[component]
pub fn Projects() -> Element {
    rsx! {
        section { class: "page",
            h1 { "Projects" }
            ul { class: "project-list",
                li { "Floating music player" }
                li { "This site" }
            }
        }
        FloatingPlayer {}
    }
}
