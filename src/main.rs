use dioxus::logger::tracing::Level;
use dioxus::prelude::*;

mod components;
mod db;
mod playback;

use components::AppView;
use playback::PlayerConfig;

const APP_CSS: Asset = asset!("/assets/styling/app.css");

fn main() {
    if let Err(err) = dioxus::logger::init(Level::INFO) {
        eprintln!("Failed to initialize logger: {err}");
    }
    dioxus::launch(App);
}

#[component]
fn App() -> Element {
    use_context_provider(PlayerConfig::default);

    rsx! {
        document::Meta { name: "theme-color", content: "#333333" }
        document::Stylesheet { href: APP_CSS }

        Router::<AppView> {}
    }
}
