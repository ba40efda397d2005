//! Site routes. Every page hosts the floating player.

use crate::components::views::{About, Home, Projects};
use crate::components::PortfolioShell;
use dioxus::prelude::*;

#[derive(Routable, Clone, PartialEq, Debug)]
#[rustfmt::skip]
pub enum AppView {
    #[layout(PortfolioShell)]
        #[route("/")]
        Home {},
        #[route("/about")]
        About {},
        #[route("/projects")]
        Projects {},
}

pub fn view_label(view: &AppView) -> &'static str {
    match view {
        AppView::Home {} => "Home",
        AppView::About {} => "About",
        AppView::Projects {} => "Projects",
    }
}
