use crate::components::{view_label, AppView, Icon};
use dioxus::prelude::*;

const NAV_ITEMS: [AppView; 3] = [AppView::Home {}, AppView::About {}, AppView::Projects {}];

/// Site chrome shared by every page.
#[component]
pub fn PortfolioShell() -> Element {
    rsx! {
        div { class: "site",
            header { class: "site-header",
                div { class: "brand",
                    Icon { name: "music".to_string(), class: "brand-icon".to_string() }
                    span { "Portfolio" }
                }
                nav { class: "site-nav",
                    for item in NAV_ITEMS {
                        Link {
                            key: "{item}",
                            class: "nav-link".to_string(),
                            active_class: "active".to_string(),
                            to: item.clone(),
                            {view_label(&item)}
                        }
                    }
                }
            }
            main { class: "page-shell", Outlet::<AppView> {} }
        }
    }
}
