//! Session registry: one live player per browsing tab.
//!
//! A page that mounts the player asks the registry for the session. Ongoing
//! playback is adopted across route changes; an idle session left behind by
//! another page is torn down and replaced.

use super::engine::PlayerEngine;
use super::media::MediaHandle;
use super::timing::{PlatformSpawner, PlatformTimer};
use super::PlayerConfig;
use crate::db::open_store;
use dioxus::logger::tracing::{debug, info};
use std::cell::RefCell;
use std::rc::Rc;

#[cfg(target_arch = "wasm32")]
use super::media::WebMedia;
#[cfg(target_arch = "wasm32")]
use dioxus::logger::tracing::error;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{closure::Closure, JsCast};

thread_local! {
    static SESSION: RefCell<Option<SessionEntry>> = const { RefCell::new(None) };
}

struct SessionEntry {
    page: String,
    engine: Rc<PlayerEngine>,
    #[cfg(target_arch = "wasm32")]
    _hooks: Option<PageHooks>,
}

/// Outcome of [`attach`].
pub enum Attach {
    /// An existing session was reused; it is already initialized.
    Adopted(Rc<PlayerEngine>),
    /// A fresh engine was registered and still needs `initialize`.
    Created(Rc<PlayerEngine>),
}

impl Attach {
    pub fn engine(&self) -> &Rc<PlayerEngine> {
        match self {
            Attach::Adopted(engine) | Attach::Created(engine) => engine,
        }
    }
}

/// Find or create the player session for `page`.
pub fn attach(page: &str, create: impl FnOnce() -> Rc<PlayerEngine>) -> Attach {
    if let Some(engine) = adopt(page) {
        return Attach::Adopted(engine);
    }

    if let Some(stale) = SESSION.with(|slot| slot.borrow_mut().take()) {
        info!("Discarding idle player session from {}", stale.page);
        stale.engine.teardown();
    }

    let engine = create();
    info!("Created player session on {page}");
    let entry = SessionEntry {
        page: page.to_string(),
        #[cfg(target_arch = "wasm32")]
        _hooks: PageHooks::install(&engine),
        engine: engine.clone(),
    };
    SESSION.with(|slot| *slot.borrow_mut() = Some(entry));
    Attach::Created(engine)
}

fn adopt(page: &str) -> Option<Rc<PlayerEngine>> {
    SESSION.with(|slot| {
        let mut slot = slot.borrow_mut();
        let entry = slot.as_mut()?;
        if entry.engine.is_live() {
            if entry.page != page {
                info!("Adopting playing session from {} on {page}", entry.page);
                entry.page = page.to_string();
            }
            return Some(entry.engine.clone());
        }
        if entry.page == page {
            debug!(
                "Player already attached on {page} (initialized: {})",
                entry.engine.is_initialized()
            );
            return Some(entry.engine.clone());
        }
        None
    })
}

/// Engine wired to the platform audio handle, store, timer and task spawner.
pub fn create_platform_engine(config: &PlayerConfig) -> Rc<PlayerEngine> {
    let engine = PlayerEngine::new(
        config.clone(),
        platform_media(),
        open_store(&config.storage_key),
        Rc::new(PlatformTimer),
        Rc::new(PlatformSpawner),
    );
    engine.bind_media_events();
    engine
}

#[cfg(target_arch = "wasm32")]
fn platform_media() -> Option<Rc<dyn MediaHandle>> {
    match WebMedia::create() {
        Ok(media) => Some(Rc::new(media)),
        Err(err) => {
            error!("Audio playback unavailable: {err}");
            None
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn platform_media() -> Option<Rc<dyn MediaHandle>> {
    debug!("No audio backend on this platform, controls run without sound");
    None
}

/// Document level listeners owned by a session. Dropping removes them.
#[cfg(target_arch = "wasm32")]
struct PageHooks {
    window: web_sys::Window,
    document: web_sys::Document,
    visibility: Closure<dyn FnMut()>,
    unload: Closure<dyn FnMut()>,
}

#[cfg(target_arch = "wasm32")]
impl PageHooks {
    fn install(engine: &Rc<PlayerEngine>) -> Option<Self> {
        let window = web_sys::window()?;
        let document = window.document()?;

        let weak = Rc::downgrade(engine);
        let doc = document.clone();
        let visibility = Closure::wrap(Box::new(move || {
            if let Some(engine) = weak.upgrade() {
                engine.on_visibility_change(doc.hidden());
            }
        }) as Box<dyn FnMut()>);

        let weak = Rc::downgrade(engine);
        let unload = Closure::wrap(Box::new(move || {
            if let Some(engine) = weak.upgrade() {
                engine.persist();
            }
        }) as Box<dyn FnMut()>);

        let _ = document.add_event_listener_with_callback(
            "visibilitychange",
            visibility.as_ref().unchecked_ref(),
        );
        let _ = window
            .add_event_listener_with_callback("beforeunload", unload.as_ref().unchecked_ref());

        Some(Self {
            window,
            document,
            visibility,
            unload,
        })
    }
}

#[cfg(target_arch = "wasm32")]
impl Drop for PageHooks {
    fn drop(&mut self) {
        let _ = self.document.remove_event_listener_with_callback(
            "visibilitychange",
            self.visibility.as_ref().unchecked_ref(),
        );
        let _ = self
            .window
            .remove_event_listener_with_callback("beforeunload", self.unload.as_ref().unchecked_ref());
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::db::NullStore;
    use crate::playback::media::testing::FakeMedia;
    use crate::playback::timing::testing::{InlineSpawner, RecordingTimer};
    use std::cell::Cell;

    fn clear_registry() {
        SESSION.with(|slot| slot.borrow_mut().take());
    }

    fn engine_on(media: &Rc<FakeMedia>) -> Rc<PlayerEngine> {
        let engine = PlayerEngine::new(
            PlayerConfig::default(),
            Some(media.clone() as Rc<dyn MediaHandle>),
            Rc::new(NullStore),
            Rc::new(RecordingTimer::default()),
            Rc::new(InlineSpawner::default()),
        );
        engine.bind_media_events();
        engine
    }

    #[test]
    fn empty_registry_creates() {
        clear_registry();
        let media = Rc::new(FakeMedia::default());
        let attached = attach("/", || engine_on(&media));
        assert!(matches!(attached, Attach::Created(_)));
    }

    #[test]
    fn same_page_reuses_session() {
        clear_registry();
        let media = Rc::new(FakeMedia::default());
        let created = Cell::new(0);
        let factory = || {
            created.set(created.get() + 1);
            engine_on(&media)
        };
        let first = attach("/", factory);
        let second = attach("/", || {
            created.set(created.get() + 1);
            engine_on(&media)
        });
        assert_eq!(created.get(), 1);
        assert!(matches!(second, Attach::Adopted(_)));
        assert!(Rc::ptr_eq(first.engine(), second.engine()));
    }

    #[test]
    fn playing_session_follows_navigation() {
        clear_registry();
        let media = Rc::new(FakeMedia::default());
        let first = attach("/", || engine_on(&media));
        media.paused.set(false);

        let other = Rc::new(FakeMedia::default());
        let second = attach("/about", || engine_on(&other));
        assert!(matches!(second, Attach::Adopted(_)));
        assert!(Rc::ptr_eq(first.engine(), second.engine()));
        assert!(media.has_handler());
    }

    #[test]
    fn idle_session_is_discarded_on_another_page() {
        clear_registry();
        let media = Rc::new(FakeMedia::default());
        let first = attach("/", || engine_on(&media));

        let other = Rc::new(FakeMedia::default());
        let second = attach("/projects", || engine_on(&other));
        assert!(matches!(second, Attach::Created(_)));
        assert!(!Rc::ptr_eq(first.engine(), second.engine()));
        assert!(!media.has_handler());
        assert!(other.has_handler());
    }
}
