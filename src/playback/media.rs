//! The audio handle seam. The browser build drives a detached
//! `HtmlAudioElement`; tests drive a scripted fake.

use super::PlayerError;
use futures_util::future::LocalBoxFuture;
use std::rc::Rc;

#[cfg(target_arch = "wasm32")]
use futures_util::future::{self, FutureExt};
#[cfg(target_arch = "wasm32")]
use std::cell::RefCell;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
#[cfg(target_arch = "wasm32")]
use wasm_bindgen_futures::JsFuture;
#[cfg(target_arch = "wasm32")]
use web_sys::{AddEventListenerOptions, HtmlAudioElement};

/// Lifecycle notifications raised by the audio handle.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    TimeUpdate,
    MetadataLoaded,
    Ended,
    Error(String),
}

pub type MediaEventHandler = Rc<dyn Fn(MediaEvent)>;

pub trait MediaHandle {
    fn set_source(&self, src: &str);
    /// Force the element to reload its current source.
    fn reload(&self);
    /// Request playback. Resolves once the element actually started or refused.
    fn play(&self) -> LocalBoxFuture<'static, Result<(), PlayerError>>;
    fn pause(&self) -> Result<(), PlayerError>;
    fn is_paused(&self) -> bool;
    fn set_volume(&self, volume: f64);
    fn current_time(&self) -> f64;
    fn set_current_time(&self, seconds: f64);
    /// `NaN` until metadata is available.
    fn duration(&self) -> f64;
    /// Resolves when the element starts loading after the next `reload`.
    /// Must be requested before calling `reload`.
    fn load_started(&self) -> LocalBoxFuture<'static, ()>;
    /// Replace the event handler. Previous bindings are removed first.
    fn set_event_handler(&self, handler: MediaEventHandler);
    fn clear_event_handler(&self);
}

#[cfg(target_arch = "wasm32")]
const MEDIA_EVENTS: [&str; 4] = ["timeupdate", "loadedmetadata", "ended", "error"];

#[cfg(target_arch = "wasm32")]
pub struct WebMedia {
    audio: HtmlAudioElement,
    listeners: RefCell<Vec<(&'static str, Closure<dyn FnMut()>)>>,
}

#[cfg(target_arch = "wasm32")]
impl WebMedia {
    /// Detached audio element that does not buffer until played.
    pub fn create() -> Result<Self, PlayerError> {
        let audio = HtmlAudioElement::new().map_err(|_| PlayerError::MissingElement("audio"))?;
        audio.set_preload("none");
        Ok(Self {
            audio,
            listeners: RefCell::new(Vec::new()),
        })
    }
}

#[cfg(target_arch = "wasm32")]
fn describe_js_error(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    js_sys::Reflect::get(value, &"message".into())
        .ok()
        .and_then(|message| message.as_string())
        .unwrap_or_else(|| "unknown error".to_string())
}

#[cfg(target_arch = "wasm32")]
fn media_error_message(audio: &HtmlAudioElement) -> String {
    let Some(error) = audio.error() else {
        return "unknown media error".to_string();
    };
    match error.code() {
        1 => "playback was aborted before the source loaded".to_string(),
        2 => "network error while loading the track".to_string(),
        3 => "the track could not be decoded".to_string(),
        4 => "no supported source was found".to_string(),
        code => format!("media error code {code}"),
    }
}

#[cfg(target_arch = "wasm32")]
impl MediaHandle for WebMedia {
    fn set_source(&self, src: &str) {
        self.audio.set_src(src);
    }

    fn reload(&self) {
        self.audio.load();
    }

    fn play(&self) -> LocalBoxFuture<'static, Result<(), PlayerError>> {
        match self.audio.play() {
            Ok(promise) => async move {
                JsFuture::from(promise)
                    .await
                    .map(|_| ())
                    .map_err(|err| PlayerError::PlaybackRejected(describe_js_error(&err)))
            }
            .boxed_local(),
            Err(err) => future::ready(Err(PlayerError::PlaybackRejected(describe_js_error(
                &err,
            ))))
            .boxed_local(),
        }
    }

    fn pause(&self) -> Result<(), PlayerError> {
        self.audio
            .pause()
            .map_err(|err| PlayerError::MediaFailure(describe_js_error(&err)))
    }

    fn is_paused(&self) -> bool {
        self.audio.paused()
    }

    fn set_volume(&self, volume: f64) {
        self.audio.set_volume(volume.clamp(0.0, 1.0));
    }

    fn current_time(&self) -> f64 {
        self.audio.current_time()
    }

    fn set_current_time(&self, seconds: f64) {
        self.audio.set_current_time(seconds);
    }

    fn duration(&self) -> f64 {
        self.audio.duration()
    }

    fn load_started(&self) -> LocalBoxFuture<'static, ()> {
        let audio = self.audio.clone();
        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            let options = AddEventListenerOptions::new();
            options.set_once(true);
            let _ = audio.add_event_listener_with_callback_and_add_event_listener_options(
                "loadstart",
                &resolve,
                &options,
            );
        });
        async move {
            let _ = JsFuture::from(promise).await;
        }
        .boxed_local()
    }

    fn set_event_handler(&self, handler: MediaEventHandler) {
        self.clear_event_handler();

        let mut listeners = self.listeners.borrow_mut();
        for name in MEDIA_EVENTS {
            let handler = handler.clone();
            let audio = self.audio.clone();
            let closure = Closure::wrap(Box::new(move || {
                let event = match name {
                    "timeupdate" => MediaEvent::TimeUpdate,
                    "loadedmetadata" => MediaEvent::MetadataLoaded,
                    "ended" => MediaEvent::Ended,
                    _ => MediaEvent::Error(media_error_message(&audio)),
                };
                handler(event);
            }) as Box<dyn FnMut()>);
            let _ = self
                .audio
                .add_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
            listeners.push((name, closure));
        }
    }

    fn clear_event_handler(&self) {
        for (name, closure) in self.listeners.borrow_mut().drain(..) {
            let _ = self
                .audio
                .remove_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl Drop for WebMedia {
    fn drop(&mut self) {
        let _ = self.audio.pause();
        self.clear_event_handler();
    }
}
