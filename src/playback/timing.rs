#[cfg(not(target_arch = "wasm32"))]
use dioxus::logger::tracing::warn;
use futures_util::future::{FutureExt, LocalBoxFuture};
use std::future::Future;

/// Source of delays for retry and recovery paths.
pub trait Timer {
    fn sleep(&self, ms: u32) -> LocalBoxFuture<'static, ()>;
}

pub struct PlatformTimer;

impl Timer for PlatformTimer {
    #[cfg(target_arch = "wasm32")]
    fn sleep(&self, ms: u32) -> LocalBoxFuture<'static, ()> {
        gloo_timers::future::TimeoutFuture::new(ms).boxed_local()
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn sleep(&self, ms: u32) -> LocalBoxFuture<'static, ()> {
        tokio::time::sleep(std::time::Duration::from_millis(u64::from(ms))).boxed_local()
    }
}

/// Fire-and-forget a player continuation. Outlives the component that
/// started it so deferred work survives route changes.
pub fn spawn_detached<F>(fut: F)
where
    F: Future<Output = ()> + 'static,
{
    #[cfg(target_arch = "wasm32")]
    wasm_bindgen_futures::spawn_local(fut);

    #[cfg(not(target_arch = "wasm32"))]
    {
        if dioxus::core::Runtime::try_current().is_some() {
            dioxus::core::spawn_forever(fut);
        } else {
            warn!("No Dioxus runtime available, player task was not started");
        }
    }
}

/// Runs continuations the engine starts from media events.
pub trait Spawner {
    fn spawn(&self, fut: LocalBoxFuture<'static, ()>);
}

pub struct PlatformSpawner;

impl Spawner for PlatformSpawner {
    fn spawn(&self, fut: LocalBoxFuture<'static, ()>) {
        spawn_detached(fut);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::{Cell, RefCell};

    /// Resolves every sleep immediately and remembers what was asked for.
    #[derive(Default)]
    pub struct RecordingTimer {
        pub requested: RefCell<Vec<u32>>,
    }

    impl Timer for RecordingTimer {
        fn sleep(&self, ms: u32) -> LocalBoxFuture<'static, ()> {
            self.requested.borrow_mut().push(ms);
            futures_util::future::ready(()).boxed_local()
        }
    }

    /// Polls each spawned task once, in place. Counts the ones left pending.
    #[derive(Default)]
    pub struct InlineSpawner {
        pub stalled: Cell<u32>,
    }

    impl Spawner for InlineSpawner {
        fn spawn(&self, fut: LocalBoxFuture<'static, ()>) {
            if fut.now_or_never().is_none() {
                self.stalled.set(self.stalled.get() + 1);
            }
        }
    }
}
