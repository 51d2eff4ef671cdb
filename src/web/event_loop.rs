//! Browser event loop: `spawn_local` and `window.setInterval`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use futures::future::LocalBoxFuture;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::Window;

use crate::app::{EventLoop, IntervalId};

pub struct BrowserEventLoop {
    window: Window,
    // Closures must outlive their interval registration.
    intervals: RefCell<HashMap<i32, Closure<dyn FnMut()>>>,
}

impl BrowserEventLoop {
    pub fn new(window: Window) -> Self {
        Self {
            window,
            intervals: RefCell::new(HashMap::new()),
        }
    }
}

impl EventLoop for BrowserEventLoop {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(task);
    }

    fn set_interval(&self, period: Duration, callback: Box<dyn FnMut()>) -> IntervalId {
        let closure = Closure::wrap(callback);
        let millis = i32::try_from(period.as_millis()).unwrap_or(i32::MAX);
        match self
            .window
            .set_interval_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                millis,
            ) {
            Ok(handle) => {
                self.intervals.borrow_mut().insert(handle, closure);
                IntervalId(handle as u64)
            }
            Err(e) => {
                // Handles start at 1, so 0 never names a live interval.
                tracing::error!("setInterval failed: {:?}", e);
                IntervalId(0)
            }
        }
    }

    fn clear_interval(&self, id: IntervalId) {
        let handle = id.0 as i32;
        self.window.clear_interval_with_handle(handle);
        let removed = self.intervals.borrow_mut().remove(&handle);
        if let Some(closure) = removed {
            // The callback may be on the stack right now; drop it on a later turn.
            wasm_bindgen_futures::spawn_local(async move { drop(closure) });
        }
    }
}
