//! Task and timer seam over the page's single-threaded event loop.

use futures::future::LocalBoxFuture;
use std::future::Future;
use std::time::Duration;

/// Handle of a repeating timer, valid until cleared.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IntervalId(pub u64);

/// What the engine needs from the host event loop.
///
/// Everything runs on one thread: spawned tasks and interval callbacks only
/// run between synchronous handler invocations, never inside one.
pub trait EventLoop {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);

    fn set_interval(&self, period: Duration, callback: Box<dyn FnMut()>) -> IntervalId;

    /// Clearing an unknown or already cleared id is a no-op.
    fn clear_interval(&self, id: IntervalId);
}

/// Box and spawn a future on `event_loop`.
pub fn spawn_local<F>(event_loop: &dyn EventLoop, task: F)
where
    F: Future<Output = ()> + 'static,
{
    event_loop.spawn(Box::pin(task));
}
