use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub type ClockBoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Source of delays for the fixture replay.
pub trait Clock: Send + Sync {
    fn sleep(&self, duration: Duration) -> ClockBoxFuture;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn sleep(&self, duration: Duration) -> ClockBoxFuture {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Resolves every sleep immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstantClock;

impl Clock for InstantClock {
    fn sleep(&self, _duration: Duration) -> ClockBoxFuture {
        Box::pin(async {})
    }
}
