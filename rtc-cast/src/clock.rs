use std::time::Instant;

/// Source of monotonic time for the engine.
///
/// Every scheduling and ingestion decision reads time through this trait, so
/// tests can drive the engine with a simulated clock. The wall clock is read
/// once at construction to anchor NTP time, unless an anchor is supplied with
/// [`RtcpBuilder::with_baseline`](crate::RtcpBuilder::with_baseline).
pub trait Clock {
    fn now(&self) -> Instant;
}

/// [`Clock`] backed by [`Instant::now`].
#[derive(Debug, Default, Copy, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}
