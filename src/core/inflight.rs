use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Monotonic request counter. Only the most recently issued ticket may apply its outcome.
#[derive(Debug, Default)]
pub struct RequestSequence {
    latest: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket(u64);

impl RequestSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> RequestTicket {
        RequestTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_latest(&self, ticket: RequestTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

/// Number of outstanding calls; the view is loading while it is non-zero.
#[derive(Debug, Default)]
pub struct InFlight {
    count: AtomicUsize,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.count.load(Ordering::SeqCst) > 0
    }

    pub fn enter(&self) -> LoadingGuard<'_> {
        self.count.fetch_add(1, Ordering::SeqCst);
        LoadingGuard { in_flight: self }
    }
}

/// Releases its slot exactly once, on drop, whether the call returned, failed or was abandoned.
#[must_use = "dropping the guard immediately clears the loading state"]
#[derive(Debug)]
pub struct LoadingGuard<'a> {
    in_flight: &'a InFlight,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.count.fetch_sub(1, Ordering::SeqCst);
    }
}
