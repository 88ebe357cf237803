use std::time::Instant;

/// Cumulative network counters as last observed, and when.
#[derive(Debug, Clone, Copy)]
pub struct NetworkSample {
    pub sent: u64,
    pub received: u64,
    pub at: Instant,
}

/// Throughput between two samples, in bytes per second.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NetworkSpeed {
    pub upload: f64,
    pub download: f64,
}

impl NetworkSample {
    pub fn new(sent: u64, received: u64, at: Instant) -> Self {
        Self { sent, received, at }
    }

    /// Replace this sample with newer counters, returning the throughput
    /// since the previous one.
    ///
    /// No time elapsed, or a counter that went backwards (an interface was
    /// reset or removed), reads as zero rather than a bogus spike.
    pub fn advance(&mut self, sent: u64, received: u64, now: Instant) -> NetworkSpeed {
        let elapsed = now.saturating_duration_since(self.at).as_secs_f64();
        let rate = |current: u64, previous: u64| match current.checked_sub(previous) {
            Some(delta) if elapsed > 0.0 => delta as f64 / elapsed,
            _ => 0.0,
        };
        let speed = NetworkSpeed {
            upload: rate(sent, self.sent),
            download: rate(received, self.received),
        };
        *self = Self::new(sent, received, now);
        speed
    }
}
