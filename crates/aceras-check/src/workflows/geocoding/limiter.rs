use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Spaces outbound requests at least `min_interval` apart. Public geocoders ask for no
/// more than one request per second.
#[derive(Debug)]
pub struct RequestLimiter {
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RequestLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Claim the next request slot and return how long to wait before using it.
    /// Concurrent callers are queued behind one another.
    pub fn reserve(&self, now: Instant) -> Duration {
        let mut next_slot = self
            .next_slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let slot = match *next_slot {
            Some(slot) if slot > now => slot,
            _ => now,
        };
        *next_slot = Some(slot + self.min_interval);
        slot.saturating_duration_since(now)
    }

    pub async fn acquire(&self) {
        let wait = self.reserve(Instant::now());
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}
