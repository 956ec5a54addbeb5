//! Fixed-interval polling shared by every readiness wait
//!
//! Peer reachability, leader readiness, topology file availability and
//! worker discovery all reduce to "ask again every `interval` until it
//! answers, optionally giving up after `ceiling`". [`Poller`] is that loop.
//! Dropping the future returned by [`Poller::until`] cancels the wait.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};

/// Result of a polling loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// The attempt produced a value
    Ready(T),
    /// The ceiling elapsed first
    TimedOut { attempts: u64, elapsed: Duration },
}

impl<T> PollOutcome<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Interval plus optional ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poller {
    interval: Duration,
    ceiling: Option<Duration>,
}

impl Poller {
    /// Poll every `interval` with no ceiling
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            ceiling: None,
        }
    }

    pub fn with_ceiling(self, ceiling: Duration) -> Self {
        self.with_optional_ceiling(Some(ceiling))
    }

    pub fn with_optional_ceiling(mut self, ceiling: Option<Duration>) -> Self {
        self.ceiling = ceiling;
        self
    }

    pub fn ceiling(&self) -> Option<Duration> {
        self.ceiling
    }

    /// Call `attempt` (with a 1-based attempt number) until it returns
    /// `Some`, sleeping `interval` between calls.
    ///
    /// The first attempt runs immediately. With a ceiling, the last sleep is
    /// shortened so the loop never overshoots it by more than one attempt.
    pub async fn until<T, F, Fut>(&self, mut attempt: F) -> PollOutcome<T>
    where
        F: FnMut(u64) -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        let start = Instant::now();
        let mut attempts = 0u64;

        loop {
            attempts += 1;
            if let Some(value) = attempt(attempts).await {
                return PollOutcome::Ready(value);
            }

            let delay = match self.ceiling {
                Some(ceiling) => {
                    let elapsed = start.elapsed();
                    if elapsed >= ceiling {
                        return PollOutcome::TimedOut { attempts, elapsed };
                    }
                    self.interval.min(ceiling - elapsed)
                }
                None => self.interval,
            };
            sleep(delay).await;
        }
    }
}
