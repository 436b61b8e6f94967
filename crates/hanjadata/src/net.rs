//! Self-imposed rate limiting for the outbound API loops.

use std::{
    thread,
    time::{Duration, Instant},
};

/// A fixed-delay scheduler: `pause` blocks until at least the configured
/// delay has passed since the previous `pause` returned. The first call
/// never blocks, so a loop can call it before (or after) every request
/// without paying the delay up front.
#[derive(Debug)]
pub struct FixedDelay {
    delay: Duration,
    last: Option<Instant>,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay, last: None }
    }

    /// One second between requests, the default for every loop in this tool.
    pub fn per_second() -> Self {
        Self::new(Duration::from_secs(1))
    }

    pub fn pause(&mut self) {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                thread::sleep(self.delay - elapsed);
            }
        }
        self.last = Some(Instant::now());
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn first_pause_does_not_block() {
        let mut delay = FixedDelay::new(Duration::from_secs(60));
        let start = Instant::now();
        delay.pause();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn consecutive_pauses_wait_out_the_delay() {
        let mut delay = FixedDelay::new(Duration::from_millis(30));
        let start = Instant::now();
        delay.pause();
        delay.pause();
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
