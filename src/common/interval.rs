use std::time::{Duration, Instant};

pub struct Interval {
    prev: Instant,
    next: Instant,
    period: Duration,
}

impl Interval {
    /// Create an interval whose first tick fires at `start`.
    pub fn new(start: Instant, period: Duration) -> Self {
        Self {
            prev: start,
            next: start,
            period,
        }
    }

    /// Try to tick the interval forward to the provided instant. Returns the
    /// time elapsed since the previous tick if the interval has fired and
    /// `None` otherwise.
    pub fn try_wait(&mut self, now: Instant) -> Option<Duration> {
        if now < self.next {
            return None;
        }

        let next = self.next + self.period;

        // check if we have fallen behind
        if next > now {
            self.next = next;
        } else {
            // if we fell behind, don't sample again until the interval has
            // elapsed
            self.next = now + self.period;
        }

        let elapsed = now - self.prev;

        self.prev = now;

        Some(elapsed)
    }

    /// Block the calling thread until the interval fires.
    pub fn wait(&mut self) -> Duration {
        loop {
            let now = Instant::now();

            if let Some(elapsed) = self.try_wait(now) {
                return elapsed;
            }

            std::thread::sleep(self.next - now);
        }
    }
}
