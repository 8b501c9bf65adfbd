use std::time::{Duration, Instant};

/// Limits progress logs to one per `min_epochs` epochs and one per `min_interval`.
///
/// A log is suppressed as soon as either limit has not elapsed since the last one.
#[derive(Debug, Clone)]
pub(crate) struct LogThrottle {
    min_epochs: usize,
    min_interval: Duration,
    last: Option<(usize, Instant)>,
}

impl LogThrottle {
    pub(crate) fn new(min_epochs: usize, min_interval: Duration) -> Self {
        Self {
            min_epochs,
            min_interval,
            last: None,
        }
    }

    /// Whether a log for `epoch` may be emitted at `now`. Records it if so.
    pub(crate) fn should_log(&mut self, epoch: usize, now: Instant) -> bool {
        if let Some((last_epoch, last_time)) = self.last {
            let too_soon = epoch.saturating_sub(last_epoch) < self.min_epochs
                || now.saturating_duration_since(last_time) < self.min_interval;

            if too_soon {
                return false;
            }
        }

        self.last = Some((epoch, now));
        true
    }
}

impl Default for LogThrottle {
    fn default() -> Self {
        Self::new(10, Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_first_log_always_passes() {
        let mut throttle = LogThrottle::default();
        assert!(throttle.should_log(1, Instant::now()));
    }

    #[test]
    fn both_limits_must_have_elapsed() {
        let mut throttle = LogThrottle::default();
        let start = Instant::now();
        assert!(throttle.should_log(1, start));

        // Enough epochs, not enough time.
        assert!(!throttle.should_log(50, start + Duration::from_millis(200)));
        // Enough time, not enough epochs.
        assert!(!throttle.should_log(5, start + Duration::from_secs(5)));
        // Both.
        assert!(throttle.should_log(11, start + Duration::from_secs(1)));
        assert!(!throttle.should_log(12, start + Duration::from_secs(10)));
    }
}
