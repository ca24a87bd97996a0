use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Periodic timer that advances playback while a track is playing.
///
/// Stopping drops the interval, so a stopped clock never yields a tick and a
/// restart begins a full period later.
#[derive(Debug)]
pub struct PlaybackClock {
    period: Duration,
    interval: Option<Interval>,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new(TICK_PERIOD)
    }
}

impl PlaybackClock {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    /// Returns `false` when the clock was already running.
    pub fn start(&mut self) -> bool {
        if self.interval.is_some() {
            return false;
        }
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
        true
    }

    /// Returns `false` when the clock was already stopped.
    pub fn stop(&mut self) -> bool {
        self.interval.take().is_some()
    }

    /// Resolves on the next tick with the period it covers. Pending forever
    /// while stopped.
    pub async fn tick(&mut self) -> Duration {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
                self.period
            }
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PlaybackClock, TICK_PERIOD};
    use std::time::Duration;
    use tokio::time::{timeout, Instant};

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period_while_running() {
        let mut clock = PlaybackClock::default();
        assert!(clock.start());
        assert!(!clock.start());

        let begin = Instant::now();
        assert_eq!(clock.tick().await, TICK_PERIOD);
        assert_eq!(clock.tick().await, TICK_PERIOD);
        assert_eq!(Instant::now() - begin, Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_clock_never_ticks() {
        let mut clock = PlaybackClock::default();
        assert!(!clock.stop());

        clock.start();
        assert!(clock.stop());
        assert!(!clock.is_running());
        assert!(timeout(Duration::from_secs(10), clock.tick()).await.is_err());
    }
}
