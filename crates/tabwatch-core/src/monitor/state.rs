use std::fmt;
use std::time::{Duration, Instant};

/// Response lifecycle of one watched page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObservationState {
    /// Nothing in flight
    #[default]
    Idle,
    /// Loading marker seen, elapsed timer running
    AwaitingResponse,
    /// Loading marker gone, waiting for the completion marker
    ResponseReceived,
    /// Retry control detected
    Erred,
    /// Retry clicked, waiting for the page to start over
    Regenerating,
    /// Retry countdown running or retry clicks in flight
    TimedOut,
    /// Response finished
    Complete,
}

impl ObservationState {
    /// Short label for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationState::Idle => "idle",
            ObservationState::AwaitingResponse => "awaiting_response",
            ObservationState::ResponseReceived => "response_received",
            ObservationState::Erred => "erred",
            ObservationState::Regenerating => "regenerating",
            ObservationState::TimedOut => "timed_out",
            ObservationState::Complete => "complete",
        }
    }
}

impl fmt::Display for ObservationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single timer a page may have running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    /// Counting up while a response is awaited
    Elapsed { started: Instant },
    /// Counting down before a retry click
    Countdown { started: Instant, duration: Duration },
}

impl Timer {
    /// Time since the timer started
    pub fn elapsed(&self, now: Instant) -> Duration {
        let started = match self {
            Timer::Elapsed { started } | Timer::Countdown { started, .. } => *started,
        };
        now.saturating_duration_since(started)
    }

    /// Time left on a countdown; `None` for an elapsed timer
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        match self {
            Timer::Elapsed { .. } => None,
            Timer::Countdown { duration, .. } => Some(duration.saturating_sub(self.elapsed(now))),
        }
    }
}

/// Seconds rounded to tenths, without a trailing `.0` ("5", "5.3")
pub fn format_seconds(duration: Duration) -> String {
    let tenths = (duration.as_millis() + 50) / 100;
    if tenths % 10 == 0 {
        format!("{}", tenths / 10)
    } else {
        format!("{}.{}", tenths / 10, tenths % 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(Duration::from_secs(5)), "5");
        assert_eq!(format_seconds(Duration::from_millis(5_340)), "5.3");
        assert_eq!(format_seconds(Duration::from_millis(5_960)), "6");
        assert_eq!(format_seconds(Duration::ZERO), "0");
    }

    #[test]
    fn test_countdown_remaining_saturates() {
        let t0 = Instant::now();
        let timer = Timer::Countdown {
            started: t0,
            duration: Duration::from_secs(10),
        };
        assert_eq!(timer.remaining(t0), Some(Duration::from_secs(10)));
        assert_eq!(
            timer.remaining(t0 + Duration::from_secs(4)),
            Some(Duration::from_secs(6))
        );
        assert_eq!(timer.remaining(t0 + Duration::from_secs(11)), Some(Duration::ZERO));
    }

    #[test]
    fn test_elapsed_timer_has_no_remaining() {
        let t0 = Instant::now();
        let timer = Timer::Elapsed { started: t0 };
        assert_eq!(timer.elapsed(t0 + Duration::from_secs(2)), Duration::from_secs(2));
        assert_eq!(timer.remaining(t0), None);
    }
}
