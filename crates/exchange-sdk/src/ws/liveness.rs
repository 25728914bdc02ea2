/*
[INPUT]:  Ping ticks and pong arrivals
[OUTPUT]: Decision to ping again or declare the session dead
[POS]:    WebSocket layer - application-level keepalive
[UPDATE]: When keepalive timing rules change
*/

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    SendPing,
    Expired { silent_for: Duration },
}

/// Tracks the last pong of the current session
#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    pong_timeout: Duration,
    last_pong: Instant,
}

impl LivenessMonitor {
    /// Starts counting from `now`, as if a pong had just arrived
    pub fn new(pong_timeout: Duration, now: Instant) -> Self {
        Self {
            pong_timeout,
            last_pong: now,
        }
    }

    pub fn record_pong(&mut self, now: Instant) {
        self.last_pong = now;
    }

    /// Expired once the silence reaches `pong_timeout`
    pub fn check(&self, now: Instant) -> Liveness {
        let silent_for = now.saturating_duration_since(self.last_pong);
        if silent_for >= self.pong_timeout {
            Liveness::Expired { silent_for }
        } else {
            Liveness::SendPing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_at_timeout() {
        let start = Instant::now();
        let mut monitor = LivenessMonitor::new(Duration::from_secs(60), start);

        assert_eq!(monitor.check(start + Duration::from_secs(30)), Liveness::SendPing);
        assert_eq!(monitor.check(start + Duration::from_millis(59_999)), Liveness::SendPing);
        assert_eq!(
            monitor.check(start + Duration::from_secs(60)),
            Liveness::Expired {
                silent_for: Duration::from_secs(60)
            }
        );

        monitor.record_pong(start + Duration::from_secs(45));
        assert_eq!(monitor.check(start + Duration::from_secs(60)), Liveness::SendPing);
    }
}
