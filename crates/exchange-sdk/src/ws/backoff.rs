/*
[INPUT]:  Reconnect attempt counter
[OUTPUT]: Delay before the next connect attempt
[POS]:    WebSocket layer - reconnect pacing
[UPDATE]: When reconnect pacing rules change
*/

use std::time::Duration;

use crate::http::{ExchangeError, Result};

/// Default delays: 1s, 2s, 4s, 8s, 16s, then 16s forever
pub const DEFAULT_RECONNECT_DELAYS: [Duration; 5] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
    Duration::from_secs(8),
    Duration::from_secs(16),
];

/// Bounded backoff table; attempts past the end reuse the last entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    delays: Vec<Duration>,
}

impl BackoffPolicy {
    pub fn new(delays: Vec<Duration>) -> Result<Self> {
        if delays.is_empty() {
            return Err(ExchangeError::Config(
                "reconnect delay table must not be empty".to_string(),
            ));
        }
        Ok(Self { delays })
    }

    pub fn delay_for(&self, attempt: usize) -> Duration {
        let idx = attempt.min(self.delays.len() - 1);
        self.delays[idx]
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            delays: DEFAULT_RECONNECT_DELAYS.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_clamps_at_last_entry() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for(4), Duration::from_secs(16));
        assert_eq!(policy.delay_for(50), Duration::from_secs(16));
    }

    #[test]
    fn empty_table_rejected() {
        assert!(matches!(
            BackoffPolicy::new(Vec::new()),
            Err(ExchangeError::Config(_))
        ));
    }
}
