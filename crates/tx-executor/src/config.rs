use std::time::Duration;

/// Tuning knobs for the transaction pipeline (§4.E).
#[derive(Debug, Clone, Copy)]
pub struct ExecutorConfig {
    pub compute_unit_limit: u32,
    pub blockhash_max_age: Duration,
    pub confirm_timeout: Duration,
    pub max_retries: u32,
    pub retry_base: Duration,
    pub retry_cap: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            compute_unit_limit: 400_000,
            blockhash_max_age: Duration::from_secs(30),
            confirm_timeout: Duration::from_secs(60),
            max_retries: 3,
            retry_base: Duration::from_secs(1),
            retry_cap: Duration::from_secs(30),
        }
    }
}

impl ExecutorConfig {
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let scaled = self.retry_base.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
        scaled.min(self.retry_cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_caps() {
        let config = ExecutorConfig::default();
        assert_eq!(config.backoff_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.backoff_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.backoff_for_attempt(2), Duration::from_secs(4));
        assert_eq!(config.backoff_for_attempt(10), Duration::from_secs(30));
    }
}
