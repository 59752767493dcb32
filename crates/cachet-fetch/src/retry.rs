use std::time::Duration;

/// Cap on the per-attempt backoff delay.
const MAX_DELAY: Duration = Duration::from_secs(10);

/// Delay before retry number `attempt` (1-indexed): 1 s, 2 s, ... capped at
/// ten seconds.
pub fn retry_delay(attempt: u32) -> Duration {
    Duration::from_secs(u64::from(attempt)).min(MAX_DELAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_linearly() {
        assert_eq!(retry_delay(1), Duration::from_secs(1));
        assert_eq!(retry_delay(2), Duration::from_secs(2));
        assert_eq!(retry_delay(5), Duration::from_secs(5));
    }

    #[test]
    fn delays_are_capped() {
        assert_eq!(retry_delay(10), Duration::from_secs(10));
        assert_eq!(retry_delay(11), Duration::from_secs(10));
        assert_eq!(retry_delay(u32::MAX), Duration::from_secs(10));
    }
}
