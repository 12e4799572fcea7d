use std::time::Duration;

/// Tunables for the hand coordinator.
#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    /// Cadence of status polling while the dealing window is open.
    pub poll_interval: Duration,
    /// Debounce before the autonomous reveal fires.
    pub reveal_delay: Duration,
    /// Restrict starting a hand to administrators.
    pub admin_only_start: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(3_000),
            reveal_delay: Duration::from_millis(500),
            admin_only_start: false,
        }
    }
}

impl CoordinatorConfig {
    pub fn from_env() -> Self {
        Self {
            poll_interval: Duration::from_millis(read_ms("FAIRDEAL_POLL_INTERVAL_MS", 3_000)),
            reveal_delay: Duration::from_millis(read_ms("FAIRDEAL_REVEAL_DELAY_MS", 500)),
            admin_only_start: read_bool("FAIRDEAL_ADMIN_ONLY_START", false),
        }
    }
}

fn read_ms(key: &str, fallback: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse::<u64>().ok())
        .unwrap_or(fallback)
}

fn read_bool(key: &str, fallback: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|raw| matches!(raw.as_str(), "1" | "true" | "TRUE"))
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.reveal_delay, Duration::from_millis(500));
        assert!(!config.admin_only_start);
    }
}
