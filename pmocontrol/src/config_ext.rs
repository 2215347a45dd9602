//! pmoconfig extension for the playback driver.

use std::time::Duration;

use pmoconfig::Config;

use crate::driver::{DEFAULT_IDLE_TIMEOUT, DEFAULT_SWEEP_INTERVAL};

pub trait PlayerConfigExt {
    /// Inactivity before a guild is evicted (`player.idle_timeout_secs`).
    fn idle_timeout(&self) -> Duration;

    /// Period of the idle sweep (`player.sweep_interval_secs`).
    fn sweep_interval(&self) -> Duration;
}

impl PlayerConfigExt for Config {
    fn idle_timeout(&self) -> Duration {
        secs_or_default(self, "idle_timeout_secs", DEFAULT_IDLE_TIMEOUT)
    }

    fn sweep_interval(&self) -> Duration {
        secs_or_default(self, "sweep_interval_secs", DEFAULT_SWEEP_INTERVAL)
    }
}

fn secs_or_default(config: &Config, key: &str, default: Duration) -> Duration {
    match config.get_u64(&["player", key], default.as_secs()) {
        0 => default,
        secs => Duration::from_secs(secs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_config(Some(dir.path())).unwrap();
        assert_eq!(config.idle_timeout(), DEFAULT_IDLE_TIMEOUT);
        assert_eq!(config.sweep_interval(), DEFAULT_SWEEP_INTERVAL);
    }

    #[test]
    fn test_player_overrides_and_zero() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.yaml"),
            "player:\n  idle_timeout_secs: 120\n  sweep_interval_secs: 0\n",
        )
        .unwrap();
        let config = Config::load_config(Some(dir.path())).unwrap();
        assert_eq!(config.idle_timeout(), Duration::from_secs(120));
        // tokio intervals reject a zero period
        assert_eq!(config.sweep_interval(), DEFAULT_SWEEP_INTERVAL);
    }
}
