use pmoconfig::Config;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter, Registry, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Installe le subscriber global
///
/// `RUST_LOG` a priorité ; sinon le niveau vient de `host.logger.min_level`.
/// Les traces vont sur stderr pour ne pas se mêler à la sortie des commandes.
pub fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = string_to_level(&config.get_log_min_level())
            .map(LevelFilter::from_level)
            .unwrap_or(LevelFilter::INFO);
        EnvFilter::default().add_directive(level.into())
    });

    let subscriber = Registry::default().with(filter);

    if config.get_log_enable_console() {
        subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        subscriber.init();
    }
}

fn string_to_level(s: &str) -> Option<Level> {
    match s.to_uppercase().as_str() {
        "ERROR" => Some(Level::ERROR),
        "WARN" => Some(Level::WARN),
        "INFO" => Some(Level::INFO),
        "DEBUG" => Some(Level::DEBUG),
        "TRACE" => Some(Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_to_level() {
        assert_eq!(string_to_level("debug"), Some(Level::DEBUG));
        assert_eq!(string_to_level("WARN"), Some(Level::WARN));
        assert_eq!(string_to_level("verbose"), None);
    }
}
