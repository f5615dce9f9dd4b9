//! Tracing initialization from configuration.

use crate::LoggingConfig;

/// Initialize tracing from configuration.
///
/// `RUST_LOG` wins over the configured level so a developer can raise
/// verbosity without touching the config file. Safe to call once per
/// process; a second call is a no-op.
pub fn install_tracing(cfg: &LoggingConfig) {
    let env_filter_str = std::env::var("RUST_LOG").unwrap_or_else(|_| cfg.level.clone());
    let env_filter = tracing_subscriber::EnvFilter::new(&env_filter_str);

    if cfg.json {
        let _ = tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .try_init();
    }
}
