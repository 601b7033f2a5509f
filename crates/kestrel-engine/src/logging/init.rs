use std::sync::Once;

use log::LevelFilter;

use crate::device::VALIDATION_TARGET;

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info", "warn",
/// "kestrel_engine=debug"). When it is `None`, `RUST_LOG` is used, and failing
/// that `default_level`.
///
/// `validation_level` applies to Vulkan validation-layer output, which is
/// logged under [`VALIDATION_TARGET`]. An explicit filter overrides it.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub default_level: LevelFilter,
    pub validation_level: LevelFilter,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            default_level: LevelFilter::Info,
            validation_level: LevelFilter::Warn,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once.
///
/// Idempotent; later calls are ignored. Call early in `main`.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        let filters = effective_filters(&config, std::env::var("RUST_LOG").ok());
        builder.parse_filters(&filters);
        builder.write_style(config.write_style);

        // Another logger may already be installed (e.g. by a test harness).
        if builder.try_init().is_err() {
            return;
        }
        log::debug!("logging initialized ({filters})");
    });
}

/// Filter string handed to `env_logger`.
fn effective_filters(config: &LoggingConfig, rust_log: Option<String>) -> String {
    if let Some(filter) = config.env_filter.clone().or(rust_log) {
        return filter;
    }
    format!(
        "{},{}={}",
        config.default_level, VALIDATION_TARGET, config.validation_level
    )
}
