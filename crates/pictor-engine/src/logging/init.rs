use std::sync::Once;

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info", "warn",
/// "pictor_engine=debug,wgpu=warn"). On wasm32 only the maximum level of the
/// filter is honoured.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    #[cfg(not(target_arch = "wasm32"))]
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            #[cfg(not(target_arch = "wasm32"))]
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

impl LoggingConfig {
    pub fn with_filter(filter: impl Into<String>) -> Self {
        Self {
            env_filter: Some(filter.into()),
            ..Self::default()
        }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once.
///
/// This function is idempotent; subsequent calls are ignored.
/// Intended usage is early in `main`.
#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = config.env_filter {
            builder.parse_filters(&filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Info);
            // wgpu is noisy at info.
            builder.filter_module("wgpu_core", log::LevelFilter::Warn);
            builder.filter_module("wgpu_hal", log::LevelFilter::Warn);
        }

        builder.write_style(config.write_style);
        builder.init();

        log::debug!("logging initialized");
    });
}

/// Initializes console logging and the panic hook for the browser build.
#[cfg(target_arch = "wasm32")]
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        console_error_panic_hook::set_once();

        let level = config
            .env_filter
            .as_deref()
            .and_then(max_level_of)
            .unwrap_or(log::Level::Info);
        wasm_logger::init(wasm_logger::Config::new(level));

        log::debug!("logging initialized");
    });
}

/// Most verbose level named in an `env_logger`-style filter string.
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
fn max_level_of(filter: &str) -> Option<log::Level> {
    filter
        .split(',')
        .filter_map(|directive| {
            let level = directive.rsplit('=').next()?.trim();
            level.parse::<log::Level>().ok()
        })
        .max()
}
