/// Filter used when neither the config nor `RUST_LOG` names one. wgpu and
/// naga log every pipeline and buffer at info.
pub const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "debug",
/// "lumen_overlay=trace,wgpu_core=warn") and wins over `RUST_LOG`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
    /// Millisecond timestamps on every line. Off is handy when output is
    /// diffed or already stamped by a supervisor.
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { env_filter: None, write_style: env_logger::WriteStyle::Auto, timestamps: true }
    }
}

impl LoggingConfig {
    /// The filter string that will be applied.
    pub fn resolved_filter(&self) -> String {
        self.env_filter
            .clone()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string())
    }
}

/// Installs the global logger.
///
/// Returns `false` when a logger was already installed, by an earlier call
/// or by the host application; the existing logger is left in place.
pub fn init_logging(config: LoggingConfig) -> bool {
    let filter = config.resolved_filter();
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(&filter).write_style(config.write_style);
    if config.timestamps {
        builder.format_timestamp_millis();
    } else {
        builder.format_timestamp(None);
    }

    match builder.try_init() {
        Ok(()) => {
            log::debug!("logging initialized ({filter})");
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_wins() {
        let config = LoggingConfig { env_filter: Some("trace".into()), ..LoggingConfig::default() };
        assert_eq!(config.resolved_filter(), "trace");
    }

    #[test]
    fn second_install_is_refused() {
        let config = LoggingConfig { timestamps: false, ..LoggingConfig::default() };
        init_logging(config.clone());
        assert!(!init_logging(config));
    }
}
