// Configuration module entry point
// Builds the immutable process configuration and the shared application state

mod state;
mod types;

use std::net::SocketAddr;

pub use state::AppState;
pub use types::Config;

/// Prefix for structured overrides, e.g. `MESSAGE_BRIDGE__LOGGING__LEVEL=debug`
const ENV_PREFIX: &str = "MESSAGE_BRIDGE";

impl Config {
    /// Load configuration from the default "config" file (any supported extension)
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from specified file path (without extension)
    ///
    /// Layers, lowest priority first: built-in defaults, the optional file,
    /// `MESSAGE_BRIDGE__*` variables, then the plain `PORT`, `DATABASE_URL`
    /// and `RENDER_API_URL` variables.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = Self::defaults()?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .set_override_option("server.port", non_blank_env("PORT"))?
            .set_override_option("database.url", non_blank_env("DATABASE_URL"))?
            .set_override_option("upstream.render_api_url", non_blank_env("RENDER_API_URL"))?
            .build()?;

        settings.try_deserialize()
    }

    fn defaults(
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("database.default_table", "messages")?
            .set_default("upstream.timeout_secs", 5)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("http.server_name", "message-bridge/0.1")?
            .set_default("http.max_body_size", 16_777_216)? // 16MB, fits a 10MB attachment in base64
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// Fallback connection string, ignoring blank values
    pub fn database_url(&self) -> Option<&str> {
        self.database
            .url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Upstream probe target, ignoring blank values
    pub fn render_api_url(&self) -> Option<&str> {
        self.upstream
            .render_api_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

fn non_blank_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config::defaults()
        .and_then(|builder| builder.build())
        .and_then(|settings| settings.try_deserialize())
        .expect("default config must deserialize")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = test_config();
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 8000);
        assert_eq!(cfg.database.default_table, "messages");
        assert_eq!(cfg.upstream.timeout_secs, 5);
        assert_eq!(cfg.logging.access_log_format, "combined");
        assert!(cfg.database_url().is_none());
        assert!(cfg.render_api_url().is_none());
        assert!(cfg.performance.max_connections.is_none());
    }

    #[test]
    fn test_socket_addr() {
        let cfg = test_config();
        let addr = cfg.get_socket_addr().unwrap();
        assert_eq!(addr.port(), 8000);
    }

    #[test]
    fn test_blank_urls_are_ignored() {
        let mut cfg = test_config();
        cfg.database.url = Some("   ".to_string());
        cfg.upstream.render_api_url = Some(" https://example.com ".to_string());
        assert!(cfg.database_url().is_none());
        assert_eq!(cfg.render_api_url(), Some("https://example.com"));
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let cfg = Config::load_from("does-not-exist/config");
        assert!(cfg.is_ok());
    }
}
