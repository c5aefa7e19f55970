//! Application configuration loaded from environment variables.

use std::time::Duration;

use domain::Locale;
use notifier::{CoordinatorConfig, RenderContext};

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `STORE_FROM_EMAIL`: sender address (default: `"orders@example.com"`)
/// - `STORE_NAME`: shown in email footers (default: `"Our Store"`)
/// - `STORE_URL`: target of "Visit Store" links (default: `"#"`)
/// - `NEWSLETTER_AUDIENCE_ID`: audience for opted-in buyers (optional)
/// - `RESEND_API_KEY`: email provider key; emails are only logged without it
/// - `DATA_API_URL`: commerce data layer; in-memory when unset
/// - `DATA_API_TOKEN`: bearer token for the data layer (optional)
/// - `INTEGRATION_TIMEOUT_MS`: per-call timeout (default: `5000`)
/// - `DISPATCH_CONCURRENCY`: batch parallelism (default: `8`)
/// - `CURRENCY_LOCALE`: `de-DE` or `en-US` (default: `de-DE`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub from_email: String,
    pub store_name: String,
    pub store_url: String,
    pub audience_id: Option<String>,
    pub resend_api_key: Option<String>,
    pub data_api_url: Option<String>,
    pub data_api_token: Option<String>,
    pub integration_timeout: Duration,
    pub dispatch_concurrency: usize,
    pub locale: Locale,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. Blank values count as unset and
    /// unparseable values fall back to the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: get("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: get("RUST_LOG").unwrap_or(defaults.log_level),
            from_email: get("STORE_FROM_EMAIL").unwrap_or(defaults.from_email),
            store_name: get("STORE_NAME").unwrap_or(defaults.store_name),
            store_url: get("STORE_URL").unwrap_or(defaults.store_url),
            audience_id: get("NEWSLETTER_AUDIENCE_ID"),
            resend_api_key: get("RESEND_API_KEY"),
            data_api_url: get("DATA_API_URL"),
            data_api_token: get("DATA_API_TOKEN"),
            integration_timeout: get("INTEGRATION_TIMEOUT_MS")
                .and_then(|ms| ms.parse().ok())
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.integration_timeout),
            dispatch_concurrency: get("DISPATCH_CONCURRENCY")
                .and_then(|n| n.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.dispatch_concurrency),
            locale: get("CURRENCY_LOCALE")
                .and_then(|l| l.parse().ok())
                .unwrap_or(defaults.locale),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Handler settings derived from this config.
    pub fn coordinator(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            from_email: self.from_email.clone(),
            audience_id: self.audience_id.clone(),
            call_timeout: self.integration_timeout,
            render: RenderContext {
                store_name: self.store_name.clone(),
                store_url: self.store_url.clone(),
                locale: self.locale,
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            from_email: "orders@example.com".to_string(),
            store_name: "Our Store".to_string(),
            store_url: "#".to_string(),
            audience_id: None,
            resend_api_key: None,
            data_api_url: None,
            data_api_token: None,
            integration_timeout: Duration::from_millis(5000),
            dispatch_concurrency: 8,
            locale: Locale::DeDe,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.from_email, "orders@example.com");
        assert_eq!(config.integration_timeout, Duration::from_secs(5));
        assert_eq!(config.dispatch_concurrency, 8);
        assert_eq!(config.locale, Locale::DeDe);
        assert!(config.resend_api_key.is_none());
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        let config = from_pairs(&[]);
        assert_eq!(config.addr(), Config::default().addr());
        assert!(config.data_api_url.is_none());
    }

    #[test]
    fn test_values_are_read() {
        let config = from_pairs(&[
            ("PORT", "8080"),
            ("STORE_NAME", "Shop"),
            ("NEWSLETTER_AUDIENCE_ID", "aud_1"),
            ("INTEGRATION_TIMEOUT_MS", "1500"),
            ("DISPATCH_CONCURRENCY", "2"),
            ("CURRENCY_LOCALE", "en-US"),
        ]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.store_name, "Shop");
        assert_eq!(config.audience_id.as_deref(), Some("aud_1"));
        assert_eq!(config.integration_timeout, Duration::from_millis(1500));
        assert_eq!(config.dispatch_concurrency, 2);
        assert_eq!(config.locale, Locale::EnUs);
    }

    #[test]
    fn test_invalid_and_blank_values_fall_back() {
        let config = from_pairs(&[
            ("PORT", "not-a-port"),
            ("INTEGRATION_TIMEOUT_MS", "0"),
            ("DISPATCH_CONCURRENCY", "-1"),
            ("CURRENCY_LOCALE", "fr-FR"),
            ("RESEND_API_KEY", "  "),
        ]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.integration_timeout, Duration::from_secs(5));
        assert_eq!(config.dispatch_concurrency, 8);
        assert_eq!(config.locale, Locale::DeDe);
        assert!(config.resend_api_key.is_none());
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_coordinator_config() {
        let config = from_pairs(&[("STORE_URL", "https://shop.test"), ("STORE_FROM_EMAIL", "hi@shop.test")]);
        let coordinator = config.coordinator();
        assert_eq!(coordinator.from_email, "hi@shop.test");
        assert_eq!(coordinator.render.store_url, "https://shop.test");
        assert_eq!(coordinator.call_timeout, config.integration_timeout);
    }
}
