use crate::error::{NextcloudError, NextcloudResult};
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Prefix shared by every environment variable the server reads
const ENV_PREFIX: &str = "NEXTCLOUD";

/// Bearer token variable of earlier deployments, read when ours is unset
const LEGACY_BEARER_ENV: &str = "FASTMCP_BEARER_TOKEN";

/// Default per-request timeout for the Nextcloud HTTP client
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings as they come out of the file/environment layers, before validation
#[derive(Debug, Deserialize, Default)]
struct RawSettings {
    host: Option<String>,
    username: Option<String>,
    password: Option<String>,
    timeout_secs: Option<u64>,
    mcp_bearer_token: Option<String>,
}

/// Validated server configuration
#[derive(Clone)]
pub struct Config {
    pub host: Url,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
    pub bearer_token: Option<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host.as_str())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment (NEXTCLOUD_* variables),
    /// layered over an optional TOML file
    pub fn load(config_file: Option<&Path>) -> NextcloudResult<Self> {
        Self::load_with_env(config_file, None)
    }

    /// Same as [`Config::load`], but reads environment values from `env`
    /// when given instead of the real process environment
    fn load_with_env(
        config_file: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> NextcloudResult<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = config_file {
            if !path.exists() {
                return Err(NextcloudError::Config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path));
        }

        let legacy_token = match &env {
            Some(vars) => vars.get(LEGACY_BEARER_ENV).cloned(),
            None => std::env::var(LEGACY_BEARER_ENV).ok(),
        };

        let mut raw: RawSettings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).source(env))
            .build()?
            .try_deserialize()?;

        if raw
            .mcp_bearer_token
            .as_deref()
            .is_none_or(|t| t.trim().is_empty())
        {
            raw.mcp_bearer_token = legacy_token;
        }

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawSettings) -> NextcloudResult<Self> {
        let host = required(raw.host, "NEXTCLOUD_HOST")?;
        let host = Url::parse(&host).map_err(|e| {
            NextcloudError::Config(format!("NEXTCLOUD_HOST is not a valid URL ({host}): {e}"))
        })?;
        if !matches!(host.scheme(), "http" | "https") {
            return Err(NextcloudError::Config(format!(
                "NEXTCLOUD_HOST must use http or https, got {}",
                host.scheme()
            )));
        }

        let timeout_secs = raw.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(NextcloudError::Config(
                "NEXTCLOUD_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(Config {
            host,
            username: required(raw.username, "NEXTCLOUD_USERNAME")?,
            password: required(raw.password, "NEXTCLOUD_PASSWORD")?,
            timeout: Duration::from_secs(timeout_secs),
            bearer_token: raw.mcp_bearer_token.filter(|t| !t.trim().is_empty()),
        })
    }
}

fn required(value: Option<String>, name: &str) -> NextcloudResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| NextcloudError::Config(format!("{name} must be set")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_load_from_env() {
        let config = Config::load_with_env(
            None,
            env(&[
                ("NEXTCLOUD_HOST", "https://cloud.example.com"),
                ("NEXTCLOUD_USERNAME", "alice"),
                ("NEXTCLOUD_PASSWORD", "app-password"),
            ]),
        )
        .unwrap();

        assert_eq!(config.host.as_str(), "https://cloud.example.com/");
        assert_eq!(config.username, "alice");
        assert_eq!(config.password, "app-password");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.bearer_token.is_none());
    }

    #[test]
    fn test_bearer_token_and_timeout() {
        let config = Config::load_with_env(
            None,
            env(&[
                ("NEXTCLOUD_HOST", "http://localhost:8080"),
                ("NEXTCLOUD_USERNAME", "admin"),
                ("NEXTCLOUD_PASSWORD", "admin"),
                ("NEXTCLOUD_TIMEOUT_SECS", "5"),
                ("NEXTCLOUD_MCP_BEARER_TOKEN", "s3cret"),
            ]),
        )
        .unwrap();

        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.bearer_token.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_blank_bearer_token_disables_gate() {
        let config = Config::load_with_env(
            None,
            env(&[
                ("NEXTCLOUD_HOST", "http://localhost:8080"),
                ("NEXTCLOUD_USERNAME", "admin"),
                ("NEXTCLOUD_PASSWORD", "admin"),
                ("NEXTCLOUD_MCP_BEARER_TOKEN", "  "),
            ]),
        )
        .unwrap();

        assert!(config.bearer_token.is_none());
    }

    #[test]
    fn test_legacy_bearer_token_enables_gate() {
        let base = [
            ("NEXTCLOUD_HOST", "http://localhost:8080"),
            ("NEXTCLOUD_USERNAME", "admin"),
            ("NEXTCLOUD_PASSWORD", "admin"),
            ("FASTMCP_BEARER_TOKEN", "old-token"),
        ];
        let config = Config::load_with_env(None, env(&base)).unwrap();
        assert_eq!(config.bearer_token.as_deref(), Some("old-token"));

        let mut both = base.to_vec();
        both.push(("NEXTCLOUD_MCP_BEARER_TOKEN", "new-token"));
        let config = Config::load_with_env(None, env(&both)).unwrap();
        assert_eq!(config.bearer_token.as_deref(), Some("new-token"));
    }

    #[test]
    fn test_missing_host_is_fatal() {
        let err = Config::load_with_env(
            None,
            env(&[
                ("NEXTCLOUD_USERNAME", "alice"),
                ("NEXTCLOUD_PASSWORD", "pw"),
            ]),
        )
        .unwrap_err();

        assert!(matches!(err, NextcloudError::Config(ref m) if m.contains("NEXTCLOUD_HOST")));
    }

    #[test]
    fn test_missing_password_is_fatal() {
        let err = Config::load_with_env(
            None,
            env(&[
                ("NEXTCLOUD_HOST", "https://cloud.example.com"),
                ("NEXTCLOUD_USERNAME", "alice"),
            ]),
        )
        .unwrap_err();

        assert!(matches!(err, NextcloudError::Config(ref m) if m.contains("NEXTCLOUD_PASSWORD")));
    }

    #[test]
    fn test_malformed_host_is_fatal() {
        let err = Config::load_with_env(
            None,
            env(&[
                ("NEXTCLOUD_HOST", "not a url"),
                ("NEXTCLOUD_USERNAME", "alice"),
                ("NEXTCLOUD_PASSWORD", "pw"),
            ]),
        )
        .unwrap_err();
        assert!(matches!(err, NextcloudError::Config(_)));

        let err = Config::load_with_env(
            None,
            env(&[
                ("NEXTCLOUD_HOST", "ftp://cloud.example.com"),
                ("NEXTCLOUD_USERNAME", "alice"),
                ("NEXTCLOUD_PASSWORD", "pw"),
            ]),
        )
        .unwrap_err();
        assert!(matches!(err, NextcloudError::Config(ref m) if m.contains("http or https")));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = Config::load_with_env(
            None,
            env(&[
                ("NEXTCLOUD_HOST", "https://cloud.example.com"),
                ("NEXTCLOUD_USERNAME", "alice"),
                ("NEXTCLOUD_PASSWORD", "pw"),
                ("NEXTCLOUD_TIMEOUT_SECS", "0"),
            ]),
        )
        .unwrap_err();
        assert!(matches!(err, NextcloudError::Config(_)));
    }

    #[test]
    fn test_file_overlaid_by_env() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            "host = \"https://file.example.com\"\nusername = \"from-file\"\npassword = \"file-pw\""
        )
        .unwrap();

        let config = Config::load_with_env(
            Some(file.path()),
            env(&[("NEXTCLOUD_USERNAME", "from-env")]),
        )
        .unwrap();

        assert_eq!(config.host.as_str(), "https://file.example.com/");
        assert_eq!(config.username, "from-env");
        assert_eq!(config.password, "file-pw");
    }

    #[test]
    fn test_missing_config_file() {
        let err = Config::load_with_env(
            Some(Path::new("/definitely/not/here.toml")),
            env(&[]),
        )
        .unwrap_err();
        assert!(matches!(err, NextcloudError::Config(ref m) if m.contains("does not exist")));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config {
            host: Url::parse("https://cloud.example.com").unwrap(),
            username: "alice".into(),
            password: "hunter2".into(),
            timeout: Duration::from_secs(30),
            bearer_token: Some("tok".into()),
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("\"tok\""));
    }
}
