use std::{collections::HashMap, fs, path::Path, time::Duration};

use thiserror::Error;

pub const DEFAULT_API_BASE_URL: &str = "https://api.unsplash.com";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing API access token; set UNSPLASH_ACCESS_KEY or access_token in the config file")]
    MissingAccessToken,
    #[error("api base url '{0}' is not a valid http(s) url")]
    InvalidBaseUrl(String),
    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub access_token: String,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            api_base_url: DEFAULT_API_BASE_URL.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = token.into();
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Rejects configurations that could only produce doomed network calls.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_token.trim().is_empty() {
            return Err(ConfigError::MissingAccessToken);
        }
        match url::Url::parse(&self.api_base_url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => return Err(ConfigError::InvalidBaseUrl(self.api_base_url.clone())),
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

/// Defaults, then the optional TOML file at `path`, then the process environment.
pub fn load_settings(path: impl AsRef<Path>) -> Settings {
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string(path.as_ref()) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<HashMap<String, toml::Value>>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(err) => {
            tracing::warn!("ignoring unreadable config file: {err}");
            return;
        }
    };

    if let Some(v) = file_cfg.get("access_token").and_then(toml::Value::as_str) {
        settings.access_token = v.to_string();
    }
    if let Some(v) = file_cfg.get("api_base_url").and_then(toml::Value::as_str) {
        settings.api_base_url = v.to_string();
    }
    match file_cfg.get("request_timeout_secs") {
        Some(toml::Value::Integer(v)) if *v >= 0 => settings.request_timeout_secs = *v as u64,
        Some(toml::Value::String(v)) => {
            if let Ok(parsed) = v.parse::<u64>() {
                settings.request_timeout_secs = parsed;
            }
        }
        _ => {}
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("UNSPLASH_ACCESS_KEY") {
        settings.access_token = v;
    }
    if let Some(v) = var("APP__ACCESS_TOKEN") {
        settings.access_token = v;
    }

    if let Some(v) = var("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = var("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        env,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;

    #[test]
    fn default_settings_fail_fast_without_token() {
        assert_eq!(
            Settings::default().validate(),
            Err(ConfigError::MissingAccessToken)
        );
        assert_eq!(
            Settings::default().with_access_token("   ").validate(),
            Err(ConfigError::MissingAccessToken)
        );
    }

    #[test]
    fn token_and_default_endpoint_validate() {
        let settings = Settings::default().with_access_token("token");
        assert_eq!(settings.validate(), Ok(()));
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn rejects_non_http_base_url_and_zero_timeout() {
        let mut settings = Settings::default().with_access_token("token");
        settings.api_base_url = "ftp://example.com".into();
        assert_eq!(
            settings.validate(),
            Err(ConfigError::InvalidBaseUrl("ftp://example.com".into()))
        );

        let mut settings = Settings::default().with_access_token("token");
        settings.request_timeout_secs = 0;
        assert_eq!(settings.validate(), Err(ConfigError::ZeroTimeout));
    }

    #[test]
    fn file_values_apply_and_app_prefixed_env_wins() {
        let mut settings = Settings::default();
        apply_file(
            &mut settings,
            "access_token = \"from-file\"\napi_base_url = \"http://127.0.0.1:9\"\nrequest_timeout_secs = 5\n",
        );
        assert_eq!(settings.access_token, "from-file");
        assert_eq!(settings.api_base_url, "http://127.0.0.1:9");
        assert_eq!(settings.request_timeout_secs, 5);

        apply_env(&mut settings, |key| match key {
            "UNSPLASH_ACCESS_KEY" => Some("from-unsplash-env".into()),
            "APP__ACCESS_TOKEN" => Some("from-app-env".into()),
            "APP__REQUEST_TIMEOUT_SECS" => Some("not-a-number".into()),
            _ => None,
        });
        assert_eq!(settings.access_token, "from-app-env");
        assert_eq!(settings.request_timeout_secs, 5);
    }

    #[test]
    fn unreadable_file_keeps_defaults() {
        let mut settings = Settings::default();
        apply_file(&mut settings, "this is = = not toml");
        assert_eq!(settings.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn load_settings_reads_file_from_disk() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = env::temp_dir().join(format!("find_or_lose_config_test_{suffix}.toml"));
        fs::write(&path, "api_base_url = \"http://localhost:1234\"\n").expect("write config");

        let settings = load_settings(&path);
        assert_eq!(settings.api_base_url, "http://localhost:1234");

        fs::remove_file(path).expect("cleanup");
    }
}
