use std::env::{self, VarError};
use std::time::Duration;

use anyhow::{Context, anyhow};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_ALLOWED_ORIGINS: &str = "https://jiaruilei.github.io";
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct Config {
    /// `None` when the key is unset or blank; only the chat route cares.
    pub api_key: Option<Box<str>>,
    pub port: u16,
    pub openai_base_url: Box<str>,
    pub allowed_origins: Vec<Box<str>>,
    pub upstream_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            port: DEFAULT_PORT,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.into(),
            allowed_origins: parse_origins(DEFAULT_ALLOWED_ORIGINS),
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key))
    }

    fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let var = |key: &str| -> anyhow::Result<Option<String>> {
            match lookup(key) {
                Ok(value) => Ok(Some(value)),
                Err(VarError::NotPresent) => Ok(None),
                Err(err) => Err(anyhow!("Failed to read {key}: {err}")),
            }
        };

        let api_key = var("OPENAI_API_KEY")?
            .map(|key| key.trim().to_owned())
            .filter(|key| !key.is_empty())
            .map(String::into_boxed_str);

        let port = match var("PORT")? {
            Some(port) => port
                .trim()
                .parse::<u16>()
                .with_context(|| format!("Invalid PORT: {port:?}"))?,
            None => DEFAULT_PORT,
        };

        let openai_base_url = var("OPENAI_BASE_URL")?
            .map(|url| url.trim().trim_end_matches('/').to_owned())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.into())
            .into_boxed_str();

        let allowed_origins = parse_origins(
            var("ALLOWED_ORIGINS")?
                .as_deref()
                .unwrap_or(DEFAULT_ALLOWED_ORIGINS),
        );

        let upstream_timeout = match var("UPSTREAM_TIMEOUT_SECS")? {
            Some(secs) => Duration::from_secs(
                secs.trim()
                    .parse()
                    .with_context(|| format!("Invalid UPSTREAM_TIMEOUT_SECS: {secs:?}"))?,
            ),
            None => DEFAULT_UPSTREAM_TIMEOUT,
        };

        Ok(Self {
            api_key,
            port,
            openai_base_url,
            allowed_origins,
            upstream_timeout,
        })
    }

    pub fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.openai_base_url)
    }
}

// Origins are scheme://host[:port]; a trailing slash would never match the
// Origin header a browser sends.
fn parse_origins(raw: &str) -> Vec<Box<str>> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(Box::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned().ok_or(VarError::NotPresent))
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.api_key, None);
        assert_eq!(config.port, 3000);
        assert_eq!(
            config.chat_completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            config.allowed_origins,
            vec![Box::<str>::from("https://jiaruilei.github.io")]
        );
        assert_eq!(config.upstream_timeout, Duration::from_secs(30));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let config = config_from(&[("OPENAI_API_KEY", "   ")]).unwrap();
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("PORT", "8080"),
            ("OPENAI_BASE_URL", "http://localhost:9000/"),
            ("ALLOWED_ORIGINS", "https://a.example, https://b.example/ ,"),
            ("UPSTREAM_TIMEOUT_SECS", "5"),
        ])
        .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.chat_completions_url(),
            "http://localhost:9000/v1/chat/completions"
        );
        assert_eq!(
            config.allowed_origins,
            vec![
                Box::<str>::from("https://a.example"),
                Box::<str>::from("https://b.example"),
            ]
        );
        assert_eq!(config.upstream_timeout, Duration::from_secs(5));
    }

    #[test]
    fn rejects_invalid_port() {
        let error = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(error.to_string().contains("Invalid PORT"));
    }
}
