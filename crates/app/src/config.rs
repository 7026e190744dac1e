use std::env;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use quiz_core::model::QuizId;
use remote::{AuthContext, Role};

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid {key} value: {raw}")]
    Invalid { key: &'static str, raw: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub api_url: Url,
    pub api_token: SecretString,
    pub candidate: String,
    pub role: Role,
    pub quiz_id: Option<QuizId>,
    pub tick: Duration,
    pub http_timeout: Duration,
}

impl Config {
    /// Read settings from the process environment (after `.env` was loaded).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the token is missing or a value does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let raw_url = var("QUIZ_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = parse_url("QUIZ_API_URL", &raw_url)?;
        let api_token = var("QUIZ_API_TOKEN")
            .map(SecretString::from)
            .ok_or(ConfigError::Missing("QUIZ_API_TOKEN"))?;
        let role = var("QUIZ_ROLE")
            .map_or(Role::Candidate, |raw| raw.parse().unwrap_or(Role::Candidate));
        let quiz_id = var("QUIZ_ID")
            .map(|raw| parse_quiz_id("QUIZ_ID", &raw))
            .transpose()?;
        let tick = var("QUIZ_TICK_MS")
            .map(|raw| parse_positive("QUIZ_TICK_MS", &raw).map(Duration::from_millis))
            .transpose()?
            .unwrap_or(Duration::from_millis(1000));
        let http_timeout = var("QUIZ_HTTP_TIMEOUT_SECS")
            .map(|raw| parse_positive("QUIZ_HTTP_TIMEOUT_SECS", &raw).map(Duration::from_secs))
            .transpose()?
            .unwrap_or(Duration::from_secs(15));

        Ok(Self {
            api_url,
            api_token,
            candidate: var("QUIZ_CANDIDATE").unwrap_or_else(|| "candidate".to_string()),
            role,
            quiz_id,
            tick,
            http_timeout,
        })
    }

    #[must_use]
    pub fn auth_context(&self) -> AuthContext {
        AuthContext::new(self.candidate.clone(), self.role.clone(), self.api_token.clone())
    }
}

pub(crate) fn parse_url(key: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|_| ConfigError::Invalid {
        key,
        raw: raw.to_string(),
    })
}

pub(crate) fn parse_quiz_id(key: &'static str, raw: &str) -> Result<QuizId, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Invalid {
        key,
        raw: raw.to_string(),
    })
}

fn parse_positive(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::Invalid {
            key,
            raw: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_the_token_is_set() {
        let config = config(&[("QUIZ_API_TOKEN", "abc")]).unwrap();
        assert_eq!(config.api_url.as_str(), "http://localhost:8080/api");
        assert_eq!(config.api_token.expose_secret(), "abc");
        assert_eq!(config.candidate, "candidate");
        assert_eq!(config.role, Role::Candidate);
        assert_eq!(config.quiz_id, None);
        assert_eq!(config.tick, Duration::from_secs(1));
        assert_eq!(config.http_timeout, Duration::from_secs(15));
    }

    #[test]
    fn token_is_required() {
        let err = config(&[("QUIZ_API_TOKEN", "  ")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("QUIZ_API_TOKEN")));
    }

    #[test]
    fn explicit_values_are_parsed() {
        let config = config(&[
            ("QUIZ_API_TOKEN", "abc"),
            ("QUIZ_API_URL", "https://quiz.example.com/api"),
            ("QUIZ_CANDIDATE", "ada"),
            ("QUIZ_ROLE", "admin"),
            ("QUIZ_ID", "12"),
            ("QUIZ_TICK_MS", "250"),
            ("QUIZ_HTTP_TIMEOUT_SECS", "3"),
        ])
        .unwrap();
        assert_eq!(config.api_url.host_str(), Some("quiz.example.com"));
        assert_eq!(config.quiz_id, Some(QuizId::new(12)));
        assert_eq!(config.tick, Duration::from_millis(250));
        assert_eq!(config.http_timeout, Duration::from_secs(3));

        let auth = config.auth_context();
        assert_eq!(auth.candidate_name(), "ada");
        assert!(!auth.is_candidate());
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = config(&[("QUIZ_API_TOKEN", "abc"), ("QUIZ_TICK_MS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "QUIZ_TICK_MS", .. }));

        let err = config(&[("QUIZ_API_TOKEN", "abc"), ("QUIZ_ID", "seven")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "QUIZ_ID", .. }));

        let err = config(&[("QUIZ_API_TOKEN", "abc"), ("QUIZ_API_URL", "nope")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "QUIZ_API_URL", .. }));
    }
}
