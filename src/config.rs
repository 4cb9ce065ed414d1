use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::api_connection::RetryPolicy;
use crate::limiter::DEFAULT_MAX_CONCURRENT_LOOKUPS;
use crate::nutrition::ScaleBounds;
use crate::optim::QaConfig;

pub const ENV_MAX_CONCURRENT_LOOKUPS: &str = "MEAL_ENGINE_MAX_CONCURRENT_LOOKUPS";
pub const ENV_FOOD_TABLE: &str = "MEAL_ENGINE_FOOD_TABLE";
pub const ENV_USDA_API_KEY: &str = "USDA_API_KEY";
pub const ENV_MAX_RETRIES: &str = "MEAL_ENGINE_MAX_RETRIES";
pub const ENV_BASE_DELAY_MS: &str = "MEAL_ENGINE_BASE_DELAY_MS";
pub const ENV_MAX_DELAY_MS: &str = "MEAL_ENGINE_MAX_DELAY_MS";
pub const ENV_QA_PASSES: &str = "MEAL_ENGINE_QA_PASSES";
/// Name of the variable holding the OpenRouter key. The key itself is read at call time.
pub const LLM_API_KEY_ENV_VAR: &str = "OPENROUTER_API_KEY";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_concurrent_lookups: usize,
    /// CSV food table used instead of the built-in one.
    pub food_table: Option<PathBuf>,
    pub usda_api_key: Option<String>,
    pub retry: RetryPolicy,
    pub qa: QaConfig,
    pub scale_bounds: ScaleBounds,
    pub llm_api_key_var: String,
    pub llm_model: Option<String>,
    /// Skip the LLM and plan with the deterministic generator only.
    pub offline: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_lookups: DEFAULT_MAX_CONCURRENT_LOOKUPS,
            food_table: None,
            usda_api_key: None,
            retry: RetryPolicy::default(),
            qa: QaConfig::default(),
            scale_bounds: ScaleBounds::default(),
            llm_api_key_var: LLM_API_KEY_ENV_VAR.to_string(),
            llm_model: None,
            offline: false,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match non_empty_var(name) {
        Some(raw) => raw.parse::<T>().with_context(|| format!("Invalid value '{}' for {}", raw, name)),
        None => Ok(default),
    }
}

impl EngineConfig {
    /// Loads `.env` if present, then reads overrides from the environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let defaults = Self::default();

        let retry = RetryPolicy {
            max_retries: parse_var(ENV_MAX_RETRIES, defaults.retry.max_retries)?,
            base_delay: Duration::from_millis(parse_var(ENV_BASE_DELAY_MS, defaults.retry.base_delay.as_millis() as u64)?),
            max_delay: Duration::from_millis(parse_var(ENV_MAX_DELAY_MS, defaults.retry.max_delay.as_millis() as u64)?),
            ..defaults.retry
        };
        let qa = QaConfig {
            max_passes: parse_var(ENV_QA_PASSES, defaults.qa.max_passes)?,
            ..defaults.qa
        };

        Ok(Self {
            max_concurrent_lookups: parse_var(ENV_MAX_CONCURRENT_LOOKUPS, defaults.max_concurrent_lookups)?.max(1),
            food_table: non_empty_var(ENV_FOOD_TABLE).map(PathBuf::from),
            usda_api_key: non_empty_var(ENV_USDA_API_KEY),
            retry,
            qa,
            offline: non_empty_var(&defaults.llm_api_key_var).is_none(),
            ..defaults
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_default_and_override() {
        env::set_var("MEAL_ENGINE_TEST_PARSE_OK", " 7 ");
        assert_eq!(parse_var("MEAL_ENGINE_TEST_PARSE_OK", 5usize).unwrap(), 7);
        assert_eq!(parse_var("MEAL_ENGINE_TEST_PARSE_UNSET", 5usize).unwrap(), 5);
    }

    #[test]
    fn test_parse_var_rejects_garbage() {
        env::set_var("MEAL_ENGINE_TEST_PARSE_BAD", "five");
        let err = parse_var("MEAL_ENGINE_TEST_PARSE_BAD", 5usize).unwrap_err();
        assert!(err.to_string().contains("MEAL_ENGINE_TEST_PARSE_BAD"));
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_concurrent_lookups, 5);
        assert_eq!(config.qa.max_passes, 1);
        assert_eq!(config.llm_api_key_var, "OPENROUTER_API_KEY");
    }
}
