use std::str::FromStr;

use anyhow::{Context, Result};

use crate::fit::engine::FitTuning;
use crate::fit::simulated::DEFAULT_LINE_HEIGHT;

/// Application configuration loaded from environment variables.
/// Every variable is optional; a value that fails to parse is a startup error.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Line height of the headless layout oracle, relative to the font size.
    pub line_height: f64,
    pub fit: FitTuning,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = FitTuning::default();
        let line_height: f64 = env_or(&lookup, "BIGTEXT_LINE_HEIGHT", DEFAULT_LINE_HEIGHT)?;
        if !(line_height.is_finite() && line_height > 0.0) {
            anyhow::bail!("BIGTEXT_LINE_HEIGHT must be a positive number, got {line_height}");
        }

        let precision_divisor: f64 =
            env_or(&lookup, "FIT_PRECISION_DIVISOR", defaults.precision_divisor)?;
        if !(precision_divisor.is_finite() && precision_divisor > 0.0) {
            anyhow::bail!("FIT_PRECISION_DIVISOR must be a positive number, got {precision_divisor}");
        }
        let min_precision: f64 = env_or(&lookup, "FIT_MIN_PRECISION", defaults.min_precision)?;
        if !(min_precision.is_finite() && min_precision > 0.0) {
            anyhow::bail!("FIT_MIN_PRECISION must be a positive number, got {min_precision}");
        }

        Ok(Config {
            port: env_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            line_height,
            fit: FitTuning {
                precision_divisor,
                min_precision,
                max_estimate_steps: env_or(&lookup, "FIT_MAX_ESTIMATE_STEPS", defaults.max_estimate_steps)?,
                ..defaults
            },
        })
    }
}

fn env_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = config(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");
        assert_eq!(config.line_height, 1.2);
        assert_eq!(config.fit, FitTuning::default());
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = config(&[
            ("PORT", "3000"),
            ("RUST_LOG", "debug"),
            ("BIGTEXT_LINE_HEIGHT", "1.5"),
            ("FIT_PRECISION_DIVISOR", "100"),
            ("FIT_MIN_PRECISION", "0.05"),
            ("FIT_MAX_ESTIMATE_STEPS", "16"),
        ])
        .unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.rust_log, "debug");
        assert_eq!(config.line_height, 1.5);
        assert_eq!(config.fit.precision_divisor, 100.0);
        assert_eq!(config.fit.min_precision, 0.05);
        assert_eq!(config.fit.max_estimate_steps, 16);
        assert_eq!(config.fit.decimals, 1);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        let err = config(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
        assert!(config(&[("FIT_MAX_ESTIMATE_STEPS", "-1")]).is_err());
        assert!(config(&[("BIGTEXT_LINE_HEIGHT", "0")]).is_err());
    }

    #[test]
    fn test_non_positive_precision_is_rejected() {
        for divisor in ["0", "-50", "NaN"] {
            let err = config(&[("FIT_PRECISION_DIVISOR", divisor)]).unwrap_err();
            assert!(err.to_string().contains("FIT_PRECISION_DIVISOR"), "{divisor}: {err}");
        }
        assert!(config(&[("FIT_MIN_PRECISION", "0")]).is_err());
    }
}
