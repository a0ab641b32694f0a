use std::str::FromStr;

use crate::app_config::{
    default_entity_timeout_secs, AnalysisConfig, SimilarityWeights, SourceSettings, SourceTable,
};
use crate::profile::SourceId;
use crate::ConfigError;

/// Load analysis configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are malformed or fail validation.
pub fn load_analysis_config() -> Result<AnalysisConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_analysis_config_from_env()
}

/// Load analysis configuration from environment variables already in the process.
///
/// Unlike [`load_analysis_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if values are malformed or fail validation.
pub fn load_analysis_config_from_env() -> Result<AnalysisConfig, ConfigError> {
    build_analysis_config(|key| std::env::var(key))
}

/// Build and validate the configuration from an env-var lookup function.
///
/// Every variable is optional; unset variables take their documented default.
fn build_analysis_config<F>(lookup: F) -> Result<AnalysisConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let defaults = AnalysisConfig::default();

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse_bool = |var: &str, default: bool| -> Result<bool, ConfigError> {
        match lookup(var) {
            Err(_) => Ok(default),
            Ok(raw) => parse_flag(&raw).ok_or_else(|| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("expected a boolean, got '{raw}'"),
            }),
        }
    };

    let source_settings = |source: SourceId| -> Result<SourceSettings, ConfigError> {
        let name = source.env_name();
        let fallback = defaults.sources.get(source);
        Ok(SourceSettings {
            requests_per_minute: parse_num(
                &lookup,
                &format!("COMPINTEL_{name}_RPM"),
                fallback.requests_per_minute,
            )?,
            enabled: parse_bool(&format!("COMPINTEL_{name}_ENABLED"), fallback.enabled)?,
            fallback_enabled: parse_bool(
                &format!("COMPINTEL_{name}_FALLBACK"),
                fallback.fallback_enabled,
            )?,
            base_url: optional(&format!("COMPINTEL_{name}_URL")),
            api_key: optional(&format!("COMPINTEL_{name}_API_KEY")),
        })
    };

    let sources = SourceTable {
        registry: source_settings(SourceId::Registry)?,
        financial: source_settings(SourceId::Financial)?,
        seo: source_settings(SourceId::Seo)?,
        social: source_settings(SourceId::Social)?,
        search: source_settings(SourceId::Search)?,
    };

    let cache_ttl_secs = parse_num(&lookup, "COMPINTEL_CACHE_TTL_SECS", defaults.cache_ttl_secs)?;
    let cache_capacity = parse_num(&lookup, "COMPINTEL_CACHE_CAPACITY", defaults.cache_capacity)?;
    let max_retries = parse_num(&lookup, "COMPINTEL_MAX_RETRIES", defaults.max_retries)?;
    let backoff_base_ms = parse_num(&lookup, "COMPINTEL_BACKOFF_BASE_MS", defaults.backoff_base_ms)?;
    let backoff_cap_ms = parse_num(&lookup, "COMPINTEL_BACKOFF_CAP_MS", defaults.backoff_cap_ms)?;
    let request_timeout_secs = parse_num(
        &lookup,
        "COMPINTEL_REQUEST_TIMEOUT_SECS",
        defaults.request_timeout_secs,
    )?;
    let entity_timeout_secs = parse_num(
        &lookup,
        "COMPINTEL_ENTITY_TIMEOUT_SECS",
        default_entity_timeout_secs(request_timeout_secs, max_retries),
    )?;
    let run_timeout_secs = parse_num(&lookup, "COMPINTEL_RUN_TIMEOUT_SECS", defaults.run_timeout_secs)?;
    let worker_pool_size = parse_num(
        &lookup,
        "COMPINTEL_WORKER_POOL_SIZE",
        defaults.worker_pool_size,
    )?;
    let rate_limit_wait_secs = parse_num(
        &lookup,
        "COMPINTEL_RATE_LIMIT_WAIT_SECS",
        defaults.rate_limit_wait_secs,
    )?;

    let similarity_weights = match lookup("COMPINTEL_SIMILARITY_WEIGHTS") {
        Err(_) => defaults.similarity_weights,
        Ok(raw) => parse_weights(&raw)?,
    };
    let strength_percentile = parse_num(
        &lookup,
        "COMPINTEL_STRENGTH_PERCENTILE",
        defaults.strength_percentile,
    )?;
    let weakness_percentile = parse_num(
        &lookup,
        "COMPINTEL_WEAKNESS_PERCENTILE",
        defaults.weakness_percentile,
    )?;
    let log_level = or_default("COMPINTEL_LOG_LEVEL", &defaults.log_level);

    let config = AnalysisConfig {
        sources,
        cache_ttl_secs,
        cache_capacity,
        max_retries,
        backoff_base_ms,
        backoff_cap_ms,
        request_timeout_secs,
        entity_timeout_secs,
        run_timeout_secs,
        worker_pool_size,
        rate_limit_wait_secs,
        similarity_weights,
        strength_percentile,
        weakness_percentile,
        log_level,
    };
    config.validate()?;
    Ok(config)
}

fn parse_num<F, T>(lookup: &F, var: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Err(_) => Ok(default),
        Ok(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Parse `"sector,keywords,audience"`, e.g. `"0.5,0.3,0.2"`.
fn parse_weights(raw: &str) -> Result<SimilarityWeights, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEnvVar {
        var: "COMPINTEL_SIMILARITY_WEIGHTS".to_string(),
        reason,
    };
    let parts = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| invalid(e.to_string()))?;
    match parts.as_slice() {
        [sector, keywords, audience] => Ok(SimilarityWeights {
            sector: *sector,
            keywords: *keywords,
            audience: *audience,
        }),
        _ => Err(invalid(format!(
            "expected three comma-separated weights, got {}",
            parts.len()
        ))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
