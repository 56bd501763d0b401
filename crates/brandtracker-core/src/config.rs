use crate::app_config::AppConfig;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is present but holds an invalid value.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is present but holds an invalid value.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u64 = |var: &str, raw: &str| -> Result<u64, ConfigError> {
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let api_base_url = or_default("BRANDTRACKER_API_URL", "http://localhost:8000");
    if api_base_url.trim().is_empty() {
        return Err(ConfigError::InvalidEnvVar {
            var: "BRANDTRACKER_API_URL".to_string(),
            reason: "must not be empty".to_string(),
        });
    }

    let poll_interval_secs = parse_u64(
        "BRANDTRACKER_POLL_INTERVAL_SECS",
        &or_default("BRANDTRACKER_POLL_INTERVAL_SECS", "3"),
    )?;
    if poll_interval_secs == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "BRANDTRACKER_POLL_INTERVAL_SECS".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }

    let request_timeout_secs = parse_u64(
        "BRANDTRACKER_REQUEST_TIMEOUT_SECS",
        &or_default("BRANDTRACKER_REQUEST_TIMEOUT_SECS", "30"),
    )?;

    let user_agent = or_default(
        "BRANDTRACKER_USER_AGENT",
        "brandtracker/0.1 (sponsor-analysis)",
    );

    let max_wait_secs = lookup("BRANDTRACKER_MAX_WAIT_SECS")
        .ok()
        .map(|raw| parse_u64("BRANDTRACKER_MAX_WAIT_SECS", &raw))
        .transpose()?;

    let log_level = or_default("BRANDTRACKER_LOG_LEVEL", "info");

    Ok(AppConfig {
        api_base_url,
        poll_interval_secs,
        request_timeout_secs,
        user_agent,
        max_wait_secs,
        log_level,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
