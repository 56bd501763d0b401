use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn build_app_config_uses_defaults_with_empty_env() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).expect("defaults should be valid");
    assert_eq!(cfg.api_base_url, "http://localhost:8000");
    assert_eq!(cfg.poll_interval_secs, 3);
    assert_eq!(cfg.request_timeout_secs, 30);
    assert_eq!(cfg.user_agent, "brandtracker/0.1 (sponsor-analysis)");
    assert!(cfg.max_wait_secs.is_none());
    assert_eq!(cfg.log_level, "info");
}

#[test]
fn build_app_config_reads_overrides() {
    let mut map = HashMap::new();
    map.insert("BRANDTRACKER_API_URL", "https://analysis.internal:9000");
    map.insert("BRANDTRACKER_POLL_INTERVAL_SECS", "5");
    map.insert("BRANDTRACKER_REQUEST_TIMEOUT_SECS", "60");
    map.insert("BRANDTRACKER_USER_AGENT", "custom-agent/2.0");
    map.insert("BRANDTRACKER_MAX_WAIT_SECS", "600");
    map.insert("BRANDTRACKER_LOG_LEVEL", "debug");

    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.api_base_url, "https://analysis.internal:9000");
    assert_eq!(cfg.poll_interval_secs, 5);
    assert_eq!(cfg.request_timeout_secs, 60);
    assert_eq!(cfg.user_agent, "custom-agent/2.0");
    assert_eq!(cfg.max_wait_secs, Some(600));
    assert_eq!(cfg.log_level, "debug");
}

#[test]
fn build_app_config_rejects_zero_poll_interval() {
    let mut map = HashMap::new();
    map.insert("BRANDTRACKER_POLL_INTERVAL_SECS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "BRANDTRACKER_POLL_INTERVAL_SECS"),
        "expected InvalidEnvVar(BRANDTRACKER_POLL_INTERVAL_SECS), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_non_numeric_timeout() {
    let mut map = HashMap::new();
    map.insert("BRANDTRACKER_REQUEST_TIMEOUT_SECS", "not-a-number");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "BRANDTRACKER_REQUEST_TIMEOUT_SECS"),
        "expected InvalidEnvVar(BRANDTRACKER_REQUEST_TIMEOUT_SECS), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_invalid_max_wait() {
    let mut map = HashMap::new();
    map.insert("BRANDTRACKER_MAX_WAIT_SECS", "-1");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "BRANDTRACKER_MAX_WAIT_SECS"),
        "expected InvalidEnvVar(BRANDTRACKER_MAX_WAIT_SECS), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_blank_api_url() {
    let mut map = HashMap::new();
    map.insert("BRANDTRACKER_API_URL", "   ");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "BRANDTRACKER_API_URL"));
}
