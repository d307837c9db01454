use super::*;

use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| map.get(name).cloned()
}

#[test]
fn file_overrides_defaults_and_env_overrides_file() {
    let mut settings = Settings::default();
    apply_file(
        &mut settings,
        r#"
api_url = "http://desk.internal:8080"
suggestion_interval_ms = 5000
sla_refresh_secs = 0
"#,
    )
    .expect("file");
    apply_env(
        &mut settings,
        env_of(&[
            ("FLOWING_API_URL", "http://ignored:1"),
            ("APP__API_URL", "http://env:9000"),
            ("APP__ML_POLL_INTERVAL_MS", "750"),
        ]),
    );

    assert_eq!(settings.api_url, "http://env:9000");
    assert_eq!(settings.suggestion_interval(), Duration::from_secs(5));
    assert_eq!(settings.sla_refresh(), None);
    assert_eq!(settings.ml_poll_interval(), Duration::from_millis(750));
    assert_eq!(settings.request_timeout(), DEFAULT_TIMEOUT);
}

#[test]
fn default_timeout_matches_client_default() {
    assert_eq!(Settings::default().request_timeout(), DEFAULT_TIMEOUT);
}

#[test]
fn unparsable_numbers_in_env_are_ignored() {
    let mut settings = Settings::default();
    apply_env(&mut settings, env_of(&[("APP__SLA_REFRESH_SECS", "soon")]));
    assert_eq!(settings.sla_refresh(), Some(Duration::from_secs(60)));
}

#[test]
fn unknown_file_keys_are_rejected() {
    let mut settings = Settings::default();
    let err = apply_file(&mut settings, "api_ulr = \"typo\"").expect_err("typo");
    assert!(err.to_string().contains("api_ulr"));
}

#[test]
fn explicit_missing_file_is_an_error() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let missing = env::temp_dir().join(format!("flowing_missing_{suffix}.toml"));

    let err = load_settings(Some(&missing)).expect_err("missing file");
    assert!(format!("{err:#}").contains("failed to read config file"));
}

#[test]
fn explicit_file_is_loaded() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("flowing_config_test_{suffix}.toml"));
    fs::write(&path, "request_timeout_secs = 3\n").expect("write config");

    let settings = load_settings(Some(&path)).expect("settings");
    assert_eq!(settings.request_timeout(), Duration::from_secs(3));

    fs::remove_file(path).expect("cleanup");
}
