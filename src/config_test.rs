use super::*;

#[test]
fn env_bool_accepts_common_spellings() {
    let cases = [("1", Some(true)), ("Yes", Some(true)), ("on", Some(true)), ("0", Some(false)), ("off", Some(false)), ("maybe", None)];
    for (i, (raw, expected)) in cases.into_iter().enumerate() {
        let key = format!("__PC_TEST_COOKIE_FLAG_{i}__");
        unsafe { std::env::set_var(&key, raw) };
        assert_eq!(env_bool(&key), expected, "COOKIE_SECURE={raw:?}");
        unsafe { std::env::remove_var(&key) };
    }
    assert_eq!(env_bool("__PC_TEST_COOKIE_FLAG_UNSET__"), None);
}

// =============================================================================
// env_parse
// =============================================================================

#[test]
fn env_parse_reads_value() {
    let key = "__PC_TEST_EP_VALUE_313__";
    unsafe { std::env::set_var(key, " 42 ") };
    assert_eq!(env_parse(key, 7_u32), 42);
    unsafe { std::env::remove_var(key) };
}

#[test]
fn env_parse_falls_back_on_garbage() {
    let key = "__PC_TEST_EP_GARBAGE_314__";
    unsafe { std::env::set_var(key, "lots") };
    assert_eq!(env_parse(key, 7_u32), 7);
    unsafe { std::env::remove_var(key) };
}

#[test]
fn env_parse_unset_uses_default() {
    assert!((env_parse("__PC_TEST_EP_UNSET_315__", 16.0_f64) - 16.0).abs() < f64::EPSILON);
}

// =============================================================================
// AppConfig
// =============================================================================

#[test]
fn with_database_url_uses_defaults() {
    let config = AppConfig::with_database_url("postgres://x");
    assert_eq!(config.database_url, "postgres://x");
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.session_ttl_hours, DEFAULT_SESSION_TTL_HOURS);
    assert!(!config.cookie_secure);
}
