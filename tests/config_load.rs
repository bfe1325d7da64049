//! Exercises [`AppConfig::load`]'s environment-variable layer. Serialized
//! with `serial_test` since every case in this file mutates the real
//! process environment and would otherwise race with the others.

use serial_test::serial;

const ENV_VARS: &[&str] = &[
    "AIROUTER__JWT_SECRET",
    "AIROUTER__RETRY__MAX_ATTEMPTS",
    "AIROUTER__WORKER__CONCURRENCY",
];

fn clear_env() {
    for key in ENV_VARS {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn load_falls_back_to_defaults_with_no_env_vars_set() {
    clear_env();
    let config = airouter::AppConfig::load().expect("defaults-only load succeeds");
    assert_eq!(config.jwt_secret, "");
    assert_eq!(config.worker.concurrency, airouter::AppConfig::default().worker.concurrency);
    clear_env();
}

#[test]
#[serial]
fn load_applies_double_underscore_nested_env_overrides() {
    clear_env();
    std::env::set_var("AIROUTER__JWT_SECRET", "from-env");
    std::env::set_var("AIROUTER__RETRY__MAX_ATTEMPTS", "7");
    std::env::set_var("AIROUTER__WORKER__CONCURRENCY", "16");

    let config = airouter::AppConfig::load().expect("env-overridden load succeeds");

    assert_eq!(config.jwt_secret, "from-env");
    assert_eq!(config.retry.max_attempts, 7);
    assert_eq!(config.worker.concurrency, 16);

    clear_env();
}
