mod common;

use std::time::Duration;

use common::add;
use easy_worker::{default_workers, Config, ConfigError, Func, Value, DEFAULT_RETRIES};

#[test]
fn test_builder_defaults() {
    let config = Config::builder(Func::new(add)).build().unwrap();
    assert_eq!(config.workers(), default_workers());
    assert_eq!(config.retries(), DEFAULT_RETRIES);
    assert_eq!(config.retry_delay(), Duration::ZERO);
    assert!(default_workers() >= 1);
}

#[test]
fn test_custom_settings() {
    let config = Config::builder(Func::new(add))
        .with_workers(3)
        .with_retries(0)
        .with_retry_delay(Duration::from_millis(25))
        .build()
        .unwrap();
    assert_eq!(config.workers(), 3);
    assert_eq!(config.retries(), 0);
    assert_eq!(config.retry_delay(), Duration::from_millis(25));
    assert!(matches!(config.target(), Value::Func(_)));
}

#[test]
fn test_target_must_be_callable() {
    let err = Config::new(42, 2, 1, Duration::ZERO).unwrap_err();
    assert_eq!(err, ConfigError::NotCallable("int"));

    let err = Config::new("add", 2, 1, Duration::ZERO).unwrap_err();
    assert_eq!(err, ConfigError::NotCallable("string"));
}

#[test]
fn test_zero_workers_rejected() {
    let err = Config::new(Func::new(add), 0, 1, Duration::ZERO).unwrap_err();
    assert_eq!(err, ConfigError::InvalidWorkerCount(0));
    assert_eq!(err.as_label(), "config_invalid_worker_count");
}
