//! Environment variable parsing helpers shared by pool and service configuration.

use std::str::FromStr;

/// Parse an environment variable, falling back to `default` when missing or malformed.
pub fn parse_env_with_default<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[serial_test::serial]
    fn falls_back_on_garbage() {
        std::env::set_var("DB_POOL_TEST_GARBAGE", "not-a-number");
        assert_eq!(parse_env_with_default("DB_POOL_TEST_GARBAGE", 7u32), 7);
        std::env::remove_var("DB_POOL_TEST_GARBAGE");
    }

    #[test]
    #[serial_test::serial]
    fn reads_valid_value() {
        std::env::set_var("DB_POOL_TEST_VALID", "42");
        assert_eq!(parse_env_with_default("DB_POOL_TEST_VALID", 7u32), 42);
        std::env::remove_var("DB_POOL_TEST_VALID");
    }
}
