//! Degrading failed service calls to empty values.

use std::fmt::Display;

/// Returns the success value, or logs the failure and returns `T::default()`.
pub fn recover<T, E>(stage: &str, what: &str, result: Result<T, E>) -> T
where
    T: Default,
    E: Display,
{
    recover_with(stage, what, result, T::default)
}

/// Returns the success value, or logs the failure and returns `fallback()`.
pub fn recover_with<T, E, F>(stage: &str, what: &str, result: Result<T, E>, fallback: F) -> T
where
    E: Display,
    F: FnOnce() -> T,
{
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(stage, error = %e, "{what} failed, using fallback");
            fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recover_passes_success_through() {
        assert_eq!(recover::<_, String>("outline", "planning", Ok(vec![1])), vec![1]);
    }

    #[test]
    fn test_recover_defaults_on_failure() {
        let value: Vec<u8> = recover("outline", "planning", Err("timeout"));
        assert!(value.is_empty());
    }

    #[test]
    fn test_recover_with_custom_fallback() {
        let value = recover_with("media", "keyword", Err::<String, _>("down"), || "Intro".to_string());
        assert_eq!(value, "Intro");
    }
}
