use airouter_core::{ErrorKind, RouterError};

/// Builds the error the worker pool surfaces when §4.8 step 1 finds the
/// selected provider's breaker open. Classified as retryable so the retry
/// policy rotates to the next provider in the fallback list rather than
/// failing the job outright.
pub fn circuit_open_error(provider: &str) -> RouterError {
    RouterError::new(
        ErrorKind::ProviderTimeout,
        format!("circuit breaker open for provider '{provider}'"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circuit_open_error_is_retryable() {
        let err = circuit_open_error("legal-encoder");
        assert!(err.is_retryable());
        assert!(err.message.contains("legal-encoder"));
    }
}
