use super::{types::Config, ConfigError};

const MAX_TIMEOUT_SECS: u64 = 300;

/// Validate configuration
/// Currently validates:
/// - At least one scan root and one media extension
/// - Retry count and flush batch size are not 0
/// - Network timeouts are within 1..=300 seconds
/// - Search base URL is not blank
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.scan.roots.is_empty() {
        return Err(ConfigError::ValidationError(
            "scan.roots must list at least one directory".to_string(),
        ));
    }

    if config.scan.extensions.iter().all(|e| e.trim().is_empty()) {
        return Err(ConfigError::ValidationError(
            "scan.extensions cannot be empty".to_string(),
        ));
    }

    if config.download.retry_count == 0 {
        return Err(ConfigError::ValidationError(
            "download.retry_count cannot be 0".to_string(),
        ));
    }

    if config.catalog.flush_batch_size == 0 {
        return Err(ConfigError::ValidationError(
            "catalog.flush_batch_size cannot be 0".to_string(),
        ));
    }

    for (name, value) in [
        ("search.page_timeout_secs", config.search.page_timeout_secs),
        ("search.marker_wait_secs", config.search.marker_wait_secs),
        ("download.timeout_secs", config.download.timeout_secs),
    ] {
        if value == 0 || value > MAX_TIMEOUT_SECS {
            return Err(ConfigError::ValidationError(format!(
                "{} must be between 1 and {} seconds, got {}",
                name, MAX_TIMEOUT_SECS, value
            )));
        }
    }

    if config.search.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "search.base_url cannot be empty".to_string(),
        ));
    }

    Ok(())
}
