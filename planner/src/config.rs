//! Planner configuration loaded via OrthoConfig.

use std::num::NonZeroUsize;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::domain::DebounceSettings;
use crate::domain::suggestions::{DEFAULT_MAX_RESULTS, DEFAULT_QUIET_PERIOD};

const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration values for the routing backend, cache and search-ahead.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "WALKS")]
pub struct PlannerSettings {
    /// Base URL of the routing backend.
    pub backend_url: Option<String>,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: Option<u64>,
    /// Search-ahead quiet period in milliseconds.
    pub suggestion_quiet_period_ms: Option<u64>,
    /// Maximum suggestions requested per lookup.
    pub suggestion_max_results: Option<usize>,
    /// Route cache capacity; absent or zero means unbounded.
    pub cache_capacity: Option<usize>,
    /// Warm the featured walks before serving a command.
    #[ortho_config(default = false)]
    pub warm_featured: bool,
}

/// Settings that cannot be turned into a working configuration.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The backend URL does not parse or cannot carry a path.
    #[error("invalid backend URL {url:?}: {reason}")]
    InvalidBackendUrl {
        /// Rejected value.
        url: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl PlannerSettings {
    /// Return the backend URL, falling back to the local default.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidBackendUrl`] when the value is not an
    /// absolute URL that can carry a path.
    pub fn backend_url(&self) -> Result<Url, SettingsError> {
        let raw = self.backend_url.as_deref().unwrap_or(DEFAULT_BACKEND_URL);
        let url = Url::parse(raw).map_err(|error| SettingsError::InvalidBackendUrl {
            url: raw.to_owned(),
            reason: error.to_string(),
        })?;
        if url.cannot_be_a_base() {
            return Err(SettingsError::InvalidBackendUrl {
                url: raw.to_owned(),
                reason: "URL cannot carry a path".to_owned(),
            });
        }
        Ok(url)
    }

    /// Return the request timeout, falling back to ten seconds.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_ms
            .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_millis)
    }

    /// Return the debounce settings, falling back to 300 ms and six results.
    pub fn debounce(&self) -> DebounceSettings {
        DebounceSettings {
            quiet_period: self
                .suggestion_quiet_period_ms
                .map_or(DEFAULT_QUIET_PERIOD, Duration::from_millis),
            max_results: self
                .suggestion_max_results
                .filter(|max| *max > 0)
                .unwrap_or(DEFAULT_MAX_RESULTS),
        }
    }

    /// Return the cache capacity; `None` means unbounded.
    pub fn cache_capacity(&self) -> Option<NonZeroUsize> {
        self.cache_capacity.and_then(NonZeroUsize::new)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for planner configuration parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 6] = [
        "WALKS_BACKEND_URL",
        "WALKS_REQUEST_TIMEOUT_MS",
        "WALKS_SUGGESTION_QUIET_PERIOD_MS",
        "WALKS_SUGGESTION_MAX_RESULTS",
        "WALKS_CACHE_CAPACITY",
        "WALKS_WARM_FEATURED",
    ];

    fn load_from_empty_args() -> PlannerSettings {
        PlannerSettings::load_from_iter([OsString::from("walk-planner")])
            .expect("config should load")
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env(VARS.map(|name| (name, None::<String>)));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.backend_url().expect("default URL").as_str(),
            "http://localhost:8000/"
        );
        assert_eq!(settings.request_timeout(), Duration::from_secs(10));
        assert_eq!(settings.debounce(), DebounceSettings::default());
        assert!(settings.cache_capacity().is_none());
        assert!(!settings.warm_featured);
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("WALKS_BACKEND_URL", Some("https://walks.example/backend".to_owned())),
            ("WALKS_REQUEST_TIMEOUT_MS", Some("2500".to_owned())),
            ("WALKS_SUGGESTION_QUIET_PERIOD_MS", Some("150".to_owned())),
            ("WALKS_SUGGESTION_MAX_RESULTS", Some("4".to_owned())),
            ("WALKS_CACHE_CAPACITY", Some("12".to_owned())),
            ("WALKS_WARM_FEATURED", Some("true".to_owned())),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(
            settings.backend_url().expect("valid URL").as_str(),
            "https://walks.example/backend"
        );
        assert_eq!(settings.request_timeout(), Duration::from_millis(2_500));
        assert_eq!(
            settings.debounce(),
            DebounceSettings {
                quiet_period: Duration::from_millis(150),
                max_results: 4,
            }
        );
        assert_eq!(settings.cache_capacity(), NonZeroUsize::new(12));
        assert!(settings.warm_featured);
    }

    #[rstest]
    #[case::not_a_url("walks backend")]
    #[case::opaque("mailto:routes@example.test")]
    fn invalid_backend_urls_are_rejected(#[case] raw: &str) {
        let _guard = lock_env([
            ("WALKS_BACKEND_URL", Some(raw.to_owned())),
            ("WALKS_CACHE_CAPACITY", Some("0".to_owned())),
        ]);

        let settings = load_from_empty_args();
        assert!(matches!(
            settings.backend_url(),
            Err(SettingsError::InvalidBackendUrl { .. })
        ));
        assert!(settings.cache_capacity().is_none());
    }
}
