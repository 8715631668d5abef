//! Driven port for search-ahead address suggestions.

use async_trait::async_trait;
use serde::Serialize;

use super::define_port_error;

/// One candidate address offered while the user types.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressSuggestion {
    /// Display text for the candidate.
    pub display: String,
    /// Latitude when the backend geocoded the candidate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    /// Longitude when the backend geocoded the candidate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}

define_port_error! {
    /// Failures surfaced by a suggestion lookup.
    pub enum AddressSuggestionSourceError {
        /// Transport failed or the backend returned a non-success status.
        Transport { message: String } => "suggestion lookup failed: {message}",
        /// Response body could not be decoded.
        Decode { message: String } => "suggestion response decode failed: {message}",
    }
}

/// Port for looking up address candidates from free text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AddressSuggestionSource: Send + Sync {
    /// Return at most `max_results` ordered candidates for `text`.
    async fn suggest(
        &self,
        text: &str,
        max_results: usize,
    ) -> Result<Vec<AddressSuggestion>, AddressSuggestionSourceError>;
}

/// Fixture implementation that never suggests anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureAddressSuggestionSource;

#[async_trait]
impl AddressSuggestionSource for FixtureAddressSuggestionSource {
    async fn suggest(
        &self,
        _text: &str,
        _max_results: usize,
    ) -> Result<Vec<AddressSuggestion>, AddressSuggestionSourceError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn fixture_never_suggests() {
        let suggestions = FixtureAddressSuggestionSource
            .suggest("Rizal", 6)
            .await
            .expect("fixture succeeds");
        assert!(suggestions.is_empty());
    }

    #[rstest]
    fn error_kinds_separate_transport_from_decoding() {
        assert_eq!(
            AddressSuggestionSourceError::transport("timeout").kind(),
            "transport"
        );
        assert_eq!(
            AddressSuggestionSourceError::decode("not JSON").to_string(),
            "suggestion response decode failed: not JSON"
        );
    }
}
