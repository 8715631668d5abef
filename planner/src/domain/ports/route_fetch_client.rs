//! Driven port for fetching route geometry from the routing backend.
//!
//! Adapters normalise every transport outcome into [`RouteResult`] or one of
//! the [`RouteFetchError`] variants, so callers never see raw HTTP details.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{RouteQuery, RouteQueryValidationError, RouteResult};

define_port_error! {
    /// Failures surfaced while fetching a route.
    pub enum RouteFetchError {
        /// Transport failed before any response arrived.
        Network { message: String } => "network error: {message}",
        /// Backend answered with a non-success status.
        Backend { status: u16, message: String } => "backend error ({status}): {message}",
        /// Backend answered successfully but not with the expected structure.
        Format { message: String } => "unexpected response format: {message}",
        /// Caller supplied a query the backend cannot serve.
        Validation { message: String } => "invalid route request: {message}",
    }
}

impl RouteFetchError {
    /// Human-readable text for the requesting view.
    ///
    /// Backend failures show the server-supplied message on its own; other
    /// failures keep their category prefix.
    pub fn user_message(&self) -> String {
        match self {
            Self::Backend { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<RouteQueryValidationError> for RouteFetchError {
    fn from(error: RouteQueryValidationError) -> Self {
        Self::validation(error.to_string())
    }
}

/// Port for requesting one route from the backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RouteFetchClient: Send + Sync {
    /// Fetch the route described by `query`.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use walk_planner::domain::ports::{FixtureRouteFetchClient, RouteFetchClient};
    /// use walk_planner::domain::RouteQuery;
    ///
    /// let query = RouteQuery::parse("UST", "BGC", "walking", "metric")?;
    /// let route = FixtureRouteFetchClient.fetch(&query).await?;
    /// assert!(route.steps.is_empty());
    /// ```
    async fn fetch(&self, query: &RouteQuery) -> Result<RouteResult, RouteFetchError>;
}

/// Fixture implementation returning an empty route for every query.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureRouteFetchClient;

#[async_trait]
impl RouteFetchClient for FixtureRouteFetchClient {
    async fn fetch(&self, _query: &RouteQuery) -> Result<RouteResult, RouteFetchError> {
        Ok(RouteResult::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn backend_errors_show_the_server_message() {
        let err = RouteFetchError::backend(404_u16, "No route data returned");
        assert_eq!(err.user_message(), "No route data returned");
        assert_eq!(err.to_string(), "backend error (404): No route data returned");
    }

    #[rstest]
    fn validation_errors_convert_from_query_errors() {
        let err = RouteFetchError::from(RouteQueryValidationError::EmptyOrigin);
        assert_eq!(err, RouteFetchError::validation("origin must not be empty"));
    }

    #[rstest]
    #[tokio::test]
    async fn fixture_returns_an_empty_route() {
        let query = RouteQuery::parse("UST", "BGC", "walking", "metric").expect("valid query");
        let route = FixtureRouteFetchClient
            .fetch(&query)
            .await
            .expect("fixture succeeds");
        assert_eq!(route, RouteResult::default());
    }
}
