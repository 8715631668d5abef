//! Routing backend outbound adapters.
//!
//! This module provides a thin HTTP implementation of the `RouteFetchClient`
//! and `AddressSuggestionSource` ports.

mod dto;
mod http_client;

pub use http_client::RoutingHttpClient;
