//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod address_suggestion_source;
mod cache_key;
mod map_widget;
mod route_fetch_client;

#[cfg(test)]
pub use address_suggestion_source::MockAddressSuggestionSource;
pub use address_suggestion_source::{
    AddressSuggestion, AddressSuggestionSource, AddressSuggestionSourceError,
    FixtureAddressSuggestionSource,
};
pub use cache_key::RouteCacheKey;
pub use map_widget::{
    MapLibrary, MapWidget, MarkerRole, MarkerSpec, MountPoint, OverlayError, OverlayId,
    PolylineSpec, WidgetInitError,
};
#[cfg(test)]
pub use route_fetch_client::MockRouteFetchClient;
pub use route_fetch_client::{FixtureRouteFetchClient, RouteFetchClient, RouteFetchError};
