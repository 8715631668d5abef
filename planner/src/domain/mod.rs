//! Domain types and services for route planning.
//!
//! Purpose: Model route queries and results, and orchestrate fetching,
//! caching and map rendering behind ports so adapters stay replaceable.
//!
//! Public surface:
//! - RouteQuery / RouteResult: the request and its immutable answer.
//! - RouteDataCache: single-flight, session-lifetime route cache.
//! - MapLifecycleController: owner of the one interactive map widget.
//! - AddressSuggestionDebouncer: per-field debounced search-ahead.
//! - RouteView: stale-response suppression for the route page.

pub mod featured;
pub mod map_lifecycle;
pub mod ports;
pub mod route;
pub mod route_cache;
pub mod route_result;
pub mod route_view;
pub mod suggestions;
pub mod viewport;

pub use self::featured::{
    FEATURED_ROUTES, FeaturedRoute, FeaturedRouteDetails, find_featured, load_featured,
    warm_featured,
};
pub use self::map_lifecycle::{
    MapLifecycleController, MapLifecycleState, RenderOutcome, RenderSkip, RenderSummary,
    ViewportFit,
};
pub use self::route::{ActivityMode, RouteQuery, RouteQueryValidationError, UnitSystem};
pub use self::route_cache::{CacheEntry, RouteDataCache, RouteOutcome, WarmReport};
pub use self::route_result::{LatLng, RouteResult, RouteStep, Waypoint, format_duration};
pub use self::route_view::{
    MapFailureKind, MapFailureNotice, RouteView, RouteViewContent, ViewUpdate,
};
pub use self::suggestions::{AddressSuggestionDebouncer, DebounceSettings, SuggestionField};
pub use self::viewport::{DEFAULT_CENTER, DEFAULT_ZOOM, FitPadding, LatLngBounds, Viewport};
