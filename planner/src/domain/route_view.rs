//! Consumer of route outcomes: what the route page shows.
//!
//! Fetches are never cancelled when the user navigates. Instead each call to
//! [`RouteView::show`] captures a request token, and an outcome is applied
//! only when its token is still the active one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::map_lifecycle::{MapLifecycleController, RenderOutcome};
use crate::domain::ports::WidgetInitError;
use crate::domain::route_cache::RouteDataCache;
use crate::domain::{RouteQuery, RouteResult};

/// Heading shown in place of the interactive map when it cannot load.
pub const MAP_FAILURE_HEADLINE: &str = "Unable to load map";
const CONFIGURATION_HINT: &str = "API configuration issue. Please contact support.";
const CONTENT_BLOCKING_HINT: &str =
    "If you have an ad blocker enabled, please allow map tiles to load.";

/// Likely cause of a map initialisation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MapFailureKind {
    /// The library rejected its configuration.
    Configuration,
    /// Tiles or the library script were probably blocked.
    ContentBlocked,
}

/// Fallback shown instead of the map, without breaking the rest of the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapFailureNotice {
    /// Classified cause.
    pub kind: MapFailureKind,
    /// Short heading.
    pub headline: &'static str,
    /// Advice for the user.
    pub hint: &'static str,
}

impl MapFailureNotice {
    /// Classify a widget initialisation failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use walk_planner::domain::ports::WidgetInitError;
    /// use walk_planner::domain::{MapFailureKind, MapFailureNotice};
    ///
    /// let notice = MapFailureNotice::from_error(&WidgetInitError::configuration("no key"));
    /// assert_eq!(notice.kind, MapFailureKind::Configuration);
    /// ```
    pub fn from_error(error: &WidgetInitError) -> Self {
        match error {
            WidgetInitError::Configuration { .. } => Self {
                kind: MapFailureKind::Configuration,
                headline: MAP_FAILURE_HEADLINE,
                hint: CONFIGURATION_HINT,
            },
            WidgetInitError::LibraryUnavailable { .. } | WidgetInitError::Creation { .. } => {
                Self {
                    kind: MapFailureKind::ContentBlocked,
                    headline: MAP_FAILURE_HEADLINE,
                    hint: CONTENT_BLOCKING_HINT,
                }
            }
        }
    }
}

/// What the route page currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteViewContent {
    /// Nothing requested yet, or the user left the page.
    Empty,
    /// Waiting for `query`.
    Loading {
        /// Query being fetched.
        query: RouteQuery,
    },
    /// Route details are shown.
    Loaded {
        /// Query the route answers.
        query: RouteQuery,
        /// Fetched route.
        route: Arc<RouteResult>,
        /// Set when the interactive map could not be initialised.
        map_notice: Option<MapFailureNotice>,
    },
    /// The fetch failed; an error message is shown and no map.
    Failed {
        /// Query that failed.
        query: RouteQuery,
        /// Message for the user.
        message: String,
    },
}

/// Whether a completed fetch changed the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewUpdate {
    /// The outcome is now on screen.
    Applied,
    /// A newer request or navigation superseded the outcome.
    Discarded,
}

struct ViewState {
    active_token: u64,
    content: RouteViewContent,
}

/// Route page state with stale-response suppression.
pub struct RouteView {
    cache: Arc<RouteDataCache>,
    map: Option<Arc<MapLifecycleController>>,
    state: Mutex<ViewState>,
}

impl RouteView {
    /// Create a view reading through `cache`.
    pub fn new(cache: Arc<RouteDataCache>) -> Self {
        Self {
            cache,
            map: None,
            state: Mutex::new(ViewState {
                active_token: 0,
                content: RouteViewContent::Empty,
            }),
        }
    }

    /// Render loaded routes into `map`.
    pub fn with_map(mut self, map: Arc<MapLifecycleController>) -> Self {
        self.map = Some(map);
        self
    }

    /// Current content.
    pub fn content(&self) -> RouteViewContent {
        self.lock().content.clone()
    }

    /// Request `query` and show its outcome unless superseded meanwhile.
    pub async fn show(&self, query: &RouteQuery) -> ViewUpdate {
        let token = {
            let mut state = self.lock();
            state.active_token = state.active_token.wrapping_add(1);
            state.content = RouteViewContent::Loading {
                query: query.clone(),
            };
            state.active_token
        };

        let outcome = self.cache.get_or_fetch(query).await;
        let route = match outcome {
            Ok(route) => route,
            Err(error) => {
                let content = RouteViewContent::Failed {
                    query: query.clone(),
                    message: error.user_message(),
                };
                return self.apply(token, content);
            }
        };

        let update = self.apply(
            token,
            RouteViewContent::Loaded {
                query: query.clone(),
                route: Arc::clone(&route),
                map_notice: None,
            },
        );
        if update == ViewUpdate::Applied {
            self.render_map(token, &route).await;
        }
        update
    }

    /// The user navigated away; outcomes still in flight are discarded.
    pub fn leave(&self) {
        let mut state = self.lock();
        state.active_token = state.active_token.wrapping_add(1);
        state.content = RouteViewContent::Empty;
    }

    async fn render_map(&self, token: u64, route: &RouteResult) {
        let Some(map) = &self.map else {
            return;
        };
        let is_current = || self.lock().active_token == token;
        match map.render_while(route, is_current).await {
            Ok(RenderOutcome::Rendered(_)) | Ok(RenderOutcome::Skipped { .. }) => {}
            Err(error) => {
                warn!(kind = error.kind(), error = %error, "interactive map unavailable");
                let mut state = self.lock();
                if state.active_token != token {
                    return;
                }
                if let RouteViewContent::Loaded { map_notice, .. } = &mut state.content {
                    *map_notice = Some(MapFailureNotice::from_error(&error));
                }
            }
        }
    }

    fn apply(&self, token: u64, content: RouteViewContent) -> ViewUpdate {
        let mut state = self.lock();
        if state.active_token != token {
            debug!(token, active = state.active_token, "discarding stale route response");
            return ViewUpdate::Discarded;
        }
        state.content = content;
        ViewUpdate::Applied
    }

    fn lock(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use mockable::DefaultClock;
    use rstest::rstest;
    use tokio::sync::Semaphore;

    use super::*;
    use crate::domain::ports::{MockRouteFetchClient, MountPoint, RouteFetchClient, RouteFetchError};
    use crate::domain::{LatLng, Waypoint};
    use crate::outbound::headless_map::HeadlessMapLibrary;

    /// Client that answers each destination once its gate is opened.
    struct GatedByDestination {
        gates: HashMap<&'static str, Semaphore>,
    }

    #[async_trait]
    impl RouteFetchClient for GatedByDestination {
        async fn fetch(&self, query: &RouteQuery) -> Result<RouteResult, RouteFetchError> {
            let gate = self
                .gates
                .get(query.destination_text())
                .ok_or_else(|| RouteFetchError::validation("unknown destination"))?;
            let permit = gate
                .acquire()
                .await
                .map_err(|err| RouteFetchError::network(err.to_string()))?;
            permit.forget();
            Ok(RouteResult {
                distance_unit: query.destination_text().to_owned(),
                ..RouteResult::default()
            })
        }
    }

    fn query(destination: &str) -> RouteQuery {
        RouteQuery::parse("UST", destination, "walking", "metric").expect("valid query")
    }

    fn view_over(client: Arc<dyn RouteFetchClient>) -> RouteView {
        RouteView::new(Arc::new(RouteDataCache::new(client, Arc::new(DefaultClock))))
    }

    #[rstest]
    #[tokio::test]
    async fn late_response_does_not_overwrite_newer_route() {
        let client = Arc::new(GatedByDestination {
            gates: HashMap::from([("Rizal Park", Semaphore::new(0)), ("BGC", Semaphore::new(1))]),
        });
        let view = view_over(client.clone());
        let rizal = query("Rizal Park");
        let bgc = query("BGC");

        let (first, second) = tokio::join!(view.show(&rizal), async {
            tokio::task::yield_now().await;
            view.leave();
            let update = view.show(&bgc).await;
            if let Some(gate) = client.gates.get("Rizal Park") {
                gate.add_permits(1);
            }
            update
        });

        assert_eq!(first, ViewUpdate::Discarded);
        assert_eq!(second, ViewUpdate::Applied);
        let RouteViewContent::Loaded { query, route, .. } = view.content() else {
            panic!("expected the BGC route to be shown");
        };
        assert_eq!(query, bgc);
        assert_eq!(route.distance_unit, "BGC");
    }

    #[rstest]
    #[tokio::test]
    async fn failed_fetch_shows_the_backend_message() {
        let mut client = MockRouteFetchClient::new();
        client
            .expect_fetch()
            .times(1)
            .returning(|_| Err(RouteFetchError::backend(502_u16, "Routing provider unavailable")));
        let view = view_over(Arc::new(client));
        let bgc = query("BGC");

        assert_eq!(view.show(&bgc).await, ViewUpdate::Applied);
        assert_eq!(
            view.content(),
            RouteViewContent::Failed {
                query: bgc,
                message: "Routing provider unavailable".to_owned(),
            }
        );
    }

    #[rstest]
    #[tokio::test]
    async fn leaving_clears_the_view() {
        let mut client = MockRouteFetchClient::new();
        client
            .expect_fetch()
            .returning(|_| Ok(RouteResult::default()));
        let view = view_over(Arc::new(client));

        view.show(&query("BGC")).await;
        view.leave();

        assert_eq!(view.content(), RouteViewContent::Empty);
    }

    #[rstest]
    #[tokio::test]
    async fn map_failures_keep_the_route_and_attach_a_notice() {
        let mut client = MockRouteFetchClient::new();
        client
            .expect_fetch()
            .returning(|_| Ok(RouteResult::default()));
        let library = Arc::new(HeadlessMapLibrary::new());
        library.fail_creation_with(Some(WidgetInitError::configuration("missing API key")));
        let map = Arc::new(MapLifecycleController::new(library.clone()));
        map.attach(MountPoint::new("route-map")).await;
        let view = view_over(Arc::new(client)).with_map(map);

        assert_eq!(view.show(&query("BGC")).await, ViewUpdate::Applied);

        let RouteViewContent::Loaded { map_notice, .. } = view.content() else {
            panic!("the route should still be shown");
        };
        assert_eq!(
            map_notice.map(|notice| notice.kind),
            Some(MapFailureKind::Configuration)
        );
        assert_eq!(library.live_widgets(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn leaving_while_the_map_loads_draws_nothing() {
        let mut client = MockRouteFetchClient::new();
        client.expect_fetch().returning(|_| {
            Ok(RouteResult {
                waypoints: vec![
                    Waypoint {
                        position: LatLng::new(14.6096, 120.9894),
                        label: "UST".to_owned(),
                    },
                    Waypoint {
                        position: LatLng::new(14.5495, 121.0509),
                        label: "BGC".to_owned(),
                    },
                ],
                path_shape: vec![LatLng::new(14.6096, 120.9894), LatLng::new(14.5495, 121.0509)],
                ..RouteResult::default()
            })
        });
        let library = Arc::new(HeadlessMapLibrary::loading());
        let map = Arc::new(MapLifecycleController::new(library.clone()));
        map.attach(MountPoint::new("route-map")).await;
        let view = view_over(Arc::new(client)).with_map(map);

        let bgc = query("BGC");
        let (update, ()) = tokio::join!(view.show(&bgc), async {
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            view.leave();
            library.mark_ready();
        });

        assert_eq!(update, ViewUpdate::Applied);
        assert_eq!(view.content(), RouteViewContent::Empty);
        let snapshot = library.snapshot();
        assert!(snapshot.markers.is_empty());
        assert!(snapshot.polylines.is_empty());
        assert_eq!(snapshot.last_fit, None);
    }

    #[rstest]
    #[tokio::test]
    async fn failed_fetches_leave_the_map_untouched() {
        let mut client = MockRouteFetchClient::new();
        client
            .expect_fetch()
            .returning(|_| Err(RouteFetchError::network("connection refused")));
        let library = Arc::new(HeadlessMapLibrary::new());
        let map = Arc::new(MapLifecycleController::new(library.clone()));
        map.attach(MountPoint::new("route-map")).await;
        let view = view_over(Arc::new(client)).with_map(map);

        view.show(&query("BGC")).await;

        assert!(matches!(view.content(), RouteViewContent::Failed { .. }));
        assert_eq!(library.snapshot().widgets_created, 0);
    }

    #[rstest]
    #[case::configuration(WidgetInitError::configuration("no key"), MapFailureKind::Configuration, CONFIGURATION_HINT)]
    #[case::library(WidgetInitError::library_unavailable("script blocked"), MapFailureKind::ContentBlocked, CONTENT_BLOCKING_HINT)]
    #[case::creation(WidgetInitError::creation("no container"), MapFailureKind::ContentBlocked, CONTENT_BLOCKING_HINT)]
    fn map_failures_are_classified(
        #[case] error: WidgetInitError,
        #[case] kind: MapFailureKind,
        #[case] hint: &str,
    ) {
        let notice = MapFailureNotice::from_error(&error);
        assert_eq!(notice.kind, kind);
        assert_eq!(notice.hint, hint);
        assert_eq!(notice.headline, MAP_FAILURE_HEADLINE);
    }
}
