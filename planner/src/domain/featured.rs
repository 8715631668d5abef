//! Fixed catalogue of featured walks starting at the University of Santo Tomas.
//!
//! Every featured walk maps to a `(walking, metric)` [`RouteQuery`], so the
//! catalogue can be warmed through the shared [`RouteDataCache`] at start-up
//! and served from it afterwards.

use std::time::Duration;

use futures_util::future::join_all;
use serde::Serialize;
use tracing::warn;

use crate::domain::route_cache::{RouteDataCache, RouteOutcome, WarmReport};
use crate::domain::{ActivityMode, RouteQuery, RouteQueryValidationError, RouteResult, UnitSystem};

const UST: &str = "University of Santo Tomas, España Boulevard, Manila";
const LOAD_FAILURE_MESSAGE: &str = "Failed to load route map";

/// One curated walk with nominal metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedRoute {
    /// Stable identifier.
    pub id: u32,
    /// Display name.
    pub name: &'static str,
    /// One-line pitch.
    pub description: &'static str,
    /// Nominal distance in kilometres.
    pub distance_km: f64,
    /// Nominal duration in minutes.
    pub duration_minutes: u32,
    /// Start address.
    pub start: &'static str,
    /// End address.
    pub end: &'static str,
}

/// The six featured walks.
pub const FEATURED_ROUTES: [FeaturedRoute; 6] = [
    FeaturedRoute {
        id: 1,
        name: "UST to BGC Skyline Walk",
        description: "From historic UST campus to modern Bonifacio Global City with stunning high-rise views",
        distance_km: 8.5,
        duration_minutes: 105,
        start: UST,
        end: "Bonifacio Global City, Taguig",
    },
    FeaturedRoute {
        id: 2,
        name: "UST to Rizal Park Heritage Trail",
        description: "Walk from UST to historic Luneta featuring monuments and lush gardens",
        distance_km: 4.2,
        duration_minutes: 55,
        start: UST,
        end: "Rizal Park, Manila",
    },
    FeaturedRoute {
        id: 3,
        name: "UST to Ayala Triangle Gardens",
        description: "Journey from UST to peaceful urban oasis in Makati business district",
        distance_km: 7.8,
        duration_minutes: 95,
        start: UST,
        end: "Ayala Triangle Gardens, Makati",
    },
    FeaturedRoute {
        id: 4,
        name: "UST to Manila Bay Sunset Promenade",
        description: "Scenic route from UST to waterfront walk along Roxas Boulevard with bay views",
        distance_km: 5.5,
        duration_minutes: 70,
        start: UST,
        end: "Manila Bay, Roxas Boulevard, Manila",
    },
    FeaturedRoute {
        id: 5,
        name: "UST to UP Diliman Academic Oval",
        description: "Cross-city walk from UST to tree-lined university route in Quezon City",
        distance_km: 6.5,
        duration_minutes: 80,
        start: UST,
        end: "UP Diliman Academic Oval, Quezon City",
    },
    FeaturedRoute {
        id: 6,
        name: "UST to Intramuros Walled City",
        description: "Historic journey from UST to colonial-era fortified city with Spanish architecture",
        distance_km: 3.8,
        duration_minutes: 50,
        start: UST,
        end: "Fort Santiago, Manila",
    },
];

/// Look up a featured walk by id.
pub fn find_featured(id: u32) -> Option<&'static FeaturedRoute> {
    FEATURED_ROUTES.iter().find(|route| route.id == id)
}

/// A featured walk combined with whatever the backend returned for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedRouteDetails {
    /// Catalogue entry.
    pub featured: FeaturedRoute,
    /// Fetched distance, or the nominal one.
    pub distance_value: f64,
    /// Unit of `distance_value`.
    pub distance_unit: String,
    /// Fetched duration in minutes, or the nominal one.
    pub duration_minutes: f64,
    /// Display duration.
    pub formatted_duration: String,
    /// Fetched route, absent when the fetch failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteResult>,
    /// Set when the fetch failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FeaturedRoute {
    /// Query that fetches this walk.
    ///
    /// # Errors
    ///
    /// Propagates [`RouteQueryValidationError`] for blank addresses.
    pub fn query(&self) -> Result<RouteQuery, RouteQueryValidationError> {
        RouteQuery::new(self.start, self.end, ActivityMode::Walking, UnitSystem::Metric)
    }

    /// Overlay a fetch outcome on the nominal metrics.
    ///
    /// Zero or blank fetched values fall back to the nominal ones; a failed
    /// fetch keeps the nominal metrics and records an error message.
    #[expect(
        clippy::float_arithmetic,
        reason = "fetched durations are shown in fractional minutes"
    )]
    pub fn merge(&self, outcome: &RouteOutcome) -> FeaturedRouteDetails {
        let nominal_duration = format!("{} min", self.duration_minutes);
        let Ok(route) = outcome else {
            return FeaturedRouteDetails {
                featured: *self,
                distance_value: self.distance_km,
                distance_unit: UnitSystem::Metric.distance_label().to_owned(),
                duration_minutes: f64::from(self.duration_minutes),
                formatted_duration: nominal_duration,
                route: None,
                error: Some(LOAD_FAILURE_MESSAGE.to_owned()),
            };
        };

        let distance_value = if route.distance_value > 0.0 {
            route.distance_value
        } else {
            self.distance_km
        };
        let distance_unit = if route.distance_unit.is_empty() {
            UnitSystem::Metric.distance_label().to_owned()
        } else {
            route.distance_unit.clone()
        };
        let duration_minutes = if route.duration_seconds > 0 {
            Duration::from_secs(route.duration_seconds).as_secs_f64() / 60.0
        } else {
            f64::from(self.duration_minutes)
        };
        let formatted_duration =
            if route.duration_seconds == 0 || route.formatted_duration.is_empty() {
                nominal_duration
            } else {
                route.formatted_duration.clone()
            };

        FeaturedRouteDetails {
            featured: *self,
            distance_value,
            distance_unit,
            duration_minutes,
            formatted_duration,
            route: Some(RouteResult::clone(route)),
            error: None,
        }
    }
}

fn featured_queries() -> Vec<RouteQuery> {
    FEATURED_ROUTES
        .iter()
        .filter_map(|route| {
            route
                .query()
                .inspect_err(|error| warn!(id = route.id, error = %error, "invalid featured route"))
                .ok()
        })
        .collect()
}

/// Warm the cache with every featured walk; failures are isolated.
pub async fn warm_featured(cache: &RouteDataCache) -> WarmReport {
    cache.warm(&featured_queries()).await
}

/// Load every featured walk through the cache and merge the outcomes.
pub async fn load_featured(cache: &RouteDataCache) -> Vec<FeaturedRouteDetails> {
    join_all(FEATURED_ROUTES.iter().map(|featured| async move {
        let outcome = match featured.query() {
            Ok(query) => cache.get_or_fetch(&query).await,
            Err(error) => Err(error.into()),
        };
        featured.merge(&outcome)
    }))
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mockable::DefaultClock;
    use rstest::rstest;

    use super::*;
    use crate::domain::ports::{MockRouteFetchClient, RouteFetchError};

    #[rstest]
    fn catalogue_ids_are_unique_and_start_at_ust() {
        for (index, route) in FEATURED_ROUTES.iter().enumerate() {
            assert_eq!(route.id as usize, index + 1);
            assert_eq!(route.start, UST);
            assert!(route.query().is_ok());
        }
        assert_eq!(
            find_featured(6).map(|route| route.end),
            Some("Fort Santiago, Manila")
        );
        assert!(find_featured(7).is_none());
    }

    #[rstest]
    fn merge_prefers_fetched_metrics() {
        let featured = FEATURED_ROUTES[1];
        let route = RouteResult {
            distance_value: 4.6,
            distance_unit: "km".to_owned(),
            duration_seconds: 3_600,
            formatted_duration: "1h 0m 0s".to_owned(),
            ..RouteResult::default()
        };

        let details = featured.merge(&Ok(Arc::new(route)));

        assert_eq!(details.distance_value, 4.6);
        assert_eq!(details.duration_minutes, 60.0);
        assert_eq!(details.formatted_duration, "1h 0m 0s");
        assert!(details.error.is_none());
    }

    #[rstest]
    fn merge_falls_back_to_nominal_values() {
        let featured = FEATURED_ROUTES[0];

        let empty = featured.merge(&Ok(Arc::new(RouteResult::default())));
        assert_eq!(empty.distance_value, 8.5);
        assert_eq!(empty.distance_unit, "km");
        assert_eq!(empty.formatted_duration, "105 min");

        let failed = featured.merge(&Err(RouteFetchError::network("offline")));
        assert_eq!(failed.duration_minutes, 105.0);
        assert!(failed.route.is_none());
        assert_eq!(failed.error.as_deref(), Some(LOAD_FAILURE_MESSAGE));
    }

    #[rstest]
    #[tokio::test]
    async fn warming_fetches_each_walk_once() {
        let mut client = MockRouteFetchClient::new();
        client
            .expect_fetch()
            .withf(|query| query.origin_text() == UST && query.mode() == ActivityMode::Walking)
            .times(FEATURED_ROUTES.len())
            .returning(|_| Ok(RouteResult::default()));
        let cache = RouteDataCache::new(Arc::new(client), Arc::new(DefaultClock));

        let report = warm_featured(&cache).await;
        let details = load_featured(&cache).await;

        assert_eq!(report.warmed.len(), FEATURED_ROUTES.len());
        assert!(report.failed.is_empty());
        assert_eq!(details.len(), FEATURED_ROUTES.len());
    }
}
