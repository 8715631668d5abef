//! Route queries: the normalised (origin, destination, mode, units) tuple.
//!
//! A [`RouteQuery`] is immutable once built. Its [`RouteQuery::cache_key`]
//! is a stable serialisation of every field, so equal queries always map to
//! the same cached outcome.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::domain::ports::RouteCacheKey;

/// Activity the route is planned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityMode {
    /// Pedestrian pace.
    Walking,
    /// Running pace over the same pedestrian network.
    Running,
}

impl ActivityMode {
    /// Return the wire representation.
    ///
    /// # Examples
    ///
    /// ```
    /// use walk_planner::domain::ActivityMode;
    ///
    /// assert_eq!(ActivityMode::Walking.as_str(), "walking");
    /// assert_eq!(ActivityMode::Running.as_str(), "running");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Walking => "walking",
            Self::Running => "running",
        }
    }
}

impl fmt::Display for ActivityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityMode {
    type Err = RouteQueryValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "walking" => Ok(Self::Walking),
            "running" => Ok(Self::Running),
            _ => Err(RouteQueryValidationError::UnsupportedMode {
                mode: value.to_owned(),
            }),
        }
    }
}

/// Measurement system used for distances in the route result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    /// Kilometres.
    #[default]
    Metric,
    /// Miles.
    Imperial,
}

impl UnitSystem {
    /// Return the wire representation.
    ///
    /// # Examples
    ///
    /// ```
    /// use walk_planner::domain::UnitSystem;
    ///
    /// assert_eq!(UnitSystem::Metric.as_str(), "metric");
    /// assert_eq!(UnitSystem::Imperial.as_str(), "imperial");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        }
    }

    /// Unit label the backend reports for distances in this system.
    pub fn distance_label(&self) -> &'static str {
        match self {
            Self::Metric => "km",
            Self::Imperial => "miles",
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitSystem {
    type Err = RouteQueryValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "metric" => Ok(Self::Metric),
            "imperial" => Ok(Self::Imperial),
            _ => Err(RouteQueryValidationError::UnsupportedUnits {
                units: value.to_owned(),
            }),
        }
    }
}

/// Reasons a route query cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteQueryValidationError {
    /// Origin text is blank.
    #[error("origin must not be empty")]
    EmptyOrigin,
    /// Destination text is blank.
    #[error("destination must not be empty")]
    EmptyDestination,
    /// Activity mode is neither walking nor running.
    #[error("only walking and running route types are supported, got {mode:?}")]
    UnsupportedMode {
        /// The rejected mode text.
        mode: String,
    },
    /// Unit system is neither metric nor imperial.
    #[error("units must be metric or imperial, got {units:?}")]
    UnsupportedUnits {
        /// The rejected unit text.
        units: String,
    },
}

/// A request for one route between two free-text addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteQuery {
    origin_text: String,
    destination_text: String,
    mode: ActivityMode,
    unit_system: UnitSystem,
}

impl RouteQuery {
    /// Build a query, trimming both addresses.
    ///
    /// # Examples
    ///
    /// ```
    /// use walk_planner::domain::{ActivityMode, RouteQuery, UnitSystem};
    ///
    /// let query = RouteQuery::new(" UST ", "BGC", ActivityMode::Walking, UnitSystem::Metric)?;
    /// assert_eq!(query.origin_text(), "UST");
    /// # Ok::<(), walk_planner::domain::RouteQueryValidationError>(())
    /// ```
    pub fn new(
        origin_text: impl Into<String>,
        destination_text: impl Into<String>,
        mode: ActivityMode,
        unit_system: UnitSystem,
    ) -> Result<Self, RouteQueryValidationError> {
        let origin_text = origin_text.into().trim().to_owned();
        let destination_text = destination_text.into().trim().to_owned();
        if origin_text.is_empty() {
            return Err(RouteQueryValidationError::EmptyOrigin);
        }
        if destination_text.is_empty() {
            return Err(RouteQueryValidationError::EmptyDestination);
        }
        Ok(Self {
            origin_text,
            destination_text,
            mode,
            unit_system,
        })
    }

    /// Build a query from untyped form input.
    ///
    /// Rejects unsupported modes before any network work can be issued.
    ///
    /// # Examples
    ///
    /// ```
    /// use walk_planner::domain::{RouteQuery, RouteQueryValidationError};
    ///
    /// let err = RouteQuery::parse("UST", "BGC", "driving", "metric").unwrap_err();
    /// assert!(matches!(err, RouteQueryValidationError::UnsupportedMode { .. }));
    /// ```
    pub fn parse(
        origin_text: &str,
        destination_text: &str,
        mode: &str,
        unit_system: &str,
    ) -> Result<Self, RouteQueryValidationError> {
        let mode = mode.parse::<ActivityMode>()?;
        let unit_system = unit_system.parse::<UnitSystem>()?;
        Self::new(origin_text, destination_text, mode, unit_system)
    }

    /// Origin address text.
    pub fn origin_text(&self) -> &str {
        self.origin_text.as_str()
    }

    /// Destination address text.
    pub fn destination_text(&self) -> &str {
        self.destination_text.as_str()
    }

    /// Requested activity mode.
    pub fn mode(&self) -> ActivityMode {
        self.mode
    }

    /// Requested unit system.
    pub fn unit_system(&self) -> UnitSystem {
        self.unit_system
    }

    /// Derive the cache key for this query.
    pub fn cache_key(&self) -> RouteCacheKey {
        RouteCacheKey::for_route(
            self.mode,
            self.unit_system,
            &self.origin_text,
            &self.destination_text,
        )
    }
}
