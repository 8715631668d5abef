//! Key under which the route cache stores one fetch outcome.
use std::fmt;

use url::form_urlencoded::byte_serialize;

use crate::domain::{ActivityMode, UnitSystem};

const KEY_PREFIX: &str = "route";
const KEY_VERSION: &str = "v1";

/// Stable serialisation of every field of a [`crate::domain::RouteQuery`].
///
/// Layout: `route:v1:{mode}:{units}:{origin}:{destination}` with both
/// addresses form-encoded, so a `:` inside an address cannot shift the
/// field boundaries and the key never contains whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteCacheKey(String);

impl RouteCacheKey {
    /// Compose the key for one route request.
    ///
    /// # Examples
    ///
    /// ```
    /// use walk_planner::domain::ports::RouteCacheKey;
    /// use walk_planner::domain::{ActivityMode, UnitSystem};
    ///
    /// let key = RouteCacheKey::for_route(ActivityMode::Walking, UnitSystem::Metric, "UST", "SM Manila");
    /// assert_eq!(key.as_str(), "route:v1:walking:metric:UST:SM+Manila");
    /// ```
    pub fn for_route(
        mode: ActivityMode,
        unit_system: UnitSystem,
        origin_text: &str,
        destination_text: &str,
    ) -> Self {
        let origin: String = byte_serialize(origin_text.as_bytes()).collect();
        let destination: String = byte_serialize(destination_text.as_bytes()).collect();
        Self(format!(
            "{KEY_PREFIX}:{KEY_VERSION}:{mode}:{unit_system}:{origin}:{destination}"
        ))
    }

    /// Borrow the underlying key as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for RouteCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for RouteCacheKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
