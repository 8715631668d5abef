//! Route results returned by the routing backend.
//!
//! Results are produced once per successful fetch and shared behind an
//! `Arc` afterwards; nothing mutates them once cached.

use serde::Serialize;

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLng {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl LatLng {
    /// Build a coordinate pair.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether the pair is finite and within WGS84 ranges.
    ///
    /// # Examples
    ///
    /// ```
    /// use walk_planner::domain::LatLng;
    ///
    /// assert!(LatLng::new(14.61, 120.99).is_valid());
    /// assert!(!LatLng::new(f64::NAN, 120.99).is_valid());
    /// assert!(!LatLng::new(91.0, 0.0).is_valid());
    /// ```
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// One turn-by-turn instruction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStep {
    /// Human-readable manoeuvre text.
    pub narrative_text: String,
    /// Distance covered by this step, in the result's unit.
    pub step_distance: f64,
}

/// A labelled location along the route (start, end, or via point).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Waypoint {
    /// Position; may be invalid when the backend could not geocode it.
    #[serde(flatten)]
    pub position: LatLng,
    /// Display label such as a street and city.
    pub label: String,
}

/// Geometry and metadata for one planned route.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResult {
    /// Total distance in `distance_unit`.
    pub distance_value: f64,
    /// Unit label for distances (`km` or `miles`).
    pub distance_unit: String,
    /// Total duration in seconds.
    pub duration_seconds: u64,
    /// Duration rendered for display, e.g. `1h 5m 0s`.
    pub formatted_duration: String,
    /// Ordered manoeuvres.
    pub steps: Vec<RouteStep>,
    /// Ordered waypoints; the first is the start, the last the end.
    pub waypoints: Vec<Waypoint>,
    /// Polyline geometry; possibly empty.
    pub path_shape: Vec<LatLng>,
    /// Pre-rendered static map image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_map_url: Option<String>,
    /// Link opening the route on the provider's own site.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_directions_link: Option<String>,
}

impl RouteResult {
    /// Waypoints whose coordinates are usable for markers.
    pub fn valid_waypoints(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints
            .iter()
            .filter(|waypoint| waypoint.position.is_valid())
    }
}

/// Render a duration the way route summaries display it.
///
/// # Examples
///
/// ```
/// use walk_planner::domain::format_duration;
///
/// assert_eq!(format_duration(42), "42s");
/// assert_eq!(format_duration(125), "2m 5s");
/// assert_eq!(format_duration(3_725), "1h 2m 5s");
/// ```
pub fn format_duration(total_seconds: u64) -> String {
    let hours = total_seconds.div_euclid(3_600);
    let minutes = total_seconds.rem_euclid(3_600).div_euclid(60);
    let seconds = total_seconds.rem_euclid(60);
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "0s")]
    #[case(60, "1m 0s")]
    #[case(3_600, "1h 0m 0s")]
    #[case(6_300, "1h 45m 0s")]
    fn formats_durations(#[case] seconds: u64, #[case] expected: &str) {
        assert_eq!(format_duration(seconds), expected);
    }

    #[rstest]
    fn invalid_waypoints_are_filtered() {
        let result = RouteResult {
            waypoints: vec![
                Waypoint {
                    position: LatLng::new(f64::NAN, f64::NAN),
                    label: "unknown".to_owned(),
                },
                Waypoint {
                    position: LatLng::new(14.61, 120.99),
                    label: "UST".to_owned(),
                },
            ],
            ..RouteResult::default()
        };
        let labels: Vec<_> = result
            .valid_waypoints()
            .map(|waypoint| waypoint.label.as_str())
            .collect();
        assert_eq!(labels, ["UST"]);
    }
}
