//! DTOs for decoding routing backend JSON responses.
//!
//! Every field is optional on the wire; absent or `null` values decode to
//! empty or zero defaults before mapping into domain records.

use std::time::Duration;

use serde::Deserialize;

use crate::domain::ports::AddressSuggestion;
use crate::domain::{LatLng, RouteResult, RouteStep, UnitSystem, Waypoint, format_duration};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct RouteResponseDto {
    pub(super) distance: Option<f64>,
    pub(super) time_seconds: Option<f64>,
    pub(super) formatted_time: Option<String>,
    pub(super) units: Option<String>,
    pub(super) steps: Option<Vec<StepDto>>,
    pub(super) static_map_url: Option<String>,
    pub(super) directions_link: Option<String>,
    pub(super) shape: Option<Vec<[f64; 2]>>,
    pub(super) locations: Option<Vec<LocationDto>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct StepDto {
    pub(super) narrative: Option<String>,
    pub(super) distance: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LocationDto {
    pub(super) display: Option<String>,
    pub(super) lat: Option<f64>,
    pub(super) lng: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct SuggestionResponseDto {
    pub(super) results: Option<Vec<LocationDto>>,
}

impl RouteResponseDto {
    /// Map into a [`RouteResult`], labelling distances for `requested` units
    /// when the backend omits its own label.
    pub(super) fn into_domain(self, requested: UnitSystem) -> RouteResult {
        let duration_seconds = self
            .time_seconds
            .and_then(|seconds| Duration::try_from_secs_f64(seconds.round()).ok())
            .map_or(0, |duration| duration.as_secs());
        let formatted_duration = self
            .formatted_time
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| format_duration(duration_seconds));

        RouteResult {
            distance_value: self.distance.filter(|value| value.is_finite()).unwrap_or(0.0),
            distance_unit: self
                .units
                .filter(|units| !units.trim().is_empty())
                .unwrap_or_else(|| requested.distance_label().to_owned()),
            duration_seconds,
            formatted_duration,
            steps: self
                .steps
                .unwrap_or_default()
                .into_iter()
                .map(StepDto::into_domain)
                .collect(),
            waypoints: self
                .locations
                .unwrap_or_default()
                .into_iter()
                .map(LocationDto::into_waypoint)
                .collect(),
            path_shape: self
                .shape
                .unwrap_or_default()
                .into_iter()
                .map(|[lat, lng]| LatLng::new(lat, lng))
                .collect(),
            static_map_url: self.static_map_url,
            external_directions_link: self.directions_link,
        }
    }
}

impl StepDto {
    fn into_domain(self) -> RouteStep {
        RouteStep {
            narrative_text: self.narrative.unwrap_or_default(),
            step_distance: self.distance.unwrap_or(0.0),
        }
    }
}

impl LocationDto {
    /// Missing coordinates become NaN so the waypoint is skipped for markers.
    fn into_waypoint(self) -> Waypoint {
        Waypoint {
            position: LatLng::new(self.lat.unwrap_or(f64::NAN), self.lng.unwrap_or(f64::NAN)),
            label: self.display.unwrap_or_default(),
        }
    }

    fn into_suggestion(self) -> Option<AddressSuggestion> {
        let display = self.display.filter(|text| !text.trim().is_empty())?;
        Some(AddressSuggestion {
            display,
            lat: self.lat,
            lng: self.lng,
        })
    }
}

impl SuggestionResponseDto {
    pub(super) fn into_domain(self, max_results: usize) -> Vec<AddressSuggestion> {
        self.results
            .unwrap_or_default()
            .into_iter()
            .filter_map(LocationDto::into_suggestion)
            .take(max_results)
            .collect()
    }
}
