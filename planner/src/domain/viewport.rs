//! Map viewport geometry: bounding boxes, padding and the default view.

use serde::Serialize;

use crate::domain::LatLng;

/// Centre of the map before any route has been fitted.
pub const DEFAULT_CENTER: LatLng = LatLng::new(40.73, -73.93);
/// Zoom level of the map before any route has been fitted.
pub const DEFAULT_ZOOM: u8 = 10;

/// Centre and zoom of a map widget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    /// Map centre.
    pub center: LatLng,
    /// Tile zoom level.
    pub zoom: u8,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
        }
    }
}

/// Padding applied when fitting the viewport to a bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum FitPadding {
    /// Fixed screen padding on every side, in pixels.
    Pixels(u32),
    /// Bounds grown by this fraction of their span on every side.
    Ratio(f64),
}

/// Axis-aligned WGS84 bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatLngBounds {
    /// South-west corner.
    pub south_west: LatLng,
    /// North-east corner.
    pub north_east: LatLng,
}

impl LatLngBounds {
    /// Smallest box containing every point, or `None` when `points` is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use walk_planner::domain::{LatLng, LatLngBounds};
    ///
    /// let bounds = LatLngBounds::from_points(&[
    ///     LatLng::new(14.61, 120.99),
    ///     LatLng::new(14.55, 121.05),
    /// ])
    /// .expect("two points");
    /// assert_eq!(bounds.south_west, LatLng::new(14.55, 120.99));
    /// assert_eq!(bounds.north_east, LatLng::new(14.61, 121.05));
    /// assert!(LatLngBounds::from_points(&[]).is_none());
    /// ```
    pub fn from_points(points: &[LatLng]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let start = Self {
            south_west: *first,
            north_east: *first,
        };
        Some(rest.iter().fold(start, |bounds, point| bounds.extend(*point)))
    }

    /// Grow the box to include `point`.
    pub fn extend(self, point: LatLng) -> Self {
        Self {
            south_west: LatLng::new(
                self.south_west.lat.min(point.lat),
                self.south_west.lng.min(point.lng),
            ),
            north_east: LatLng::new(
                self.north_east.lat.max(point.lat),
                self.north_east.lng.max(point.lng),
            ),
        }
    }

    /// Grow the box by `ratio` of its span on every side.
    #[expect(clippy::float_arithmetic, reason = "padding is a fraction of the span in degrees")]
    pub fn pad(self, ratio: f64) -> Self {
        let lat_buffer = (self.north_east.lat - self.south_west.lat).abs() * ratio;
        let lng_buffer = (self.north_east.lng - self.south_west.lng).abs() * ratio;
        Self {
            south_west: LatLng::new(
                self.south_west.lat - lat_buffer,
                self.south_west.lng - lng_buffer,
            ),
            north_east: LatLng::new(
                self.north_east.lat + lat_buffer,
                self.north_east.lng + lng_buffer,
            ),
        }
    }

    /// Whether `point` lies inside or on the edge of the box.
    pub fn contains(&self, point: LatLng) -> bool {
        (self.south_west.lat..=self.north_east.lat).contains(&point.lat)
            && (self.south_west.lng..=self.north_east.lng).contains(&point.lng)
    }

    /// Centre of the box.
    #[expect(clippy::float_arithmetic, reason = "midpoint of two coordinates")]
    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn padding_grows_each_side_by_the_ratio() {
        let bounds = LatLngBounds {
            south_west: LatLng::new(0.0, 0.0),
            north_east: LatLng::new(10.0, 20.0),
        }
        .pad(0.5);
        assert_eq!(bounds.south_west, LatLng::new(-5.0, -10.0));
        assert_eq!(bounds.north_east, LatLng::new(15.0, 30.0));
    }

    #[rstest]
    fn single_point_bounds_contain_only_that_point() {
        let point = LatLng::new(14.6, 121.0);
        let bounds = LatLngBounds::from_points(&[point]).expect("one point");
        assert!(bounds.contains(point));
        assert!(!bounds.contains(LatLng::new(14.7, 121.0)));
        assert_eq!(bounds.center(), point);
    }
}
