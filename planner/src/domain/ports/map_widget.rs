//! Driven port for the external, stateful map widget library.
//!
//! The library loads asynchronously and signals readiness through
//! [`MapLibrary::wait_ready`]. Widget mutations are synchronous. Only
//! [`crate::domain::MapLifecycleController`] may hold a [`MapWidget`].

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use super::define_port_error;
use crate::domain::{FitPadding, LatLng, LatLngBounds, Viewport};

/// Identifier of the DOM node a widget is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MountPoint(String);

impl MountPoint {
    /// Wrap a mount point identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for MountPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle of one overlay (marker or polyline) on a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct OverlayId(pub u64);

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "overlay#{}", self.0)
    }
}

/// Which end of the route a marker denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerRole {
    /// First waypoint.
    Start,
    /// Last waypoint.
    End,
}

/// Marker to place on the widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerSpec {
    /// Start or end marker.
    pub role: MarkerRole,
    /// Marker position.
    pub position: LatLng,
    /// Popup label.
    pub label: String,
}

/// Polyline to draw on the widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolylineSpec {
    /// Ordered vertices.
    pub points: Vec<LatLng>,
    /// Stroke colour as `#rrggbb`.
    pub color: &'static str,
    /// Stroke width in pixels.
    pub weight: u32,
}

define_port_error! {
    /// Failures while producing a usable widget instance.
    pub enum WidgetInitError {
        /// The library rejected its configuration (for example a missing API key).
        Configuration { message: String } => "map configuration error: {message}",
        /// The library script never became available.
        LibraryUnavailable { message: String } => "map library unavailable: {message}",
        /// The library loaded but could not create a widget.
        Creation { message: String } => "map widget creation failed: {message}",
    }
}

define_port_error! {
    /// Failures while adding or removing overlays.
    pub enum OverlayError {
        /// The widget refused the operation.
        Rejected { message: String } => "overlay operation rejected: {message}",
        /// The overlay is not on the widget.
        Missing { overlay: OverlayId } => "{overlay} is not on the map",
    }
}

/// One live widget instance bound to a mount point.
pub trait MapWidget: Send {
    /// Place a marker and return its handle.
    fn add_marker(&mut self, marker: &MarkerSpec) -> Result<OverlayId, OverlayError>;

    /// Draw a polyline and return its handle.
    fn add_polyline(&mut self, polyline: &PolylineSpec) -> Result<OverlayId, OverlayError>;

    /// Remove one overlay.
    fn remove_overlay(&mut self, overlay: OverlayId) -> Result<(), OverlayError>;

    /// Remove every marker and polyline. Idempotent.
    fn clear_overlays(&mut self) -> Result<(), OverlayError>;

    /// Fit the viewport to `bounds`.
    fn fit_bounds(&mut self, bounds: &LatLngBounds, padding: FitPadding);

    /// Destroy the widget and release its DOM node.
    fn remove(self: Box<Self>);
}

/// Port for the asynchronously loaded map library.
#[async_trait]
pub trait MapLibrary: Send + Sync {
    /// Resolve once the library has finished loading.
    async fn wait_ready(&self) -> Result<(), WidgetInitError>;

    /// Create a widget bound to `mount` showing `viewport`.
    fn create_widget(
        &self,
        mount: &MountPoint,
        viewport: &Viewport,
    ) -> Result<Box<dyn MapWidget>, WidgetInitError>;
}
