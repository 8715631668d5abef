//! In-memory map library for environments without a browser widget.
//!
//! The library records every overlay and viewport change in a shared scene
//! so callers can inspect what an interactive map would show. Readiness can
//! be held back to model a library that is still loading, and creation can
//! be made to fail to model a blocked or misconfigured library.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::domain::ports::{
    MapLibrary, MapWidget, MarkerSpec, MountPoint, OverlayError, OverlayId, PolylineSpec,
    WidgetInitError,
};
use crate::domain::{FitPadding, LatLngBounds, Viewport, ViewportFit};

#[derive(Debug, Clone)]
enum Overlay {
    Marker(MarkerSpec),
    Polyline(PolylineSpec),
}

#[derive(Debug, Default)]
struct HeadlessScene {
    live_widgets: usize,
    widgets_created: usize,
    next_overlay: u64,
    overlays: BTreeMap<u64, (u64, Overlay)>,
    viewport: Option<Viewport>,
    last_fit: Option<ViewportFit>,
    mount: Option<MountPoint>,
}

type SharedScene = Arc<Mutex<HeadlessScene>>;

fn lock(scene: &SharedScene) -> MutexGuard<'_, HeadlessScene> {
    scene.lock().unwrap_or_else(PoisonError::into_inner)
}

/// What the map currently shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapSnapshot {
    /// Widgets created and not yet removed.
    pub live_widgets: usize,
    /// Widgets created over the library's lifetime.
    pub widgets_created: usize,
    /// Mount point of the most recent widget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount: Option<MountPoint>,
    /// Markers on live widgets, in placement order.
    pub markers: Vec<MarkerSpec>,
    /// Polylines on live widgets, in drawing order.
    pub polylines: Vec<PolylineSpec>,
    /// Viewport of the live widget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
    /// Most recent fit applied to the live widget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_fit: Option<ViewportFit>,
}

/// Headless [`MapLibrary`] implementation.
pub struct HeadlessMapLibrary {
    scene: SharedScene,
    ready: watch::Sender<bool>,
    creation_error: Mutex<Option<WidgetInitError>>,
}

impl Default for HeadlessMapLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessMapLibrary {
    /// A library that is already loaded.
    pub fn new() -> Self {
        Self::with_readiness(true)
    }

    /// A library that stays loading until [`Self::mark_ready`].
    pub fn loading() -> Self {
        Self::with_readiness(false)
    }

    fn with_readiness(ready: bool) -> Self {
        let (ready, _) = watch::channel(ready);
        Self {
            scene: SharedScene::default(),
            ready,
            creation_error: Mutex::new(None),
        }
    }

    /// Signal that the library has finished loading.
    pub fn mark_ready(&self) {
        self.ready.send_replace(true);
    }

    /// Make subsequent widget creation fail with `error`, or succeed again with `None`.
    pub fn fail_creation_with(&self, error: Option<WidgetInitError>) {
        *self
            .creation_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = error;
    }

    /// Widgets created and not yet removed.
    pub fn live_widgets(&self) -> usize {
        lock(&self.scene).live_widgets
    }

    /// Capture the current scene.
    pub fn snapshot(&self) -> MapSnapshot {
        let scene = lock(&self.scene);
        let mut markers = Vec::new();
        let mut polylines = Vec::new();
        for (_, overlay) in scene.overlays.values() {
            match overlay {
                Overlay::Marker(marker) => markers.push(marker.clone()),
                Overlay::Polyline(polyline) => polylines.push(polyline.clone()),
            }
        }
        MapSnapshot {
            live_widgets: scene.live_widgets,
            widgets_created: scene.widgets_created,
            mount: scene.mount.clone(),
            markers,
            polylines,
            viewport: scene.viewport,
            last_fit: scene.last_fit,
        }
    }
}

#[async_trait]
impl MapLibrary for HeadlessMapLibrary {
    async fn wait_ready(&self) -> Result<(), WidgetInitError> {
        let mut ready = self.ready.subscribe();
        ready
            .wait_for(|loaded| *loaded)
            .await
            .map(|_| ())
            .map_err(|error| WidgetInitError::library_unavailable(error.to_string()))
    }

    fn create_widget(
        &self,
        mount: &MountPoint,
        viewport: &Viewport,
    ) -> Result<Box<dyn MapWidget>, WidgetInitError> {
        if let Some(error) = self
            .creation_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(error);
        }
        let mut scene = lock(&self.scene);
        scene.widgets_created += 1;
        scene.live_widgets += 1;
        scene.viewport = Some(*viewport);
        scene.last_fit = None;
        scene.mount = Some(mount.clone());
        let widget_id = u64::try_from(scene.widgets_created).unwrap_or(u64::MAX);
        debug!(mount = %mount, widget_id, "headless widget created");
        Ok(Box::new(HeadlessWidget {
            widget_id,
            scene: Arc::clone(&self.scene),
        }))
    }
}

struct HeadlessWidget {
    widget_id: u64,
    scene: SharedScene,
}

impl HeadlessWidget {
    fn add(&mut self, overlay: Overlay) -> OverlayId {
        let mut scene = lock(&self.scene);
        scene.next_overlay += 1;
        let id = scene.next_overlay;
        scene.overlays.insert(id, (self.widget_id, overlay));
        OverlayId(id)
    }
}

impl MapWidget for HeadlessWidget {
    fn add_marker(&mut self, marker: &MarkerSpec) -> Result<OverlayId, OverlayError> {
        if !marker.position.is_valid() {
            return Err(OverlayError::rejected("marker position is not a WGS84 coordinate"));
        }
        Ok(self.add(Overlay::Marker(marker.clone())))
    }

    fn add_polyline(&mut self, polyline: &PolylineSpec) -> Result<OverlayId, OverlayError> {
        if polyline.points.is_empty() {
            return Err(OverlayError::rejected("polyline has no points"));
        }
        Ok(self.add(Overlay::Polyline(polyline.clone())))
    }

    fn remove_overlay(&mut self, overlay: OverlayId) -> Result<(), OverlayError> {
        let mut scene = lock(&self.scene);
        let owned = scene
            .overlays
            .get(&overlay.0)
            .is_some_and(|(owner, _)| *owner == self.widget_id);
        if !owned {
            return Err(OverlayError::missing(overlay));
        }
        scene.overlays.remove(&overlay.0);
        Ok(())
    }

    fn clear_overlays(&mut self) -> Result<(), OverlayError> {
        let widget_id = self.widget_id;
        lock(&self.scene)
            .overlays
            .retain(|_, (owner, _)| *owner != widget_id);
        Ok(())
    }

    fn fit_bounds(&mut self, bounds: &LatLngBounds, padding: FitPadding) {
        let visible = match padding {
            FitPadding::Ratio(ratio) => bounds.pad(ratio),
            FitPadding::Pixels(_) => *bounds,
        };
        let mut scene = lock(&self.scene);
        if let Some(viewport) = scene.viewport.as_mut() {
            viewport.center = visible.center();
        }
        scene.last_fit = Some(ViewportFit {
            bounds: *bounds,
            padding,
        });
    }

    fn remove(self: Box<Self>) {
        let widget_id = self.widget_id;
        let mut scene = lock(&self.scene);
        scene.overlays.retain(|_, (owner, _)| *owner != widget_id);
        scene.live_widgets = scene.live_widgets.saturating_sub(1);
        if scene.live_widgets == 0 {
            scene.viewport = None;
            scene.last_fit = None;
        }
        debug!(widget_id, "headless widget removed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LatLng;
    use crate::domain::ports::MarkerRole;
    use rstest::rstest;

    fn marker(lat: f64) -> MarkerSpec {
        MarkerSpec {
            role: MarkerRole::Start,
            position: LatLng::new(lat, 120.98),
            label: "Start".to_owned(),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn widgets_record_overlays_until_removed() {
        let library = HeadlessMapLibrary::new();
        library.wait_ready().await.expect("ready");
        let mut widget = library
            .create_widget(&MountPoint::new("map"), &Viewport::default())
            .expect("created");

        let id = widget.add_marker(&marker(14.6)).expect("marker placed");
        assert_eq!(library.snapshot().markers.len(), 1);
        widget.remove_overlay(id).expect("removed");
        assert_eq!(
            widget.remove_overlay(id),
            Err(OverlayError::missing(id))
        );

        widget.add_marker(&marker(14.5)).expect("marker placed");
        widget.remove();
        let snapshot = library.snapshot();
        assert_eq!(snapshot.live_widgets, 0);
        assert_eq!(snapshot.widgets_created, 1);
        assert!(snapshot.markers.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn loading_libraries_hold_readiness_until_marked() {
        let library = Arc::new(HeadlessMapLibrary::loading());
        let waiter = tokio::spawn({
            let library = Arc::clone(&library);
            async move { library.wait_ready().await }
        });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        library.mark_ready();

        waiter
            .await
            .expect("waiter joins")
            .expect("library ready");
    }

    #[rstest]
    fn invalid_markers_are_rejected() {
        let library = HeadlessMapLibrary::new();
        let mut widget = library
            .create_widget(&MountPoint::new("map"), &Viewport::default())
            .expect("created");
        let result = widget.add_marker(&marker(f64::NAN));
        assert!(matches!(result, Err(OverlayError::Rejected { .. })));
    }

    #[rstest]
    fn ratio_fits_move_the_centre_to_the_padded_box() {
        let library = HeadlessMapLibrary::new();
        let mut widget = library
            .create_widget(&MountPoint::new("map"), &Viewport::default())
            .expect("created");
        let bounds = LatLngBounds::from_points(&[LatLng::new(14.0, 120.0), LatLng::new(15.0, 121.0)])
            .expect("two points");

        widget.fit_bounds(&bounds, FitPadding::Ratio(0.3));

        let snapshot = library.snapshot();
        assert_eq!(
            snapshot.viewport.map(|viewport| viewport.center),
            Some(LatLng::new(14.5, 120.5))
        );
        assert_eq!(
            snapshot.last_fit.map(|fit| fit.padding),
            Some(FitPadding::Ratio(0.3))
        );
    }

    #[rstest]
    fn configured_failures_block_creation() {
        let library = HeadlessMapLibrary::new();
        library.fail_creation_with(Some(WidgetInitError::configuration("missing key")));
        let result = library.create_widget(&MountPoint::new("map"), &Viewport::default());
        assert!(matches!(result, Err(WidgetInitError::Configuration { .. })));
        assert_eq!(library.live_widgets(), 0);
    }
}
