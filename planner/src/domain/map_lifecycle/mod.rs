//! Lifecycle of the single interactive map widget bound to one mount point.
//!
//! The controller is the only owner of a [`MapWidget`]. It moves through
//! `Unmounted -> Initializing -> Ready <-> Updating` and into `Disposed` when
//! the owning view unmounts or interactive mode is switched off. Renders hold
//! an async lock for their whole duration, so a render that arrives while the
//! library is still loading waits for initialisation to finish before it
//! touches any overlay.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::domain::ports::{
    MapLibrary, MapWidget, MarkerRole, MarkerSpec, MountPoint, OverlayId, PolylineSpec,
    WidgetInitError,
};
use crate::domain::{FitPadding, LatLng, LatLngBounds, RouteResult, Viewport, Waypoint};

/// Screen padding applied when fitting the viewport to a route shape.
pub const SHAPE_FIT_PADDING_PX: u32 = 40;
/// Fraction of the span added around a start/end marker pair.
pub const MARKER_FIT_PAD_RATIO: f64 = 0.3;
/// Stroke colour of the route polyline.
pub const POLYLINE_COLOR: &str = "#4267B2";
/// Stroke width of the route polyline in pixels.
pub const POLYLINE_WEIGHT: u32 = 5;

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MapLifecycleState {
    /// No widget exists.
    Unmounted,
    /// Waiting for the library and creating the widget.
    Initializing,
    /// Widget exists and is idle.
    Ready,
    /// Overlays are being replaced.
    Updating,
    /// Widget destroyed; interactive mode must be re-entered to render again.
    Disposed,
}

/// Viewport fit applied by a render.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewportFit {
    /// Region the viewport was fitted to.
    pub bounds: LatLngBounds,
    /// Padding used for the fit.
    pub padding: FitPadding,
}

/// Overlays produced by one render.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSummary {
    /// Markers placed (0, 1 or 2).
    pub markers: usize,
    /// Whether a polyline was drawn.
    pub polyline: bool,
    /// Viewport fit, or `None` when the viewport was left unchanged.
    pub fit: Option<ViewportFit>,
}

/// Why a render did not touch any widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RenderSkip {
    /// The owning view has not supplied a mount point.
    NoMountPoint,
    /// Interactive mode is off or the controller has been disposed.
    Disposed,
    /// The route stopped being the one on screen while the render waited.
    Superseded,
}

/// Result of [`MapLifecycleController::render`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum RenderOutcome {
    /// The widget now shows the route.
    Rendered(RenderSummary),
    /// Nothing was drawn.
    Skipped {
        /// Reason nothing was drawn.
        reason: RenderSkip,
    },
}

#[derive(Debug, Default)]
struct RouteOverlays {
    start: Option<OverlayId>,
    end: Option<OverlayId>,
    polyline: Option<OverlayId>,
}

impl RouteOverlays {
    fn take_all(&mut self) -> impl Iterator<Item = OverlayId> {
        [self.polyline.take(), self.start.take(), self.end.take()]
            .into_iter()
            .flatten()
    }
}

struct Inner {
    mount: Option<MountPoint>,
    interactive: bool,
    widget: Option<Box<dyn MapWidget>>,
    overlays: RouteOverlays,
}

/// Owns creation, update and teardown of one map widget.
pub struct MapLifecycleController {
    library: Arc<dyn MapLibrary>,
    inner: Mutex<Inner>,
    state: watch::Sender<MapLifecycleState>,
}

impl MapLifecycleController {
    /// Create a controller in interactive mode with no mount point.
    pub fn new(library: Arc<dyn MapLibrary>) -> Self {
        let (state, _) = watch::channel(MapLifecycleState::Unmounted);
        Self {
            library,
            inner: Mutex::new(Inner {
                mount: None,
                interactive: true,
                widget: None,
                overlays: RouteOverlays::default(),
            }),
            state,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> MapLifecycleState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<MapLifecycleState> {
        self.state.subscribe()
    }

    /// Bind the controller to the mount point of a newly mounted view.
    ///
    /// A controller disposed by an earlier unmount becomes `Unmounted` again.
    pub async fn attach(&self, mount: MountPoint) {
        let mut inner = self.inner.lock().await;
        info!(mount = %mount, "map mount point attached");
        inner.mount = Some(mount);
        if inner.interactive && self.state() == MapLifecycleState::Disposed {
            self.transition(MapLifecycleState::Unmounted);
        }
    }

    /// React to the owning view unmounting: dispose and forget the mount point.
    pub async fn detach(&self) {
        let mut inner = self.inner.lock().await;
        self.dispose_locked(&mut inner);
        inner.mount = None;
    }

    /// Switch between the interactive map and the static image.
    ///
    /// Turning interactive mode off disposes the widget. Turning it back on
    /// after disposal returns to `Unmounted`, so the next render builds a
    /// fresh widget.
    pub async fn set_interactive(&self, interactive: bool) {
        let mut inner = self.inner.lock().await;
        inner.interactive = interactive;
        if !interactive {
            self.dispose_locked(&mut inner);
        } else if self.state() == MapLifecycleState::Disposed {
            self.transition(MapLifecycleState::Unmounted);
        }
    }

    /// Destroy the widget. Calling this more than once is a no-op.
    pub async fn dispose(&self) {
        let mut inner = self.inner.lock().await;
        self.dispose_locked(&mut inner);
    }

    /// Show `route` on the widget, creating the widget first when needed.
    ///
    /// # Errors
    ///
    /// Returns [`WidgetInitError`] when the library never becomes ready or
    /// refuses to create a widget. The controller then stays `Unmounted` and
    /// does not retry on its own.
    pub async fn render(&self, route: &RouteResult) -> Result<RenderOutcome, WidgetInitError> {
        self.render_while(route, || true).await
    }

    /// Like [`Self::render`], but draws nothing once `is_current` reports
    /// that `route` is no longer wanted.
    ///
    /// `is_current` is checked after the render lock is acquired and again
    /// after the widget finishes initialising, since either may wait.
    ///
    /// # Errors
    ///
    /// Same as [`Self::render`].
    pub async fn render_while(
        &self,
        route: &RouteResult,
        is_current: impl Fn() -> bool + Send,
    ) -> Result<RenderOutcome, WidgetInitError> {
        let superseded = || {
            debug!("route superseded before drawing");
            Ok(RenderOutcome::Skipped {
                reason: RenderSkip::Superseded,
            })
        };
        let mut inner = self.inner.lock().await;
        if !is_current() {
            return superseded();
        }
        if !inner.interactive || self.state() == MapLifecycleState::Disposed {
            return Ok(RenderOutcome::Skipped {
                reason: RenderSkip::Disposed,
            });
        }
        let Some(mount) = inner.mount.clone() else {
            return Ok(RenderOutcome::Skipped {
                reason: RenderSkip::NoMountPoint,
            });
        };

        if inner.widget.is_none() {
            let widget = self.initialise(&mount).await?;
            inner.widget = Some(widget);
            inner.overlays = RouteOverlays::default();
            self.transition(MapLifecycleState::Ready);
            if !is_current() {
                return superseded();
            }
        }

        self.transition(MapLifecycleState::Updating);
        let Inner {
            widget, overlays, ..
        } = &mut *inner;
        let summary = match widget.as_deref_mut() {
            Some(widget) => {
                remove_route_overlays(widget, overlays);
                draw_route(widget, overlays, route)
            }
            None => RenderSummary {
                markers: 0,
                polyline: false,
                fit: None,
            },
        };
        self.transition(MapLifecycleState::Ready);
        debug!(
            markers = summary.markers,
            polyline = summary.polyline,
            fitted = summary.fit.is_some(),
            "route rendered"
        );
        Ok(RenderOutcome::Rendered(summary))
    }

    async fn initialise(&self, mount: &MountPoint) -> Result<Box<dyn MapWidget>, WidgetInitError> {
        self.transition(MapLifecycleState::Initializing);
        let created = match self.library.wait_ready().await {
            Ok(()) => self.library.create_widget(mount, &Viewport::default()),
            Err(error) => Err(error),
        };
        match created {
            Ok(mut widget) => {
                if let Err(error) = widget.clear_overlays() {
                    warn!(mount = %mount, error = %error, "clearing stale overlays failed");
                }
                info!(mount = %mount, "map widget created");
                Ok(widget)
            }
            Err(error) => {
                warn!(
                    mount = %mount,
                    kind = error.kind(),
                    error = %error,
                    "map widget initialisation failed"
                );
                self.transition(MapLifecycleState::Unmounted);
                Err(error)
            }
        }
    }

    fn dispose_locked(&self, inner: &mut Inner) {
        if self.state() == MapLifecycleState::Disposed {
            debug!("map already disposed");
            return;
        }
        inner.overlays = RouteOverlays::default();
        if let Some(widget) = inner.widget.take() {
            widget.remove();
            info!("map widget removed");
        }
        self.transition(MapLifecycleState::Disposed);
    }

    fn transition(&self, next: MapLifecycleState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = ?previous, to = ?next, "map lifecycle transition");
        }
    }
}

impl Drop for MapLifecycleController {
    fn drop(&mut self) {
        if let Some(widget) = self.inner.get_mut().widget.take() {
            widget.remove();
        }
    }
}

fn remove_route_overlays(widget: &mut dyn MapWidget, overlays: &mut RouteOverlays) {
    for overlay in overlays.take_all() {
        if let Err(error) = widget.remove_overlay(overlay) {
            warn!(overlay = %overlay, error = %error, "overlay removal failed; continuing");
        }
    }
}

fn place_marker(
    widget: &mut dyn MapWidget,
    role: MarkerRole,
    waypoint: &Waypoint,
) -> Option<OverlayId> {
    let fallback = match role {
        MarkerRole::Start => "Start",
        MarkerRole::End => "End",
    };
    let label = if waypoint.label.trim().is_empty() {
        fallback.to_owned()
    } else {
        waypoint.label.clone()
    };
    let marker = MarkerSpec {
        role,
        position: waypoint.position,
        label,
    };
    widget
        .add_marker(&marker)
        .inspect_err(|error| warn!(role = ?role, error = %error, "marker placement failed"))
        .ok()
}

fn draw_route(
    widget: &mut dyn MapWidget,
    overlays: &mut RouteOverlays,
    route: &RouteResult,
) -> RenderSummary {
    let waypoints: Vec<&Waypoint> = route.valid_waypoints().collect();
    let start = waypoints.first().copied();
    let end = match waypoints.as_slice() {
        [_, .., last] => Some(*last),
        _ => None,
    };

    overlays.start = start.and_then(|waypoint| place_marker(widget, MarkerRole::Start, waypoint));
    overlays.end = end.and_then(|waypoint| place_marker(widget, MarkerRole::End, waypoint));

    let shape: Vec<LatLng> = route
        .path_shape
        .iter()
        .copied()
        .filter(LatLng::is_valid)
        .collect();
    let fit = if let Some(bounds) = LatLngBounds::from_points(&shape) {
        let polyline = PolylineSpec {
            points: shape,
            color: POLYLINE_COLOR,
            weight: POLYLINE_WEIGHT,
        };
        overlays.polyline = widget
            .add_polyline(&polyline)
            .inspect_err(|error| warn!(error = %error, "polyline drawing failed"))
            .ok();
        Some(ViewportFit {
            bounds,
            padding: FitPadding::Pixels(SHAPE_FIT_PADDING_PX),
        })
    } else {
        match (overlays.start.and(start), overlays.end.and(end)) {
            (Some(first), Some(last)) => {
                LatLngBounds::from_points(&[first.position, last.position]).map(|bounds| {
                    ViewportFit {
                        bounds,
                        padding: FitPadding::Ratio(MARKER_FIT_PAD_RATIO),
                    }
                })
            }
            _ => None,
        }
    };

    if let Some(fit) = &fit {
        widget.fit_bounds(&fit.bounds, fit.padding);
    }

    RenderSummary {
        markers: usize::from(overlays.start.is_some()) + usize::from(overlays.end.is_some()),
        polyline: overlays.polyline.is_some(),
        fit,
    }
}
