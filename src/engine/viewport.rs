//! Pan/zoom state and the world ↔ screen transform.
//!
//! `screen = world * zoom + pan`, screen origin top-left, +y down.

use log::{info, warn};

use super::error::{Result, check_dimensions};
use super::model::Point;

/// Zoom factor for a wheel notch away from the user.
pub const WHEEL_ZOOM_OUT: f64 = 0.9;
/// Zoom factor for a wheel notch toward the user.
pub const WHEEL_ZOOM_IN: f64 = 1.1;
/// Padding added around content by [`Viewport::fit_to_content`].
pub const FIT_PADDING: f64 = 50.0;

/// Inclusive zoom limits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomBounds {
	/// Smallest zoom.
	pub min: f64,
	/// Largest zoom.
	pub max: f64,
}

impl Default for ZoomBounds {
	fn default() -> Self {
		Self { min: 0.1, max: 3.0 }
	}
}

/// Snapshot handed to renderers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportState {
	/// Scale from world to screen.
	pub zoom: f64,
	/// Screen offset of the world origin.
	pub pan: Point,
}

impl Default for ViewportState {
	fn default() -> Self {
		Self {
			zoom: 1.0,
			pan: Point::ZERO,
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
enum DragState {
	#[default]
	Idle,
	/// `anchor` is the pointer position minus the pan at pointer-down.
	Dragging { anchor: Point },
}

/// Zoom, pan and drag state of one view.
#[derive(Clone, Debug)]
pub struct Viewport {
	width: f64,
	height: f64,
	bounds: ZoomBounds,
	state: ViewportState,
	drag: DragState,
}

impl Viewport {
	/// A viewport with the default zoom bounds.
	pub fn new(width: f64, height: f64) -> Result<Self> {
		Self::with_bounds(width, height, ZoomBounds::default())
	}

	/// A viewport with custom zoom bounds.
	pub fn with_bounds(width: f64, height: f64, bounds: ZoomBounds) -> Result<Self> {
		check_dimensions(width, height)?;
		info!("viewport {width}x{height}, zoom {}..{}", bounds.min, bounds.max);
		Ok(Self {
			width,
			height,
			bounds,
			state: ViewportState::default(),
			drag: DragState::Idle,
		})
	}

	/// Changes the size; zoom and pan are kept.
	pub fn resize(&mut self, width: f64, height: f64) -> Result<()> {
		check_dimensions(width, height)?;
		info!("viewport resized to {width}x{height}");
		self.width = width;
		self.height = height;
		Ok(())
	}

	/// Width in screen pixels.
	pub fn width(&self) -> f64 {
		self.width
	}

	/// Height in screen pixels.
	pub fn height(&self) -> f64 {
		self.height
	}

	/// Current zoom and pan.
	pub fn state(&self) -> ViewportState {
		self.state
	}

	/// Current zoom.
	pub fn zoom(&self) -> f64 {
		self.state.zoom
	}

	/// Maps a world point to the screen.
	pub fn world_to_screen(&self, p: Point) -> Point {
		p * self.state.zoom + self.state.pan
	}

	/// Maps a screen point back to the world.
	pub fn screen_to_world(&self, p: Point) -> Point {
		(p - self.state.pan) * (1.0 / self.state.zoom)
	}

	/// Shifts the pan by `(dx, dy)` screen pixels.
	pub fn pan(&mut self, dx: f64, dy: f64) {
		self.state.pan = self.state.pan + Point::new(dx, dy);
	}

	/// Multiplies the zoom by `factor`, keeping the pan as is.
	pub fn zoom_by(&mut self, factor: f64) {
		if !(factor.is_finite() && factor > 0.0) {
			warn!("ignoring zoom factor {factor}");
			return;
		}
		self.state.zoom = (self.state.zoom * factor).clamp(self.bounds.min, self.bounds.max);
	}

	/// Zooms by `factor` while keeping the world point under `anchor` still.
	pub fn zoom_at(&mut self, factor: f64, anchor: Point) {
		let before = self.state.zoom;
		self.zoom_by(factor);
		let ratio = self.state.zoom / before;
		self.state.pan = anchor - (anchor - self.state.pan) * ratio;
	}

	/// One discrete wheel event; positive `delta_y` zooms out.
	pub fn wheel(&mut self, delta_y: f64, anchor: Point) {
		self.zoom_at(wheel_factor(delta_y), anchor);
	}

	/// Zoom 1, no pan, no drag.
	pub fn reset(&mut self) {
		self.state = ViewportState::default();
		self.drag = DragState::Idle;
	}

	/// Zooms (never past 1×) and pans so `points`, padded by `padding`, are
	/// centered in the viewport. Returns `false` and changes nothing when
	/// there is nothing to fit.
	pub fn fit_to_content(&mut self, points: impl IntoIterator<Item = Point>, padding: f64) -> bool {
		let mut points = points.into_iter();
		let Some(first) = points.next() else {
			return false;
		};
		let (min, max) = points.fold((first, first), |(lo, hi), p| {
			(
				Point::new(lo.x.min(p.x), lo.y.min(p.y)),
				Point::new(hi.x.max(p.x), hi.y.max(p.y)),
			)
		});
		let (box_w, box_h) = (max.x - min.x + 2.0 * padding, max.y - min.y + 2.0 * padding);
		if !(box_w > 0.0 || box_h > 0.0) {
			return false;
		}

		let ratio = |extent: f64, size: f64| {
			if size > 0.0 { extent / size } else { f64::INFINITY }
		};
		let zoom = ratio(self.width, box_w)
			.min(ratio(self.height, box_h))
			.min(1.0)
			.clamp(self.bounds.min, self.bounds.max);
		let center = (min + max) * 0.5;
		self.state = ViewportState {
			zoom,
			pan: Point::new(self.width / 2.0, self.height / 2.0) - center * zoom,
		};
		true
	}

	/// Whether a background drag is in progress.
	pub fn is_dragging(&self) -> bool {
		matches!(self.drag, DragState::Dragging { .. })
	}

	/// Starts dragging from `pointer`.
	pub fn pointer_down(&mut self, pointer: Point) {
		self.drag = DragState::Dragging {
			anchor: pointer - self.state.pan,
		};
	}

	/// Pans to follow the pointer while dragging. Returns whether it panned.
	pub fn pointer_move(&mut self, pointer: Point) -> bool {
		match self.drag {
			DragState::Dragging { anchor } => {
				self.state.pan = pointer - anchor;
				true
			}
			DragState::Idle => false,
		}
	}

	/// Ends the drag.
	pub fn pointer_up(&mut self) {
		self.drag = DragState::Idle;
	}

	/// Ends the drag when the pointer leaves the canvas.
	pub fn pointer_leave(&mut self) {
		self.drag = DragState::Idle;
	}
}

/// Zoom factor for a wheel event with vertical delta `delta_y`.
pub fn wheel_factor(delta_y: f64) -> f64 {
	if delta_y > 0.0 { WHEEL_ZOOM_OUT } else { WHEEL_ZOOM_IN }
}
