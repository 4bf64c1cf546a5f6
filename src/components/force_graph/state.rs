use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use super::scale::{clamp_zoom, label_opacity};
use super::simulation::Point;

/// Pan and uniform zoom applied to the scene, view box space = layout * k + (x, y).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	/// Horizontal offset in view box units.
	pub x: f64,
	/// Vertical offset in view box units.
	pub y: f64,
	/// Scale, within [0.25, 4].
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self::IDENTITY
	}
}

impl ViewTransform {
	/// No pan, no zoom.
	pub const IDENTITY: Self = Self {
		x: 0.0,
		y: 0.0,
		k: 1.0,
	};

	/// Maps a view box point back into layout space.
	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> Point {
		Point::new((sx - self.x) / self.k, (sy - self.y) / self.k)
	}

	/// Scales by `factor` around the screen point `(sx, sy)`, which keeps its
	/// layout position.
	pub fn zoomed_at(&self, sx: f64, sy: f64, factor: f64) -> Self {
		let k = clamp_zoom(self.k * factor);
		let ratio = k / self.k;
		Self {
			x: sx - (sx - self.x) * ratio,
			y: sy - (sy - self.y) * ratio,
			k,
		}
	}

	/// Follows a two-finger gesture: the layout point under the old finger
	/// midpoint ends up under the new one, scaled by the change in spread.
	pub fn pinched(&self, from: &PinchState, to: &PinchState) -> Self {
		let (factor, shift) = from.step_to(to);
		self.zoomed_at(from.mid.x, from.mid.y, factor)
			.panned(shift.x, shift.y)
	}

	/// Shifted by `(dx, dy)` view box units.
	pub fn panned(&self, dx: f64, dy: f64) -> Self {
		Self {
			x: self.x + dx,
			y: self.y + dy,
			k: self.k,
		}
	}

	/// Same transform with `k` clamped to the zoom range.
	pub fn clamped(self) -> Self {
		Self {
			k: clamp_zoom(self.k),
			..self
		}
	}

	/// Label opacity at this zoom level.
	pub fn label_opacity(&self) -> f64 {
		label_opacity(self.k)
	}
}

impl fmt::Display for ViewTransform {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "translate({},{}) scale({})", self.x, self.y, self.k)
	}
}

/// Wheel delta to zoom factor; `ctrl` marks a trackpad pinch.
pub fn wheel_zoom_factor(delta_y: f64, delta_mode: u32, ctrl: bool) -> f64 {
	let unit = match delta_mode {
		0 => 0.002,
		1 => 0.05,
		_ => 1.0,
	};
	let pinch = if ctrl { 10.0 } else { 1.0 };
	2f64.powf(-delta_y * unit * pinch)
}

#[derive(Clone, Debug, PartialEq)]
pub struct DragState {
	pub id: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PanState {
	pub last_x: f64,
	pub last_y: f64,
}

/// Two-finger touch gesture, in view box units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PinchState {
	/// Midpoint between the two fingers.
	pub mid: Point,
	/// Distance between the two fingers.
	pub distance: f64,
}

impl PinchState {
	/// Gesture state for fingers at `a` and `b`.
	pub fn between(a: Point, b: Point) -> Self {
		Self {
			mid: Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0),
			distance: (b - a).length(),
		}
	}

	/// Zoom factor and midpoint shift from `self` to `next`. Fingers that
	/// touch each other keep the current scale.
	pub fn step_to(&self, next: &Self) -> (f64, Point) {
		let factor = if self.distance > 0.0 && next.distance > 0.0 {
			next.distance / self.distance
		} else {
			1.0
		};
		(factor, next.mid - self.mid)
	}
}

/// Tells the click that ends a node drag apart from a plain click.
#[derive(Clone, Debug, Default)]
pub struct ClickGuard(Rc<Cell<bool>>);

impl ClickGuard {
	/// A node was pressed; the new gesture has not moved yet.
	pub fn press(&self) {
		self.0.set(false);
	}

	pub fn moved(&self) {
		self.0.set(true);
	}

	/// Whether the click should be swallowed. Resets the guard.
	pub fn take_click(&self) -> bool {
		self.0.replace(false)
	}
}

/// Finger that is dragging a node, by touch identifier.
#[derive(Clone, Debug, Default)]
pub struct DragFinger(Rc<Cell<Option<i32>>>);

impl DragFinger {
	pub fn grab(&self, finger: i32) {
		self.0.set(Some(finger));
	}

	pub fn finger(&self) -> Option<i32> {
		self.0.get()
	}

	/// Lets go if the dragging finger is among `lifted`; returns whether it was.
	pub fn release(&self, lifted: impl IntoIterator<Item = i32>) -> bool {
		let Some(held) = self.0.get() else {
			return false;
		};
		let released = lifted.into_iter().any(|finger| finger == held);
		if released {
			self.0.set(None);
		}
		released
	}
}
