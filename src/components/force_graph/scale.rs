//! Scale-dependent constants and the mappings between screen, view box and
//! layout space.

use std::fmt;

use super::simulation::Point;

/// Zoom multiplier in the label opacity ramp.
pub const OPACITY_SCALE: f64 = 5.0;
/// Magnification of layout units relative to CSS pixels.
pub const VIEW_SCALE: f64 = 1.2;
/// Label font size in `em`.
pub const FONT_SIZE: f64 = 0.7;
/// Smallest zoom level.
pub const MIN_ZOOM: f64 = 0.25;
/// Largest zoom level.
pub const MAX_ZOOM: f64 = 4.0;

/// Label opacity for zoom level `k`. Labels fade out as the graph shrinks.
pub fn label_opacity(k: f64) -> f64 {
	((k * OPACITY_SCALE - 1.0) / 3.75).clamp(0.0, 1.0)
}

/// Clamps `k` to [`MIN_ZOOM`, `MAX_ZOOM`].
pub fn clamp_zoom(k: f64) -> f64 {
	k.clamp(MIN_ZOOM, MAX_ZOOM)
}

/// Region of layout space shown by the container, centered on the origin.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewBox {
	/// Left edge.
	pub min_x: f64,
	/// Top edge.
	pub min_y: f64,
	/// Width in layout units.
	pub width: f64,
	/// Height in layout units.
	pub height: f64,
}

impl ViewBox {
	/// View box for a container of `width` x `height` CSS pixels.
	pub fn for_container(width: f64, height: f64) -> Self {
		let (w, h) = (width / VIEW_SCALE, height / VIEW_SCALE);
		Self {
			min_x: -w / 2.0,
			min_y: -h / 2.0,
			width: w,
			height: h,
		}
	}

	/// Maps a pointer offset inside a `client_width` x `client_height` element
	/// into view box coordinates.
	pub fn client_to_view(&self, px: f64, py: f64, client_width: f64, client_height: f64) -> Point {
		if client_width <= 0.0 || client_height <= 0.0 {
			return Point::new(self.min_x, self.min_y);
		}
		Point::new(
			self.min_x + px * self.width / client_width,
			self.min_y + py * self.height / client_height,
		)
	}
}

impl fmt::Display for ViewBox {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {} {} {}", self.min_x, self.min_y, self.width, self.height)
	}
}
