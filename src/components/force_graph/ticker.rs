use std::cell::RefCell;
use std::rc::Rc;

/// Callback invoked once per frame while a ticker is active.
pub type FrameCallback = Box<dyn FnMut()>;

/// Frame scheduler driving the simulation.
///
/// `stop` may be called from inside the frame callback; the callback must not
/// be invoked again afterwards unless `start` is called.
pub trait Ticker {
	/// Calls `frame` once per frame until `stop`. Replaces any earlier callback.
	fn start(&mut self, frame: FrameCallback);
	/// Cancels the scheduled callback.
	fn stop(&mut self);
	/// Whether a callback is scheduled.
	fn is_active(&self) -> bool;
}

#[derive(Default)]
struct ManualState {
	frame: Option<FrameCallback>,
	active: bool,
	frames: usize,
}

/// Ticker driven by hand, for headless use.
///
/// Clones share the same schedule, so a test can keep one handle while the
/// controller owns another.
#[derive(Clone, Default)]
pub struct ManualTicker {
	state: Rc<RefCell<ManualState>>,
}

impl ManualTicker {
	/// Ticker that runs nothing until [`advance`](Self::advance) is called.
	pub fn new() -> Self {
		Self::default()
	}

	/// Runs up to `frames` frames and returns how many actually ran.
	pub fn advance(&self, frames: usize) -> usize {
		let mut ran = 0;
		for _ in 0..frames {
			let Some(mut frame) = self.state.borrow_mut().frame.take() else {
				break;
			};
			frame();
			ran += 1;

			let mut state = self.state.borrow_mut();
			state.frames += 1;
			if state.active && state.frame.is_none() {
				state.frame = Some(frame);
			}
		}
		ran
	}

	/// Total frames delivered since creation.
	pub fn frames(&self) -> usize {
		self.state.borrow().frames
	}
}

impl Ticker for ManualTicker {
	fn start(&mut self, frame: FrameCallback) {
		let mut state = self.state.borrow_mut();
		state.frame = Some(frame);
		state.active = true;
	}

	fn stop(&mut self) {
		let mut state = self.state.borrow_mut();
		state.frame = None;
		state.active = false;
	}

	fn is_active(&self) -> bool {
		self.state.borrow().active
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::cell::Cell;

	#[test]
	fn delivers_frames_until_stopped() {
		let mut ticker = ManualTicker::new();
		let count = Rc::new(Cell::new(0));
		let seen = count.clone();
		ticker.start(Box::new(move || seen.set(seen.get() + 1)));

		assert_eq!(ticker.advance(3), 3);
		ticker.stop();
		assert_eq!(ticker.advance(3), 0);
		assert_eq!(count.get(), 3);
		assert_eq!(ticker.frames(), 3);
	}

	#[test]
	fn stop_from_inside_frame_is_honored() {
		let ticker = ManualTicker::new();
		let mut inner = ticker.clone();
		let count = Rc::new(Cell::new(0));
		let seen = count.clone();
		let mut handle = ticker.clone();
		handle.start(Box::new(move || {
			seen.set(seen.get() + 1);
			if seen.get() == 2 {
				inner.stop();
			}
		}));

		assert_eq!(ticker.advance(10), 2);
		assert!(!ticker.is_active());
		assert_eq!(count.get(), 2);
	}
}
