//! Owns one live graph: simulation, viewport transform, surface and ticker.
//!
//! Everything runs on one thread. Pointer handlers and frame callbacks reach
//! the controller through a [`WeakController`], so a graph that has been
//! disposed (or dropped) turns every late callback into a no-op.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use log::{debug, info};

use super::highlight::{base_style, hover_style};
use super::render::{Frame, Scene};
use super::scale::ViewBox;
use super::simulation::{Point, Simulation, SimulationState};
use super::state::{DragState, PanState, PinchState, ViewTransform};
use super::ticker::Ticker;
use super::types::{GraphData, LinkData};

/// Container the graph draws into.
pub trait Surface {
	/// Current size of the rendered graph in CSS pixels. Read after `mount`.
	fn size(&self) -> (f64, f64);
	/// Creates one element per scene entry. Input handlers should hold on to
	/// `controller` and nothing stronger.
	fn mount(&mut self, scene: &Scene, styles: &[&str], controller: WeakController);
	/// Calls `on_resize` with the new size whenever the container changes size.
	fn watch_resize(&mut self, on_resize: Box<dyn FnMut(f64, f64)>);
	/// Stops resize notifications.
	fn unwatch_resize(&mut self);
	/// Applies the layout region the container shows.
	fn set_view_box(&mut self, view_box: ViewBox);
	/// Moves every glyph and edge to the positions of `frame`.
	fn paint(&mut self, frame: &Frame);
	/// Applies the pan/zoom transform and the matching label opacity.
	fn set_transform(&mut self, transform: &ViewTransform, label_opacity: f64);
	/// Replaces the hover stylesheet; `""` resets it.
	fn set_hover_style(&mut self, css: &str);
	/// Removes every rendered element and input listener.
	fn clear(&mut self);
}

/// Published after every simulation step.
#[derive(Clone, Debug, PartialEq)]
pub struct TickEvent {
	/// Alpha after the step.
	pub alpha: f64,
	/// Geometry painted for the step.
	pub frame: Frame,
}

/// Node drag progress, in layout coordinates.
#[derive(Clone, Debug, PartialEq)]
pub enum DragEvent {
	/// Node pinned where it was.
	Start {
		/// Dragged node.
		id: String,
		/// Layout x of the pin.
		x: f64,
		/// Layout y of the pin.
		y: f64,
	},
	/// Pin moved to `(x, y)`.
	Move {
		/// Dragged node.
		id: String,
		/// Layout x of the pin.
		x: f64,
		/// Layout y of the pin.
		y: f64,
	},
	/// Node released.
	End {
		/// Released node.
		id: String,
	},
}

struct Handlers<T> {
	next: Cell<u64>,
	list: RefCell<Vec<(u64, Rc<dyn Fn(&T)>)>>,
}

impl<T: 'static> Handlers<T> {
	fn new() -> Rc<Self> {
		Rc::new(Self {
			next: Cell::new(0),
			list: RefCell::new(Vec::new()),
		})
	}

	fn subscribe(self: &Rc<Self>, handler: impl Fn(&T) + 'static) -> Subscription {
		let id = self.next.get();
		self.next.set(id + 1);
		self.list.borrow_mut().push((id, Rc::new(handler)));

		let handlers = Rc::downgrade(self);
		Subscription {
			remove: Box::new(move || {
				if let Some(handlers) = handlers.upgrade() {
					handlers.list.borrow_mut().retain(|(other, _)| *other != id);
				}
			}),
		}
	}

	/// Handlers may subscribe or unsubscribe while being notified; changes
	/// apply from the next event.
	fn emit(&self, value: &T) {
		let current: Vec<_> = self.list.borrow().iter().map(|(_, h)| h.clone()).collect();
		for handler in current {
			handler(value);
		}
	}
}

/// Registration returned by the `on_*` methods.
#[must_use = "the handler stays registered until `unsubscribe` is called"]
pub struct Subscription {
	remove: Box<dyn FnOnce()>,
}

impl Subscription {
	/// Removes the handler. Events already being dispatched still reach it.
	pub fn unsubscribe(self) {
		(self.remove)()
	}
}

struct Hub {
	tick: Rc<Handlers<TickEvent>>,
	transform: Rc<Handlers<ViewTransform>>,
	drag: Rc<Handlers<DragEvent>>,
}

struct Inner {
	simulation: Simulation,
	scene: Scene,
	surface: Box<dyn Surface>,
	ticker: Box<dyn Ticker>,
	transform: ViewTransform,
	view_box: ViewBox,
	drag: Option<DragState>,
	pan: Option<PanState>,
	hovered: Option<String>,
	frame: Frame,
	disposed: bool,
}

/// Handle to a live graph; clones share it.
#[derive(Clone)]
pub struct Controller {
	inner: Rc<RefCell<Inner>>,
	hub: Rc<Hub>,
}

/// Non-owning [`Controller`] handle held by input listeners.
#[derive(Clone)]
pub struct WeakController {
	inner: Weak<RefCell<Inner>>,
	hub: Weak<Hub>,
}

impl WeakController {
	/// `None` once the graph has been dropped.
	pub fn upgrade(&self) -> Option<Controller> {
		Some(Controller {
			inner: self.inner.upgrade()?,
			hub: self.hub.upgrade()?,
		})
	}
}

/// Per-graph settings for [`build_and_run`].
#[derive(Clone, Debug, Default)]
pub struct GraphOptions {
	/// Injected verbatim after the base stylesheet.
	pub style_override: String,
	/// Id of the page being viewed, drawn with the `current` class.
	pub current: Option<String>,
}

/// Builds the graph for `data`, mounts it on `surface` and starts ticking.
pub fn build_and_run(
	data: &LinkData,
	surface: impl Surface + 'static,
	ticker: impl Ticker + 'static,
	options: &GraphOptions,
) -> Disposer {
	let graph = GraphData::from_link_data(data);
	let simulation = Simulation::new(&graph);
	let scene = Scene::new(&simulation, data, options.current.as_deref());

	let controller = Controller {
		inner: Rc::new(RefCell::new(Inner {
			simulation,
			scene,
			surface: Box::new(surface),
			ticker: Box::new(ticker),
			transform: ViewTransform::IDENTITY,
			view_box: ViewBox::default(),
			drag: None,
			pan: None,
			hovered: None,
			frame: Frame::default(),
			disposed: false,
		})),
		hub: Rc::new(Hub {
			tick: Handlers::new(),
			transform: Handlers::new(),
			drag: Handlers::new(),
		}),
	};

	{
		let weak = controller.downgrade();
		let mut inner = controller.inner.borrow_mut();
		let inner = &mut *inner;
		let base = base_style();
		inner
			.surface
			.mount(&inner.scene, &[base.as_str(), options.style_override.as_str()], weak.clone());
		// Measured after mounting: an empty host usually has no height yet.
		let (width, height) = inner.surface.size();
		inner.view_box = ViewBox::for_container(width, height);
		inner.surface.set_view_box(inner.view_box);
		inner
			.surface
			.set_transform(&inner.transform, inner.transform.label_opacity());
		inner.surface.watch_resize(Box::new(move |width, height| {
			if let Some(controller) = weak.upgrade() {
				controller.resize(width, height);
			}
		}));
		inner.simulation.restart();
		info!(
			"local graph mounted: {} nodes, {} links",
			inner.scene.nodes.len(),
			inner.scene.edges.len()
		);
	}
	controller.ensure_ticking();

	Disposer { controller }
}

/// Tears the graph down when `dispose` is called or when dropped.
#[must_use = "dropping the disposer tears the graph down immediately"]
pub struct Disposer {
	controller: Controller,
}

impl Disposer {
	/// The graph this disposer tears down.
	pub fn controller(&self) -> &Controller {
		&self.controller
	}

	/// Tears the graph down now.
	pub fn dispose(self) {
		self.controller.dispose();
	}
}

impl Drop for Disposer {
	fn drop(&mut self) {
		self.controller.dispose();
	}
}

impl Controller {
	/// Handle for listeners that must not keep the graph alive.
	pub fn downgrade(&self) -> WeakController {
		WeakController {
			inner: Rc::downgrade(&self.inner),
			hub: Rc::downgrade(&self.hub),
		}
	}

	/// Called after every tick with the painted geometry.
	pub fn on_tick(&self, handler: impl Fn(&TickEvent) + 'static) -> Subscription {
		self.hub.tick.subscribe(handler)
	}

	/// Called on every pan or zoom step.
	pub fn on_transform_change(&self, handler: impl Fn(&ViewTransform) + 'static) -> Subscription {
		self.hub.transform.subscribe(handler)
	}

	/// Called on drag start, every move and drag end.
	pub fn on_node_drag_event(&self, handler: impl Fn(&DragEvent) + 'static) -> Subscription {
		self.hub.drag.subscribe(handler)
	}

	/// Layout position of node `id`.
	pub fn position(&self, id: &str) -> Option<Point> {
		self.inner.borrow().simulation.position(id)
	}

	/// Lifecycle state of the simulation.
	pub fn state(&self) -> SimulationState {
		self.inner.borrow().simulation.state()
	}

	/// Current simulation temperature.
	pub fn alpha(&self) -> f64 {
		self.inner.borrow().simulation.alpha()
	}

	/// Current pan/zoom transform.
	pub fn transform(&self) -> ViewTransform {
		self.inner.borrow().transform
	}

	/// Layout region shown by the container.
	pub fn view_box(&self) -> ViewBox {
		self.inner.borrow().view_box
	}

	/// Id of the highlighted node.
	pub fn hovered(&self) -> Option<String> {
		self.inner.borrow().hovered.clone()
	}

	/// Id of the node being dragged.
	pub fn dragging(&self) -> Option<String> {
		self.inner.borrow().drag.as_ref().map(|drag| drag.id.clone())
	}

	/// Geometry painted on the most recent tick.
	pub fn last_frame(&self) -> Frame {
		self.inner.borrow().frame.clone()
	}

	/// Whether the graph has been torn down.
	pub fn is_disposed(&self) -> bool {
		self.inner.borrow().disposed
	}

	fn ensure_ticking(&self) {
		let weak = self.downgrade();
		let mut inner = self.inner.borrow_mut();
		if inner.disposed || !inner.simulation.is_ticking() || inner.ticker.is_active() {
			return;
		}
		inner.ticker.start(Box::new(move || {
			if let Some(controller) = weak.upgrade() {
				controller.frame();
			}
		}));
	}

	fn frame(&self) {
		let event = {
			let mut inner = self.inner.borrow_mut();
			let inner = &mut *inner;
			if inner.disposed {
				return;
			}
			if !inner.simulation.tick() {
				inner.ticker.stop();
				return;
			}
			inner.frame = Frame::compute(&inner.simulation, &inner.scene);
			inner.surface.paint(&inner.frame);
			if !inner.simulation.is_ticking() {
				inner.ticker.stop();
			}
			TickEvent {
				alpha: inner.simulation.alpha(),
				frame: inner.frame.clone(),
			}
		};
		self.hub.tick.emit(&event);
	}

	/// Pins `id` where it stands and heats the layout. Ignored while another
	/// drag is in progress.
	pub fn drag_start(&self, id: &str) -> bool {
		let event = {
			let mut inner = self.inner.borrow_mut();
			if inner.disposed || inner.drag.is_some() {
				return false;
			}
			let Some(p) = inner.simulation.position(id) else {
				return false;
			};
			if inner.simulation.state() != SimulationState::Running {
				inner.simulation.reheat();
			}
			inner.simulation.pin(id, p.x, p.y);
			inner.drag = Some(DragState { id: id.to_owned() });
			debug!("drag start {id}");
			DragEvent::Start {
				id: id.to_owned(),
				x: p.x,
				y: p.y,
			}
		};
		self.ensure_ticking();
		self.hub.drag.emit(&event);
		true
	}

	/// Moves the pin of the dragged node to the screen point `(sx, sy)`.
	pub fn drag_move(&self, id: &str, sx: f64, sy: f64) -> bool {
		let event = {
			let mut inner = self.inner.borrow_mut();
			if inner.disposed || inner.drag.as_ref().is_none_or(|drag| drag.id != id) {
				return false;
			}
			let p = inner.transform.screen_to_graph(sx, sy);
			inner.simulation.pin(id, p.x, p.y);
			DragEvent::Move {
				id: id.to_owned(),
				x: p.x,
				y: p.y,
			}
		};
		self.hub.drag.emit(&event);
		true
	}

	/// Releases the dragged node; alpha keeps decaying from where it is.
	pub fn drag_end(&self, id: &str) -> bool {
		let event = {
			let mut inner = self.inner.borrow_mut();
			if inner.disposed || inner.drag.as_ref().is_none_or(|drag| drag.id != id) {
				return false;
			}
			inner.simulation.unpin(id);
			inner.drag = None;
			debug!("drag end {id}");
			DragEvent::End { id: id.to_owned() }
		};
		self.hub.drag.emit(&event);
		true
	}

	/// Clamps and applies `transform`, then notifies subscribers.
	pub fn set_transform(&self, transform: ViewTransform) {
		let transform = {
			let mut inner = self.inner.borrow_mut();
			let inner = &mut *inner;
			if inner.disposed {
				return;
			}
			inner.transform = transform.clamped();
			let opacity = inner.transform.label_opacity();
			inner.surface.set_transform(&inner.transform, opacity);
			if inner.hovered.is_some() {
				let css = hover_style(inner.hovered.as_deref(), opacity);
				inner.surface.set_hover_style(&css);
			}
			inner.transform
		};
		self.hub.transform.emit(&transform);
	}

	/// Scales around the screen point, as a wheel or pinch gesture does.
	pub fn zoom_at(&self, sx: f64, sy: f64, factor: f64) {
		let next = self.transform().zoomed_at(sx, sy, factor);
		self.set_transform(next);
	}

	/// Two-finger gesture step, both states in view box units.
	pub fn pinch(&self, from: &PinchState, to: &PinchState) {
		let next = self.transform().pinched(from, to);
		self.set_transform(next);
	}

	/// Shifts the scene by a screen offset.
	pub fn pan_by(&self, dx: f64, dy: f64) {
		let next = self.transform().panned(dx, dy);
		self.set_transform(next);
	}

	/// Background drag, in screen units.
	pub fn pan_start(&self, sx: f64, sy: f64) {
		let mut inner = self.inner.borrow_mut();
		if !inner.disposed && inner.drag.is_none() {
			inner.pan = Some(PanState {
				last_x: sx,
				last_y: sy,
			});
		}
	}

	/// Continues a background drag at the screen point `(sx, sy)`.
	pub fn pan_move(&self, sx: f64, sy: f64) {
		let delta = {
			let mut inner = self.inner.borrow_mut();
			let Some(pan) = inner.pan.as_mut() else {
				return;
			};
			let delta = (sx - pan.last_x, sy - pan.last_y);
			pan.last_x = sx;
			pan.last_y = sy;
			delta
		};
		self.pan_by(delta.0, delta.1);
	}

	/// Ends a background drag.
	pub fn pan_end(&self) {
		self.inner.borrow_mut().pan = None;
	}

	/// Highlights the neighborhood of `id`; `None` clears it.
	pub fn hover(&self, id: Option<&str>) {
		let mut inner = self.inner.borrow_mut();
		if inner.disposed || inner.hovered.as_deref() == id {
			return;
		}
		inner.hovered = id.map(str::to_owned);
		let css = hover_style(id, inner.transform.label_opacity());
		inner.surface.set_hover_style(&css);
	}

	/// Recomputes the view box for a container of this size.
	pub fn resize(&self, width: f64, height: f64) {
		let mut inner = self.inner.borrow_mut();
		if inner.disposed {
			return;
		}
		inner.view_box = ViewBox::for_container(width, height);
		let view_box = inner.view_box;
		inner.surface.set_view_box(view_box);
	}

	/// Stops ticking, disconnects resize observation and clears the surface.
	pub fn dispose(&self) {
		let mut inner = self.inner.borrow_mut();
		if inner.disposed {
			return;
		}
		inner.disposed = true;
		inner.simulation.stop();
		inner.ticker.stop();
		inner.surface.unwatch_resize();
		inner.surface.clear();
		inner.drag = None;
		inner.pan = None;
		inner.hovered = None;
		info!("local graph disposed");
	}
}
