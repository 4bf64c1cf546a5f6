//! Browser implementations of [`Surface`] and [`Ticker`].

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::warn;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
	Document, Element, EventTarget, MouseEvent, ResizeObserver, ResizeObserverEntry, ShadowRoot, ShadowRootInit,
	ShadowRootMode, TouchEvent, TouchList, WheelEvent,
};

use super::controller::{Surface, WeakController};
use super::highlight::id_list_attr;
use super::render::{Frame, Scene};
use super::scale::ViewBox;
use super::simulation::Point;
use super::state::{ClickGuard, DragFinger, PinchState, ViewTransform, wheel_zoom_factor};
use super::ticker::{FrameCallback, Ticker};

const SVG_NS: &str = "http://www.w3.org/2000/svg";

static NEXT_GRAPH: AtomicUsize = AtomicUsize::new(0);

fn window() -> Option<web_sys::Window> {
	web_sys::window()
}

/// Ticker backed by `requestAnimationFrame`.
#[derive(Default)]
pub struct AnimationFrameTicker {
	/// Generation of the running schedule, 0 when stopped.
	generation: Rc<Cell<u64>>,
	started: u64,
	handle: Rc<Cell<Option<i32>>>,
	callback: Rc<RefCell<Option<Closure<dyn FnMut()>>>>,
}

impl AnimationFrameTicker {
	/// Idle until the controller starts it.
	pub fn new() -> Self {
		Self::default()
	}

	fn request(callback: &Closure<dyn FnMut()>) -> Option<i32> {
		window()?
			.request_animation_frame(callback.as_ref().unchecked_ref())
			.ok()
	}
}

impl Ticker for AnimationFrameTicker {
	fn start(&mut self, mut frame: FrameCallback) {
		self.stop();
		self.started += 1;
		let generation = self.started;
		self.generation.set(generation);

		let (current, handle) = (self.generation.clone(), self.handle.clone());
		let slot = Rc::downgrade(&self.callback);
		let closure = Closure::new(move || {
			handle.set(None);
			if current.get() != generation {
				return;
			}
			frame();
			if current.get() != generation {
				return;
			}
			if let Some(slot) = slot.upgrade() {
				if let Some(cb) = slot.borrow().as_ref() {
					handle.set(Self::request(cb));
				}
			}
		});
		self.handle.set(Self::request(&closure));
		*self.callback.borrow_mut() = Some(closure);
	}

	fn stop(&mut self) {
		self.generation.set(0);
		if let Some(id) = self.handle.take() {
			if let Some(win) = window() {
				let _ = win.cancel_animation_frame(id);
			}
		}
	}

	fn is_active(&self) -> bool {
		self.generation.get() != 0
	}
}

impl Drop for AnimationFrameTicker {
	fn drop(&mut self) {
		self.stop();
		self.callback.borrow_mut().take();
	}
}

struct Listener {
	target: EventTarget,
	event: &'static str,
	callback: Closure<dyn FnMut(web_sys::Event)>,
}

impl Listener {
	fn attach(
		target: &EventTarget,
		event: &'static str,
		callback: impl FnMut(web_sys::Event) + 'static,
	) -> Result<Self, JsValue> {
		let callback = Closure::<dyn FnMut(web_sys::Event)>::new(callback);
		target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())?;
		Ok(Self {
			target: target.clone(),
			event,
			callback,
		})
	}

	fn detach(&self) {
		let _ = self
			.target
			.remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref());
	}
}

/// Identifier and client coordinates of each touch in `list`.
fn fingers(list: &TouchList) -> Vec<(i32, f64, f64)> {
	(0..list.length())
		.filter_map(|i| list.get(i))
		.map(|touch| (touch.identifier(), touch.client_x() as f64, touch.client_y() as f64))
		.collect()
}

struct NodeElements {
	circle: Element,
	label: Element,
}

/// SVG rendering inside the shadow root of a host element, so the graph's
/// stylesheets apply to this graph only.
pub struct SvgSurface {
	host: Element,
	root: Option<ShadowRoot>,
	link_prefix: Option<String>,
	document: Option<Document>,
	svg: Option<Element>,
	scene_group: Option<Element>,
	styles: Vec<Element>,
	hover_style: Option<Element>,
	paths: Vec<Element>,
	nodes: Vec<NodeElements>,
	view_box: Rc<Cell<ViewBox>>,
	listeners: Vec<Listener>,
	observer: Option<(ResizeObserver, Closure<dyn FnMut(js_sys::Array, ResizeObserver)>)>,
}

impl SvgSurface {
	/// Renders into `host`, attaching a shadow root on first mount.
	pub fn new(host: Element) -> Self {
		Self {
			host,
			root: None,
			link_prefix: None,
			document: window().and_then(|w| w.document()),
			svg: None,
			scene_group: None,
			styles: Vec::new(),
			hover_style: None,
			paths: Vec::new(),
			nodes: Vec::new(),
			view_box: Rc::new(Cell::new(ViewBox::default())),
			listeners: Vec::new(),
			observer: None,
		}
	}

	/// Wraps each node glyph in a link to `{prefix}{id}`.
	pub fn with_link_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.link_prefix = Some(prefix.into());
		self
	}

	fn svg_element(&self, tag: &str) -> Result<Element, JsValue> {
		let document = self
			.document
			.as_ref()
			.ok_or_else(|| JsValue::from_str("no document"))?;
		document.create_element_ns(Some(SVG_NS), tag)
	}

	/// The host keeps its shadow root across rebuilds; it can only be attached once.
	fn shadow_root(&mut self) -> Result<ShadowRoot, JsValue> {
		if let Some(root) = &self.root {
			return Ok(root.clone());
		}
		let root = match self.host.shadow_root() {
			Some(root) => root,
			None => self.host.attach_shadow(&ShadowRootInit::new(ShadowRootMode::Open))?,
		};
		self.root = Some(root.clone());
		Ok(root)
	}

	fn try_mount(&mut self, scene: &Scene, styles: &[&str], controller: WeakController) -> Result<(), JsValue> {
		let document = self
			.document
			.clone()
			.ok_or_else(|| JsValue::from_str("no document"))?;
		let graph_id = NEXT_GRAPH.fetch_add(1, Ordering::Relaxed);
		let root = self.shadow_root()?;

		for css in styles.iter().copied().chain([""]) {
			let style = document.create_element("style")?;
			style.set_text_content(Some(css));
			root.append_child(&style)?;
			self.styles.push(style);
		}
		self.hover_style = self.styles.last().cloned();

		let svg = self.svg_element("svg")?;
		let defs = self.svg_element("defs")?;
		let arrow = self.svg_element("polygon")?;
		let arrow_id = format!("arrow-{graph_id}");
		arrow.set_attribute("id", &arrow_id)?;
		arrow.set_attribute("points", "0,0 10,5, 0,10 5,5")?;
		defs.append_child(&arrow)?;
		svg.append_child(&defs)?;

		let group = self.svg_element("g")?;
		svg.append_child(&group)?;

		for (i, edge) in scene.edges.iter().enumerate() {
			let link = self.svg_element("g")?;
			link.set_attribute("class", "link")?;
			link.set_attribute("data-source", &edge.source)?;
			link.set_attribute("data-target", &edge.target)?;

			let marker_id = format!("m{graph_id}-{i}");
			let marker = self.svg_element("marker")?;
			for (name, value) in [
				("id", marker_id.as_str()),
				("viewBox", "0 0 10 10"),
				("refX", "8"),
				("refY", "5"),
				("markerWidth", "4"),
				("markerHeight", "4"),
				("orient", "auto"),
			] {
				marker.set_attribute(name, value)?;
			}
			let arrow_use = self.svg_element("use")?;
			arrow_use.set_attribute("href", &format!("#{arrow_id}"))?;
			arrow_use.set_attribute("fill", "currentColor")?;
			marker.append_child(&arrow_use)?;
			link.append_child(&marker)?;

			let path = self.svg_element("path")?;
			path.set_attribute("stroke", "currentColor")?;
			path.set_attribute("stroke-width", "2")?;
			path.set_attribute("marker-end", &format!("url(#{marker_id})"))?;
			link.append_child(&path)?;
			group.append_child(&link)?;
			self.paths.push(path);
		}

		let guard = ClickGuard::default();
		let drag_finger = DragFinger::default();
		for node in &scene.nodes {
			let g = self.svg_element("g")?;
			let mut class = String::from("node");
			if node.current {
				class.push_str(" current");
			}
			if node.empty {
				class.push_str(" empty");
			}
			g.set_attribute("class", &class)?;
			g.set_attribute("data-title", &node.id)?;
			g.set_attribute("data-targets", &id_list_attr(&node.targets))?;
			g.set_attribute("data-sources", &id_list_attr(&node.sources))?;

			let circle = self.svg_element("circle")?;
			circle.set_attribute("r", &node.radius.to_string())?;
			match self.link_prefix.clone() {
				Some(prefix) => {
					let anchor = self.svg_element("a")?;
					anchor.set_attribute("href", &format!("{prefix}{}", node.id))?;
					anchor.append_child(&circle)?;
					g.append_child(&anchor)?;
					let guard = guard.clone();
					self.listeners.push(Listener::attach(&anchor, "click", move |event| {
						if guard.take_click() {
							event.prevent_default();
						}
					})?);
				}
				None => {
					g.append_child(&circle)?;
				}
			}

			let label = self.svg_element("text")?;
			for (name, value) in [
				("dx", "0"),
				("dy", "8px"),
				("text-anchor", "middle"),
				("dominant-baseline", "text-before-edge"),
			] {
				label.set_attribute(name, value)?;
			}
			label.set_text_content(Some(&node.label));
			g.append_child(&label)?;
			group.append_child(&g)?;

			self.attach_node_listeners(&circle, &node.id, &controller, &guard, &drag_finger)?;
			self.nodes.push(NodeElements { circle, label });
		}

		root.append_child(&svg)?;
		self.attach_view_listeners(&svg, controller, guard, drag_finger)?;
		self.svg = Some(svg);
		self.scene_group = Some(group);
		Ok(())
	}

	fn attach_node_listeners(
		&mut self,
		circle: &Element,
		id: &str,
		controller: &WeakController,
		guard: &ClickGuard,
		drag_finger: &DragFinger,
	) -> Result<(), JsValue> {
		let (down_id, down_ctl, down_guard) = (id.to_owned(), controller.clone(), guard.clone());
		self.listeners.push(Listener::attach(circle, "mousedown", move |event| {
			event.stop_propagation();
			event.prevent_default();
			down_guard.press();
			if let Some(controller) = down_ctl.upgrade() {
				controller.drag_start(&down_id);
			}
		})?);

		// No prevent_default here: a tap still has to reach the node's link.
		let (touch_id, touch_ctl, touch_guard, touch_finger) =
			(id.to_owned(), controller.clone(), guard.clone(), drag_finger.clone());
		self.listeners.push(Listener::attach(circle, "touchstart", move |event| {
			event.stop_propagation();
			let (Some(controller), Some(event)) = (touch_ctl.upgrade(), event.dyn_ref::<TouchEvent>()) else {
				return;
			};
			let Some(&(finger, _, _)) = fingers(&event.changed_touches()).first() else {
				return;
			};
			touch_guard.press();
			if controller.drag_start(&touch_id) {
				touch_finger.grab(finger);
			}
		})?);

		let (over_id, over_ctl) = (id.to_owned(), controller.clone());
		self.listeners.push(Listener::attach(circle, "mouseover", move |_| {
			if let Some(controller) = over_ctl.upgrade() {
				controller.hover(Some(&over_id));
			}
		})?);

		let leave_ctl = controller.clone();
		self.listeners.push(Listener::attach(circle, "mouseleave", move |_| {
			if let Some(controller) = leave_ctl.upgrade() {
				controller.hover(None);
			}
		})?);
		Ok(())
	}

	fn attach_view_listeners(
		&mut self,
		svg: &Element,
		controller: WeakController,
		guard: ClickGuard,
		drag_finger: DragFinger,
	) -> Result<(), JsValue> {
		let client_to_view = {
			let (svg, view_box) = (svg.clone(), self.view_box.clone());
			move |x: f64, y: f64| -> Point {
				let rect = svg.get_bounding_client_rect();
				view_box
					.get()
					.client_to_view(x - rect.left(), y - rect.top(), rect.width(), rect.height())
			}
		};
		let to_view = {
			let client_to_view = client_to_view.clone();
			move |event: &MouseEvent| client_to_view(event.client_x() as f64, event.client_y() as f64)
		};

		let (down_ctl, down_view) = (controller.clone(), to_view.clone());
		self.listeners.push(Listener::attach(svg, "mousedown", move |event| {
			let (Some(controller), Some(event)) = (down_ctl.upgrade(), event.dyn_ref::<MouseEvent>()) else {
				return;
			};
			let p = down_view(event);
			controller.pan_start(p.x, p.y);
		})?);

		self.attach_touch_listeners(svg, &controller, &guard, drag_finger, client_to_view)?;

		let (wheel_ctl, wheel_view) = (controller.clone(), to_view.clone());
		self.listeners.push(Listener::attach(svg, "wheel", move |event| {
			let (Some(controller), Some(event)) = (wheel_ctl.upgrade(), event.dyn_ref::<WheelEvent>()) else {
				return;
			};
			event.prevent_default();
			let mouse: &MouseEvent = event;
			let p = wheel_view(mouse);
			let factor = wheel_zoom_factor(event.delta_y(), event.delta_mode(), event.ctrl_key());
			controller.zoom_at(p.x, p.y, factor);
		})?);

		let Some(win) = window() else {
			return Ok(());
		};
		let (move_ctl, move_view, move_guard) = (controller.clone(), to_view, guard);
		self.listeners.push(Listener::attach(&win, "mousemove", move |event| {
			let (Some(controller), Some(event)) = (move_ctl.upgrade(), event.dyn_ref::<MouseEvent>()) else {
				return;
			};
			match controller.dragging() {
				Some(id) => {
					let p = move_view(event);
					move_guard.moved();
					controller.drag_move(&id, p.x, p.y);
				}
				None => {
					let p = move_view(event);
					controller.pan_move(p.x, p.y);
				}
			}
		})?);

		let up_ctl = controller;
		self.listeners.push(Listener::attach(&win, "mouseup", move |_| {
			let Some(controller) = up_ctl.upgrade() else {
				return;
			};
			match controller.dragging() {
				Some(id) => {
					controller.drag_end(&id);
				}
				None => controller.pan_end(),
			}
		})?);
		Ok(())
	}

	/// One finger pans the background or drags a node; two fingers pinch.
	fn attach_touch_listeners(
		&mut self,
		svg: &Element,
		controller: &WeakController,
		guard: &ClickGuard,
		drag_finger: DragFinger,
		to_view: impl Fn(f64, f64) -> Point + Clone + 'static,
	) -> Result<(), JsValue> {
		let pinch = Rc::new(Cell::new(None::<PinchState>));
		let pinch_of = {
			let to_view = to_view.clone();
			move |a: (i32, f64, f64), b: (i32, f64, f64)| {
				PinchState::between(to_view(a.1, a.2), to_view(b.1, b.2))
			}
		};

		let (start_ctl, start_view, start_pinch, start_of) =
			(controller.clone(), to_view.clone(), pinch.clone(), pinch_of.clone());
		self.listeners.push(Listener::attach(svg, "touchstart", move |event| {
			let (Some(controller), Some(event)) = (start_ctl.upgrade(), event.dyn_ref::<TouchEvent>()) else {
				return;
			};
			match fingers(&event.touches()).as_slice() {
				[(_, x, y)] => {
					start_pinch.set(None);
					let p = start_view(*x, *y);
					controller.pan_start(p.x, p.y);
				}
				[a, b, ..] => {
					controller.pan_end();
					start_pinch.set(Some(start_of(*a, *b)));
				}
				[] => {}
			}
		})?);

		let (move_ctl, move_view, move_pinch, move_guard, move_finger) = (
			controller.clone(),
			to_view.clone(),
			pinch.clone(),
			guard.clone(),
			drag_finger.clone(),
		);
		self.listeners.push(Listener::attach(svg, "touchmove", move |event| {
			let (Some(controller), Some(touch)) = (move_ctl.upgrade(), event.dyn_ref::<TouchEvent>()) else {
				return;
			};
			event.prevent_default();
			let touches = fingers(&touch.touches());
			if let Some(id) = controller.dragging() {
				let held = move_finger.finger();
				if let Some(&(_, x, y)) = touches.iter().find(|(finger, _, _)| Some(*finger) == held) {
					let p = move_view(x, y);
					move_guard.moved();
					controller.drag_move(&id, p.x, p.y);
				}
				return;
			}
			match touches.as_slice() {
				[(_, x, y)] => {
					let p = move_view(*x, *y);
					controller.pan_move(p.x, p.y);
				}
				[a, b, ..] => {
					let next = pinch_of(*a, *b);
					if let Some(previous) = move_pinch.replace(Some(next)) {
						controller.pinch(&previous, &next);
					}
				}
				[] => {}
			}
		})?);

		for name in ["touchend", "touchcancel"] {
			let (end_ctl, end_view, end_pinch, end_finger) =
				(controller.clone(), to_view.clone(), pinch.clone(), drag_finger.clone());
			self.listeners.push(Listener::attach(svg, name, move |event| {
				let (Some(controller), Some(event)) = (end_ctl.upgrade(), event.dyn_ref::<TouchEvent>()) else {
					return;
				};
				let lifted = fingers(&event.changed_touches());
				if let Some(id) = controller.dragging() {
					if end_finger.release(lifted.iter().map(|(finger, _, _)| *finger)) {
						controller.drag_end(&id);
					}
					return;
				}
				end_pinch.set(None);
				controller.pan_end();
				if let [(_, x, y)] = fingers(&event.touches()).as_slice() {
					let p = end_view(*x, *y);
					controller.pan_start(p.x, p.y);
				}
			})?);
		}
		Ok(())
	}

	fn try_watch_resize(&mut self, mut on_resize: Box<dyn FnMut(f64, f64)>) -> Result<(), JsValue> {
		let Some(svg) = self.svg.clone() else {
			return Ok(());
		};
		let callback = Closure::<dyn FnMut(js_sys::Array, ResizeObserver)>::new(
			move |entries: js_sys::Array, _observer: ResizeObserver| {
				let Some(entry) = entries.get(0).dyn_into::<ResizeObserverEntry>().ok() else {
					return;
				};
				let rect = entry.content_rect();
				on_resize(rect.width(), rect.height());
			},
		);
		let observer = ResizeObserver::new(callback.as_ref().unchecked_ref())?;
		observer.observe(&svg);
		self.observer = Some((observer, callback));
		Ok(())
	}
}

fn set_or_remove(element: &Element, name: &str, value: Option<f64>) {
	let result = match value {
		Some(value) => element.set_attribute(name, &value.to_string()),
		None => element.remove_attribute(name),
	};
	if let Err(err) = result {
		warn!("failed to update {name}: {err:?}");
	}
}

impl Surface for SvgSurface {
	fn size(&self) -> (f64, f64) {
		let rect = self.host.get_bounding_client_rect();
		(rect.width(), rect.height())
	}

	fn mount(&mut self, scene: &Scene, styles: &[&str], controller: WeakController) {
		if let Err(err) = self.try_mount(scene, styles, controller) {
			warn!("failed to mount local graph: {err:?}");
			self.clear();
		}
	}

	fn watch_resize(&mut self, on_resize: Box<dyn FnMut(f64, f64)>) {
		if let Err(err) = self.try_watch_resize(on_resize) {
			warn!("failed to observe graph size: {err:?}");
		}
	}

	fn unwatch_resize(&mut self) {
		if let Some((observer, _callback)) = self.observer.take() {
			observer.disconnect();
		}
	}

	fn set_view_box(&mut self, view_box: ViewBox) {
		self.view_box.set(view_box);
		if let Some(svg) = &self.svg {
			let _ = svg.set_attribute("viewBox", &view_box.to_string());
		}
	}

	fn paint(&mut self, frame: &Frame) {
		for (path, edge) in self.paths.iter().zip(&frame.edges) {
			let result = match edge {
				Some(edge) => path.set_attribute("d", &edge.to_string()),
				None => path.remove_attribute("d"),
			};
			if let Err(err) = result {
				warn!("failed to update edge path: {err:?}");
			}
		}
		for (elements, anchor) in self.nodes.iter().zip(&frame.nodes) {
			set_or_remove(&elements.circle, "cx", anchor.map(|p| p.x));
			set_or_remove(&elements.circle, "cy", anchor.map(|p| p.y));
			set_or_remove(&elements.label, "x", anchor.map(|p| p.x));
			set_or_remove(&elements.label, "y", anchor.map(|p| p.y));
		}
	}

	fn set_transform(&mut self, transform: &ViewTransform, label_opacity: f64) {
		if let Some(group) = &self.scene_group {
			let _ = group.set_attribute("transform", &transform.to_string());
		}
		let style = format!("opacity: {label_opacity}");
		for elements in &self.nodes {
			let _ = elements.label.set_attribute("style", &style);
		}
	}

	fn set_hover_style(&mut self, css: &str) {
		if let Some(style) = &self.hover_style {
			style.set_text_content(Some(css));
		}
	}

	fn clear(&mut self) {
		self.unwatch_resize();
		for listener in self.listeners.drain(..) {
			listener.detach();
		}
		if let Some(svg) = self.svg.take() {
			svg.remove();
		}
		for style in self.styles.drain(..) {
			style.remove();
		}
		self.scene_group = None;
		self.hover_style = None;
		self.paths.clear();
		self.nodes.clear();
	}
}
