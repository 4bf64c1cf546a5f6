use std::cell::RefCell;
use std::rc::Rc;

use local_graph::components::force_graph::scale::{ViewBox, label_opacity};
use local_graph::components::force_graph::{
	DragEvent, Frame, FrameCallback, GraphOptions, LinkData, ManualTicker, PageLinks, PinchState, Point, Scene,
	SimulationState, Surface, Ticker, ViewTransform, WeakController, build_and_run, convert,
};

#[derive(Default)]
struct SurfaceLog {
	mounted: Option<Scene>,
	styles: Vec<String>,
	view_boxes: Vec<ViewBox>,
	paints: usize,
	last_frame: Option<Frame>,
	transforms: Vec<(ViewTransform, f64)>,
	hover_css: Vec<String>,
	cleared: bool,
	on_resize: Option<Box<dyn FnMut(f64, f64)>>,
}

#[derive(Clone, Default)]
struct FakeSurface {
	log: Rc<RefCell<SurfaceLog>>,
}

impl FakeSurface {
	fn fire_resize(&self, width: f64, height: f64) {
		let callback = self.log.borrow_mut().on_resize.take();
		if let Some(mut callback) = callback {
			callback(width, height);
			let mut log = self.log.borrow_mut();
			if log.on_resize.is_none() && !log.cleared {
				log.on_resize = Some(callback);
			}
		}
	}
}

impl Surface for FakeSurface {
	/// Nothing has height until the graph is mounted.
	fn size(&self) -> (f64, f64) {
		match self.log.borrow().mounted {
			Some(_) => (600.0, 300.0),
			None => (0.0, 0.0),
		}
	}

	fn mount(&mut self, scene: &Scene, styles: &[&str], _controller: WeakController) {
		let mut log = self.log.borrow_mut();
		log.mounted = Some(scene.clone());
		log.styles = styles.iter().map(|s| s.to_string()).collect();
	}

	fn watch_resize(&mut self, on_resize: Box<dyn FnMut(f64, f64)>) {
		self.log.borrow_mut().on_resize = Some(on_resize);
	}

	fn unwatch_resize(&mut self) {
		self.log.borrow_mut().on_resize = None;
	}

	fn set_view_box(&mut self, view_box: ViewBox) {
		self.log.borrow_mut().view_boxes.push(view_box);
	}

	fn paint(&mut self, frame: &Frame) {
		let mut log = self.log.borrow_mut();
		log.paints += 1;
		log.last_frame = Some(frame.clone());
	}

	fn set_transform(&mut self, transform: &ViewTransform, label_opacity: f64) {
		self.log.borrow_mut().transforms.push((*transform, label_opacity));
	}

	fn set_hover_style(&mut self, css: &str) {
		self.log.borrow_mut().hover_css.push(css.to_owned());
	}

	fn clear(&mut self) {
		self.log.borrow_mut().cleared = true;
	}
}

/// Keeps calling its frame even after `stop`, like a frame that was already
/// queued when the graph went away.
#[derive(Clone, Default)]
struct StaleTicker {
	frame: Rc<RefCell<Option<FrameCallback>>>,
}

impl Ticker for StaleTicker {
	fn start(&mut self, frame: FrameCallback) {
		*self.frame.borrow_mut() = Some(frame);
	}

	fn stop(&mut self) {}

	fn is_active(&self) -> bool {
		self.frame.borrow().is_some()
	}
}

fn page(title: &str, links: &[&str]) -> PageLinks {
	PageLinks {
		title: title.into(),
		links: links.iter().map(|s| s.to_string()).collect(),
	}
}

fn sample() -> LinkData {
	convert(
		&page("A", &["B", "C"]),
		&[page("B", &["A", "C"]), page("C", &[]), page("D", &["A"])],
	)
}

fn options() -> GraphOptions {
	GraphOptions {
		style_override: ".node { fill: red; }".into(),
		current: Some("a".into()),
	}
}

#[test]
fn mounts_and_paints_every_tick() {
	let surface = FakeSurface::default();
	let ticker = ManualTicker::new();
	let disposer = build_and_run(&sample(), surface.clone(), ticker.clone(), &options());
	let ticks = Rc::new(RefCell::new(0));
	let seen = ticks.clone();
	let _subscription = disposer.controller().on_tick(move |_| *seen.borrow_mut() += 1);

	assert_eq!(ticker.advance(5), 5);
	assert_eq!(*ticks.borrow(), 5);

	let log = surface.log.borrow();
	assert_eq!(log.paints, 5);
	let scene = log.mounted.as_ref().unwrap();
	assert_eq!(scene.nodes.len(), 4);
	assert_eq!(scene.edges.len(), 5);
	assert!(scene.nodes.iter().any(|n| n.id == "a" && n.current));
	assert_eq!(log.styles[1], ".node { fill: red; }");
	assert_eq!(log.view_boxes, [ViewBox::for_container(600.0, 300.0)]);
	assert_eq!(log.transforms[0].0, ViewTransform::IDENTITY);
	let frame = log.last_frame.as_ref().unwrap();
	assert_eq!(frame.nodes.len(), 4);
	assert!(frame.nodes.iter().all(Option::is_some));
}

#[test]
fn drag_pins_then_releases_into_cooling() {
	let ticker = ManualTicker::new();
	let disposer = build_and_run(&sample(), FakeSurface::default(), ticker.clone(), &options());
	let controller = disposer.controller().clone();

	ticker.advance(60);
	assert_eq!(controller.state(), SimulationState::Cooling);
	assert!(controller.alpha() < 0.5);

	assert!(controller.drag_start("a"));
	assert_eq!(controller.alpha(), 1.0);
	assert_eq!(controller.state(), SimulationState::Running);

	assert!(controller.drag_move("a", 100.0, 50.0));
	for _ in 0..5 {
		ticker.advance(1);
		assert_eq!(controller.position("a"), Some(Point::new(100.0, 50.0)));
	}

	assert!(controller.drag_end("a"));
	assert_eq!(controller.dragging(), None);
	assert_eq!(controller.state(), SimulationState::Cooling);
	let mut previous = controller.alpha();
	for _ in 0..20 {
		ticker.advance(1);
		assert!(controller.alpha() < previous);
		previous = controller.alpha();
	}
	assert_ne!(controller.position("a"), Some(Point::new(100.0, 50.0)));
}

#[test]
fn drag_moves_are_inverse_transformed() {
	let ticker = ManualTicker::new();
	let disposer = build_and_run(&sample(), FakeSurface::default(), ticker.clone(), &options());
	let controller = disposer.controller();

	controller.set_transform(ViewTransform {
		x: 10.0,
		y: 0.0,
		k: 2.0,
	});
	controller.drag_start("b");
	controller.drag_move("b", 210.0, 100.0);
	ticker.advance(1);
	assert_eq!(controller.position("b"), Some(Point::new(100.0, 50.0)));
}

#[test]
fn drag_events_follow_protocol_order() {
	let ticker = ManualTicker::new();
	let disposer = build_and_run(&sample(), FakeSurface::default(), ticker.clone(), &options());
	let controller = disposer.controller();
	let events = Rc::new(RefCell::new(Vec::new()));
	let sink = events.clone();
	let subscription = controller.on_node_drag_event(move |event| sink.borrow_mut().push(event.clone()));

	assert!(!controller.drag_move("a", 1.0, 1.0));
	assert!(!controller.drag_end("a"));
	assert!(!controller.drag_start("missing"));

	assert!(controller.drag_start("a"));
	assert!(!controller.drag_start("b"));
	assert!(!controller.drag_move("b", 1.0, 1.0));
	assert!(controller.drag_move("a", 3.0, 4.0));
	assert!(controller.drag_end("a"));

	{
		let events = events.borrow();
		assert_eq!(events.len(), 3);
		assert!(matches!(&events[0], DragEvent::Start { id, .. } if id == "a"));
		assert_eq!(events[1], DragEvent::Move {
			id: "a".into(),
			x: 3.0,
			y: 4.0
		});
		assert_eq!(events[2], DragEvent::End { id: "a".into() });
	}

	subscription.unsubscribe();
	controller.drag_start("a");
	assert_eq!(events.borrow().len(), 3);
}

#[test]
fn teardown_stops_ticks_and_resize() {
	let surface = FakeSurface::default();
	let ticker = ManualTicker::new();
	let disposer = build_and_run(&sample(), surface.clone(), ticker.clone(), &options());
	let controller = disposer.controller().clone();
	let ticks = Rc::new(RefCell::new(0));
	let seen = ticks.clone();
	let _subscription = controller.on_tick(move |_| *seen.borrow_mut() += 1);

	ticker.advance(10);
	disposer.dispose();

	assert!(controller.is_disposed());
	assert!(!ticker.is_active());
	assert_eq!(ticker.advance(10), 0);
	assert_eq!(*ticks.borrow(), 10);

	let boxes_before = surface.log.borrow().view_boxes.len();
	surface.fire_resize(1200.0, 800.0);
	controller.resize(1200.0, 800.0);
	let log = surface.log.borrow();
	assert_eq!(log.view_boxes.len(), boxes_before);
	assert!(log.cleared);
	assert!(!controller.drag_start("a"));
}

#[test]
fn frames_queued_before_teardown_are_ignored() {
	let surface = FakeSurface::default();
	let ticker = StaleTicker::default();
	let disposer = build_and_run(&sample(), surface.clone(), ticker.clone(), &options());
	let controller = disposer.controller().clone();
	let frame = ticker.frame.borrow_mut().take();
	let mut frame = frame.unwrap();

	frame();
	assert_eq!(surface.log.borrow().paints, 1);
	drop(disposer);
	frame();
	frame();
	assert_eq!(surface.log.borrow().paints, 1);
	assert!(controller.is_disposed());
}

#[test]
fn resize_recomputes_view_box() {
	let surface = FakeSurface::default();
	let disposer = build_and_run(&sample(), surface.clone(), ManualTicker::new(), &options());

	surface.fire_resize(1200.0, 600.0);
	assert_eq!(disposer.controller().view_box(), ViewBox {
		min_x: -500.0,
		min_y: -250.0,
		width: 1000.0,
		height: 500.0,
	});
	assert_eq!(surface.log.borrow().view_boxes.len(), 2);
}

#[test]
fn zoom_broadcasts_clamped_transform_and_opacity() {
	let surface = FakeSurface::default();
	let disposer = build_and_run(&sample(), surface.clone(), ManualTicker::new(), &options());
	let controller = disposer.controller();
	let seen = Rc::new(RefCell::new(Vec::new()));
	let sink = seen.clone();
	let _subscription = controller.on_transform_change(move |t| sink.borrow_mut().push(*t));

	controller.zoom_at(10.0, 10.0, 100.0);
	controller.zoom_at(10.0, 10.0, 0.0001);
	controller.pan_by(5.0, -5.0);

	let seen = seen.borrow();
	assert_eq!(seen.len(), 3);
	assert_eq!(seen[0].k, 4.0);
	assert_eq!(seen[1].k, 0.25);
	assert_eq!(seen[2].k, 0.25);
	assert_eq!(seen[2].x, seen[1].x + 5.0);

	let log = surface.log.borrow();
	let (_, opacity) = log.transforms.last().copied().unwrap();
	assert_eq!(opacity, label_opacity(0.25));
	assert!(opacity > 0.0);
}

#[test]
fn background_drag_pans() {
	let disposer = build_and_run(&sample(), FakeSurface::default(), ManualTicker::new(), &options());
	let controller = disposer.controller();

	controller.pan_start(0.0, 0.0);
	controller.pan_move(10.0, 5.0);
	controller.pan_move(15.0, 5.0);
	controller.pan_end();
	controller.pan_move(100.0, 100.0);

	assert_eq!(controller.transform(), ViewTransform {
		x: 15.0,
		y: 5.0,
		k: 1.0
	});
}

#[test]
fn two_finger_gesture_pans_and_zooms() {
	let disposer = build_and_run(&sample(), FakeSurface::default(), ManualTicker::new(), &options());
	let controller = disposer.controller();
	let transforms = Rc::new(RefCell::new(0));
	let count = transforms.clone();
	let _subscription = controller.on_transform_change(move |_| *count.borrow_mut() += 1);

	let start = PinchState::between(Point::new(0.0, 0.0), Point::new(40.0, 0.0));
	let slid = PinchState::between(Point::new(10.0, 10.0), Point::new(50.0, 10.0));
	controller.pinch(&start, &slid);
	assert_eq!(controller.transform(), ViewTransform {
		x: 10.0,
		y: 10.0,
		k: 1.0
	});

	let spread = PinchState::between(Point::new(-10.0, 10.0), Point::new(70.0, 10.0));
	let under = controller.transform().screen_to_graph(slid.mid.x, slid.mid.y);
	controller.pinch(&slid, &spread);
	let transform = controller.transform();
	assert_eq!(transform.k, 2.0);
	let after = transform.screen_to_graph(spread.mid.x, spread.mid.y);
	assert!((under - after).length() < 1e-9);
	assert_eq!(*transforms.borrow(), 2);
}

#[test]
fn hover_style_tracks_zoom() {
	let surface = FakeSurface::default();
	let disposer = build_and_run(&sample(), surface.clone(), ManualTicker::new(), &options());
	let controller = disposer.controller();

	controller.hover(Some("b"));
	controller.zoom_at(0.0, 0.0, 0.5);
	controller.hover(None);

	let log = surface.log.borrow();
	assert_eq!(log.hover_css.len(), 3);
	assert!(log.hover_css[0].contains(r#"[data-title="b"]"#));
	assert!(log.hover_css[0].contains("opacity: 0.6 !important;"));
	let dimmed = format!("opacity: {} !important;", label_opacity(0.5) * 0.6);
	assert!(log.hover_css[1].contains(&dimmed));
	assert_eq!(log.hover_css[2], "");
	assert_eq!(controller.hovered(), None);
}

#[test]
fn layout_settles_and_stops_ticking() {
	let ticker = ManualTicker::new();
	let disposer = build_and_run(&sample(), FakeSurface::default(), ticker.clone(), &options());

	let ran = ticker.advance(1000);
	assert!(ran < 1000);
	assert!(!ticker.is_active());
	assert_eq!(disposer.controller().state(), SimulationState::Stopped);

	assert!(disposer.controller().drag_start("c"));
	assert!(ticker.is_active());
	assert_eq!(ticker.advance(3), 3);
}

#[test]
fn empty_data_renders_nothing() {
	let surface = FakeSurface::default();
	let ticker = ManualTicker::new();
	let _disposer = build_and_run(&LinkData::default(), surface.clone(), ticker.clone(), &options());
	ticker.advance(2);

	let log = surface.log.borrow();
	assert!(log.mounted.as_ref().unwrap().nodes.is_empty());
	assert_eq!(log.last_frame, Some(Frame::default()));
}
