use std::fmt;

use super::simulation::{Point, Simulation};
use super::types::LinkData;

/// Edge segment clipped to the circumference of both endpoint glyphs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgePath {
	/// Point on the source glyph's circumference.
	pub from: Point,
	/// Point on the target glyph's circumference.
	pub to: Point,
}

impl fmt::Display for EdgePath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "M{},{}L{},{}", self.from.x, self.from.y, self.to.x, self.to.y)
	}
}

/// Shortens `from -> to` by `r1` at the start and `r2` at the end.
/// Coincident endpoints have no direction and yield `None`.
pub fn clip_edge(from: Point, to: Point, r1: f64, r2: f64) -> Option<EdgePath> {
	let delta = to - from;
	let distance = delta.length();
	if distance == 0.0 || !distance.is_finite() {
		return None;
	}
	let unit = delta * (1.0 / distance);
	Some(EdgePath {
		from: from + unit * r1,
		to: to - unit * r2,
	})
}

/// Static description of one node glyph, fixed for the lifetime of a graph.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeView {
	/// Normalized title.
	pub id: String,
	/// Display title.
	pub label: String,
	/// Glyph radius, `2 + sqrt(degree)`.
	pub radius: f64,
	/// Drawn de-emphasized.
	pub empty: bool,
	/// The page being viewed.
	pub current: bool,
	/// Forward links, for hover matching.
	pub targets: Vec<String>,
	/// Backward links, for hover matching.
	pub sources: Vec<String>,
}

/// One directed link.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeView {
	/// Source node id.
	pub source: String,
	/// Target node id.
	pub target: String,
}

/// Elements a surface must create. Index order matches [`Frame`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
	/// One entry per simulation node.
	pub nodes: Vec<NodeView>,
	/// One entry per simulation link.
	pub edges: Vec<EdgeView>,
}

impl Scene {
	/// Describes the simulation's nodes and links, styled from `data`.
	pub fn new(simulation: &Simulation, data: &LinkData, current: Option<&str>) -> Self {
		let nodes = simulation
			.nodes()
			.iter()
			.map(|node| NodeView {
				id: node.id.clone(),
				label: data.display_name(&node.id).to_owned(),
				radius: data.node_radius(&node.id),
				empty: data.is_empty_node(&node.id),
				current: current == Some(node.id.as_str()),
				targets: data.targets(&node.id).to_vec(),
				sources: data.sources(&node.id).map(str::to_owned).collect(),
			})
			.collect();
		let edges = simulation
			.links()
			.iter()
			.map(|link| EdgeView {
				source: simulation.nodes()[link.source].id.clone(),
				target: simulation.nodes()[link.target].id.clone(),
			})
			.collect();
		Self { nodes, edges }
	}
}

/// Screen geometry for one tick. `None` entries are not drawn.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
	/// Clipped segment of each edge.
	pub edges: Vec<Option<EdgePath>>,
	/// Anchor of each node glyph and its label.
	pub nodes: Vec<Option<Point>>,
}

fn anchor(p: Point) -> Option<Point> {
	(p.x.is_finite() && p.y.is_finite()).then_some(p)
}

impl Frame {
	/// Reads the current positions of `simulation` for every element of `scene`.
	pub fn compute(simulation: &Simulation, scene: &Scene) -> Self {
		let positions: Vec<Option<Point>> = simulation
			.nodes()
			.iter()
			.map(|node| anchor(node.position))
			.collect();
		let edges = simulation
			.links()
			.iter()
			.map(|link| {
				let (from, to) = (positions[link.source]?, positions[link.target]?);
				clip_edge(
					from,
					to,
					scene.nodes[link.source].radius,
					scene.nodes[link.target].radius,
				)
			})
			.collect();
		Self {
			edges,
			nodes: positions,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::convert::{PageLinks, convert};
	use crate::components::force_graph::types::GraphData;

	#[test]
	fn clips_both_ends_by_radius() {
		let path = clip_edge(Point::new(0.0, 0.0), Point::new(10.0, 0.0), 2.0, 3.0).unwrap();
		assert_eq!(path.from, Point::new(2.0, 0.0));
		assert_eq!(path.to, Point::new(7.0, 0.0));
		assert_eq!(path.to_string(), "M2,0L7,0");
	}

	#[test]
	fn coincident_endpoints_emit_nothing() {
		let p = Point::new(4.0, -1.0);
		assert_eq!(clip_edge(p, p, 2.0, 2.0), None);
	}

	#[test]
	fn frame_matches_scene_order() {
		let data = convert(
			&PageLinks {
				title: "Home".into(),
				links: vec!["A".into(), "B".into()],
			},
			&[],
		);
		let mut sim = Simulation::new(&GraphData::from_link_data(&data));
		let scene = Scene::new(&sim, &data, Some("home"));
		sim.restart();
		sim.tick();
		let frame = Frame::compute(&sim, &scene);

		assert_eq!(frame.nodes.len(), scene.nodes.len());
		assert_eq!(frame.edges.len(), 2);
		assert!(frame.edges.iter().all(Option::is_some));
		let home = scene.nodes.iter().find(|n| n.id == "home").unwrap();
		assert!(home.current);
		assert_eq!(home.label, "Home");
		assert_eq!(home.radius, 2.0 + 2f64.sqrt());
		assert!(scene.nodes.iter().filter(|n| n.id != "home").all(|n| n.empty));
	}

	#[test]
	fn overlapping_nodes_skip_their_edge() {
		let data = convert(
			&PageLinks {
				title: "a".into(),
				links: vec!["b".into()],
			},
			&[],
		);
		let mut sim = Simulation::new(&GraphData::from_link_data(&data));
		sim.pin("a", 5.0, 5.0);
		sim.pin("b", 5.0, 5.0);
		sim.reheat();
		sim.tick();
		let frame = Frame::compute(&sim, &Scene::new(&sim, &data, None));
		assert_eq!(frame.edges, [None]);
		assert_eq!(frame.nodes, [Some(Point::new(5.0, 5.0)), Some(Point::new(5.0, 5.0))]);
	}
}
