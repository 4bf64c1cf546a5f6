//! Force-directed layout: link springs, Barnes-Hut repulsion, centering, and
//! an alpha "temperature" that cools the system into equilibrium.

mod forces;
mod quadtree;

use std::collections::HashMap;
use std::f64::consts::PI;
use std::ops::{Add, Mul, Sub};

use log::{debug, warn};

use super::types::GraphData;
use forces::ChargeParams;

/// Repulsion multiplier applied to the base charge of -100.
pub const REPEL_FORCE: f64 = 0.7;
/// Rest length of every link spring, in layout units.
pub const LINK_DISTANCE: f64 = 50.0;

/// Position or vector in layout space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
	/// Horizontal coordinate.
	pub x: f64,
	/// Vertical coordinate.
	pub y: f64,
}

impl Point {
	/// Point at `(x, y)`.
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	/// Squared length, for comparisons without a square root.
	pub fn length_sq(self) -> f64 {
		self.x * self.x + self.y * self.y
	}

	/// Euclidean length.
	pub fn length(self) -> f64 {
		self.length_sq().sqrt()
	}
}

impl Add for Point {
	type Output = Self;
	fn add(self, rhs: Self) -> Self {
		Self::new(self.x + rhs.x, self.y + rhs.y)
	}
}

impl Sub for Point {
	type Output = Self;
	fn sub(self, rhs: Self) -> Self {
		Self::new(self.x - rhs.x, self.y - rhs.y)
	}
}

impl Mul<f64> for Point {
	type Output = Self;
	fn mul(self, rhs: f64) -> Self {
		Self::new(self.x * rhs, self.y * rhs)
	}
}

/// Position override held while a node is dragged.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Pin {
	/// Moved by the integrator.
	#[default]
	Free,
	/// Held at `(x, y)` every tick.
	PinnedAt { x: f64, y: f64 },
}

/// Simulation state of one node.
#[derive(Clone, Debug)]
pub struct SimNode {
	/// Normalized title.
	pub id: String,
	/// Position in layout space; follows the pin while pinned.
	pub position: Point,
	/// Velocity carried to the next tick.
	pub velocity: Point,
	/// Drag override.
	pub pin: Pin,
}

/// Link resolved to arena indices, with strength and bias derived from the
/// endpoint link counts.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SimLink {
	pub(crate) source: usize,
	pub(crate) target: usize,
	strength: f64,
	bias: f64,
}

/// Where the simulation is in its alpha lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimulationState {
	/// Not ticking.
	Stopped,
	/// A pinned node holds the alpha target up.
	Running,
	/// Alpha decays toward zero.
	Cooling,
}

/// Force and cooling constants.
#[derive(Clone, Debug)]
pub struct SimulationParameters {
	/// Rest length of every link.
	pub link_distance: f64,
	/// Many-body strength; negative repels.
	pub charge_strength: f64,
	/// Barnes-Hut opening angle.
	pub theta: f64,
	/// Charge distances are clamped below this.
	pub distance_min: f64,
	/// Point the barycenter is pulled toward.
	pub center: Point,
	/// Share of the barycenter offset removed each tick.
	pub center_strength: f64,
	/// The simulation stops once alpha falls below this.
	pub alpha_min: f64,
	/// Fraction of the gap to the alpha target closed each tick.
	pub alpha_decay: f64,
	/// Alpha target while at least one node is pinned.
	pub pinned_alpha_target: f64,
	/// Fraction of velocity lost each tick.
	pub velocity_decay: f64,
	/// Seed of the jiggle generator.
	pub seed: u32,
}

impl Default for SimulationParameters {
	fn default() -> Self {
		let alpha_min = 0.001;
		Self {
			link_distance: LINK_DISTANCE,
			charge_strength: -100.0 * REPEL_FORCE,
			theta: 0.9,
			distance_min: 1.0,
			center: Point::default(),
			center_strength: 1.0,
			alpha_min,
			alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
			pinned_alpha_target: 1.0,
			velocity_decay: 0.4,
			seed: 1,
		}
	}
}

/// Linear congruential generator for the jiggle applied to coincident nodes.
#[derive(Clone, Debug)]
pub(crate) struct Lcg(u64);

impl Lcg {
	const A: u64 = 1_664_525;
	const C: u64 = 1_013_904_223;
	const M: u64 = 1 << 32;

	fn new(seed: u32) -> Self {
		Self(seed as u64)
	}

	pub(crate) fn next_f64(&mut self) -> f64 {
		self.0 = (Self::A * self.0 + Self::C) % Self::M;
		self.0 as f64 / Self::M as f64
	}
}

/// Arena of nodes and resolved links stepped one tick at a time.
pub struct Simulation {
	nodes: Vec<SimNode>,
	index: HashMap<String, usize>,
	links: Vec<SimLink>,
	params: SimulationParameters,
	alpha: f64,
	ticking: bool,
	rng: Lcg,
	scratch: Vec<Point>,
}

impl Simulation {
	/// Places the nodes on a phyllotaxis spiral with default parameters.
	pub fn new(data: &GraphData) -> Self {
		Self::with_parameters(data, SimulationParameters::default())
	}

	/// Links to unknown ids are dropped. A self link adds two to its node's
	/// degree, which scales the strength of that node's other links, but gets
	/// no spring of its own.
	pub fn with_parameters(data: &GraphData, params: SimulationParameters) -> Self {
		let golden_angle = PI * (3.0 - 5.0_f64.sqrt());
		let nodes: Vec<SimNode> = data
			.nodes
			.iter()
			.enumerate()
			.map(|(i, node)| {
				let radius = 10.0 * (0.5 + i as f64).sqrt();
				let angle = i as f64 * golden_angle;
				SimNode {
					id: node.id.clone(),
					position: Point::new(radius * angle.cos(), radius * angle.sin()),
					velocity: Point::default(),
					pin: Pin::Free,
				}
			})
			.collect();
		let index: HashMap<String, usize> = nodes
			.iter()
			.enumerate()
			.map(|(i, node)| (node.id.clone(), i))
			.collect();

		let mut resolved = Vec::with_capacity(data.links.len());
		let mut count = vec![0usize; nodes.len()];
		for link in &data.links {
			let (Some(&source), Some(&target)) = (index.get(&link.source), index.get(&link.target)) else {
				warn!("dropping link {} -> {}: unknown node", link.source, link.target);
				continue;
			};
			count[source] += 1;
			count[target] += 1;
			if source == target {
				debug!("self link on {} counts toward degree only", link.source);
				continue;
			}
			resolved.push((source, target));
		}
		let links = resolved
			.into_iter()
			.map(|(source, target)| {
				let (cs, ct) = (count[source] as f64, count[target] as f64);
				SimLink {
					source,
					target,
					strength: 1.0 / cs.min(ct),
					bias: cs / (cs + ct),
				}
			})
			.collect();

		debug!("simulation built with {} nodes", nodes.len());
		Self {
			nodes,
			index,
			links,
			rng: Lcg::new(params.seed),
			params,
			alpha: 1.0,
			ticking: false,
			scratch: Vec::new(),
		}
	}

	/// Nodes in arena order.
	pub fn nodes(&self) -> &[SimNode] {
		&self.nodes
	}

	pub(crate) fn links(&self) -> &[SimLink] {
		&self.links
	}

	/// Arena index of node `id`.
	pub fn node_index(&self, id: &str) -> Option<usize> {
		self.index.get(id).copied()
	}

	/// Position of node `id`.
	pub fn position(&self, id: &str) -> Option<Point> {
		self.node_index(id).map(|i| self.nodes[i].position)
	}

	/// Current temperature.
	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	/// Alpha approaches this: held up while any node is pinned, 0 otherwise.
	pub fn alpha_target(&self) -> f64 {
		if self.nodes.iter().any(|node| node.pin != Pin::Free) {
			self.params.pinned_alpha_target
		} else {
			0.0
		}
	}

	/// Stopped, Running or Cooling.
	pub fn state(&self) -> SimulationState {
		if !self.ticking {
			SimulationState::Stopped
		} else if self.alpha_target() >= self.params.alpha_min {
			SimulationState::Running
		} else {
			SimulationState::Cooling
		}
	}

	/// Whether `step` advances.
	pub fn is_ticking(&self) -> bool {
		self.ticking
	}

	/// Resumes ticking without touching positions or alpha.
	pub fn restart(&mut self) {
		self.ticking = true;
	}

	/// Halts ticking; state is kept for a warm restart.
	pub fn stop(&mut self) {
		self.ticking = false;
	}

	/// Sets alpha back to 1 and resumes ticking.
	pub fn reheat(&mut self) {
		self.alpha = 1.0;
		self.ticking = true;
	}

	/// Holds node `id` at `(x, y)` until [`unpin`](Self::unpin). `false` for unknown ids.
	pub fn pin(&mut self, id: &str, x: f64, y: f64) -> bool {
		let Some(i) = self.node_index(id) else {
			return false;
		};
		self.nodes[i].pin = Pin::PinnedAt { x, y };
		true
	}

	/// Hands node `id` back to the integrator.
	pub fn unpin(&mut self, id: &str) -> bool {
		let Some(i) = self.node_index(id) else {
			return false;
		};
		self.nodes[i].pin = Pin::Free;
		true
	}

	/// Advances one step. Returns `false` without doing anything when stopped.
	pub fn tick(&mut self) -> bool {
		if !self.ticking {
			return false;
		}
		self.step();
		if self.alpha < self.params.alpha_min {
			debug!("simulation settled");
			self.ticking = false;
		}
		true
	}

	/// One integration step regardless of the lifecycle state.
	pub fn step(&mut self) {
		self.alpha += (self.alpha_target() - self.alpha) * self.params.alpha_decay;
		let alpha = self.alpha;

		forces::apply_links(
			&mut self.nodes,
			&self.links,
			self.params.link_distance,
			alpha,
			&mut self.rng,
		);
		forces::apply_charge(
			&mut self.nodes,
			&mut self.scratch,
			ChargeParams {
				strength: self.params.charge_strength,
				theta_sq: self.params.theta * self.params.theta,
				distance_min_sq: self.params.distance_min * self.params.distance_min,
				alpha,
			},
			&mut self.rng,
		);
		forces::apply_center(&mut self.nodes, self.params.center, self.params.center_strength);

		let retain = 1.0 - self.params.velocity_decay;
		for node in &mut self.nodes {
			match node.pin {
				Pin::Free => {
					node.velocity = node.velocity * retain;
					node.position = node.position + node.velocity;
				}
				Pin::PinnedAt { x, y } => node.position = Point::new(x, y),
			}
		}
	}
}
