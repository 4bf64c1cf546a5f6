use super::quadtree::QuadNode;
use super::{Lcg, Pin, Point, SimLink, SimNode};

fn jiggle(rng: &mut Lcg) -> f64 {
	(rng.next_f64() - 0.5) * 1e-6
}

/// Spring along every link toward `distance`, applied to velocities.
pub(super) fn apply_links(
	nodes: &mut [SimNode],
	links: &[SimLink],
	distance: f64,
	alpha: f64,
	rng: &mut Lcg,
) {
	for link in links {
		let (source, target) = (&nodes[link.source], &nodes[link.target]);
		let mut x = target.position.x + target.velocity.x - source.position.x - source.velocity.x;
		let mut y = target.position.y + target.velocity.y - source.position.y - source.velocity.y;
		if x == 0.0 {
			x = jiggle(rng);
		}
		if y == 0.0 {
			y = jiggle(rng);
		}

		let length = (x * x + y * y).sqrt();
		let scale = (length - distance) / length * alpha * link.strength;
		let delta = Point::new(x * scale, y * scale);

		let target = &mut nodes[link.target];
		if target.pin == Pin::Free {
			target.velocity = target.velocity - delta * link.bias;
		}
		let source = &mut nodes[link.source];
		if source.pin == Pin::Free {
			source.velocity = source.velocity + delta * (1.0 - link.bias);
		}
	}
}

#[derive(Clone, Copy)]
pub(super) struct ChargeParams {
	pub(super) strength: f64,
	pub(super) theta_sq: f64,
	pub(super) distance_min_sq: f64,
	pub(super) alpha: f64,
}

/// Many-body repulsion using a Barnes-Hut tree over current positions.
pub(super) fn apply_charge(
	nodes: &mut [SimNode],
	positions: &mut Vec<Point>,
	params: ChargeParams,
	rng: &mut Lcg,
) {
	positions.clear();
	positions.extend(nodes.iter().map(|node| node.position));
	let Some(tree) = QuadNode::build(positions) else {
		return;
	};

	for (index, node) in nodes.iter_mut().enumerate() {
		if node.pin != Pin::Free {
			continue;
		}
		let mut force = Point::default();
		accumulate_charge(&tree, index, positions, params, rng, &mut force);
		node.velocity = node.velocity + force;
	}
}

fn softened(distance_sq: f64, distance_min_sq: f64) -> f64 {
	if distance_sq < distance_min_sq {
		(distance_min_sq * distance_sq).sqrt()
	} else {
		distance_sq
	}
}

fn accumulate_charge(
	cell: &QuadNode,
	index: usize,
	positions: &[Point],
	params: ChargeParams,
	rng: &mut Lcg,
	force: &mut Point,
) {
	if cell.mass <= 0.0 {
		return;
	}
	let point = positions[index];

	if cell.is_leaf() {
		for &other in &cell.indices {
			if other == index {
				continue;
			}
			let mut delta = positions[other] - point;
			if delta.x == 0.0 {
				delta.x = jiggle(rng);
			}
			if delta.y == 0.0 {
				delta.y = jiggle(rng);
			}
			let distance_sq = softened(delta.length_sq(), params.distance_min_sq);
			*force = *force + delta * (params.strength * params.alpha / distance_sq);
		}
		return;
	}

	let delta = cell.center_of_mass - point;
	let distance_sq = delta.length_sq();
	let width = cell.bounds.side_length();
	if !cell.bounds.contains(point) && width * width / params.theta_sq < distance_sq {
		let distance_sq = softened(distance_sq, params.distance_min_sq);
		*force = *force + delta * (params.strength * cell.mass * params.alpha / distance_sq);
		return;
	}

	for child in cell.children.iter().flatten() {
		accumulate_charge(child, index, positions, params, rng, force);
	}
}

/// Translates free nodes so the barycenter of all nodes sits on `center`.
pub(super) fn apply_center(nodes: &mut [SimNode], center: Point, strength: f64) {
	if nodes.is_empty() {
		return;
	}
	let mut sum = Point::default();
	for node in nodes.iter() {
		sum = sum + node.position;
	}
	let shift = (sum * (1.0 / nodes.len() as f64) - center) * strength;
	for node in nodes.iter_mut().filter(|node| node.pin == Pin::Free) {
		node.position = node.position - shift;
	}
}
