use super::Point;

const QUADTREE_LEAF_CAPACITY: usize = 8;
const QUADTREE_MAX_DEPTH: usize = 12;

#[derive(Clone, Copy, Debug)]
pub(super) struct QuadBounds {
	pub(super) center: Point,
	pub(super) half_extent: f64,
}

impl QuadBounds {
	fn from_points(points: &[Point]) -> Option<Self> {
		let mut min = Point::new(f64::INFINITY, f64::INFINITY);
		let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);

		for point in points {
			min.x = min.x.min(point.x);
			min.y = min.y.min(point.y);
			max.x = max.x.max(point.x);
			max.y = max.y.max(point.y);
		}

		if !min.x.is_finite() || !min.y.is_finite() || !max.x.is_finite() || !max.y.is_finite() {
			return None;
		}

		let center = Point::new((min.x + max.x) * 0.5, (min.y + max.y) * 0.5);
		let span = (max.x - min.x).max(max.y - min.y).max(1.0);

		Some(Self {
			center,
			half_extent: span * 0.5 + 1.0,
		})
	}

	pub(super) fn contains(self, point: Point) -> bool {
		(point.x - self.center.x).abs() <= self.half_extent
			&& (point.y - self.center.y).abs() <= self.half_extent
	}

	fn child(self, quadrant: usize) -> Self {
		let quarter = self.half_extent * 0.5;
		let (ox, oy) = match quadrant {
			0 => (-quarter, -quarter),
			1 => (quarter, -quarter),
			2 => (-quarter, quarter),
			_ => (quarter, quarter),
		};

		Self {
			center: Point::new(self.center.x + ox, self.center.y + oy),
			half_extent: quarter,
		}
	}

	fn quadrant_for(self, point: Point) -> usize {
		match (point.x >= self.center.x, point.y >= self.center.y) {
			(false, false) => 0,
			(true, false) => 1,
			(false, true) => 2,
			(true, true) => 3,
		}
	}

	pub(super) fn side_length(self) -> f64 {
		self.half_extent * 2.0
	}
}

/// Barnes-Hut cell. Mass is the number of bodies below it; every body carries
/// the same charge.
pub(super) struct QuadNode {
	pub(super) bounds: QuadBounds,
	pub(super) center_of_mass: Point,
	pub(super) mass: f64,
	pub(super) indices: Vec<usize>,
	pub(super) children: [Option<Box<QuadNode>>; 4],
}

impl QuadNode {
	pub(super) fn build(positions: &[Point]) -> Option<Self> {
		let bounds = QuadBounds::from_points(positions)?;
		let indices = (0..positions.len()).collect::<Vec<_>>();
		Some(Self::build_node(bounds, indices, positions, 0))
	}

	fn build_node(bounds: QuadBounds, indices: Vec<usize>, positions: &[Point], depth: usize) -> Self {
		let mut sum = Point::default();
		for &index in &indices {
			sum = sum + positions[index];
		}

		let mass = indices.len() as f64;
		let center_of_mass = if mass > 0.0 { sum * (1.0 / mass) } else { sum };

		let mut node = Self {
			bounds,
			center_of_mass,
			mass,
			indices,
			children: std::array::from_fn(|_| None),
		};

		if depth >= QUADTREE_MAX_DEPTH || node.indices.len() <= QUADTREE_LEAF_CAPACITY {
			return node;
		}

		let mut buckets = std::array::from_fn::<_, 4, _>(|_| Vec::new());
		for &index in &node.indices {
			buckets[bounds.quadrant_for(positions[index])].push(index);
		}

		// Coincident bodies never split apart, keep them in one leaf.
		if buckets.iter().filter(|bucket| !bucket.is_empty()).count() <= 1 {
			return node;
		}

		for (quadrant, bucket) in buckets.into_iter().enumerate() {
			if bucket.is_empty() {
				continue;
			}
			node.children[quadrant] = Some(Box::new(Self::build_node(
				bounds.child(quadrant),
				bucket,
				positions,
				depth + 1,
			)));
		}
		node.indices.clear();
		node
	}

	pub(super) fn is_leaf(&self) -> bool {
		self.children.iter().all(Option::is_none)
	}
}
