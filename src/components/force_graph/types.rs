use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Forward and backward link structure of a page neighborhood.
///
/// Every key is a normalized title (see [`to_title_lc`](super::to_title_lc)).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinkData {
	/// Forward links, in the order the page lists them.
	pub outgoing: BTreeMap<String, Vec<String>>,
	/// Backward links.
	pub incoming: BTreeMap<String, BTreeSet<String>>,
	/// Normalized title to display title.
	pub to_title: HashMap<String, String>,
}

impl LinkData {
	/// Number of forward links of `id`.
	pub fn out_degree(&self, id: &str) -> usize {
		self.outgoing.get(id).map_or(0, Vec::len)
	}

	/// Number of backlinks of `id`.
	pub fn in_degree(&self, id: &str) -> usize {
		self.incoming.get(id).map_or(0, BTreeSet::len)
	}

	/// Visual radius of a node glyph in layout units.
	pub fn node_radius(&self, id: &str) -> f64 {
		2.0 + ((self.out_degree(id) + self.in_degree(id)) as f64).sqrt()
	}

	/// A node with fewer than two backlinks and no forward links.
	pub fn is_empty_node(&self, id: &str) -> bool {
		self.in_degree(id) < 2 && self.out_degree(id) == 0
	}

	/// Display title of `id`, or `id` itself when unknown.
	pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
		self.to_title.get(id).map_or(id, String::as_str)
	}

	/// Forward links of `id` in page order.
	pub fn targets(&self, id: &str) -> &[String] {
		self.outgoing.get(id).map_or(&[], Vec::as_slice)
	}

	/// Pages linking to `id`.
	pub fn sources(&self, id: &str) -> impl Iterator<Item = &str> {
		self.incoming
			.get(id)
			.into_iter()
			.flat_map(|set| set.iter().map(String::as_str))
	}
}

/// Simulation input node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphNode {
	/// Normalized title.
	pub id: String,
}

/// Directed link between two node ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphLink {
	/// Linking page.
	pub source: String,
	/// Linked page.
	pub target: String,
}

/// Nodes and links handed to the simulation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GraphData {
	/// Unique nodes.
	pub nodes: Vec<GraphNode>,
	/// One entry per forward link, duplicates kept.
	pub links: Vec<GraphLink>,
}

impl GraphData {
	/// Nodes are the union of both link directions' keys; links flatten
	/// `outgoing`, keeping repeated and reciprocal pairs.
	pub fn from_link_data(data: &LinkData) -> Self {
		let ids: BTreeSet<&String> = data.outgoing.keys().chain(data.incoming.keys()).collect();
		let nodes = ids
			.into_iter()
			.map(|id| GraphNode { id: id.clone() })
			.collect();
		let links = data
			.outgoing
			.iter()
			.flat_map(|(source, targets)| {
				targets.iter().map(move |target| GraphLink {
					source: source.clone(),
					target: target.clone(),
				})
			})
			.collect();
		Self { nodes, links }
	}

	/// Whether there is nothing to draw.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn link_data(outgoing: &[(&str, &[&str])], incoming: &[(&str, &[&str])]) -> LinkData {
		LinkData {
			outgoing: outgoing
				.iter()
				.map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
				.collect(),
			incoming: incoming
				.iter()
				.map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
				.collect(),
			to_title: HashMap::new(),
		}
	}

	#[test]
	fn builds_single_link_scenario() {
		let data = link_data(&[("a", &["b"]), ("b", &[])], &[("b", &["a"])]);
		let graph = GraphData::from_link_data(&data);

		let ids: Vec<_> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
		assert_eq!(ids, ["a", "b"]);
		assert_eq!(
			graph.links,
			[GraphLink {
				source: "a".into(),
				target: "b".into()
			}]
		);
		assert_eq!(data.in_degree("b"), 1);
		assert_eq!(data.out_degree("b"), 0);
		assert!(data.is_empty_node("b"));
		assert!(!data.is_empty_node("a"));
	}

	#[test]
	fn node_set_is_union_of_keys_without_duplicates() {
		let data = link_data(
			&[("a", &["b", "c"]), ("b", &["a"])],
			&[("a", &["b"]), ("b", &["a"]), ("c", &["a"]), ("d", &["x"])],
		);
		let graph = GraphData::from_link_data(&data);

		let ids: Vec<_> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
		assert_eq!(ids, ["a", "b", "c", "d"]);
	}

	#[test]
	fn reciprocal_links_stay_separate() {
		let data = link_data(&[("a", &["b"]), ("b", &["a"])], &[("a", &["b"]), ("b", &["a"])]);
		let graph = GraphData::from_link_data(&data);
		assert_eq!(graph.links.len(), 2);
		assert_eq!(graph.links[1].source, "b");
		assert_eq!(graph.links[1].target, "a");
	}

	#[test]
	fn empty_index_builds_empty_graph() {
		let graph = GraphData::from_link_data(&LinkData::default());
		assert!(graph.is_empty());
		assert!(graph.links.is_empty());
	}

	#[test]
	fn radius_grows_with_degree() {
		let data = link_data(&[("a", &["b", "c", "d"])], &[("a", &["e"])]);
		assert_eq!(data.node_radius("a"), 4.0);
		assert_eq!(data.node_radius("missing"), 2.0);
	}

	#[test]
	fn display_name_falls_back_to_id() {
		let mut data = LinkData::default();
		data.to_title.insert("rust_lang".into(), "Rust Lang".into());
		assert_eq!(data.display_name("rust_lang"), "Rust Lang");
		assert_eq!(data.display_name("other"), "other");
	}
}
