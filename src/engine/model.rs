//! Value types for the graph handed to the engine, plus orphan filtering.

use std::collections::{HashMap, HashSet};
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

use super::error::{EngineError, Result};

/// A 2D point or vector, used for both world and screen coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
	/// Horizontal coordinate, growing right.
	pub x: f64,
	/// Vertical coordinate, growing down.
	pub y: f64,
}

impl Point {
	/// The origin.
	pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

	/// A point at `(x, y)`.
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	/// Euclidean norm.
	pub fn length(self) -> f64 {
		(self.x * self.x + self.y * self.y).sqrt()
	}

	/// Euclidean distance to `other`.
	pub fn distance(self, other: Point) -> f64 {
		(self - other).length()
	}
}

impl Add for Point {
	type Output = Point;

	fn add(self, rhs: Point) -> Point {
		Point::new(self.x + rhs.x, self.y + rhs.y)
	}
}

impl Sub for Point {
	type Output = Point;

	fn sub(self, rhs: Point) -> Point {
		Point::new(self.x - rhs.x, self.y - rhs.y)
	}
}

impl Mul<f64> for Point {
	type Output = Point;

	fn mul(self, k: f64) -> Point {
		Point::new(self.x * k, self.y * k)
	}
}

/// What a node stands for in the knowledge base. Styling only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
	/// A whole note.
	#[default]
	Page,
	/// A block inside a page.
	Block,
	/// A tag shared by pages.
	Tag,
}

/// Relationship carried by a link. Styling only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
	/// A page referencing another.
	#[default]
	Reference,
	/// A page owning a block.
	Parent,
	/// A page carrying a tag.
	Tag,
}

/// Axes on which a pinned node is held in place.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinAxes {
	/// Horizontal only.
	X,
	/// Vertical only.
	Y,
	/// Both axes.
	Both,
}

impl PinAxes {
	/// Whether x is held.
	pub fn x(self) -> bool {
		matches!(self, PinAxes::X | PinAxes::Both)
	}

	/// Whether y is held.
	pub fn y(self) -> bool {
		matches!(self, PinAxes::Y | PinAxes::Both)
	}
}

/// Where a node sits before layout.
///
/// `Unplaced` nodes receive a seed position on the layout circle. A pinned
/// node keeps `at` on its pinned axes for the whole run; its other axis is
/// free and starts from `at`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum NodePosition {
	/// No position yet.
	#[default]
	Unplaced,
	/// Starts here and moves freely.
	Free(Point),
	/// Held at `at` on `axes`.
	Pinned {
		/// Held position.
		at: Point,
		/// Held axes.
		axes: PinAxes,
	},
}

impl NodePosition {
	/// The given position, if any.
	pub fn point(&self) -> Option<Point> {
		match *self {
			NodePosition::Unplaced => None,
			NodePosition::Free(p) | NodePosition::Pinned { at: p, .. } => Some(p),
		}
	}

	/// Pinned axes, if pinned.
	pub fn pin(&self) -> Option<PinAxes> {
		match *self {
			NodePosition::Pinned { axes, .. } => Some(axes),
			_ => None,
		}
	}
}

/// A vertex of the graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
	/// Unique within one graph.
	pub id: String,
	/// Text drawn under the node.
	pub label: String,
	/// Styling category.
	#[serde(default)]
	pub kind: NodeKind,
	/// Visual radius; falls back to the configured node size.
	#[serde(default)]
	pub size: Option<f64>,
	/// CSS color overriding the kind palette.
	#[serde(default)]
	pub color: Option<String>,
	/// Starting position and pins.
	#[serde(default)]
	pub position: NodePosition,
}

impl Node {
	/// An unplaced page node.
	pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			label: label.into(),
			kind: NodeKind::default(),
			size: None,
			color: None,
			position: NodePosition::Unplaced,
		}
	}

	/// Sets the kind.
	pub fn with_kind(mut self, kind: NodeKind) -> Self {
		self.kind = kind;
		self
	}

	/// Sets the radius.
	pub fn with_size(mut self, size: f64) -> Self {
		self.size = Some(size);
		self
	}

	/// Sets the color override.
	pub fn with_color(mut self, color: impl Into<String>) -> Self {
		self.color = Some(color.into());
		self
	}

	/// Starts the node at `(x, y)`.
	pub fn at(mut self, x: f64, y: f64) -> Self {
		self.position = NodePosition::Free(Point::new(x, y));
		self
	}

	/// Holds the node at `(x, y)` on `axes`.
	pub fn pinned(mut self, x: f64, y: f64, axes: PinAxes) -> Self {
		self.position = NodePosition::Pinned {
			at: Point::new(x, y),
			axes,
		};
		self
	}

	/// Radius used for drawing and hit-testing.
	pub fn radius(&self, default_size: f64) -> f64 {
		self.size.unwrap_or(default_size)
	}
}

/// An edge between two node ids.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
	/// Unique within one graph.
	pub id: String,
	/// Id of the source node.
	pub source: String,
	/// Id of the target node.
	pub target: String,
	/// Styling category.
	#[serde(default)]
	pub kind: LinkKind,
	/// Reserved for weighted attraction; the solver ignores it.
	#[serde(default)]
	pub strength: Option<f64>,
}

impl Link {
	/// A reference link from `source` to `target`.
	pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			source: source.into(),
			target: target.into(),
			kind: LinkKind::default(),
			strength: None,
		}
	}

	/// Sets the kind.
	pub fn with_kind(mut self, kind: LinkKind) -> Self {
		self.kind = kind;
		self
	}
}

/// Nodes and links as supplied by the host.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
	/// Nodes in layout order.
	pub nodes: Vec<Node>,
	/// Links; endpoints may be missing.
	pub links: Vec<Link>,
}

impl Graph {
	/// A graph over `nodes` and `links`. Not validated.
	pub fn new(nodes: Vec<Node>, links: Vec<Link>) -> Self {
		Self { nodes, links }
	}

	/// Checks that node ids are unique.
	pub fn validate(&self) -> Result<()> {
		let mut seen = HashSet::with_capacity(self.nodes.len());
		for node in &self.nodes {
			if !seen.insert(node.id.as_str()) {
				return Err(EngineError::DuplicateNodeId {
					id: node.id.clone(),
				});
			}
		}
		Ok(())
	}

	/// Node `id`.
	pub fn node(&self, id: &str) -> Option<&Node> {
		self.nodes.iter().find(|n| n.id == id)
	}

	/// Mutable node `id`.
	pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
		self.nodes.iter_mut().find(|n| n.id == id)
	}

	/// Link `id`.
	pub fn link(&self, id: &str) -> Option<&Link> {
		self.links.iter().find(|l| l.id == id)
	}

	/// Node id → position in `nodes`.
	pub fn index(&self) -> HashMap<&str, usize> {
		self.nodes
			.iter()
			.enumerate()
			.map(|(i, n)| (n.id.as_str(), i))
			.collect()
	}

	/// Links whose endpoints both exist, as `(link, source index, target index)`.
	pub fn resolved_links(&self) -> Vec<(&Link, usize, usize)> {
		let index = self.index();
		self.links
			.iter()
			.filter_map(|link| {
				match (
					index.get(link.source.as_str()),
					index.get(link.target.as_str()),
				) {
					(Some(&s), Some(&t)) => Some((link, s, t)),
					_ => None,
				}
			})
			.collect()
	}

	/// Ids of the nodes sharing a link with `id`.
	pub fn neighbors(&self, id: &str) -> HashSet<&str> {
		let mut out = HashSet::new();
		for link in &self.links {
			if link.source == id {
				out.insert(link.target.as_str());
			} else if link.target == id {
				out.insert(link.source.as_str());
			}
		}
		out
	}
}

/// Options for [`filter_graph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilterOptions {
	/// Keep nodes with no incident link.
	pub show_orphans: bool,
}

impl Default for FilterOptions {
	fn default() -> Self {
		Self { show_orphans: true }
	}
}

/// Returns the view of `graph` that layout and rendering work on.
///
/// With `show_orphans` off, only nodes named as a source or target of some
/// link are kept. Links are always returned as-is; a link left with a missing
/// endpoint is skipped later by layout and rendering.
pub fn filter_graph(graph: &Graph, options: FilterOptions) -> Graph {
	if options.show_orphans {
		return graph.clone();
	}
	let linked: HashSet<&str> = graph
		.links
		.iter()
		.flat_map(|l| [l.source.as_str(), l.target.as_str()])
		.collect();
	Graph {
		nodes: graph
			.nodes
			.iter()
			.filter(|n| linked.contains(n.id.as_str()))
			.cloned()
			.collect(),
		links: graph.links.clone(),
	}
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;

	use super::*;

	fn abc() -> Graph {
		Graph::new(
			vec![Node::new("A", "A"), Node::new("B", "B"), Node::new("C", "C")],
			vec![Link::new("ab", "A", "B")],
		)
	}

	fn ids(graph: &Graph) -> Vec<&str> {
		graph.nodes.iter().map(|n| n.id.as_str()).collect()
	}

	#[test]
	fn hides_orphans_and_keeps_links() {
		let g = abc();
		let filtered = filter_graph(&g, FilterOptions { show_orphans: false });
		assert_eq!(ids(&filtered), ["A", "B"]);
		assert_eq!(filtered.links, g.links);
	}

	#[test]
	fn showing_orphans_returns_everything() {
		let g = abc();
		assert_eq!(filter_graph(&g, FilterOptions::default()), g);
	}

	#[test]
	fn dangling_endpoint_still_counts_as_linked() {
		let g = Graph::new(
			vec![Node::new("A", "A"), Node::new("B", "B")],
			vec![Link::new("l", "A", "missing")],
		);
		let filtered = filter_graph(&g, FilterOptions { show_orphans: false });
		assert_eq!(ids(&filtered), ["A"]);
		assert!(filtered.resolved_links().is_empty());
	}

	#[test]
	fn duplicate_ids_fail_validation() {
		let g = Graph::new(vec![Node::new("A", "x"), Node::new("A", "y")], vec![]);
		assert_eq!(
			g.validate(),
			Err(EngineError::DuplicateNodeId { id: "A".into() })
		);
		assert!(abc().validate().is_ok());
	}

	#[test]
	fn neighbors_cover_both_directions() {
		let g = Graph::new(
			vec![Node::new("A", "A"), Node::new("B", "B"), Node::new("C", "C")],
			vec![Link::new("ab", "A", "B"), Link::new("ca", "C", "A")],
		);
		let n = g.neighbors("A");
		assert!(n.contains("B") && n.contains("C"));
		assert_eq!(g.neighbors("B").len(), 1);
	}

	#[test]
	fn pin_axes_report_their_axes() {
		assert!(PinAxes::Both.x() && PinAxes::Both.y());
		assert!(PinAxes::X.x() && !PinAxes::X.y());
		assert!(!PinAxes::Y.x() && PinAxes::Y.y());
	}

	fn arb_graph() -> impl Strategy<Value = Graph> {
		(1usize..12).prop_flat_map(|n| {
			proptest::collection::vec((0..n + 2, 0..n + 2), 0..16).prop_map(move |pairs| {
				let nodes = (0..n).map(|i| Node::new(i.to_string(), "")).collect();
				let links = pairs
					.into_iter()
					.enumerate()
					.map(|(i, (s, t))| Link::new(format!("l{i}"), s.to_string(), t.to_string()))
					.collect();
				Graph::new(nodes, links)
			})
		})
	}

	proptest! {
		#[test]
		fn orphan_filter_is_idempotent(g in arb_graph()) {
			let hide = FilterOptions { show_orphans: false };
			let once = filter_graph(&g, hide);
			let twice = filter_graph(&once, hide);
			prop_assert_eq!(&once, &twice);
			prop_assert_eq!(filter_graph(&g, FilterOptions::default()).nodes.len(), g.nodes.len());
			prop_assert_eq!(once.links.len(), g.links.len());
		}
	}
}
