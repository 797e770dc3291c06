//! Hover/selection tracking and geometric hit-testing.

use std::fmt;

use indexmap::IndexMap;

use super::model::{Graph, Point};

/// Something the pointer can hover or select.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Entity {
	/// A node id.
	Node(String),
	/// A link id.
	Link(String),
}

impl Entity {
	/// The wrapped id.
	pub fn id(&self) -> &str {
		match self {
			Entity::Node(id) | Entity::Link(id) => id,
		}
	}
}

/// World-space circle a renderer draws for a node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeGeometry {
	/// World position.
	pub center: Point,
	/// World radius.
	pub radius: f64,
}

type ClickHandler = Box<dyn FnMut(&Entity)>;

/// Hover and selection of one view, plus the click callback.
#[derive(Default)]
pub struct Interaction {
	hovered: Option<Entity>,
	selected: Option<Entity>,
	on_click: Option<ClickHandler>,
}

impl fmt::Debug for Interaction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Interaction")
			.field("hovered", &self.hovered)
			.field("selected", &self.selected)
			.field("on_click", &self.on_click.is_some())
			.finish()
	}
}

impl Interaction {
	/// Nothing hovered or selected.
	pub fn new() -> Self {
		Self::default()
	}

	/// The entity under the pointer.
	pub fn hovered(&self) -> Option<&Entity> {
		self.hovered.as_ref()
	}

	/// The last clicked entity.
	pub fn selected(&self) -> Option<&Entity> {
		self.selected.as_ref()
	}

	/// Registers the callback run once per click.
	pub fn set_click_handler(&mut self, handler: impl FnMut(&Entity) + 'static) {
		self.on_click = Some(Box::new(handler));
	}

	/// Returns `false` when `entity` was already hovered.
	pub fn enter(&mut self, entity: Entity) -> bool {
		if self.hovered.as_ref() == Some(&entity) {
			return false;
		}
		self.hovered = Some(entity);
		true
	}

	/// Clears the hover only if `entity` is the hovered one, so a late leave
	/// from an overlapping node cannot wipe a newer enter.
	pub fn leave(&mut self, entity: &Entity) -> bool {
		if self.hovered.as_ref() != Some(entity) {
			return false;
		}
		self.hovered = None;
		true
	}

	/// Selects `entity` regardless of hover and runs the click handler.
	pub fn click(&mut self, entity: Entity) {
		if let Some(handler) = self.on_click.as_mut() {
			handler(&entity);
		}
		self.selected = Some(entity);
	}

	/// [`enter`](Self::enter) for node `id`.
	pub fn on_node_enter(&mut self, id: &str) -> bool {
		self.enter(Entity::Node(id.to_owned()))
	}

	/// [`leave`](Self::leave) for node `id`.
	pub fn on_node_leave(&mut self, id: &str) -> bool {
		self.leave(&Entity::Node(id.to_owned()))
	}

	/// [`click`](Self::click) for node `id`.
	pub fn on_node_click(&mut self, id: &str) {
		self.click(Entity::Node(id.to_owned()));
	}

	/// [`enter`](Self::enter) for link `id`.
	pub fn on_link_enter(&mut self, id: &str) -> bool {
		self.enter(Entity::Link(id.to_owned()))
	}

	/// [`leave`](Self::leave) for link `id`.
	pub fn on_link_leave(&mut self, id: &str) -> bool {
		self.leave(&Entity::Link(id.to_owned()))
	}

	/// [`click`](Self::click) for link `id`.
	pub fn on_link_click(&mut self, id: &str) {
		self.click(Entity::Link(id.to_owned()));
	}

	/// Hover follows whatever the pointer is over now.
	pub fn hover(&mut self, entity: Option<Entity>) -> bool {
		match entity {
			Some(e) => self.enter(e),
			None => self.hovered.take().is_some(),
		}
	}

	/// Deselects without touching the hover.
	pub fn clear_selection(&mut self) {
		self.selected = None;
	}

	/// Clears hover and selection.
	pub fn clear(&mut self) {
		self.hovered = None;
		self.selected = None;
	}

	/// Drops hover/selection pointing at entities no longer in `graph`.
	pub fn retain_existing(&mut self, graph: &Graph) {
		let exists = |e: &Entity| match e {
			Entity::Node(id) => graph.node(id).is_some(),
			Entity::Link(id) => graph.link(id).is_some(),
		};
		if !self.hovered.as_ref().is_some_and(exists) {
			self.hovered = None;
		}
		if !self.selected.as_ref().is_some_and(exists) {
			self.selected = None;
		}
	}
}

/// Distance from `p` to the segment `a`–`b`.
pub fn point_segment_distance(p: Point, a: Point, b: Point) -> f64 {
	let ab = b - a;
	let len2 = ab.x * ab.x + ab.y * ab.y;
	if len2 == 0.0 {
		return p.distance(a);
	}
	let t = (((p.x - a.x) * ab.x + (p.y - a.y) * ab.y) / len2).clamp(0.0, 1.0);
	p.distance(a + ab * t)
}

/// Topmost node whose circle contains `world`. Later nodes draw on top.
pub fn hit_node<'g>(
	graph: &'g Graph,
	positions: &IndexMap<String, Point>,
	world: Point,
	default_size: f64,
) -> Option<&'g str> {
	graph.nodes.iter().rev().find_map(|node| {
		let center = positions.get(&node.id)?;
		(world.distance(*center) <= node.radius(default_size)).then_some(node.id.as_str())
	})
}

/// Topmost link passing within `tolerance` of `world`. Links with an
/// unpositioned endpoint are never hit.
pub fn hit_link<'g>(
	graph: &'g Graph,
	positions: &IndexMap<String, Point>,
	world: Point,
	tolerance: f64,
) -> Option<&'g str> {
	graph.links.iter().rev().find_map(|link| {
		let a = positions.get(&link.source)?;
		let b = positions.get(&link.target)?;
		(point_segment_distance(world, *a, *b) <= tolerance).then_some(link.id.as_str())
	})
}
