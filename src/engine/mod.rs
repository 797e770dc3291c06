//! Headless graph visualization engine: orphan filtering, force layout,
//! pan/zoom viewport and pointer interaction.
//!
//! A [`GraphEngine`] owns one view's state. Hosts feed it a graph and
//! settings, read back node positions and the viewport transform, and
//! forward pointer events in screen space (origin top-left, +y down).

pub mod error;
pub mod interaction;
pub mod layout;
pub mod model;
pub mod settings;
pub mod viewport;

use std::collections::HashSet;

use log::{debug, info};

pub use error::{EngineError, Result};
pub use interaction::{Entity, Interaction, NodeGeometry};
pub use layout::{CancelToken, ForceSimulation, LayoutParams, LayoutResult};
pub use model::{
	FilterOptions, Graph, Link, LinkKind, Node, NodeKind, NodePosition, PinAxes, Point,
	filter_graph,
};
pub use settings::{LayoutMode, Settings, SettingsChange, SettingsPatch};
pub use viewport::{FIT_PADDING, Viewport, ViewportState, ZoomBounds};

/// State of one graph view: data, settings, layout cache, viewport and interaction.
#[derive(Debug)]
pub struct GraphEngine {
	graph: Graph,
	/// `graph` after orphan filtering; what layout and hit-testing see.
	view: Graph,
	settings: Settings,
	viewport: Viewport,
	interaction: Interaction,
	layout: Option<LayoutResult>,
	layout_revision: u64,
}

impl GraphEngine {
	/// An engine with default settings over a `width`×`height` canvas.
	pub fn new(width: f64, height: f64) -> Result<Self> {
		Self::with_settings(width, height, Settings::default())
	}

	/// An engine with `settings`, clamped the same way patches are.
	pub fn with_settings(width: f64, height: f64, settings: Settings) -> Result<Self> {
		let viewport = Viewport::new(width, height)?;
		let (settings, change) = settings.clamped();
		if !change.clamped.is_empty() {
			debug!("{} initial setting(s) clamped", change.clamped.len());
		}
		info!("graph engine initialized at {width}x{height}");
		Ok(Self {
			graph: Graph::default(),
			view: Graph::default(),
			settings,
			viewport,
			interaction: Interaction::new(),
			layout: None,
			layout_revision: 0,
		})
	}

	/// Replaces the graph. On error the previous graph stays in place.
	pub fn set_graph(&mut self, nodes: Vec<Node>, links: Vec<Link>) -> Result<()> {
		let graph = Graph::new(nodes, links);
		graph.validate()?;
		self.graph = graph;
		self.refilter();
		Ok(())
	}

	/// The graph as given, before filtering.
	pub fn graph(&self) -> &Graph {
		&self.graph
	}

	/// The filtered graph that is laid out and drawn.
	pub fn visible_graph(&self) -> &Graph {
		&self.view
	}

	/// Current settings.
	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	/// Applies `patch` and drops the cached layout if it no longer holds.
	pub fn set_settings(&mut self, patch: &SettingsPatch) -> SettingsChange {
		let show_orphans = self.settings.show_orphans;
		let change = self.settings.apply(patch);
		if self.settings.show_orphans != show_orphans {
			self.refilter();
		} else if change.layout_affecting {
			self.layout = None;
		}
		change
	}

	fn refilter(&mut self) {
		self.view = filter_graph(
			&self.graph,
			FilterOptions {
				show_orphans: self.settings.show_orphans,
			},
		);
		self.interaction.retain_existing(&self.view);
		self.layout = None;
	}

	/// Solver inputs for the current settings and canvas.
	pub fn layout_params(&self) -> LayoutParams {
		LayoutParams::from_settings(&self.settings, self.viewport.width(), self.viewport.height())
	}

	/// Positions for the current graph and settings, recomputed only when
	/// either changed since the last call.
	pub fn compute_layout(&mut self) -> &LayoutResult {
		let params = self.layout_params();
		let (view, revision) = (&self.view, &mut self.layout_revision);
		self.layout.get_or_insert_with(|| {
			*revision += 1;
			debug!(
				"layout #{revision}: {} node(s), {} link(s), mode {}, {} iteration(s)",
				view.nodes.len(),
				view.links.len(),
				params.mode,
				params.iterations
			);
			layout::compute_layout(view, params)
		})
	}

	/// [`compute_layout`](Self::compute_layout) that stops when `cancel`
	/// fires, leaving the cache empty.
	pub fn compute_layout_with(&mut self, cancel: &CancelToken) -> Result<&LayoutResult> {
		let result = match self.layout.take() {
			Some(cached) => cached,
			None => {
				let result = layout::compute_layout_with(&self.view, self.layout_params(), cancel)?;
				self.layout_revision += 1;
				result
			}
		};
		let cached: &LayoutResult = self.layout.insert(result);
		Ok(cached)
	}

	/// The last computed layout, if it is still current.
	pub fn cached_layout(&self) -> Option<&LayoutResult> {
		self.layout.as_ref()
	}

	/// A fresh simulation over the visible graph, for hosts that animate.
	pub fn simulation(&self) -> ForceSimulation {
		ForceSimulation::new(&self.view, self.layout_params())
	}

	/// Number of layouts actually computed so far.
	pub fn layout_revision(&self) -> u64 {
		self.layout_revision
	}

	/// New canvas size; the next layout is recomputed for it.
	pub fn resize(&mut self, width: f64, height: f64) -> Result<()> {
		self.viewport.resize(width, height)?;
		self.layout = None;
		Ok(())
	}

	/// The viewport, for coordinate conversion.
	pub fn viewport(&self) -> &Viewport {
		&self.viewport
	}

	/// Current zoom and pan.
	pub fn viewport_state(&self) -> ViewportState {
		self.viewport.state()
	}

	/// Shifts the view by a screen-space offset.
	pub fn pan(&mut self, dx: f64, dy: f64) {
		self.viewport.pan(dx, dy);
	}

	/// Multiplies the zoom, keeping it inside its bounds.
	pub fn zoom_by(&mut self, factor: f64) {
		self.viewport.zoom_by(factor);
	}

	/// Wheel zoom anchored at `anchor`.
	pub fn wheel(&mut self, delta_y: f64, anchor: Point) {
		self.viewport.wheel(delta_y, anchor);
	}

	/// Back to zoom 1, no pan, nothing hovered or selected.
	pub fn reset_view(&mut self) {
		self.viewport.reset();
		self.interaction.clear();
	}

	/// Frames the laid-out nodes. Returns `false` when there is nothing to frame.
	pub fn fit_to_content(&mut self) -> bool {
		let points: Vec<Point> = self.compute_layout().positions.values().copied().collect();
		self.viewport.fit_to_content(points, FIT_PADDING)
	}

	/// Starts a background drag.
	pub fn pointer_down(&mut self, screen: Point) {
		self.viewport.pointer_down(screen);
	}

	/// Pans while dragging. Returns whether the view moved.
	pub fn pointer_move(&mut self, screen: Point) -> bool {
		self.viewport.pointer_move(screen)
	}

	/// Ends a drag.
	pub fn pointer_up(&mut self) {
		self.viewport.pointer_up();
	}

	/// Ends a drag and clears the hover.
	pub fn pointer_leave(&mut self) {
		self.viewport.pointer_leave();
		self.interaction.hover(None);
	}

	/// The node under a screen point, else the link within the hit width.
	pub fn hit_test_point(&mut self, screen_x: f64, screen_y: f64) -> Option<Entity> {
		let world = self.viewport.screen_to_world(Point::new(screen_x, screen_y));
		let tolerance = self.settings.link_hit_width / self.viewport.zoom();
		let default_size = self.settings.node_size;
		self.compute_layout();
		let positions = &self.layout.as_ref()?.positions;
		if let Some(id) = interaction::hit_node(&self.view, positions, world, default_size) {
			return Some(Entity::Node(id.to_owned()));
		}
		interaction::hit_link(&self.view, positions, world, tolerance)
			.map(|id| Entity::Link(id.to_owned()))
	}

	/// World position and radius of a visible node.
	pub fn node_geometry(&mut self, id: &str) -> Option<NodeGeometry> {
		let center = self.compute_layout().get(id)?;
		let radius = self.view.node(id)?.radius(self.settings.node_size);
		Some(NodeGeometry { center, radius })
	}

	/// Hover and selection state.
	pub fn interaction(&self) -> &Interaction {
		&self.interaction
	}

	/// Mutable hover and selection state.
	pub fn interaction_mut(&mut self) -> &mut Interaction {
		&mut self.interaction
	}

	/// Called once per click on a node or link.
	pub fn set_click_handler(&mut self, handler: impl FnMut(&Entity) + 'static) {
		self.interaction.set_click_handler(handler);
	}

	/// Pointer entered node `id`.
	pub fn on_node_enter(&mut self, id: &str) -> bool {
		self.interaction.on_node_enter(id)
	}

	/// Pointer left node `id`.
	pub fn on_node_leave(&mut self, id: &str) -> bool {
		self.interaction.on_node_leave(id)
	}

	/// Selects node `id`.
	pub fn on_node_click(&mut self, id: &str) {
		self.interaction.on_node_click(id);
	}

	/// Selects link `id`.
	pub fn on_link_click(&mut self, id: &str) {
		self.interaction.on_link_click(id);
	}

	/// The hovered node and its neighbors, or both ends of a hovered link.
	pub fn highlighted(&self) -> HashSet<&str> {
		match self.interaction.hovered() {
			Some(Entity::Node(id)) => {
				let mut set = self.view.neighbors(id);
				if let Some(node) = self.view.node(id) {
					set.insert(node.id.as_str());
				}
				set
			}
			Some(Entity::Link(id)) => self
				.view
				.link(id)
				.map(|l| HashSet::from([l.source.as_str(), l.target.as_str()]))
				.unwrap_or_default(),
			None => HashSet::new(),
		}
	}

	/// Holds a node at `world` on both axes. Returns `false` for unknown ids.
	pub fn pin_node(&mut self, id: &str, world: Point) -> bool {
		self.set_position(
			id,
			NodePosition::Pinned {
				at: world,
				axes: PinAxes::Both,
			},
		)
	}

	/// Frees a pinned node, starting it from where it was held.
	pub fn release_node(&mut self, id: &str) -> bool {
		let Some(at) = self.graph.node(id).and_then(|n| n.position.point()) else {
			return false;
		};
		self.set_position(id, NodePosition::Free(at))
	}

	fn set_position(&mut self, id: &str, position: NodePosition) -> bool {
		let Some(node) = self.graph.node_mut(id) else {
			return false;
		};
		node.position = position;
		if let Some(visible) = self.view.node_mut(id) {
			visible.position = position;
			self.layout = None;
		}
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn engine() -> GraphEngine {
		let mut e = GraphEngine::new(800.0, 600.0).unwrap();
		e.set_graph(
			vec![Node::new("a", "A"), Node::new("b", "B"), Node::new("c", "C")],
			vec![Link::new("ab", "a", "b")],
		)
		.unwrap();
		e
	}

	#[test]
	fn initial_settings_are_clamped() {
		let settings = Settings {
			node_size: 500.0,
			repulsion: 1e9,
			..Settings::default()
		};
		let mut e = GraphEngine::with_settings(800.0, 600.0, settings).unwrap();
		assert_eq!(e.settings().node_size, 20.0);
		assert_eq!(e.settings().repulsion, 200.0);
		e.set_graph(
			vec![Node::new("a", ""), Node::new("b", ""), Node::new("c", "")],
			vec![],
		)
		.unwrap();
		let layout = e.compute_layout();
		let a = layout.get("a").unwrap();
		assert!(a.distance(layout.get("b").unwrap()) > 1.0);
		assert!(a.distance(layout.get("c").unwrap()) > 1.0);
	}

	#[test]
	fn layout_is_cached_until_inputs_change() {
		let mut e = engine();
		e.compute_layout();
		e.compute_layout();
		assert_eq!(e.layout_revision(), 1);

		e.set_settings(&SettingsPatch {
			show_labels: Some(false),
			..Default::default()
		});
		e.compute_layout();
		assert_eq!(e.layout_revision(), 1);

		e.set_settings(&SettingsPatch {
			link_distance: Some(80.0),
			..Default::default()
		});
		e.compute_layout();
		assert_eq!(e.layout_revision(), 2);

		e.resize(1024.0, 768.0).unwrap();
		e.compute_layout();
		assert_eq!(e.layout_revision(), 3);
	}

	#[test]
	fn hiding_orphans_shrinks_the_layout() {
		let mut e = engine();
		assert_eq!(e.compute_layout().len(), 3);
		e.set_settings(&SettingsPatch {
			show_orphans: Some(false),
			..Default::default()
		});
		assert_eq!(e.compute_layout().len(), 2);
		assert_eq!(e.graph().nodes.len(), 3);
		e.set_settings(&SettingsPatch {
			show_orphans: Some(true),
			..Default::default()
		});
		assert_eq!(e.compute_layout().len(), 3);
	}

	#[test]
	fn rejected_graph_keeps_previous_one() {
		let mut e = engine();
		let err = e
			.set_graph(vec![Node::new("x", ""), Node::new("x", "")], vec![])
			.unwrap_err();
		assert_eq!(err, EngineError::DuplicateNodeId { id: "x".into() });
		assert_eq!(e.graph().nodes.len(), 3);
	}

	#[test]
	fn hit_test_finds_nodes_through_the_transform() {
		let mut e = engine();
		e.pan(100.0, 50.0);
		e.zoom_by(2.0);
		let geometry = e.node_geometry("c").unwrap();
		let screen = e.viewport().world_to_screen(geometry.center);
		assert_eq!(
			e.hit_test_point(screen.x, screen.y),
			Some(Entity::Node("c".into()))
		);
		assert_eq!(e.hit_test_point(-5000.0, -5000.0), None);
	}

	#[test]
	fn reset_view_clears_interaction() {
		let mut e = engine();
		e.on_node_enter("a");
		e.on_node_click("b");
		e.zoom_by(2.0);
		e.reset_view();
		assert_eq!(e.viewport_state(), ViewportState::default());
		assert!(e.interaction().hovered().is_none());
		assert!(e.interaction().selected().is_none());
	}

	#[test]
	fn highlight_covers_hovered_node_and_neighbors() {
		let mut e = engine();
		e.on_node_enter("a");
		assert_eq!(e.highlighted(), HashSet::from(["a", "b"]));
		e.interaction_mut().on_link_enter("ab");
		assert_eq!(e.highlighted(), HashSet::from(["a", "b"]));
		e.interaction_mut().on_link_leave("ab");
		assert!(e.highlighted().is_empty());
	}

	#[test]
	fn pinned_node_holds_and_release_frees_it() {
		let mut e = engine();
		assert!(e.pin_node("a", Point::new(123.0, 321.0)));
		assert_eq!(e.compute_layout().get("a"), Some(Point::new(123.0, 321.0)));
		assert!(e.release_node("a"));
		assert_eq!(
			e.graph().node("a").unwrap().position,
			NodePosition::Free(Point::new(123.0, 321.0))
		);
		assert!(!e.pin_node("nope", Point::ZERO));
	}

	#[test]
	fn cancelled_layout_leaves_cache_empty() {
		let mut e = engine();
		let cancel = CancelToken::new();
		cancel.cancel();
		assert!(e.compute_layout_with(&cancel).is_err());
		assert_eq!(e.layout_revision(), 0);
		let fresh = CancelToken::new();
		assert_eq!(e.compute_layout_with(&fresh).unwrap().len(), 3);
	}
}
