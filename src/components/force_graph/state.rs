use crate::engine::{Entity, Graph, GraphEngine, Point, Result, SettingsPatch};

/// Pointer travel, in screen pixels, after which a press is a drag, not a click.
pub const CLICK_SLOP: f64 = 3.0;

#[derive(Clone, Debug, Default)]
pub struct PressState {
	pub origin: Option<Point>,
	pub node: Option<String>,
	pub moved: bool,
}

/// Canvas-side state around one [`GraphEngine`]: node dragging, click
/// detection and the hover highlight fade.
#[derive(Debug)]
pub struct ForceGraphState {
	pub engine: GraphEngine,
	pub press: PressState,
	pub highlight_t: f64,
	pub flow_time: f64,
}

impl ForceGraphState {
	pub fn new(graph: Graph, settings: &SettingsPatch, width: f64, height: f64) -> Result<Self> {
		let mut engine = GraphEngine::new(width, height)?;
		engine.set_settings(settings);
		engine.set_graph(graph.nodes, graph.links)?;
		engine.fit_to_content();
		Ok(Self {
			engine,
			press: PressState::default(),
			highlight_t: 0.0,
			flow_time: 0.0,
		})
	}

	pub fn set_graph(&mut self, graph: Graph) -> Result<()> {
		self.press = PressState::default();
		self.engine.set_graph(graph.nodes, graph.links)
	}

	pub fn pointer_down(&mut self, p: Point) {
		let node = match self.engine.hit_test_point(p.x, p.y) {
			Some(Entity::Node(id)) => Some(id),
			_ => None,
		};
		if node.is_none() {
			self.engine.pointer_down(p);
		}
		self.press = PressState {
			origin: Some(p),
			node,
			moved: false,
		};
	}

	pub fn pointer_move(&mut self, p: Point) {
		if let Some(origin) = self.press.origin {
			self.press.moved |= origin.distance(p) > CLICK_SLOP;
		}
		if let (Some(id), true) = (self.press.node.as_deref(), self.press.moved) {
			let world = self.engine.viewport().screen_to_world(p);
			self.engine.pin_node(id, world);
			return;
		}
		if !self.engine.pointer_move(p) {
			let hit = self.engine.hit_test_point(p.x, p.y);
			self.engine.interaction_mut().hover(hit);
		}
	}

	/// Ends a press; a press that never moved clicks what is under it.
	pub fn pointer_up(&mut self, p: Point) {
		let press = std::mem::take(&mut self.press);
		self.engine.pointer_up();
		if press.moved || press.origin.is_none() {
			return;
		}
		match self.engine.hit_test_point(p.x, p.y) {
			Some(entity) => self.engine.interaction_mut().click(entity),
			None => self.engine.interaction_mut().clear_selection(),
		}
	}

	pub fn pointer_leave(&mut self) {
		self.press = PressState::default();
		self.engine.pointer_leave();
	}

	pub fn wheel(&mut self, delta_y: f64, p: Point) {
		self.engine.wheel(delta_y, p);
	}

	/// Advances the hover fade and link flow by `dt` seconds.
	pub fn tick(&mut self, dt: f64) {
		self.flow_time += dt;
		let (target, speed) = if self.engine.interaction().hovered().is_some() {
			(1.0, 6.0)
		} else {
			(0.0, 4.0)
		};
		self.highlight_t += (target - self.highlight_t) * (speed * dt).min(1.0);
		if target == 0.0 && self.highlight_t < 0.01 {
			self.highlight_t = 0.0;
		}
	}

	pub fn resize(&mut self, width: f64, height: f64) -> Result<()> {
		self.engine.resize(width, height)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::engine::{Link, Node, NodePosition};

	fn state() -> ForceGraphState {
		let graph = Graph::new(
			vec![Node::new("a", "A"), Node::new("b", "B")],
			vec![Link::new("ab", "a", "b")],
		);
		ForceGraphState::new(graph, &SettingsPatch::default(), 800.0, 600.0).unwrap()
	}

	fn screen_of(s: &mut ForceGraphState, id: &str) -> Point {
		let center = s.engine.node_geometry(id).unwrap().center;
		s.engine.viewport().world_to_screen(center)
	}

	#[test]
	fn press_without_motion_selects_the_node() {
		let mut s = state();
		let p = screen_of(&mut s, "b");
		s.pointer_down(p);
		s.pointer_up(p);
		assert_eq!(
			s.engine.interaction().selected(),
			Some(&Entity::Node("b".into()))
		);
	}

	#[test]
	fn dragging_a_node_pins_it() {
		let mut s = state();
		let p = screen_of(&mut s, "a");
		s.pointer_down(p);
		let to = p + Point::new(40.0, 0.0);
		s.pointer_move(to);
		s.pointer_up(to);
		let node = s.engine.graph().node("a").unwrap();
		assert!(matches!(node.position, NodePosition::Pinned { .. }));
		assert!(s.engine.interaction().selected().is_none());
	}

	#[test]
	fn dragging_the_background_pans() {
		let mut s = state();
		let before = s.engine.viewport_state().pan;
		s.pointer_down(Point::new(2.0, 2.0));
		s.pointer_move(Point::new(32.0, 12.0));
		s.pointer_up(Point::new(32.0, 12.0));
		let moved = s.engine.viewport_state().pan - before;
		assert!((moved.x - 30.0).abs() < 1e-9 && (moved.y - 10.0).abs() < 1e-9);
	}

	#[test]
	fn highlight_fades_in_and_out() {
		let mut s = state();
		s.engine.on_node_enter("a");
		for _ in 0..60 {
			s.tick(0.016);
		}
		assert!(s.highlight_t > 0.9);
		s.engine.on_node_leave("a");
		for _ in 0..120 {
			s.tick(0.016);
		}
		assert_eq!(s.highlight_t, 0.0);
	}
}
