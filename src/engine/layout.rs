//! Force-directed placement.
//!
//! Every node pair repels with `repulsion / d²`, every resolved link acts as a
//! spring toward `link_distance`, and free axes are clamped inside the canvas
//! after each step. A step reads all positions before committing any
//! displacement, so the result does not depend on node visiting order.
//!
//! Repulsion is all-pairs, O(n²) per step.

use std::f64::consts::PI;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use indexmap::IndexMap;
use log::{debug, warn};

use super::error::{EngineError, Result};
use super::model::{Graph, PinAxes, Point};
use super::settings::{LayoutMode, Settings};

/// Lower bound on node separation inside force terms.
pub const MIN_DISTANCE: f64 = 1.0;

/// Numeric inputs of one layout run.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutParams {
	/// Canvas width in world units.
	pub width: f64,
	/// Canvas height in world units.
	pub height: f64,
	/// Node radius, also the margin kept from the canvas edges.
	pub node_size: f64,
	/// Rest length of link springs.
	pub link_distance: f64,
	/// Pairwise repulsion coefficient.
	pub repulsion: f64,
	/// Link spring coefficient.
	pub attraction: f64,
	/// Force steps to run; ignored by circular placement.
	pub iterations: usize,
	/// Requested mode, before fallback.
	pub mode: LayoutMode,
}

impl LayoutParams {
	/// Takes the layout-affecting fields of `settings`.
	pub fn from_settings(settings: &Settings, width: f64, height: f64) -> Self {
		Self {
			width,
			height,
			node_size: settings.node_size,
			link_distance: settings.link_distance,
			repulsion: settings.repulsion,
			attraction: settings.attraction,
			iterations: settings.iterations,
			mode: settings.layout,
		}
	}
}

/// Positions produced by a completed run, in node order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutResult {
	/// Final position of every node.
	pub positions: IndexMap<String, Point>,
	/// The algorithm that actually ran.
	pub resolved_mode: LayoutMode,
	/// Steps actually taken.
	pub iterations: usize,
}

impl LayoutResult {
	/// Position of node `id`, if it was laid out.
	pub fn get(&self, id: &str) -> Option<Point> {
		self.positions.get(id).copied()
	}

	/// Number of positioned nodes.
	pub fn len(&self) -> usize {
		self.positions.len()
	}

	/// True when no node was laid out.
	pub fn is_empty(&self) -> bool {
		self.positions.is_empty()
	}
}

/// Shared flag that stops a running layout at the next step boundary.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
	/// A token that has not fired.
	pub fn new() -> Self {
		Self::default()
	}

	/// Requests cancellation; every clone observes it.
	pub fn cancel(&self) {
		self.0.store(true, Ordering::Relaxed);
	}

	/// Whether [`cancel`](Self::cancel) has been called.
	pub fn is_cancelled(&self) -> bool {
		self.0.load(Ordering::Relaxed)
	}
}

/// Seed position of the node at `index` among `count`: evenly spaced on a
/// circle of radius `min(width, height) / 4` around the canvas center.
pub fn circle_position(index: usize, count: usize, width: f64, height: f64) -> Point {
	let angle = 2.0 * PI * index as f64 / count.max(1) as f64;
	let radius = width.min(height) / 4.0;
	Point::new(
		width / 2.0 + radius * angle.cos(),
		height / 2.0 + radius * angle.sin(),
	)
}

/// Keeps a coordinate `margin` away from both canvas edges; a canvas narrower
/// than two margins collapses to its midline.
fn clamp_axis(v: f64, margin: f64, extent: f64) -> f64 {
	let (lo, hi) = (margin, extent - margin);
	if lo > hi { extent / 2.0 } else { v.clamp(lo, hi) }
}

/// A force layout that can be advanced one step at a time.
///
/// Hosts that animate call [`step`](Self::step) per frame and draw
/// [`positions`](Self::positions); everything else calls [`run`](Self::run).
#[derive(Clone, Debug)]
pub struct ForceSimulation {
	params: LayoutParams,
	resolved_mode: LayoutMode,
	ids: Vec<String>,
	positions: Vec<Point>,
	pins: Vec<Option<PinAxes>>,
	links: Vec<(usize, usize)>,
	completed: usize,
}

impl ForceSimulation {
	/// Seeds a run over `graph`. Nothing moves until the first step.
	pub fn new(graph: &Graph, params: LayoutParams) -> Self {
		let resolved_mode = params.mode.resolved();
		if resolved_mode != params.mode {
			warn!(
				"layout mode {} is not implemented, using {} placement",
				params.mode, resolved_mode
			);
		}

		let count = graph.nodes.len();
		let mut ids = Vec::with_capacity(count);
		let mut positions = Vec::with_capacity(count);
		let mut pins = Vec::with_capacity(count);
		for (i, node) in graph.nodes.iter().enumerate() {
			let placed = node
				.position
				.point()
				.filter(|p| p.x.is_finite() && p.y.is_finite());
			let pin = placed.and(node.position.pin());
			let seed = circle_position(i, count, params.width, params.height);
			// Circular placement overrides every free axis; force keeps host positions.
			let start = match (placed, resolved_mode) {
				(None, _) => seed,
				(Some(p), LayoutMode::Force) => p,
				(Some(p), _) => Point::new(
					if pin.is_some_and(PinAxes::x) { p.x } else { seed.x },
					if pin.is_some_and(PinAxes::y) { p.y } else { seed.y },
				),
			};
			ids.push(node.id.clone());
			positions.push(start);
			pins.push(pin);
		}

		let resolved = graph.resolved_links();
		if resolved.len() < graph.links.len() {
			debug!(
				"skipping {} link(s) with a missing endpoint",
				graph.links.len() - resolved.len()
			);
		}
		let links = resolved.into_iter().map(|(_, s, t)| (s, t)).collect();

		let mut sim = Self {
			params,
			resolved_mode,
			ids,
			positions,
			pins,
			links,
			completed: 0,
		};
		sim.clamp();
		sim
	}

	/// Steps this run will take in total.
	pub fn total_steps(&self) -> usize {
		match self.resolved_mode {
			LayoutMode::Force => self.params.iterations,
			_ => 0,
		}
	}

	/// Steps taken so far.
	pub fn completed(&self) -> usize {
		self.completed
	}

	/// True once every step has run.
	pub fn is_finished(&self) -> bool {
		self.completed >= self.total_steps()
	}

	/// Current positions; interim until the run is finished.
	pub fn positions(&self) -> IndexMap<String, Point> {
		self.ids
			.iter()
			.cloned()
			.zip(self.positions.iter().copied())
			.collect()
	}

	/// Advances one step. Returns `false` once the run is already finished.
	pub fn step(&mut self) -> bool {
		if self.is_finished() {
			return false;
		}
		let start = &self.positions;
		let mut delta = vec![Point::ZERO; start.len()];

		let repulsion = self.params.repulsion;
		if repulsion != 0.0 {
			for a in 0..start.len() {
				for b in (a + 1)..start.len() {
					let d = start[a] - start[b];
					let dist = d.length().max(MIN_DISTANCE);
					let push = d * (repulsion / (dist * dist * dist));
					delta[a] = delta[a] + push;
					delta[b] = delta[b] - push;
				}
			}
		}

		let (rest, attraction) = (self.params.link_distance, self.params.attraction);
		if attraction != 0.0 {
			for &(s, t) in &self.links {
				let d = start[t] - start[s];
				let dist = d.length().max(MIN_DISTANCE);
				let pull = d * ((dist - rest) * attraction / dist);
				delta[s] = delta[s] + pull;
				delta[t] = delta[t] - pull;
			}
		}

		for ((pos, pin), d) in self.positions.iter_mut().zip(&self.pins).zip(delta) {
			if !pin.is_some_and(PinAxes::x) {
				pos.x += d.x;
			}
			if !pin.is_some_and(PinAxes::y) {
				pos.y += d.y;
			}
		}
		self.clamp();
		self.completed += 1;
		true
	}

	fn clamp(&mut self) {
		let LayoutParams {
			width,
			height,
			node_size,
			..
		} = self.params;
		for (pos, pin) in self.positions.iter_mut().zip(&self.pins) {
			if !pin.is_some_and(PinAxes::x) {
				pos.x = clamp_axis(pos.x, node_size, width);
			}
			if !pin.is_some_and(PinAxes::y) {
				pos.y = clamp_axis(pos.y, node_size, height);
			}
		}
	}

	/// Runs the remaining steps, checking `cancel` before each one.
	pub fn run(mut self, cancel: &CancelToken) -> Result<LayoutResult> {
		while !self.is_finished() {
			if cancel.is_cancelled() {
				return Err(EngineError::Cancelled {
					completed: self.completed,
				});
			}
			self.step();
		}
		Ok(self.finish())
	}

	/// Ends the run where it stands.
	pub fn finish(self) -> LayoutResult {
		LayoutResult {
			positions: self.ids.into_iter().zip(self.positions).collect(),
			resolved_mode: self.resolved_mode,
			iterations: self.completed,
		}
	}
}

/// Lays out `graph` to completion. Pure: identical input gives identical output.
pub fn compute_layout(graph: &Graph, params: LayoutParams) -> LayoutResult {
	let mut sim = ForceSimulation::new(graph, params);
	while sim.step() {}
	sim.finish()
}

/// [`compute_layout`] that gives up when `cancel` fires.
pub fn compute_layout_with(
	graph: &Graph,
	params: LayoutParams,
	cancel: &CancelToken,
) -> Result<LayoutResult> {
	ForceSimulation::new(graph, params).run(cancel)
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;

	use super::*;
	use crate::engine::model::{Link, Node};

	fn params(width: f64, height: f64) -> LayoutParams {
		LayoutParams::from_settings(&Settings::default(), width, height)
	}

	fn nodes(n: usize) -> Vec<Node> {
		(0..n).map(|i| Node::new(format!("n{i}"), "")).collect()
	}

	#[test]
	fn empty_graph_yields_empty_map() {
		let result = compute_layout(&Graph::default(), params(800.0, 600.0));
		assert!(result.is_empty());
	}

	#[test]
	fn single_node_stays_finite() {
		let g = Graph::new(nodes(1), vec![]);
		let p = compute_layout(&g, params(800.0, 600.0)).get("n0").unwrap();
		assert!(p.x.is_finite() && p.y.is_finite());
	}

	#[test]
	fn seeds_follow_node_order_on_a_circle() {
		let g = Graph::new(nodes(4), vec![]);
		let sim = ForceSimulation::new(&g, params(800.0, 600.0));
		let seeds = sim.positions();
		let center = Point::new(400.0, 300.0);
		for (i, p) in seeds.values().enumerate() {
			let d = *p - center;
			assert!((d.length() - 150.0).abs() < 1e-9);
			let angle = d.y.atan2(d.x).rem_euclid(2.0 * PI);
			assert!((angle - 2.0 * PI * i as f64 / 4.0).abs() < 1e-9, "node {i}");
		}
		assert_eq!(seeds, ForceSimulation::new(&g, params(800.0, 600.0)).positions());
	}

	#[test]
	fn placed_nodes_keep_their_start() {
		let g = Graph::new(vec![Node::new("a", "").at(10.0, 500.0)], vec![]);
		let sim = ForceSimulation::new(&g, params(800.0, 600.0));
		assert_eq!(sim.positions()["a"], Point::new(10.0, 500.0));
	}

	#[test]
	fn zero_forces_leave_the_seed_unchanged() {
		let g = Graph::new(nodes(5), vec![Link::new("l", "n0", "n1")]);
		let mut p = params(800.0, 600.0);
		p.repulsion = 0.0;
		p.attraction = 0.0;
		let seeds = ForceSimulation::new(&g, p.clone()).positions();
		assert_eq!(compute_layout(&g, p).positions, seeds);
	}

	#[test]
	fn linked_pair_settles_near_link_distance() {
		let g = Graph::new(nodes(2), vec![Link::new("l", "n0", "n1")]);
		let r = compute_layout(&g, params(1000.0, 1000.0));
		let d = r.get("n0").unwrap().distance(r.get("n1").unwrap());
		assert!((d - 50.0).abs() <= 5.0, "distance {d}");
	}

	#[test]
	fn coincident_nodes_do_not_produce_nan() {
		let g = Graph::new(
			vec![Node::new("a", "").at(100.0, 100.0), Node::new("b", "").at(100.0, 100.0)],
			vec![Link::new("l", "a", "b")],
		);
		for p in compute_layout(&g, params(800.0, 600.0)).positions.values() {
			assert!(p.x.is_finite() && p.y.is_finite());
		}
	}

	#[test]
	fn dangling_links_are_ignored() {
		let g = Graph::new(nodes(1), vec![Link::new("l", "n0", "missing")]);
		let with = compute_layout(&g, params(800.0, 600.0));
		let without = compute_layout(&Graph::new(nodes(1), vec![]), params(800.0, 600.0));
		assert_eq!(with, without);
	}

	#[test]
	fn circular_and_fallback_modes_skip_iteration() {
		let g = Graph::new(nodes(6), vec![Link::new("l", "n0", "n3")]);
		let seeds = ForceSimulation::new(&g, params(800.0, 600.0)).positions();
		for mode in [LayoutMode::Circular, LayoutMode::Hierarchical, LayoutMode::Grid] {
			let mut p = params(800.0, 600.0);
			p.mode = mode;
			let r = compute_layout(&g, p);
			assert_eq!(r.resolved_mode, LayoutMode::Circular);
			assert_eq!(r.iterations, 0);
			assert_eq!(r.positions, seeds);
		}
	}

	#[test]
	fn circular_mode_moves_placed_nodes_onto_the_circle() {
		let g = Graph::new(
			vec![
				Node::new("a", "").at(20.0, 20.0),
				Node::new("b", ""),
				Node::new("c", ""),
				Node::new("d", "").pinned(700.0, 50.0, PinAxes::Y),
			],
			vec![],
		);
		let mut p = params(800.0, 600.0);
		p.mode = LayoutMode::Circular;
		let r = compute_layout(&g, p);
		for (i, id) in ["a", "b", "c"].into_iter().enumerate() {
			assert_eq!(r.get(id), Some(circle_position(i, 4, 800.0, 600.0)), "node {id}");
		}
		let d = r.get("d").unwrap();
		assert!((d.x - circle_position(3, 4, 800.0, 600.0).x).abs() < 1e-9);
		assert_eq!(d.y, 50.0);
	}

	#[test]
	fn tiny_canvas_collapses_to_center() {
		let g = Graph::new(nodes(3), vec![]);
		let r = compute_layout(&g, params(10.0, 10.0));
		for p in r.positions.values() {
			assert_eq!(*p, Point::new(5.0, 5.0));
		}
	}

	#[test]
	fn cancelled_run_returns_no_positions() {
		let g = Graph::new(nodes(3), vec![]);
		let cancel = CancelToken::new();
		cancel.cancel();
		assert_eq!(
			compute_layout_with(&g, params(800.0, 600.0), &cancel),
			Err(EngineError::Cancelled { completed: 0 })
		);
	}

	#[test]
	fn runs_can_move_to_worker_threads() {
		fn assert_send<T: Send + 'static>() {}
		assert_send::<ForceSimulation>();
		assert_send::<CancelToken>();

		let g = Graph::new(nodes(20), vec![Link::new("l", "n0", "n1")]);
		let cancel = CancelToken::new();
		let worker = {
			let cancel = cancel.clone();
			std::thread::spawn(move || compute_layout_with(&g, params(800.0, 600.0), &cancel))
		};
		let result = worker.join().unwrap().unwrap();
		assert_eq!(result.len(), 20);
		assert_eq!(result.iterations, 100);
	}

	#[test]
	fn stepping_matches_one_shot() {
		let g = Graph::new(nodes(4), vec![Link::new("l", "n0", "n2")]);
		let mut sim = ForceSimulation::new(&g, params(800.0, 600.0));
		let mut steps = 0;
		while sim.step() {
			steps += 1;
		}
		assert_eq!(steps, 100);
		assert!(!sim.step());
		assert_eq!(sim.finish(), compute_layout(&g, params(800.0, 600.0)));
	}

	fn arb_graph() -> impl Strategy<Value = Graph> {
		(0usize..10).prop_flat_map(|n| {
			let pins = proptest::collection::vec(
				proptest::option::of((-50.0..900.0f64, -50.0..700.0f64, 0u8..4)),
				n,
			);
			let links = proptest::collection::vec((0..n.max(1), 0..n.max(1)), 0..12);
			(pins, links).prop_map(|(pins, links)| {
				let nodes = pins
					.into_iter()
					.enumerate()
					.map(|(i, pin)| {
						let node = Node::new(i.to_string(), "");
						match pin {
							None => node,
							Some((x, y, 0)) => node.at(x, y),
							Some((x, y, 1)) => node.pinned(x, y, PinAxes::X),
							Some((x, y, 2)) => node.pinned(x, y, PinAxes::Y),
							Some((x, y, _)) => node.pinned(x, y, PinAxes::Both),
						}
					})
					.collect();
				let links = links
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
		fn free_axes_stay_inside_and_pins_hold(
			g in arb_graph(),
			iterations in 0usize..30,
			repulsion in 0.0..200.0f64,
			attraction in 0.0..0.3f64,
			circular in any::<bool>(),
		) {
			let mut p = params(800.0, 600.0);
			if circular {
				p.mode = LayoutMode::Circular;
			}
			p.iterations = iterations;
			p.repulsion = repulsion;
			p.attraction = attraction;
			let result = compute_layout(&g, p.clone());
			for node in &g.nodes {
				let pos = result.get(&node.id).unwrap();
				let pin = node.position.pin();
				let at = node.position.point();
				if pin.is_some_and(PinAxes::x) {
					prop_assert_eq!(pos.x, at.unwrap().x);
				} else {
					prop_assert!(pos.x >= p.node_size && pos.x <= p.width - p.node_size);
				}
				if pin.is_some_and(PinAxes::y) {
					prop_assert_eq!(pos.y, at.unwrap().y);
				} else {
					prop_assert!(pos.y >= p.node_size && pos.y <= p.height - p.node_size);
				}
			}
		}
	}
}
