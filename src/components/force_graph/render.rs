use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::state::ForceGraphState;
use crate::engine::{Entity, LinkKind, NodeKind};

const PAGE_COLORS: &[&str] = &["#1f77b4", "#2ca02c", "#9467bd", "#17becf"];

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

fn node_color(kind: NodeKind, index: usize) -> &'static str {
	match kind {
		NodeKind::Page => PAGE_COLORS[index % PAGE_COLORS.len()],
		NodeKind::Block => "#8c564b",
		NodeKind::Tag => "#ff7f0e",
	}
}

pub fn render(state: &mut ForceGraphState, ctx: &CanvasRenderingContext2d) {
	state.engine.compute_layout();
	let viewport = state.engine.viewport();
	ctx.set_fill_style_str("#1a1a2e");
	ctx.fill_rect(0.0, 0.0, viewport.width(), viewport.height());

	let view = viewport.state();
	ctx.save();
	let _ = ctx.translate(view.pan.x, view.pan.y);
	let _ = ctx.scale(view.zoom, view.zoom);
	draw_links(state, ctx);
	draw_nodes(state, ctx);
	ctx.restore();
}

fn draw_links(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	let engine = &state.engine;
	let Some(layout) = engine.cached_layout() else {
		return;
	};
	let k = engine.viewport().zoom();
	let t = ease_out_cubic(state.highlight_t);
	let highlighted = engine.highlighted();
	let (dash, gap) = (6.0 / k, 4.0 / k);
	let dash_offset = -(state.flow_time * 20.0) % (dash + gap);
	let selected = engine.interaction().selected();

	for link in &engine.visible_graph().links {
		let (Some(a), Some(b)) = (layout.get(&link.source), layout.get(&link.target)) else {
			continue;
		};
		let lit = highlighted.contains(link.source.as_str())
			&& highlighted.contains(link.target.as_str());
		let alpha = if lit { 0.6 + 0.3 * t } else { 0.6 - 0.45 * t };
		let is_selected = matches!(selected, Some(Entity::Link(id)) if *id == link.id);
		let width = (if is_selected { 3.0 } else { 1.5 }) / k;

		ctx.set_stroke_style_str(&format!("rgba(100, 180, 255, {alpha})"));
		ctx.set_line_width(width);
		if link.kind == LinkKind::Tag {
			let _ = ctx.set_line_dash(&js_sys::Array::of2(
				&JsValue::from_f64(dash),
				&JsValue::from_f64(gap),
			));
			ctx.set_line_dash_offset(dash_offset);
		}
		ctx.begin_path();
		ctx.move_to(a.x, a.y);
		ctx.line_to(b.x, b.y);
		ctx.stroke();
		let _ = ctx.set_line_dash(&js_sys::Array::new());
	}
}

fn draw_nodes(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	let engine = &state.engine;
	let Some(layout) = engine.cached_layout() else {
		return;
	};
	let settings = engine.settings();
	let k = engine.viewport().zoom();
	let t = ease_out_cubic(state.highlight_t);
	let highlighted = engine.highlighted();
	let selected = engine.interaction().selected();

	for (i, node) in engine.visible_graph().nodes.iter().enumerate() {
		let Some(p) = layout.get(&node.id) else {
			continue;
		};
		let lit = highlighted.contains(node.id.as_str());
		let (alpha, radius) = if lit || highlighted.is_empty() {
			(1.0, node.radius(settings.node_size) * (1.0 + 0.25 * t))
		} else {
			(1.0 - 0.7 * t, node.radius(settings.node_size) * (1.0 - 0.15 * t))
		};

		ctx.set_global_alpha(alpha);
		ctx.begin_path();
		let _ = ctx.arc(p.x, p.y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(node.color.as_deref().unwrap_or(node_color(node.kind, i)));
		ctx.fill();

		if matches!(selected, Some(Entity::Node(id)) if *id == node.id) {
			ctx.begin_path();
			let _ = ctx.arc(p.x, p.y, radius + 3.0 / k, 0.0, 2.0 * PI);
			ctx.set_stroke_style_str("rgba(255, 255, 255, 0.9)");
			ctx.set_line_width(2.0 / k);
			ctx.stroke();
		}

		if settings.show_labels {
			ctx.set_fill_style_str(&format!("rgba(255, 255, 255, {})", alpha * 0.8));
			ctx.set_font(&format!("{}px sans-serif", 10.0 / k.max(0.5)));
			ctx.set_text_align("center");
			let _ = ctx.fill_text(&node.label, p.x, p.y + radius + 12.0 / k.max(0.5));
		}
		ctx.set_global_alpha(1.0);
	}
}
