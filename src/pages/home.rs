use leptos::prelude::*;

use crate::components::force_graph::ForceGraphCanvas;
use crate::engine::{Entity, Graph, Link, LinkKind, Node, NodeKind, SettingsPatch};

const TAGS: &[&str] = &["rust", "gtd", "reading", "ideas", "work"];

/// Sample note graph: pages referencing each other, a few tags, a handful of
/// blocks hanging off pages and some orphan pages.
fn generate_sample_data(pages: usize) -> Graph {
	let mut nodes: Vec<Node> = (0..pages)
		.map(|i| Node::new(format!("page-{i}"), format!("Note {i}")))
		.collect();
	let mut links = Vec::new();

	for i in 1..pages {
		if i % 7 == 0 {
			continue;
		}
		let target = (rand_simple(i) * (i as f64)) as usize;
		links.push(Link::new(
			format!("ref-{i}"),
			format!("page-{i}"),
			format!("page-{target}"),
		));
	}

	for (t, tag) in TAGS.iter().enumerate() {
		nodes.push(Node::new(format!("tag-{tag}"), format!("#{tag}")).with_kind(NodeKind::Tag));
		for i in (t..pages).step_by(TAGS.len() * 2) {
			links.push(
				Link::new(
					format!("tag-{tag}-{i}"),
					format!("page-{i}"),
					format!("tag-{tag}"),
				)
				.with_kind(LinkKind::Tag),
			);
		}
	}

	for i in (0..pages).step_by(9) {
		let id = format!("block-{i}");
		nodes.push(
			Node::new(id.clone(), format!("Block {i}"))
				.with_kind(NodeKind::Block)
				.with_size(5.0),
		);
		links.push(Link::new(format!("parent-{i}"), format!("page-{i}"), id).with_kind(LinkKind::Parent));
	}

	Graph::new(nodes, links)
}

/// Simple pseudo-random number generator (deterministic for consistency).
fn rand_simple(seed: usize) -> f64 {
	let x = ((seed + 1) * 9301 + 49297) % 233280;
	(x as f64) / 233280.0
}

fn describe(entity: &Entity) -> String {
	match entity {
		Entity::Node(id) => format!("Selected note {id}"),
		Entity::Link(id) => format!("Selected link {id}"),
	}
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let graph_data = Signal::derive(move || generate_sample_data(60));
	let show_orphans = RwSignal::new(true);
	let show_labels = RwSignal::new(true);
	let (selected, set_selected) = signal(None::<String>);

	let settings = Signal::derive(move || SettingsPatch {
		show_orphans: Some(show_orphans.get()),
		show_labels: Some(show_labels.get()),
		..Default::default()
	});
	let on_select = Callback::new(move |entity: Entity| set_selected.set(Some(describe(&entity))));

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="fullscreen-graph">
				<ForceGraphCanvas
					data=graph_data
					settings=settings
					on_select=on_select
					fullscreen=true
				/>
				<div class="graph-overlay">
					<h1>"Note Graph"</h1>
					<p class="subtitle">
						"Drag notes to pin them. Scroll to zoom. Drag background to pan."
					</p>
					<label>
						<input
							type="checkbox"
							prop:checked=move || show_orphans.get()
							on:change=move |ev| show_orphans.set(event_target_checked(&ev))
						/>
						"Show orphans"
					</label>
					<label>
						<input
							type="checkbox"
							prop:checked=move || show_labels.get()
							on:change=move |ev| show_labels.set(event_target_checked(&ev))
						/>
						"Show labels"
					</label>
					<p class="selection">
						{move || selected.get().unwrap_or_else(|| "Nothing selected".to_string())}
					</p>
				</div>
			</div>
		</ErrorBoundary>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sample_data_is_a_valid_graph_with_orphans() {
		let g = generate_sample_data(60);
		assert!(g.validate().is_ok());
		assert!(g.resolved_links().len() == g.links.len());
		let linked: std::collections::HashSet<&str> = g
			.links
			.iter()
			.flat_map(|l| [l.source.as_str(), l.target.as_str()])
			.collect();
		assert!(g.nodes.iter().any(|n| !linked.contains(n.id.as_str())));
	}
}
