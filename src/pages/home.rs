use leptos::prelude::*;

use crate::components::force_graph::{LinkData, LocalGraph, PageLinks, convert, to_title_lc};

const TOPICS: &[&str] = &[
	"Graph Layout",
	"Spring Embedder",
	"Barnes Hut",
	"Quadtree",
	"Simulated Annealing",
	"Velocity Verlet",
	"Zoom And Pan",
	"SVG",
	"Hover Highlight",
	"Link Index",
	"Backlinks",
	"Title Normalization",
	"Animation Frame",
	"Resize Observer",
];

/// Simple pseudo-random number generator (deterministic for consistency).
fn rand_simple(seed: usize) -> f64 {
	let x = ((seed + 1) * 9301 + 49297) % 233280;
	(x as f64) / 233280.0
}

/// Sample neighborhood: the home page links to every topic, and each topic
/// links back plus to a couple of pseudo-random siblings.
fn sample_link_data() -> LinkData {
	let home = PageLinks {
		title: "Force Directed Graphs".into(),
		links: TOPICS.iter().map(|t| t.to_string()).collect(),
	};
	let related: Vec<PageLinks> = TOPICS
		.iter()
		.enumerate()
		.map(|(i, title)| {
			let mut links = Vec::new();
			if i % 3 != 2 {
				links.push(home.title.clone());
			}
			for k in 0..(i % 3) {
				let j = (rand_simple(i * 7 + k) * TOPICS.len() as f64) as usize;
				if j != i {
					links.push(TOPICS[j].to_string());
				}
			}
			if i % 4 == 0 {
				links.push(format!("{title} Notes"));
			}
			PageLinks {
				title: title.to_string(),
				links,
			}
		})
		.collect();
	convert(&home, &related)
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let graph_data = Signal::derive(move || Some(sample_link_data()));
	let current = to_title_lc("Force Directed Graphs");

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

			<div class="local-graph-page">
				<h1>"Force Directed Graphs"</h1>
				<p class="subtitle">"Drag nodes to reposition. Scroll to zoom. Drag background to pan."</p>
				<LocalGraph data=graph_data current=Some(current) link_prefix=Some("#".to_string()) />
			</div>
		</ErrorBoundary>
	}
}
