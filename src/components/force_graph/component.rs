use leptos::prelude::*;
use log::debug;

use super::controller::{Disposer, GraphOptions, build_and_run};
use super::dom::{AnimationFrameTicker, SvgSurface};
use super::types::LinkData;

/// Local link graph of one page.
///
/// Every change of `data` tears the previous graph down and builds a new one;
/// `None` renders nothing.
#[component]
pub fn LocalGraph(
	/// Link neighborhood to draw.
	#[prop(into)]
	data: Signal<Option<LinkData>>,
	/// Extra CSS injected after the base stylesheet.
	#[prop(default = String::new(), into)]
	css: String,
	/// Id of the page being viewed.
	#[prop(default = None)]
	current: Option<String>,
	/// Node glyphs link to `{link_prefix}{id}` when set.
	#[prop(default = None)]
	link_prefix: Option<String>,
) -> impl IntoView {
	let host_ref = NodeRef::<leptos::html::Div>::new();
	let disposer = StoredValue::new_local(None::<Disposer>);
	let options = GraphOptions {
		style_override: css,
		current,
	};

	Effect::new(move |_| {
		let data = data.get();
		let Some(host) = host_ref.get() else {
			return;
		};
		disposer.update_value(|slot| {
			if let Some(old) = slot.take() {
				old.dispose();
			}
		});
		let Some(data) = data else {
			debug!("no link data, graph left empty");
			return;
		};

		let mut surface = SvgSurface::new(host.into());
		if let Some(prefix) = &link_prefix {
			surface = surface.with_link_prefix(prefix.clone());
		}
		let running = build_and_run(&data, surface, AnimationFrameTicker::new(), &options);
		disposer.set_value(Some(running));
	});

	on_cleanup(move || {
		disposer.try_update_value(|slot| {
			if let Some(running) = slot.take() {
				running.dispose();
			}
		});
	});

	view! { <div node_ref=host_ref class="local-graph" /> }
}
