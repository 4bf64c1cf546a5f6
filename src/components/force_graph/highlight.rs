use std::fmt::Write;

use super::scale::FONT_SIZE;

/// Stylesheet every graph starts from. Caller overrides follow it.
///
/// Selectors are bare: the surface mounts them in the graph's own shadow root.
pub fn base_style() -> String {
	format!(
		r#":host {{
  display: block;
}}
svg {{
  width: 100%;
  touch-action: none;
  min-height: 250px;
  box-shadow: 0 4px 0 rgba(0,0,0,.16);
  border-radius: 4px 4px 3px 3px;
  background-color: var(--page-bg, #fefefe);
  margin: .5em 0;
  --graph-node: #6b879a;
  --graph-node-current: #f58382;
  --graph-node-inactive: #4a575e;
  --graph-node-font-size: {FONT_SIZE}em;
  --graph-link: #f2f2f3;
  --graph-link-active: #848484;
  --graph-label-color: var(--page-text-color, #4a4a4a);
}}
.node {{
  --graph-node-opacity-factor: 1.0;
}}
.node circle {{
  opacity: var(--graph-node-opacity-factor);
  transition: opacity 0.2s linear;
}}
.node.empty circle {{
  opacity: calc(var(--graph-node-opacity-factor) * 0.5);
}}
circle {{
  fill: var(--graph-node);
  cursor: pointer;
}}
.current circle {{
  fill: var(--graph-node-current);
}}
.link {{
  color: var(--graph-link);
}}
text {{
  font-size: var(--graph-node-font-size);
  fill: var(--graph-label-color);
  pointer-events: none;
}}
text, .link {{
  transition: color,font-size,opacity;
  transition-duration: 0.2s;
  transition-timing-function: linear;
}}
"#
	)
}

/// Escapes `value` for use inside a double-quoted CSS string.
pub fn css_escape(value: &str) -> String {
	let mut out = String::with_capacity(value.len());
	for c in value.chars() {
		match c {
			'"' | '\\' => {
				out.push('\\');
				out.push(c);
			}
			'\n' => out.push_str("\\a "),
			c if c.is_control() => {
				let _ = write!(out, "\\{:x} ", c as u32);
			}
			c => out.push(c),
		}
	}
	out
}

/// JSON array written into `data-targets`/`data-sources`.
pub fn id_list_attr<'a>(ids: impl IntoIterator<Item = &'a String>) -> String {
	let ids: Vec<&String> = ids.into_iter().collect();
	serde_json::to_string(&ids).unwrap_or_else(|_| "[]".into())
}

/// Rules that dim everything not adjacent to `hovered`.
///
/// `opacity` is the current label opacity; dimmed labels drop to 60% of it.
/// Returns an empty string when nothing is hovered.
pub fn hover_style(hovered: Option<&str>, opacity: f64) -> String {
	let Some(id) = hovered else {
		return String::new();
	};
	let title = css_escape(id);
	let quoted = css_escape(&serde_json::to_string(id).unwrap_or_default());
	let others = format!(
		r#".node:not([data-title="{title}"]):not([data-targets*="{quoted}"]):not([data-sources*="{quoted}"])"#
	);
	let dimmed = opacity * 0.6;

	format!(
		r#"{others} {{
  --graph-node-opacity-factor: 0.6;
}}
{others} text {{
  opacity: {dimmed} !important;
}}
.node[data-title="{title}"] text {{
  opacity: 1 !important;
  font-size: calc(var(--graph-node-font-size) * 1.5) !important;
}}
.link:is([data-target="{title}"], [data-source="{title}"]) {{
  color: var(--graph-link-active);
}}"#
	)
}
