use super::types::LinkData;

/// Normalized title used as node identity.
pub fn to_title_lc(title: &str) -> String {
	title.to_lowercase().replace(' ', "_")
}

/// One page as the link source provider reports it.
#[derive(Clone, Debug, Default)]
pub struct PageLinks {
	/// Display title.
	pub title: String,
	/// Display titles of the pages this page links to.
	pub links: Vec<String>,
}

/// Folds the viewed page and its related pages into forward and backward link maps.
///
/// Related pages later in the list override an earlier page's forward links,
/// so the viewed page should come first.
pub fn convert(page: &PageLinks, related: &[PageLinks]) -> LinkData {
	let mut data = LinkData::default();
	for link in &page.links {
		data.to_title.insert(to_title_lc(link), link.clone());
	}

	for entry in std::iter::once(page).chain(related) {
		let title_lc = to_title_lc(&entry.title);
		let links_lc: Vec<String> = entry.links.iter().map(|link| to_title_lc(link)).collect();
		for link_lc in &links_lc {
			data.incoming
				.entry(link_lc.clone())
				.or_default()
				.insert(title_lc.clone());
		}
		data.to_title.insert(title_lc.clone(), entry.title.clone());
		data.outgoing.insert(title_lc, links_lc);
	}
	data
}
