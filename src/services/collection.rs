use std::cmp::Ordering;

use serde::Deserialize;

use crate::models::link::LinkWithTags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    Alphabetical,
}

/// Pure collection view over the owner's full link set: tag filter, free-text
/// search, then sort. Recomputed per request; the working set is one user's
/// bookmarks, so no caching or incremental update is warranted.
pub fn filter_and_sort(
    links: Vec<LinkWithTags>,
    tag_id: Option<&str>,
    query: Option<&str>,
    sort: SortOrder,
) -> Vec<LinkWithTags> {
    let mut filtered: Vec<LinkWithTags> = links
        .into_iter()
        .filter(|link| match tag_id {
            Some(tag_id) => link.tags.iter().any(|tag| tag.id == tag_id),
            None => true,
        })
        .filter(|link| match query.map(str::trim) {
            Some(query) if !query.is_empty() => matches_query(link, &query.to_lowercase()),
            _ => true,
        })
        .collect();

    filtered.sort_by(|a, b| match sort {
        SortOrder::Newest => b.link.created_at.cmp(&a.link.created_at),
        SortOrder::Oldest => a.link.created_at.cmp(&b.link.created_at),
        SortOrder::Alphabetical => compare_titles(&a.link.title, &b.link.title),
    });

    filtered
}

/// Case-insensitive substring match across title, description, domain, notes
/// and the space-joined tag names. `query` must already be lower-cased.
fn matches_query(link: &LinkWithTags, query: &str) -> bool {
    let fields = [
        Some(link.link.title.as_str()),
        link.link.description.as_deref(),
        link.link.domain.as_deref(),
        link.link.notes.as_deref(),
    ];

    if fields
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(query))
    {
        return true;
    }

    let tag_names = link
        .tags
        .iter()
        .map(|tag| tag.name.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    tag_names.contains(query)
}

fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
