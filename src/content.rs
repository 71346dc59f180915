//! Result descriptors and the reducers that collapse a parse's raw results
//! into tag lists and prioritised URL groups.

use std::collections::{BTreeMap, BTreeSet};

// Wire identifiers for the payload kinds.
pub(crate) const WIRE_URLS: u64 = 0;
pub(crate) const WIRE_MAPPINGS: u64 = 1;
pub(crate) const WIRE_VETO: u64 = 2;

/// Decides whether a document should be abandoned, from the fragments a
/// formula found in it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct VetoRule {
    pub veto_if_matches_found: bool,
    pub match_if_text_present: bool,
    pub search_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ContentPayload {
    /// Lower or absent priority sorts last.
    Urls { priority: Option<i64> },
    /// Empty namespace means an unnamespaced tag.
    Mappings { namespace: String },
    Veto(VetoRule),
}

impl ContentPayload {
    pub(crate) fn wire_id(&self) -> u64 {
        match self {
            ContentPayload::Urls { .. } => WIRE_URLS,
            ContentPayload::Mappings { .. } => WIRE_MAPPINGS,
            ContentPayload::Veto(_) => WIRE_VETO,
        }
    }
}

/// The typed identity of a result.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ContentDescriptor {
    pub name: String,
    pub payload: ContentPayload,
}

pub type ContentResult = (ContentDescriptor, String);

#[must_use]
pub fn combine_tag(namespace: &str, tag: &str) -> String {
    if namespace.is_empty() {
        tag.to_owned()
    } else {
        format!("{namespace}:{tag}")
    }
}

/// Normalises a combined tag: trimmed, inner whitespace collapsed, lowercase.
/// Returns None for tags that clean away to nothing.
fn clean_tag(tag: &str) -> Option<String> {
    let cleaned = tag
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    (!cleaned.is_empty() && cleaned != ":").then_some(cleaned)
}

/// Mapping fragments combined with their namespace, cleaned and deduplicated,
/// in sorted order.
#[must_use]
pub fn tags_from_results(results: &[ContentResult]) -> Vec<String> {
    let mut tags = BTreeSet::new();
    for (descriptor, text) in results {
        if let ContentPayload::Mappings { namespace } = &descriptor.payload {
            if let Some(tag) = clean_tag(&combine_tag(namespace, text)) {
                tags.insert(tag);
            }
        }
    }
    tags.into_iter().collect()
}

/// URL fragments grouped by priority (absent counts as -1), groups in
/// descending priority order, input order kept within each group.
#[must_use]
pub fn urls_from_results(results: &[ContentResult]) -> Vec<Vec<String>> {
    let mut groups: BTreeMap<i64, Vec<String>> = BTreeMap::new();
    for (descriptor, text) in results {
        if let ContentPayload::Urls { priority } = descriptor.payload {
            groups
                .entry(priority.unwrap_or(-1))
                .or_default()
                .push(text.clone());
        }
    }
    groups.into_values().rev().collect()
}

/// One-line rendering of a single result.
#[must_use]
pub fn describe_result((descriptor, text): &ContentResult) -> String {
    match &descriptor.payload {
        ContentPayload::Urls { .. } => format!("url: {text}"),
        ContentPayload::Mappings { namespace } => {
            format!("tag: {}", combine_tag(namespace, text))
        }
        ContentPayload::Veto(_) => "veto".to_owned(),
    }
}

/// Summary of what a set of descriptors can produce, e.g.
/// "urls, tags: character, unnamespaced".
#[must_use]
pub fn describe_parsable_content(
    content: &BTreeSet<ContentDescriptor>,
    include_veto: bool,
) -> String {
    let mut has_urls = false;
    let mut has_unnamespaced = false;
    let mut has_veto = false;
    let mut namespaces = BTreeSet::new();
    for descriptor in content {
        match &descriptor.payload {
            ContentPayload::Urls { .. } => has_urls = true,
            ContentPayload::Mappings { namespace } => {
                if namespace.is_empty() {
                    has_unnamespaced = true;
                } else {
                    namespaces.insert(namespace.clone());
                }
            }
            ContentPayload::Veto(_) => has_veto = true,
        }
    }

    let mut parts = Vec::new();
    if has_urls {
        parts.push("urls".to_owned());
    }
    if !namespaces.is_empty() || has_unnamespaced {
        let mut names: Vec<String> = namespaces.into_iter().collect();
        if has_unnamespaced {
            names.push("unnamespaced".to_owned());
        }
        parts.push(format!("tags: {}", names.join(", ")));
    }
    if has_veto && include_veto {
        parts.push("veto".to_owned());
    }

    if parts.is_empty() {
        "nothing".to_owned()
    } else {
        parts.join(", ")
    }
}
