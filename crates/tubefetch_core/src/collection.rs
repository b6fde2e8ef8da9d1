use std::collections::HashSet;

use crate::reference::{watch_url, Reference, ReferenceKind};

/// Maximum number of unique items taken from an unbounded (mix/radio) collection.
pub const UNBOUNDED_COLLECTION_CAP: usize = 20;

/// One entry as reported by the collection-listing capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub native_id: String,
    /// Native 1-based position, when the listing reports one.
    pub position: Option<u32>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CollectionListing {
    pub title: Option<String>,
    pub entries: Vec<ListingEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionInfo {
    pub list_id: String,
    pub title: Option<String>,
}

/// One concrete, positioned unit of fetch work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedItem {
    pub video_id: String,
    pub url: String,
    /// Native position inside the originating collection, `1` for standalone items.
    pub position: u32,
    pub title: Option<String>,
    pub source: Reference,
    pub collection: Option<CollectionInfo>,
}

impl ResolvedItem {
    /// Returns `None` for collection references; those go through a listing.
    pub fn standalone(reference: &Reference) -> Option<Self> {
        match reference.kind() {
            ReferenceKind::Single { video_id } => Some(Self {
                video_id: video_id.clone(),
                url: watch_url(video_id),
                position: 1,
                title: None,
                source: reference.clone(),
                collection: None,
            }),
            ReferenceKind::Collection(_) => None,
        }
    }

    /// Short human label: the title when known, otherwise the video id.
    pub fn label(&self) -> String {
        match (&self.title, &self.collection) {
            (Some(title), Some(_)) => format!("#{} {}", self.position, title),
            (Some(title), None) => title.clone(),
            (None, Some(_)) => format!("#{} {}", self.position, self.video_id),
            (None, None) => self.video_id.clone(),
        }
    }
}

/// Select the items of a collection listing that a reference asks for.
///
/// Entries are walked in listing order. Entries before `start_index` are
/// skipped, repeated ids keep their first occurrence, unbounded collections
/// stop after [`UNBOUNDED_COLLECTION_CAP`] unique items, and the result is
/// sorted by native position. Single references select nothing.
pub fn select_items(reference: &Reference, listing: &CollectionListing) -> Vec<ResolvedItem> {
    let Some(collection) = reference.collection() else {
        return Vec::new();
    };

    let info = CollectionInfo {
        list_id: collection.list_id.clone(),
        title: listing.title.clone(),
    };

    let mut seen = HashSet::new();
    let mut selected = Vec::new();
    let mut counter: u32 = 0;
    for entry in &listing.entries {
        counter += 1;
        let position = entry.position.unwrap_or(counter);
        if position < collection.start_index {
            continue;
        }
        if !seen.insert(entry.native_id.as_str()) {
            continue;
        }
        selected.push(ResolvedItem {
            video_id: entry.native_id.clone(),
            url: watch_url(&entry.native_id),
            position,
            title: entry.title.clone(),
            source: reference.clone(),
            collection: Some(info.clone()),
        });
        if !collection.bounded && selected.len() >= UNBOUNDED_COLLECTION_CAP {
            break;
        }
    }

    selected.sort_by_key(|item| item.position);
    selected
}
