use engine_logging::{engine_debug, engine_warn};
use thiserror::Error;
use url::Url;

const SHORT_LINK_HOST: &str = "youtu.be";
const WATCH_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
];
/// Generated mix/radio list ids start with this prefix.
const MIX_LIST_PREFIX: &str = "RD";

/// A validated reference to a single video or to a collection of videos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    raw: String,
    url: String,
    kind: ReferenceKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceKind {
    Single { video_id: String },
    Collection(CollectionRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRef {
    pub list_id: String,
    /// 1-based position of the first item to fetch.
    pub start_index: u32,
    /// `false` for mix/radio collections, which need a cap.
    pub bounded: bool,
    /// Set when an index marker was present but unusable.
    pub start_index_defaulted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidReference {
    #[error("empty reference")]
    Empty,
    #[error("not a url: {0}")]
    NotAUrl(String),
    #[error("unsupported host or path: {0}")]
    UnsupportedShape(String),
    #[error("missing video or list id: {0}")]
    MissingId(String),
}

impl Reference {
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Normalized URL (scheme added when it was missing).
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn kind(&self) -> &ReferenceKind {
        &self.kind
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.kind, ReferenceKind::Collection(_))
    }

    pub fn collection(&self) -> Option<&CollectionRef> {
        match &self.kind {
            ReferenceKind::Collection(collection) => Some(collection),
            ReferenceKind::Single { .. } => None,
        }
    }
}

/// Canonical watch URL for a native video id.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// Validate and classify one raw user-supplied string.
pub fn validate(raw: &str) -> Result<Reference, InvalidReference> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InvalidReference::Empty);
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let url = Url::parse(&candidate).map_err(|_| InvalidReference::NotAUrl(trimmed.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(InvalidReference::NotAUrl(trimmed.to_string()));
    }
    let host = url
        .host_str()
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| InvalidReference::NotAUrl(trimmed.to_string()))?;

    let query = QueryMarkers::from_url(&url);

    let kind = if host == SHORT_LINK_HOST {
        let video_id = url.path().trim_matches('/').to_string();
        if video_id.is_empty() || video_id.contains('/') {
            return Err(InvalidReference::MissingId(trimmed.to_string()));
        }
        match query.list {
            Some(ref list_id) => ReferenceKind::Collection(query.collection(list_id)),
            None => ReferenceKind::Single { video_id },
        }
    } else if WATCH_HOSTS.contains(&host.as_str()) {
        match url.path().trim_end_matches('/') {
            "/watch" => match (&query.video, &query.list) {
                (_, Some(list_id)) => ReferenceKind::Collection(query.collection(list_id)),
                (Some(video_id), None) => ReferenceKind::Single {
                    video_id: video_id.clone(),
                },
                (None, None) => return Err(InvalidReference::MissingId(trimmed.to_string())),
            },
            "/playlist" => match &query.list {
                Some(list_id) => ReferenceKind::Collection(query.collection(list_id)),
                None => return Err(InvalidReference::MissingId(trimmed.to_string())),
            },
            _ => return Err(InvalidReference::UnsupportedShape(trimmed.to_string())),
        }
    } else {
        return Err(InvalidReference::UnsupportedShape(trimmed.to_string()));
    };

    if let ReferenceKind::Collection(collection) = &kind {
        if collection.start_index_defaulted {
            engine_warn!(
                "Malformed index marker in {}, starting at item 1",
                trimmed
            );
        }
    }
    engine_debug!("Validated reference {} as {:?}", trimmed, kind);

    Ok(Reference {
        raw: trimmed.to_string(),
        url: url.to_string(),
        kind,
    })
}

#[derive(Default)]
struct QueryMarkers {
    video: Option<String>,
    list: Option<String>,
    index: Option<String>,
    start_radio: bool,
}

impl QueryMarkers {
    fn from_url(url: &Url) -> Self {
        let mut markers = Self::default();
        for (key, value) in url.query_pairs() {
            let value = value.trim();
            match key.as_ref() {
                "v" if !value.is_empty() => markers.video = Some(value.to_string()),
                "list" if !value.is_empty() => markers.list = Some(value.to_string()),
                "index" => markers.index = Some(value.to_string()),
                "start_radio" => markers.start_radio = value == "1",
                _ => {}
            }
        }
        markers
    }

    fn collection(&self, list_id: &str) -> CollectionRef {
        let parsed = self
            .index
            .as_deref()
            .map(|raw| raw.parse::<u32>().ok().filter(|index| *index >= 1));
        let (start_index, start_index_defaulted) = match parsed {
            None => (1, false),
            Some(Some(index)) => (index, false),
            Some(None) => (1, true),
        };
        CollectionRef {
            list_id: list_id.to_string(),
            start_index,
            bounded: !(list_id.starts_with(MIX_LIST_PREFIX) || self.start_radio),
            start_index_defaulted,
        }
    }
}
