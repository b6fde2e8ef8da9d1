use std::path::{Path, PathBuf};

use tubefetch_core::ResolvedItem;

const MAX_COMPONENT_LEN: usize = 80;

/// Decides where an item is written.
pub trait OutputPathResolver: Send + Sync {
    /// Directory the item (and its thumbnail) lands in.
    fn item_dir(&self, output_root: &Path, item: &ResolvedItem) -> PathBuf;

    /// Output template handed to the fetch capability.
    fn template(&self, output_root: &Path, item: &ResolvedItem) -> PathBuf;
}

/// yt-dlp template layout: standalone items directly under the root,
/// collection items in a per-collection folder prefixed with their position.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplatePathResolver;

impl OutputPathResolver for TemplatePathResolver {
    fn item_dir(&self, output_root: &Path, item: &ResolvedItem) -> PathBuf {
        match &item.collection {
            Some(collection) => {
                let name = collection
                    .title
                    .as_deref()
                    .unwrap_or(collection.list_id.as_str());
                output_root.join(sanitize_component(name))
            }
            None => output_root.to_path_buf(),
        }
    }

    fn template(&self, output_root: &Path, item: &ResolvedItem) -> PathBuf {
        let dir = escape_template(&self.item_dir(output_root, item).to_string_lossy());
        let file = match item.collection {
            Some(_) => format!("{:03} - %(title)s.%(ext)s", item.position),
            None => "%(title)s [%(id)s].%(ext)s".to_string(),
        };
        PathBuf::from(dir).join(file)
    }
}

/// Windows-safe thumbnail filename: `{sanitized_title} [{video_id}].jpg`.
pub fn thumbnail_filename(title: Option<&str>, video_id: &str) -> String {
    let title = sanitize_component(title.unwrap_or(video_id));
    let id = sanitize_component(video_id);
    format!("{title} [{id}].jpg")
}

/// Make one path component safe on every platform.
pub fn sanitize_component(input: &str) -> String {
    let mut cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]).to_string();
    if cleaned.is_empty() {
        cleaned = "untitled".to_string();
    }
    // Collapse multiple underscores
    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }
    let mut final_name: String = compacted.chars().take(MAX_COMPONENT_LEN).collect();
    final_name = final_name.trim_end_matches(&[' ', '.'][..]).to_string();
    if is_reserved_windows_name(&final_name) {
        final_name.push('_');
    }
    final_name
}

/// `%` starts a field in yt-dlp output templates.
fn escape_template(input: &str) -> String {
    input.replace('%', "%%")
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}
