use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use tubefetch_core::{validate, CollectionInfo, ResolvedItem};
use tubefetch_engine::{
    sanitize_component, thumbnail_filename, OutputPathResolver, TemplatePathResolver,
};

fn single_item() -> ResolvedItem {
    let reference = validate("https://youtu.be/dQw4w9WgXcQ").unwrap();
    ResolvedItem::standalone(&reference).unwrap()
}

fn collection_item(title: Option<&str>, position: u32) -> ResolvedItem {
    let reference = validate("https://www.youtube.com/playlist?list=PL123").unwrap();
    ResolvedItem {
        video_id: "abc".to_string(),
        url: "https://www.youtube.com/watch?v=abc".to_string(),
        position,
        title: None,
        source: reference,
        collection: Some(CollectionInfo {
            list_id: "PL123".to_string(),
            title: title.map(str::to_string),
        }),
    }
}

#[test]
fn single_items_land_in_the_root() {
    let root = Path::new("/downloads");
    let item = single_item();

    assert_eq!(TemplatePathResolver.item_dir(root, &item), PathBuf::from("/downloads"));
    assert_eq!(
        TemplatePathResolver.template(root, &item),
        PathBuf::from("/downloads/%(title)s [%(id)s].%(ext)s")
    );
}

#[test]
fn collection_items_are_numbered_in_a_named_folder() {
    let root = Path::new("/downloads");
    let item = collection_item(Some("Best of: 2024?"), 7);

    assert_eq!(
        TemplatePathResolver.item_dir(root, &item),
        PathBuf::from("/downloads/Best of_ 2024")
    );
    assert_eq!(
        TemplatePathResolver.template(root, &item),
        PathBuf::from("/downloads/Best of_ 2024/007 - %(title)s.%(ext)s")
    );
}

#[test]
fn collection_folder_falls_back_to_list_id() {
    let item = collection_item(None, 1);
    assert_eq!(
        TemplatePathResolver.item_dir(Path::new("out"), &item),
        PathBuf::from("out/PL123")
    );
}

#[test]
fn percent_signs_in_folders_are_escaped() {
    let item = collection_item(Some("100% hits"), 2);
    assert_eq!(
        TemplatePathResolver.template(Path::new("out"), &item),
        PathBuf::from("out/100%% hits/002 - %(title)s.%(ext)s")
    );
}

#[test]
fn components_are_made_safe() {
    assert_eq!(sanitize_component("My: Title?/Bad"), "My_ Title_Bad");
    assert_eq!(sanitize_component("CON"), "CON_");
    assert_eq!(sanitize_component("  ...  "), "untitled");
    assert_eq!(sanitize_component(&"x".repeat(200)).len(), 80);
}

#[test]
fn thumbnail_name_uses_title_and_id() {
    assert_eq!(thumbnail_filename(Some("Song | Live"), "abc"), "Song _ Live [abc].jpg");
    assert_eq!(thumbnail_filename(None, "abc"), "abc [abc].jpg");
}
