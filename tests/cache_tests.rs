use rondo::cache::MetadataCache;
use serde_json::json;

#[test]
fn store_then_load_round_trips() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = MetadataCache::new(dir.path());
    let value = json!({"versions": {"1.0": {"Depends": "R (>= 3.5)"}}});

    cache.store(&value, &["cran", "demo.json"]).expect("store");
    assert_eq!(cache.load(&["cran", "demo.json"]), Some(value));
}

#[test]
fn exists_mirrors_load() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = MetadataCache::new(dir.path());

    assert!(!cache.exists(&["cran", "missing.json"]));
    assert_eq!(cache.load(&["cran", "missing.json"]), None);

    cache.store(&json!({"a": 1}), &["cran", "present.json"]).expect("store");
    assert!(cache.exists(&["cran", "present.json"]));
    assert!(cache.load(&["cran", "present.json"]).is_some());
}

#[test]
fn drop_removes_entries() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = MetadataCache::new(dir.path());

    cache.store(&json!([1, 2, 3]), &["bioconductor", "3.17.json"]).expect("store");
    assert!(cache.exists(&["bioconductor", "3.17.json"]));
    cache.drop(&["bioconductor", "3.17.json"]).expect("drop");
    assert!(!cache.exists(&["bioconductor", "3.17.json"]));
    // Dropping a missing entry is not an error.
    cache.drop(&["bioconductor", "3.17.json"]).expect("idempotent drop");
}

#[test]
fn slashes_in_segments_cannot_escape_the_root() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = MetadataCache::new(dir.path());
    let value = json!({"owner": "user", "repo": "pkg"});

    cache
        .store(&value, &["github", "user/pkg__abc.json"])
        .expect("store");
    let expected = dir.path().join("github").join("user__pkg__abc.json");
    assert!(expected.is_file());
    assert_eq!(cache.load(&["github", "user/pkg__abc.json"]), Some(value));
}

#[test]
fn files_are_pretty_printed_with_sorted_keys_and_ascii() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = MetadataCache::new(dir.path());
    let value = json!({"zebra": 1, "alpha": "caf\u{e9}"});

    cache.store(&value, &["cran", "order.json"]).expect("store");
    let text = std::fs::read_to_string(dir.path().join("cran").join("order.json")).expect("read");

    let alpha = text.find("\"alpha\"").expect("alpha present");
    let zebra = text.find("\"zebra\"").expect("zebra present");
    assert!(alpha < zebra, "keys must be sorted");
    assert!(text.contains("caf\\u00e9"), "non-ASCII must be escaped");
    assert!(text.contains("\n  \"alpha\""), "two-space indent");
}

#[test]
fn corrupt_entries_read_as_absent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = MetadataCache::new(dir.path());

    let path = dir.path().join("cran");
    std::fs::create_dir_all(&path).expect("mkdir");
    std::fs::write(path.join("bad.json"), "{not json").expect("write");
    assert_eq!(cache.load(&["cran", "bad.json"]), None);
}
