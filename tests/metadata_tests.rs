use rondo::metadata::description::{
    normalize_bioc_payload, normalize_cran_payload, normalize_github_payload, parse_description,
};
use rondo::metadata::fetchers::GithubDescriptor;
use rondo::model::{DependencyKind, Source};
use serde_json::{Map, Value};

fn payload(value: Value) -> Map<String, Value> {
    value.as_object().expect("fixture is an object").clone()
}

#[test]
fn cran_depends_extracts_r_and_filters_base_packages() {
    let fields = payload(serde_json::json!({
        "Depends": "R (>= 3.5), methods, foo (>= 1.0)"
    }));
    let version = normalize_cran_payload("demo", &fields, "1.0.0", false);

    assert_eq!(version.r_min.as_deref(), Some("3.5"));
    assert_eq!(version.dependencies.len(), 1);
    assert_eq!(version.dependencies[0].name, "foo");
    assert_eq!(version.dependencies[0].constraints[0].to_string(), ">=1.0");
    assert_eq!(version.repo, Source::Cran);
    assert_eq!(
        version.source_url.as_deref(),
        Some("https://cran.r-project.org/package=demo")
    );
}

#[test]
fn cran_metadata_fields_are_carried() {
    let fields = payload(serde_json::json!({
        "Imports": {"rlang": ">= 1.0"},
        "MD5sum": "abc123",
        "NeedsCompilation": "no",
        "Repository": "CRAN",
        "Date/Publication": "2024-01-01 10:00:00 UTC"
    }));
    let version = normalize_cran_payload("demo", &fields, "2.0", false);

    assert_eq!(version.metadata["MD5sum"], "abc123");
    assert_eq!(version.metadata["NeedsCompilation"], "no");
    assert_eq!(version.metadata["Repository"], "CRAN");
    assert_eq!(version.published.as_deref(), Some("2024-01-01 10:00:00 UTC"));
}

#[test]
fn suggests_only_appear_when_optional_deps_are_requested() {
    let fields = payload(serde_json::json!({
        "Imports": "rlang",
        "Suggests": "testthat (>= 3.0.0), knitr"
    }));

    let without = normalize_cran_payload("demo", &fields, "1.0", false);
    assert_eq!(without.dependencies.len(), 1);

    let with = normalize_cran_payload("demo", &fields, "1.0", true);
    let suggested: Vec<&str> = with
        .dependencies
        .iter()
        .filter(|dep| dep.optional)
        .map(|dep| dep.name.as_str())
        .collect();
    assert_eq!(suggested, vec!["testthat", "knitr"]);
    assert!(with
        .dependencies
        .iter()
        .filter(|dep| dep.optional)
        .all(|dep| dep.kind == DependencyKind::Suggests));
}

#[test]
fn multiple_r_entries_keep_the_maximum_lower_bound() {
    let fields = payload(serde_json::json!({
        "Depends": "R (>= 3.2)",
        "Imports": "R (>= 4.0), cli"
    }));
    let version = normalize_cran_payload("demo", &fields, "1.0", false);
    assert_eq!(version.r_min.as_deref(), Some("4.0"));
    // Upper bounds on R are discarded rather than stored.
    let fields = payload(serde_json::json!({"Depends": "R (< 4.0)"}));
    let version = normalize_cran_payload("demo", &fields, "1.0", false);
    assert_eq!(version.r_min, None);
}

#[test]
fn description_continuations_and_blank_lines() {
    let raw = "Package: PrettyName\nVersion: 1.2.0\nDepends:\n    R (>= 4.0),\n    rlang\nDescription: A tool\n  spanning lines\n\nStray: footer\n";
    let fields = parse_description(raw);
    assert_eq!(fields["Package"], "PrettyName");
    assert_eq!(fields["Depends"], "R (>= 4.0), rlang");
    assert_eq!(fields["Description"], "A tool spanning lines");
    assert_eq!(fields["Stray"], "footer");
}

fn descriptor(description: &str) -> GithubDescriptor {
    GithubDescriptor {
        owner: "user".to_string(),
        repo: "MyPkg".to_string(),
        commit: "abcdef1234567890".to_string(),
        git_ref: "main".to_string(),
        description: description.to_string(),
        commit_timestamp: Some("2024-03-01T12:00:00Z".to_string()),
        url: Some("https://github.com/user/MyPkg/commit/abcdef".to_string()),
    }
}

#[test]
fn github_description_yields_a_renamed_package() {
    let version = normalize_github_payload(
        &descriptor("Package: PrettyName\nVersion: 1.2.0\nImports: rlang (>= 1.0)\n"),
        false,
    )
    .expect("valid DESCRIPTION");

    assert_eq!(version.name, "PrettyName");
    assert_eq!(version.version, "1.2.0");
    assert_eq!(version.repo, Source::Github);
    assert_eq!(version.metadata["repo"], "user/MyPkg");
    assert_eq!(version.metadata["commit"], "abcdef1234567890");
    assert_eq!(version.metadata["ref"], "main");
}

#[test]
fn github_description_without_package_is_an_error() {
    assert!(normalize_github_payload(&descriptor("Version: 1.0\n"), false).is_err());
}

#[test]
fn github_version_defaults_when_missing() {
    let version =
        normalize_github_payload(&descriptor("Package: Bare\n"), false).expect("valid");
    assert_eq!(version.version, "0.0.0");
}

#[test]
fn bioconductor_payload_takes_version_and_category() {
    let fields = payload(serde_json::json!({
        "Version": "3.54.0",
        "Depends": "R (>= 4.2)",
        ".category": "bioc",
        "git_branch": "RELEASE_3_17",
        "git_url": "https://git.bioconductor.org/packages/limma"
    }));
    let version =
        normalize_bioc_payload("limma", &fields, "3.17", false).expect("valid payload");

    assert_eq!(version.version, "3.54.0");
    assert_eq!(version.r_min.as_deref(), Some("4.2"));
    assert_eq!(version.bioc_release.as_deref(), Some("3.17"));
    assert_eq!(
        version.source_url.as_deref(),
        Some("https://git.bioconductor.org/packages/limma")
    );
    assert_eq!(version.metadata["category"], "bioc");
}

#[test]
fn bioconductor_payload_falls_back_to_the_package_page() {
    let fields = payload(serde_json::json!({"Version": "1.0.0"}));
    let version = normalize_bioc_payload("edgeR", &fields, "3.17", false).expect("valid");
    assert_eq!(
        version.source_url.as_deref(),
        Some("https://bioconductor.org/packages/3.17/bioc/html/edgeR.html")
    );

    let missing = payload(serde_json::json!({"Depends": "R (>= 4.0)"}));
    assert!(normalize_bioc_payload("edgeR", &missing, "3.17", false).is_err());
}
