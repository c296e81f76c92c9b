use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::constants::is_base_package;
use crate::error::MetadataFetchError;
use crate::metadata::fetchers::GithubDescriptor;
use crate::model::{Dependency, DependencyKind, PackageVersion, Source};
use crate::resolver::version::{compare_versions, parse_constraint_list, Constraint, ConstraintOp};

static DEP_ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9._]+)(?:\s*\(([^)]+)\))?$").expect("valid regex"));

/// Parse DESCRIPTION-style header text into a field map.
///
/// Non-indented lines containing `:` start a new field; indented lines and
/// lines without a colon continue the current field, joined with single
/// spaces. A blank line terminates the field in progress.
pub fn parse_description(raw: &str) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    let mut current_key: Option<String> = None;
    let mut current_value: Vec<String> = Vec::new();

    for line in raw.lines() {
        if line.trim().is_empty() {
            flush_field(&mut fields, &mut current_key, &mut current_value);
            continue;
        }
        if !line.starts_with(' ') {
            if let Some((key, value)) = line.split_once(':') {
                flush_field(&mut fields, &mut current_key, &mut current_value);
                current_key = Some(key.trim().to_string());
                current_value.push(value.trim().to_string());
                continue;
            }
        }
        current_value.push(line.to_string());
    }
    flush_field(&mut fields, &mut current_key, &mut current_value);
    fields
}

fn flush_field(
    fields: &mut BTreeMap<String, String>,
    current_key: &mut Option<String>,
    current_value: &mut Vec<String>,
) {
    if let Some(key) = current_key.take() {
        let joined = current_value
            .iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        fields.insert(key, joined);
    }
    current_value.clear();
}

/// Split one `name (constraints)` entry. Entries the grammar does not cover
/// become a bare dependency with no constraints; upstream metadata is too
/// messy to reject outright.
fn parse_dependency_entry(entry: &str) -> (String, Vec<Constraint>) {
    let entry = entry.trim();
    match DEP_ENTRY_RE.captures(entry) {
        Some(caps) => {
            let name = caps[1].to_string();
            let constraints = caps
                .get(2)
                .map(|m| parse_constraint_list(m.as_str()))
                .unwrap_or_default();
            (name, constraints)
        }
        None => (entry.to_string(), Vec::new()),
    }
}

/// A dependency section may arrive as a mapping (crandb), a comma-separated
/// string (DESCRIPTION), or a list.
fn parse_dep_section(section: &Value) -> Vec<(String, Vec<Constraint>)> {
    match section {
        Value::Object(entries) => entries
            .iter()
            .map(|(name, spec)| {
                let spec = match spec {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                (name.clone(), parse_constraint_list(&spec))
            })
            .collect(),
        Value::String(raw) => raw.split(',').map(parse_dependency_entry).collect(),
        Value::Array(entries) => entries
            .iter()
            .map(|entry| {
                let text = match entry {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                parse_dependency_entry(&text)
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Build the dependency list for one payload and lift the R requirement out
/// of it. Returns the non-R, non-base dependencies plus the strongest
/// `>=`/`>` bound seen on `R` itself.
pub fn build_dependencies(
    payload: &Map<String, Value>,
    include_optional: bool,
) -> (Vec<Dependency>, Option<String>) {
    let sections = [
        ("Depends", DependencyKind::Depends, false),
        ("Imports", DependencyKind::Imports, false),
        ("LinkingTo", DependencyKind::LinkingTo, false),
        ("Suggests", DependencyKind::Suggests, true),
    ];
    let mut dependencies = Vec::new();
    for (field, kind, optional) in sections {
        if optional && !include_optional {
            continue;
        }
        let Some(section) = payload.get(field) else {
            continue;
        };
        for (name, constraints) in parse_dep_section(section) {
            dependencies.push(Dependency {
                name,
                constraints,
                kind,
                optional,
            });
        }
    }
    let r_min = split_r_requirement(&mut dependencies);
    dependencies.retain(|dep| !is_base_package(&dep.name));
    (dependencies, r_min)
}

fn split_r_requirement(dependencies: &mut Vec<Dependency>) -> Option<String> {
    let mut r_min: Option<String> = None;
    dependencies.retain(|dep| {
        if !dep.name.eq_ignore_ascii_case("R") {
            return true;
        }
        for constraint in &dep.constraints {
            if !matches!(
                constraint.op,
                ConstraintOp::GreaterOrEqual | ConstraintOp::Greater
            ) {
                continue;
            }
            let stronger = match &r_min {
                Some(current) => {
                    compare_versions(&constraint.version, current) == Ordering::Greater
                }
                None => true,
            };
            if stronger {
                r_min = Some(constraint.version.clone());
            }
        }
        false
    });
    r_min
}

fn string_field(payload: &Map<String, Value>, field: &str) -> Option<String> {
    payload.get(field).and_then(Value::as_str).map(str::to_string)
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Normalize one crandb version payload.
pub fn normalize_cran_payload(
    package: &str,
    payload: &Map<String, Value>,
    version: &str,
    include_optional: bool,
) -> PackageVersion {
    let (dependencies, r_min) = build_dependencies(payload, include_optional);
    let mut metadata = BTreeMap::new();
    for field in ["MD5sum", "NeedsCompilation", "Repository"] {
        if let Some(value) = payload.get(field) {
            metadata.insert(field.to_string(), stringify(value));
        }
    }
    PackageVersion {
        name: package.to_string(),
        version: version.to_string(),
        repo: Source::Cran,
        r_min,
        dependencies,
        bioc_release: None,
        source_url: Some(format!("https://cran.r-project.org/package={package}")),
        published: string_field(payload, "Date/Publication"),
        metadata,
    }
}

/// Normalize one package payload from a Bioconductor release listing.
pub fn normalize_bioc_payload(
    package: &str,
    payload: &Map<String, Value>,
    release: &str,
    include_optional: bool,
) -> Result<PackageVersion, MetadataFetchError> {
    let (dependencies, r_min) = build_dependencies(payload, include_optional);
    let version = string_field(payload, "Version").ok_or_else(|| {
        MetadataFetchError::new(format!(
            "Failed to normalize Bioconductor metadata for {package}@{release}"
        ))
    })?;
    let source_url = string_field(payload, "git_url").unwrap_or_else(|| {
        format!("https://bioconductor.org/packages/{release}/bioc/html/{package}.html")
    });
    let published =
        string_field(payload, "Date/Publication").or_else(|| string_field(payload, "git_last_commit_date"));
    let mut metadata = BTreeMap::new();
    metadata.insert(
        "category".to_string(),
        string_field(payload, ".category").unwrap_or_else(|| "bioc".to_string()),
    );
    metadata.insert(
        "git_branch".to_string(),
        string_field(payload, "git_branch").unwrap_or_default(),
    );
    Ok(PackageVersion {
        name: package.to_string(),
        version,
        repo: Source::Bioc,
        r_min,
        dependencies,
        bioc_release: Some(release.to_string()),
        source_url: Some(source_url),
        published,
        metadata,
    })
}

/// Normalize a GitHub checkout from its DESCRIPTION file. `Package` is the
/// only mandatory field; a missing `Version` falls back to `0.0.0`, which is
/// what an untagged development checkout effectively is.
pub fn normalize_github_payload(
    descriptor: &GithubDescriptor,
    include_optional: bool,
) -> Result<PackageVersion, MetadataFetchError> {
    let fields = parse_description(&descriptor.description);
    let package = fields
        .get("Package")
        .filter(|name| !name.is_empty())
        .cloned()
        .ok_or_else(|| MetadataFetchError::new("GitHub DESCRIPTION missing Package field"))?;
    let version = fields
        .get("Version")
        .filter(|version| !version.is_empty())
        .cloned()
        .unwrap_or_else(|| "0.0.0".to_string());

    let payload: Map<String, Value> = fields
        .iter()
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect();
    let (dependencies, r_min) = build_dependencies(&payload, include_optional);

    let mut metadata = BTreeMap::new();
    metadata.insert("commit".to_string(), descriptor.commit.clone());
    metadata.insert(
        "repo".to_string(),
        format!("{}/{}", descriptor.owner, descriptor.repo),
    );
    metadata.insert("ref".to_string(), descriptor.git_ref.clone());

    Ok(PackageVersion {
        name: package,
        version,
        repo: Source::Github,
        r_min,
        dependencies,
        bioc_release: None,
        source_url: descriptor.url.clone(),
        published: descriptor.commit_timestamp.clone(),
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuation_lines_join_with_single_spaces() {
        let raw = "Package: demo\nDescription: first line\n  second line\n\tthird line\nSuggests: testthat\n";
        let fields = parse_description(raw);
        assert_eq!(fields["Package"], "demo");
        assert_eq!(fields["Description"], "first line second line third line");
        assert_eq!(fields["Suggests"], "testthat");
    }

    #[test]
    fn blank_line_terminates_the_current_field() {
        let raw = "Title: something\n\norphan continuation\nVersion: 1.0\n";
        let fields = parse_description(raw);
        assert_eq!(fields["Title"], "something");
        assert_eq!(fields["Version"], "1.0");
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn dependency_entries_split_name_and_constraints() {
        let (name, constraints) = parse_dependency_entry("rlang (>= 1.0.0)");
        assert_eq!(name, "rlang");
        assert_eq!(constraints.len(), 1);

        let (name, constraints) = parse_dependency_entry("methods");
        assert_eq!(name, "methods");
        assert!(constraints.is_empty());

        // Unparseable entries keep their raw text and drop the constraint.
        let (name, constraints) = parse_dependency_entry("weird entry !!");
        assert_eq!(name, "weird entry !!");
        assert!(constraints.is_empty());
    }

    #[test]
    fn r_requirement_keeps_the_strongest_lower_bound() {
        let payload: Map<String, Value> = serde_json::from_value(serde_json::json!({
            "Depends": "R (>= 3.2), R (>= 3.5), utils",
            "Imports": {"R": "<= 4.0", "rlang": ">= 1.0"}
        }))
        .expect("payload is an object");
        let (deps, r_min) = build_dependencies(&payload, false);
        assert_eq!(r_min.as_deref(), Some("3.5"));
        let names: Vec<&str> = deps.iter().map(|dep| dep.name.as_str()).collect();
        assert_eq!(names, vec!["rlang"]);
    }
}
