#![allow(dead_code)]

use std::collections::BTreeMap;

use rondo::model::{Dependency, DependencyKind, PackageVersion, Source};
use rondo::resolver::version::parse_constraint_list;

/// Build a dependency edge from a `name` and a constraint expression
/// (empty string for unconstrained).
pub fn dep(name: &str, constraints: &str) -> Dependency {
    Dependency {
        name: name.to_string(),
        constraints: parse_constraint_list(constraints),
        kind: DependencyKind::Imports,
        optional: false,
    }
}

pub fn suggests(name: &str) -> Dependency {
    Dependency {
        name: name.to_string(),
        constraints: Vec::new(),
        kind: DependencyKind::Suggests,
        optional: true,
    }
}

fn package(
    name: &str,
    version: &str,
    repo: Source,
    r_min: Option<&str>,
    dependencies: Vec<Dependency>,
) -> PackageVersion {
    PackageVersion {
        name: name.to_string(),
        version: version.to_string(),
        repo,
        r_min: r_min.map(str::to_string),
        dependencies,
        bioc_release: None,
        source_url: None,
        published: None,
        metadata: BTreeMap::new(),
    }
}

pub fn cran(
    name: &str,
    version: &str,
    r_min: Option<&str>,
    dependencies: Vec<Dependency>,
) -> PackageVersion {
    package(name, version, Source::Cran, r_min, dependencies)
}

pub fn bioc(
    name: &str,
    version: &str,
    release: &str,
    r_min: Option<&str>,
    dependencies: Vec<Dependency>,
) -> PackageVersion {
    let mut version = package(name, version, Source::Bioc, r_min, dependencies);
    version.bioc_release = Some(release.to_string());
    version
}

pub fn github(
    name: &str,
    version: &str,
    r_min: Option<&str>,
    dependencies: Vec<Dependency>,
) -> PackageVersion {
    package(name, version, Source::Github, r_min, dependencies)
}
