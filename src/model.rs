use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::resolver::version::Constraint;

/// Where a package version can come from. `bioc` and `bioconductor` parse to
/// the same variant, so the two spellings are interchangeable everywhere a
/// source can be named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Source {
    Cran,
    Bioc,
    Github,
}

impl Source {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "cran" => Some(Self::Cran),
            "bioc" | "bioconductor" => Some(Self::Bioc),
            "github" => Some(Self::Github),
            _ => None,
        }
    }

    /// Repository name as shown in plans and conflict traces.
    pub fn repo_name(&self) -> &'static str {
        match self {
            Self::Cran => "CRAN",
            Self::Bioc => "Bioconductor",
            Self::Github => "GitHub",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repo_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    Depends,
    Imports,
    LinkingTo,
    Suggests,
}

/// One dependency edge as declared in package metadata. `Suggests` entries
/// are marked optional and only followed when the solver is asked to.
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    pub name: String,
    pub constraints: Vec<Constraint>,
    pub kind: DependencyKind,
    pub optional: bool,
}

/// Canonical record for one published version of one package, normalized
/// from whichever repository served it. The pseudo-package `R` never appears
/// in `dependencies`; its requirement is lifted into `r_min`. Base R
/// packages are filtered out as well.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageVersion {
    pub name: String,
    pub version: String,
    pub repo: Source,
    pub r_min: Option<String>,
    pub dependencies: Vec<Dependency>,
    pub bioc_release: Option<String>,
    pub source_url: Option<String>,
    pub published: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

/// A package version the solver has bound for a specific name, carrying the
/// dependency edges it will be explored through.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub package: String,
    pub version: String,
    pub repo: Source,
    pub source_url: Option<String>,
    pub dependencies: Vec<Dependency>,
    pub r_min: Option<String>,
    pub bioc_release: Option<String>,
}

/// A complete assignment: one R version plus a selection for every
/// transitively required package.
#[derive(Debug, Clone)]
pub struct Plan {
    pub r_version: String,
    pub selections: BTreeMap<String, Selection>,
    pub notes: Vec<String>,
}

/// Frozen diagnostic describing why one resolution attempt failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conflict {
    pub package: String,
    pub required_by: Vec<String>,
    pub message: String,
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub minimal_plan: Option<Plan>,
    pub locked_plan: Option<Plan>,
    pub conflicts: Vec<Conflict>,
    pub locked_conflicts: Vec<Conflict>,
    pub r_version_locked: Option<String>,
}
