use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;

use crate::metadata::MetadataStore;
use crate::model::{Conflict, Plan, Report};
use crate::resolver::solver::{compute_resolution, TargetContext};
use crate::resolver::version::compare_versions;

/// Compute the minimal plan and, when an R lock is requested, the locked
/// plan as an independent second resolution.
pub fn build_report<M: MetadataStore>(
    metadata: &mut M,
    targets: &[TargetContext],
    include_optional: bool,
    prefer_bioc_release: Option<&str>,
    locked_r: Option<&str>,
) -> Report {
    let (minimal_plan, conflicts) =
        compute_resolution(metadata, targets, include_optional, prefer_bioc_release, None);

    let (locked_plan, locked_conflicts) = match locked_r {
        Some(locked) => compute_resolution(
            metadata,
            targets,
            include_optional,
            prefer_bioc_release,
            Some(locked),
        ),
        None => (None, Vec::new()),
    };

    Report {
        minimal_plan,
        locked_plan,
        conflicts,
        locked_conflicts,
        r_version_locked: locked_r.map(str::to_string),
    }
}

fn format_plan(plan: &Plan) -> Vec<String> {
    let mut lines = vec![format!("R {}", plan.r_version)];
    for (name, selection) in &plan.selections {
        let mut extras: Vec<String> = Vec::new();
        if let Some(release) = &selection.bioc_release {
            extras.push(format!("Bioconductor {release}"));
        }
        if let Some(r_min) = &selection.r_min {
            extras.push(format!("needs R>={r_min}"));
        }
        if let Some(url) = &selection.source_url {
            extras.push(url.clone());
        }
        let meta = if extras.is_empty() {
            String::new()
        } else {
            format!(" ({})", extras.join(", "))
        };
        lines.push(format!(
            "  - {name} {} [{}]{meta}",
            selection.version, selection.repo
        ));
    }
    lines
}

fn format_conflicts(conflicts: &[Conflict]) -> Vec<String> {
    let mut lines = Vec::new();
    for conflict in conflicts {
        let chain = conflict.required_by.join(" -> ");
        lines.push(format!(
            "  * {} (via {chain}): {}",
            conflict.package, conflict.message
        ));
        if !conflict.candidates.is_empty() {
            lines.push(format!("    candidates: {}", conflict.candidates.join(", ")));
        }
    }
    lines
}

/// Packages present in both plans where the locked plan had to settle for a
/// lower version. Returned as (package, minimal, locked).
pub fn compute_downgrades(minimal: &Plan, locked: &Plan) -> Vec<(String, String, String)> {
    let mut downgrades = Vec::new();
    for (package, desired) in &minimal.selections {
        let Some(locked_selection) = locked.selections.get(package) else {
            continue;
        };
        if compare_versions(&locked_selection.version, &desired.version)
            == std::cmp::Ordering::Less
        {
            downgrades.push((
                package.clone(),
                desired.version.clone(),
                locked_selection.version.clone(),
            ));
        }
    }
    downgrades
}

pub fn generate_text(report: &Report) -> String {
    let mut lines: Vec<String> = Vec::new();
    if let Some(minimal) = &report.minimal_plan {
        lines.push("Minimal feasible environment:".to_string());
        lines.extend(format_plan(minimal));
    } else {
        lines.push("Failed to determine a compatible environment.".to_string());
        if !report.conflicts.is_empty() {
            lines.push("Conflicts encountered while searching versions:".to_string());
            lines.extend(format_conflicts(&report.conflicts));
        }
    }

    if let Some(locked_r) = &report.r_version_locked {
        lines.push(String::new());
        lines.push(format!("When locking R to {locked_r}:"));
        if let Some(locked) = &report.locked_plan {
            lines.extend(format_plan(locked));
            if let Some(minimal) = &report.minimal_plan {
                let downgrades = compute_downgrades(minimal, locked);
                if !downgrades.is_empty() {
                    lines.push("  Downgrades required relative to minimal plan:".to_string());
                    for (package, desired, locked_version) in downgrades {
                        lines.push(format!("    - {package}: {desired} -> {locked_version}"));
                    }
                }
            }
        } else if !report.locked_conflicts.is_empty() {
            lines.push("  Conflicts:".to_string());
            lines.extend(format_conflicts(&report.locked_conflicts));
        } else {
            lines.push("  No solution found.".to_string());
        }
    }
    lines.join("\n")
}

#[derive(Serialize)]
struct SelectionDoc<'a> {
    version: &'a str,
    repo: &'static str,
    r_min: Option<&'a str>,
    bioc_release: Option<&'a str>,
    source_url: Option<&'a str>,
}

#[derive(Serialize)]
struct PlanDoc<'a> {
    r_version: &'a str,
    selections: BTreeMap<&'a str, SelectionDoc<'a>>,
    notes: &'a [String],
}

#[derive(Serialize)]
struct ReportDoc<'a> {
    minimal_plan: Option<PlanDoc<'a>>,
    locked_plan: Option<PlanDoc<'a>>,
    conflicts: &'a [Conflict],
    locked_conflicts: &'a [Conflict],
    r_version_locked: Option<&'a str>,
}

fn plan_doc(plan: &Plan) -> PlanDoc<'_> {
    let selections = plan
        .selections
        .iter()
        .map(|(name, selection)| {
            (
                name.as_str(),
                SelectionDoc {
                    version: &selection.version,
                    repo: selection.repo.repo_name(),
                    r_min: selection.r_min.as_deref(),
                    bioc_release: selection.bioc_release.as_deref(),
                    source_url: selection.source_url.as_deref(),
                },
            )
        })
        .collect();
    PlanDoc {
        r_version: &plan.r_version,
        selections,
        notes: &plan.notes,
    }
}

pub fn generate_json(report: &Report) -> Result<String> {
    let doc = ReportDoc {
        minimal_plan: report.minimal_plan.as_ref().map(plan_doc),
        locked_plan: report.locked_plan.as_ref().map(plan_doc),
        conflicts: &report.conflicts,
        locked_conflicts: &report.locked_conflicts,
        r_version_locked: report.r_version_locked.as_deref(),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}
