use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use anyhow::{bail, Result};

use crate::config::ProjectConfig;
use crate::constants::SUPPORTED_R_VERSIONS;
use crate::error::{MetadataFetchError, ResolutionError};
use crate::metadata::MetadataStore;
use crate::model::{Conflict, PackageVersion, Plan, Selection, Source};
use crate::resolver::version::{compare_versions, parse_constraint_list, satisfies_all, Constraint};

/// One user-declared target, fully prepared for solving: constraints parsed,
/// the Bioconductor release pinned, and GitHub slugs already resolved to the
/// package name declared in the repository's DESCRIPTION.
#[derive(Debug, Clone)]
pub struct TargetContext {
    pub identifier: String,
    pub package: String,
    pub source: Source,
    pub constraints: Vec<Constraint>,
    pub bioc_release: Option<String>,
    pub github_ref: Option<String>,
    pub github_token: Option<String>,
    pub github_slug: Option<String>,
}

#[derive(Debug, Clone)]
struct PackageRequest {
    package: String,
    source: Option<Source>,
    constraints: Vec<Constraint>,
    required_by: Vec<String>,
    bioc_release: Option<String>,
    github_ref: Option<String>,
    github_token: Option<String>,
    github_slug: Option<String>,
}

/// Mutable state of a single solve attempt under one candidate R version.
struct ResolutionState {
    candidate_r: String,
    assignments: BTreeMap<String, Selection>,
    constraints: BTreeMap<String, Vec<Constraint>>,
    visiting: BTreeSet<String>,
    /// Abandoned-candidate diagnostics, kept for debugging sessions.
    #[allow(dead_code)]
    failure_traces: Vec<Conflict>,
}

impl ResolutionState {
    fn new(candidate_r: &str) -> Self {
        Self {
            candidate_r: candidate_r.to_string(),
            assignments: BTreeMap::new(),
            constraints: BTreeMap::new(),
            visiting: BTreeSet::new(),
            failure_traces: Vec::new(),
        }
    }
}

/// Backtracking search over package-version assignments for one fixed R
/// version. Targets are processed in declaration order; within a package,
/// candidates are tried highest-version-first with the requested source
/// taking priority.
pub struct EnvironmentSolver<'a, M: MetadataStore> {
    metadata: &'a mut M,
    include_optional: bool,
    prefer_bioc_release: Option<String>,
}

impl<'a, M: MetadataStore> EnvironmentSolver<'a, M> {
    pub fn new(
        metadata: &'a mut M,
        include_optional: bool,
        prefer_bioc_release: Option<String>,
    ) -> Self {
        Self {
            metadata,
            include_optional,
            prefer_bioc_release,
        }
    }

    pub fn solve(
        &mut self,
        targets: &[TargetContext],
        candidate_r: &str,
    ) -> Result<Plan, ResolutionError> {
        let mut state = ResolutionState::new(candidate_r);
        for target in targets {
            let request = PackageRequest {
                package: target.package.clone(),
                source: Some(target.source),
                constraints: target.constraints.clone(),
                required_by: vec![target.identifier.clone()],
                bioc_release: target.bioc_release.clone(),
                github_ref: target.github_ref.clone(),
                github_token: target.github_token.clone(),
                github_slug: target.github_slug.clone(),
            };
            self.resolve_package(&request, &mut state)?;
        }
        Ok(Plan {
            r_version: candidate_r.to_string(),
            selections: state.assignments,
            notes: Vec::new(),
        })
    }

    fn resolve_package(
        &mut self,
        request: &PackageRequest,
        state: &mut ResolutionState,
    ) -> Result<Selection, ResolutionError> {
        let package = request.package.as_str();
        if state.visiting.contains(package) {
            // Cycle: reuse the binding made higher up the stack.
            if let Some(existing) = state.assignments.get(package) {
                return Ok(existing.clone());
            }
            return Err(ResolutionError::new(
                package,
                request.required_by.clone(),
                "Dependency cycle detected",
            ));
        }

        let mut aggregated = state.constraints.get(package).cloned().unwrap_or_default();
        aggregated.extend(request.constraints.iter().cloned());

        if let Some(existing) = state.assignments.get(package).cloned() {
            if !satisfies_all(&existing.version, &aggregated) {
                let new_constraints: Vec<String> =
                    request.constraints.iter().map(Constraint::to_string).collect();
                return Err(ResolutionError::new(
                    package,
                    request.required_by.clone(),
                    format!(
                        "Selected version {} does not satisfy new constraints [{}]",
                        existing.version,
                        new_constraints.join(", ")
                    ),
                )
                .with_candidates(vec![existing.version.clone()]));
            }
            if let Some(r_min) = &existing.r_min {
                if compare_versions(&state.candidate_r, r_min) == Ordering::Less {
                    return Err(ResolutionError::new(
                        package,
                        request.required_by.clone(),
                        format!("Selected version {} requires R>={r_min}", existing.version),
                    )
                    .with_candidates(vec![existing.version.clone()]));
                }
            }
            state.constraints.insert(package.to_string(), aggregated);
            return Ok(existing);
        }

        let candidates = self.candidate_versions(request, state, &aggregated);
        if candidates.is_empty() {
            return Err(ResolutionError::new(
                package,
                request.required_by.clone(),
                "No candidate versions satisfy constraints",
            )
            .with_candidates(vec!["(none)".to_string()]));
        }

        state.visiting.insert(package.to_string());
        let previous_constraints = state.constraints.get(package).cloned();
        let mut failures: Vec<ResolutionError> = Vec::new();
        for candidate in &candidates {
            let selection = Selection {
                package: candidate.name.clone(),
                version: candidate.version.clone(),
                repo: candidate.repo,
                source_url: candidate.source_url.clone(),
                dependencies: candidate.dependencies.clone(),
                r_min: candidate.r_min.clone(),
                bioc_release: candidate.bioc_release.clone(),
            };
            state.assignments.insert(package.to_string(), selection.clone());
            state.constraints.insert(package.to_string(), aggregated.clone());
            match self.resolve_dependencies(&selection, request, state) {
                Ok(()) => {
                    state.visiting.remove(package);
                    return Ok(selection);
                }
                Err(error) => {
                    state.failure_traces.push(Conflict {
                        package: error.package.clone(),
                        required_by: error.required_by.clone(),
                        message: error.message.clone(),
                        candidates: error.candidates.clone().unwrap_or_default(),
                    });
                    failures.push(error);
                    state.assignments.remove(package);
                }
            }
        }

        state.visiting.remove(package);
        match previous_constraints {
            Some(previous) if !previous.is_empty() => {
                state.constraints.insert(package.to_string(), previous);
            }
            _ => {
                state.constraints.remove(package);
            }
        }

        let tried: Vec<String> = candidates
            .iter()
            .map(|candidate| format!("{} {}", candidate.repo, candidate.version))
            .collect();
        let messages: BTreeSet<String> =
            failures.iter().map(|failure| failure.message.clone()).collect();
        let message = if messages.is_empty() {
            "Unresolvable dependency chain".to_string()
        } else {
            messages.into_iter().collect::<Vec<_>>().join(", ")
        };
        Err(
            ResolutionError::new(package, request.required_by.clone(), message)
                .with_candidates(tried),
        )
    }

    fn resolve_dependencies(
        &mut self,
        selection: &Selection,
        request: &PackageRequest,
        state: &mut ResolutionState,
    ) -> Result<(), ResolutionError> {
        for dependency in &selection.dependencies {
            if dependency.optional && !self.include_optional {
                continue;
            }
            let mut required_by = request.required_by.clone();
            required_by.push(selection.package.clone());
            let child = PackageRequest {
                package: dependency.name.clone(),
                source: self.infer_source(selection),
                constraints: dependency.constraints.clone(),
                required_by,
                bioc_release: self.infer_bioc_release(selection, request.bioc_release.as_deref()),
                github_ref: None,
                github_token: None,
                github_slug: None,
            };
            self.resolve_package(&child, state)?;
        }
        Ok(())
    }

    /// Bioconductor parents pull their dependencies from the same release;
    /// everything else leaves the source open, which falls back to CRAN
    /// first. GitHub parents intentionally do not propagate their source.
    fn infer_source(&self, parent: &Selection) -> Option<Source> {
        if parent.repo == Source::Bioc {
            Some(Source::Bioc)
        } else {
            None
        }
    }

    fn infer_bioc_release(
        &self,
        parent: &Selection,
        parent_release: Option<&str>,
    ) -> Option<String> {
        if parent.repo == Source::Bioc {
            parent
                .bioc_release
                .clone()
                .or_else(|| parent_release.map(str::to_string))
                .or_else(|| self.prefer_bioc_release.clone())
        } else {
            None
        }
    }

    fn candidate_versions(
        &mut self,
        request: &PackageRequest,
        state: &ResolutionState,
        constraints: &[Constraint],
    ) -> Vec<PackageVersion> {
        let mut source_order: Vec<Source> = Vec::new();
        if let Some(source) = request.source {
            source_order.push(source);
        }
        for fallback in [Source::Cran, Source::Bioc] {
            if !source_order.contains(&fallback) {
                source_order.push(fallback);
            }
        }

        let mut seen: BTreeSet<(Source, String)> = BTreeSet::new();
        let mut results: Vec<PackageVersion> = Vec::new();
        for &source in &source_order {
            let versions = match self.load_versions_for_source(request, source) {
                Ok(versions) => versions,
                // A source that cannot serve this package is skipped, not fatal.
                Err(_) => continue,
            };
            for version in versions {
                if let Some(r_min) = &version.r_min {
                    if compare_versions(&state.candidate_r, r_min) == Ordering::Less {
                        continue;
                    }
                }
                if !constraints.is_empty() && !satisfies_all(&version.version, constraints) {
                    continue;
                }
                if !seen.insert((version.repo, version.version.clone())) {
                    continue;
                }
                results.push(version);
            }
        }

        results.sort_by(|a, b| compare_versions(&b.version, &a.version));
        results.sort_by_key(|version| {
            source_order
                .iter()
                .position(|&source| source == version.repo)
                .unwrap_or(source_order.len())
        });
        results
    }

    fn load_versions_for_source(
        &mut self,
        request: &PackageRequest,
        source: Source,
    ) -> Result<Vec<PackageVersion>, MetadataFetchError> {
        match source {
            Source::Cran => self
                .metadata
                .get_versions(&request.package, Source::Cran, None, None, None),
            Source::Bioc => {
                let release = request
                    .bioc_release
                    .clone()
                    .or_else(|| self.prefer_bioc_release.clone())
                    .or_else(|| self.metadata.latest_bioconductor_release())
                    .ok_or_else(|| MetadataFetchError::new("No Bioconductor release available"))?;
                self.metadata
                    .get_versions(&request.package, Source::Bioc, Some(&release), None, None)
            }
            Source::Github => {
                let slug = request
                    .github_slug
                    .clone()
                    .unwrap_or_else(|| request.package.clone());
                self.metadata.get_versions(
                    &slug,
                    Source::Github,
                    None,
                    request.github_ref.as_deref(),
                    request.github_token.as_deref(),
                )
            }
        }
    }
}

/// Prepare targets for solving. GitHub targets are resolved eagerly so the
/// package name inside the repository's DESCRIPTION replaces the slug;
/// Bioconductor targets without a release inherit the preferred or latest
/// one. A fetch failure here is fatal, unlike during candidate enumeration.
pub fn build_target_contexts<M: MetadataStore>(
    config: &ProjectConfig,
    metadata: &mut M,
) -> Result<Vec<TargetContext>> {
    let mut contexts = Vec::new();
    for spec in &config.targets {
        let identifier = spec.alias.clone().unwrap_or_else(|| spec.package.clone());
        let constraints = spec
            .constraint
            .as_deref()
            .map(parse_constraint_list)
            .unwrap_or_default();
        let mut bioc_release = spec
            .bioc_release
            .clone()
            .or_else(|| config.options.prefer_bioc_release.clone());
        let github_token = spec
            .github_token
            .clone()
            .or_else(|| config.options.github_token.clone());
        let github_ref = spec.github_ref.clone();
        let mut github_slug = None;
        let mut package_name = spec.package.clone();

        if spec.source == Source::Bioc && bioc_release.is_none() {
            bioc_release = metadata.latest_bioconductor_release();
        }
        if spec.source == Source::Github {
            let Some((owner, repo)) = package_name.split_once('/') else {
                bail!("GitHub target must use owner/repo format");
            };
            let resolved = metadata.get_github_version(
                owner,
                repo,
                github_ref.as_deref(),
                github_token.as_deref(),
            )?;
            github_slug = Some(package_name.clone());
            package_name = resolved.name;
        }

        contexts.push(TargetContext {
            identifier,
            package: package_name,
            source: spec.source,
            constraints,
            bioc_release,
            github_ref,
            github_token,
            github_slug,
        });
    }
    Ok(contexts)
}

/// Pin each Bioconductor target to a release and collect the R series those
/// releases demand. Targets without an explicit release are pinned here.
fn bioc_release_requirements<M: MetadataStore>(
    targets: &mut [TargetContext],
    metadata: &mut M,
    default_release: Option<&str>,
) -> BTreeMap<String, String> {
    let mut requirements = BTreeMap::new();
    for target in targets.iter_mut() {
        if target.source != Source::Bioc {
            continue;
        }
        let release = target
            .bioc_release
            .clone()
            .or_else(|| default_release.map(str::to_string))
            .or_else(|| metadata.latest_bioconductor_release());
        let Some(release) = release else {
            continue;
        };
        if let Some(required_r) = metadata.bioconductor_r_version(&release) {
            requirements.insert(release.clone(), required_r);
            target.bioc_release = Some(release);
        }
    }
    requirements
}

fn push_unique(candidates: &mut Vec<String>, version: &str) {
    let duplicate = candidates
        .iter()
        .any(|existing| compare_versions(existing, version) == Ordering::Equal);
    if !duplicate {
        candidates.push(version.to_string());
    }
}

fn record_conflict(conflicts: &mut Vec<Conflict>, error: ResolutionError) {
    let conflict = Conflict {
        package: error.package,
        required_by: error.required_by,
        message: error.message,
        candidates: error.candidates.unwrap_or_default(),
    };
    // The same dead end recurs across R candidates; keep one record of it.
    if !conflicts.contains(&conflict) {
        conflicts.push(conflict);
    }
}

/// Search over R versions. With `locked_r` only that version is attempted;
/// otherwise candidates ascend through the supported list united with every
/// R series the referenced Bioconductor releases demand, and the first R
/// that admits a full assignment wins.
pub fn compute_resolution<M: MetadataStore>(
    metadata: &mut M,
    targets: &[TargetContext],
    include_optional: bool,
    prefer_bioc_release: Option<&str>,
    locked_r: Option<&str>,
) -> (Option<Plan>, Vec<Conflict>) {
    let mut targets: Vec<TargetContext> = targets.to_vec();
    let default_release = prefer_bioc_release
        .map(str::to_string)
        .or_else(|| metadata.latest_bioconductor_release());
    let release_requirements =
        bioc_release_requirements(&mut targets, metadata, default_release.as_deref());

    let mut conflicts: Vec<Conflict> = Vec::new();
    let mut solver = EnvironmentSolver::new(
        metadata,
        include_optional,
        prefer_bioc_release.map(str::to_string),
    );

    if let Some(locked) = locked_r {
        return match solver.solve(&targets, locked) {
            Ok(plan) => (Some(plan), conflicts),
            Err(error) => {
                record_conflict(&mut conflicts, error);
                (None, conflicts)
            }
        };
    }

    let mut candidates: Vec<String> = Vec::new();
    for version in SUPPORTED_R_VERSIONS {
        push_unique(&mut candidates, version);
    }
    for required in release_requirements.values() {
        push_unique(&mut candidates, required);
    }
    candidates.sort_by(|a, b| compare_versions(a, b));

    for candidate in &candidates {
        let incompatible = release_requirements
            .values()
            .any(|required| compare_versions(candidate, required) == Ordering::Less);
        if incompatible {
            continue;
        }
        match solver.solve(&targets, candidate) {
            Ok(plan) => return (Some(plan), conflicts),
            Err(error) => record_conflict(&mut conflicts, error),
        }
    }
    (None, conflicts)
}
