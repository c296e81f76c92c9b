use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::model::Source;

/// Project-wide options, all optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolverOptions {
    pub current_r: Option<String>,
    pub prefer_bioc_release: Option<String>,
    #[serde(default)]
    pub include_optional: bool,
    pub github_token: Option<String>,
}

/// One resolved target entry from the configuration file.
#[derive(Debug, Clone)]
pub struct TargetSpec {
    pub package: String,
    pub source: Source,
    pub constraint: Option<String>,
    pub alias: Option<String>,
    pub bioc_release: Option<String>,
    pub github_ref: Option<String>,
    pub github_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub name: String,
    pub targets: Vec<TargetSpec>,
    pub options: ResolverOptions,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawProject {
    Name(String),
    Table { name: Option<String> },
}

#[derive(Debug, Deserialize)]
struct RawTarget {
    package: Option<String>,
    name: Option<String>,
    source: Option<String>,
    constraint: Option<String>,
    version: Option<String>,
    alias: Option<String>,
    id: Option<String>,
    bioc_release: Option<String>,
    #[serde(rename = "ref")]
    git_ref: Option<String>,
    github_ref: Option<String>,
    github_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    project: Option<RawProject>,
    options: Option<ResolverOptions>,
    targets: Option<Vec<RawTarget>>,
}

/// Load a project configuration. The project name falls back to the config
/// file's stem when the file does not declare one.
pub fn load_config(path: &Path) -> Result<ProjectConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_config(&text, path)
}

fn parse_config(text: &str, path: &Path) -> Result<ProjectConfig> {
    let value: serde_yaml::Value = serde_yaml::from_str(text)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    if !value.is_mapping() {
        bail!("Configuration root must be a mapping");
    }
    let raw: RawConfig = serde_yaml::from_value(value)
        .with_context(|| format!("invalid configuration in {}", path.display()))?;

    let name = match raw.project {
        Some(RawProject::Name(name)) if !name.is_empty() => name,
        Some(RawProject::Table { name: Some(name) }) if !name.is_empty() => name,
        _ => path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("project")
            .to_string(),
    };

    let options = raw.options.unwrap_or_default();

    let Some(raw_targets) = raw.targets else {
        bail!("Configuration must include a non-empty 'targets' list");
    };
    if raw_targets.is_empty() {
        bail!("Configuration must include a non-empty 'targets' list");
    }
    let targets = raw_targets
        .into_iter()
        .map(|entry| normalize_target(entry, &options))
        .collect::<Result<Vec<_>>>()?;

    Ok(ProjectConfig {
        name,
        targets,
        options,
    })
}

fn normalize_target(entry: RawTarget, options: &ResolverOptions) -> Result<TargetSpec> {
    let Some(package) = entry.package.or(entry.name) else {
        bail!("Target entry missing 'package'");
    };
    let source_text = entry.source.unwrap_or_else(|| "cran".to_string());
    let Some(source) = Source::parse(&source_text) else {
        bail!("Unsupported source '{source_text}' for target {package}");
    };
    Ok(TargetSpec {
        package,
        source,
        constraint: entry.constraint.or(entry.version),
        alias: entry.alias.or(entry.id),
        bioc_release: entry.bioc_release,
        github_ref: entry.git_ref.or(entry.github_ref),
        github_token: entry.github_token.or_else(|| options.github_token.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(text: &str) -> Result<ProjectConfig> {
        parse_config(text, &PathBuf::from("analysis.yaml"))
    }

    #[test]
    fn minimal_config_defaults() {
        let config = parse("targets:\n  - package: dplyr\n").expect("valid config");
        assert_eq!(config.name, "analysis");
        assert_eq!(config.targets.len(), 1);
        assert_eq!(config.targets[0].source, Source::Cran);
    }

    #[test]
    fn project_may_be_string_or_mapping() {
        let config = parse("project: demo\ntargets:\n  - package: rlang\n").expect("valid");
        assert_eq!(config.name, "demo");
        let config =
            parse("project:\n  name: nested\ntargets:\n  - package: rlang\n").expect("valid");
        assert_eq!(config.name, "nested");
    }

    #[test]
    fn name_and_version_are_accepted_aliases() {
        let config =
            parse("targets:\n  - name: limma\n    source: bioconductor\n    version: '>= 3.0'\n")
                .expect("valid");
        assert_eq!(config.targets[0].package, "limma");
        assert_eq!(config.targets[0].source, Source::Bioc);
        assert_eq!(config.targets[0].constraint.as_deref(), Some(">= 3.0"));
    }

    #[test]
    fn empty_targets_are_rejected() {
        assert!(parse("targets: []\n").is_err());
        assert!(parse("project: demo\n").is_err());
        assert!(parse("- not\n- a\n- mapping\n").is_err());
    }

    #[test]
    fn target_without_package_is_rejected() {
        assert!(parse("targets:\n  - source: cran\n").is_err());
    }

    #[test]
    fn global_github_token_flows_into_targets() {
        let config = parse(
            "options:\n  github_token: secret\ntargets:\n  - package: tidyverse/dplyr\n    source: github\n",
        )
        .expect("valid");
        assert_eq!(config.targets[0].github_token.as_deref(), Some("secret"));
    }
}
