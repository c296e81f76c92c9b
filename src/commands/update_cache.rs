use anyhow::Result;

use crate::cli::UpdateCacheArgs;
use crate::config::load_config;
use crate::metadata::{MetadataProvider, MetadataStore};
use crate::model::Source;
use crate::resolver::solver::build_target_contexts;

/// Prime the on-disk metadata cache. Explicitly requested packages and
/// releases fail loudly; targets pulled in from a config file are
/// best-effort, matching the partial-failure rules of candidate loading.
pub fn run(args: &UpdateCacheArgs) -> Result<()> {
    let mut metadata = MetadataProvider::new(&args.cache_root)?;
    let mut processed: Vec<String> = Vec::new();

    for package in &args.package {
        metadata.get_cran_versions(package)?;
        processed.push(format!("CRAN:{package}"));
    }
    for release in &args.bioc_release {
        metadata.prime_bioconductor_release(release)?;
        processed.push(format!("Bioconductor release {release}"));
    }

    if let Some(config_path) = &args.config {
        let config = load_config(config_path)?;
        let contexts = build_target_contexts(&config, &mut metadata)?;
        for context in &contexts {
            match context.source {
                Source::Cran => {
                    metadata.get_cran_versions(&context.package)?;
                }
                Source::Bioc => {
                    let release = context
                        .bioc_release
                        .clone()
                        .or_else(|| metadata.latest_bioconductor_release());
                    if let Some(release) = release {
                        if let Err(err) =
                            metadata.get_bioconductor_versions(&context.package, &release)
                        {
                            log::warn!("skipping {}: {err}", context.package);
                        }
                    }
                }
                Source::Github => {
                    let slug = context
                        .github_slug
                        .clone()
                        .unwrap_or_else(|| context.package.clone());
                    if let Err(err) = metadata.get_versions(
                        &slug,
                        Source::Github,
                        None,
                        context.github_ref.as_deref(),
                        context.github_token.as_deref(),
                    ) {
                        log::warn!("skipping {slug}: {err}");
                    }
                }
            }
        }
        let label = config_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| config_path.display().to_string());
        processed.push(format!("config:{label}"));
    }

    if processed.is_empty() {
        println!("No cache entries updated.");
    } else {
        println!("Primed cache entries:");
        for item in &processed {
            println!("  - {item}");
        }
    }
    Ok(())
}
