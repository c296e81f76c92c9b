use anyhow::Result;

use crate::cli::{OutputFormat, SolveArgs};
use crate::config::load_config;
use crate::metadata::MetadataProvider;
use crate::report::{build_report, generate_json, generate_text};
use crate::resolver::solver::build_target_contexts;

/// Resolve a project config and print the report.
pub fn run(args: &SolveArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let include_optional = args.include_optional || config.options.include_optional;
    let prefer_bioc = args
        .prefer_bioc
        .clone()
        .or_else(|| config.options.prefer_bioc_release.clone());
    let locked_r = args
        .lock_r
        .clone()
        .or_else(|| config.options.current_r.clone());

    let mut metadata = MetadataProvider::with_options(&args.cache_root, include_optional)?;
    let contexts = build_target_contexts(&config, &mut metadata)?;
    log::info!(
        "resolving {} targets for project {}",
        contexts.len(),
        config.name
    );

    let report = build_report(
        &mut metadata,
        &contexts,
        include_optional,
        prefer_bioc.as_deref(),
        locked_r.as_deref(),
    );

    let output = match args.format {
        OutputFormat::Json => generate_json(&report)?,
        OutputFormat::Text => generate_text(&report),
    };
    println!("{output}");
    Ok(())
}
