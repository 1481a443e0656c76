//! Root log command: extract build dependencies

use super::OutputFormat;
use convenient_content::entity::BuildrootPkgRelation;
use convenient_rootlog::{RootLogExtraction, RootLogExtractor};
use std::path::Path;

/// Relation document target: source package, view and architecture
pub struct RelationTarget<'a> {
    pub srpm: &'a str,
    pub view: &'a str,
    pub arch: &'a str,
}

/// Execute the root-log command
pub fn execute(
    file: &Path,
    relation: Option<RelationTarget<'_>>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = std::fs::read(file)?;
    let text = std::str::from_utf8(&bytes)
        .map_err(convenient_rootlog::LogFormatError::from)?;

    tracing::info!("Extracting build dependencies from {}", file.display());
    let extraction = RootLogExtractor::default().extract(text);
    if extraction.truncated {
        tracing::warn!("{} ends inside a transaction, result may be partial", file.display());
    }

    if let Some(target) = relation {
        let document = BuildrootPkgRelation::from_build_deps(
            target.view,
            target.arch,
            target.srpm,
            &extraction.deps,
        )
        .to_document();
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(extraction.deps.as_slice())?),
        OutputFormat::Text => print_text(file, &extraction),
    }
    Ok(())
}

fn print_text(file: &Path, extraction: &RootLogExtraction) {
    println!("🔍 Build dependencies in {}", file.display());
    let dialects: Vec<String> = extraction.sections.iter().map(ToString::to_string).collect();
    if dialects.is_empty() {
        println!("  No builddep transaction found");
        return;
    }
    println!("  Transactions: {}", dialects.join(", "));
    if extraction.skipped_lines > 0 {
        println!("  Skipped lines: {}", extraction.skipped_lines);
    }
    println!();
    for dep in &extraction.deps {
        println!("  {dep}");
    }
    println!();
    println!("  ✓ {} packages", extraction.deps.len());
}
