//! Simple analysis example: analyze a build document and print the results.
//! Run with: cargo run --example simple_analysis [catalog.json] [build.json]

use rigguard::prelude::*;
use std::path::Path;

fn main() -> Result<(), RigGuardError> {
    let mut args = std::env::args().skip(1);
    let catalog = args
        .next()
        .unwrap_or_else(|| "tests/fixtures/catalog.json".to_string());
    let build = args
        .next()
        .unwrap_or_else(|| "tests/fixtures/builds/socket_mismatch.json".to_string());
    let (catalog, build) = (Path::new(&catalog), Path::new(&build));

    if !catalog.exists() || !build.exists() {
        eprintln!("Usage: cargo run --example simple_analysis [catalog.json] [build.json]");
        std::process::exit(1);
    }

    let core = RigGuardCore::from_files(catalog, None, None)?;
    let configuration = core.load_configuration(build)?;
    let result = core.analyze_configuration(&configuration, AnalysisOptions::final_build())?;

    println!("Analysis of: {}", configuration.name);
    println!("Status: {} (score {})", result.overall_status, result.compatibility_score);
    println!("{}", result.status_message);
    println!();

    for issue in result.issues() {
        println!("  [{:?}] {}", issue.issue_type, issue.title);
        println!("    {}", issue.description);
        if let Some(ref fix) = issue.recommendation {
            println!("    Fix: {}", fix);
        }
    }

    if !result.compatible {
        println!("\nBuild is not compatible.");
        std::process::exit(1);
    }

    println!("\nBuild is compatible.");
    Ok(())
}
