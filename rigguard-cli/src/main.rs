//! RigGuard CLI - PC build compatibility checks from the command line.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rigguard::analyzer::AnalysisReport;
use rigguard::{
    AnalysisOptions, ComponentId, ComponentType, CompatibilityAnalysisResult, CompatibilityIssue,
    EngineConfig, IssueType, PcConfiguration, PowerReport, RigGuardCore, RuleSet,
};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rigguard")]
#[command(about = "PC build compatibility checker", long_about = None)]
#[command(version)]
struct Cli {
    /// Component catalog (JSON)
    #[arg(long, global = true, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Rule file (JSON); the built-in rules are used when omitted
    #[arg(long, global = true, value_name = "FILE")]
    rules: Option<PathBuf>,

    /// Engine configuration (JSON)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a build document
    Analyze {
        /// Build file: {"name": "...", "components": [{"id": 1, "quantity": 1}]}
        #[arg(value_name = "BUILD")]
        build: PathBuf,

        /// Treat the build as work in progress (missing parts are warnings)
        #[arg(long)]
        partial: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Exit with error code if issues found at this level or higher
        #[arg(long, value_enum)]
        fail_on: Option<FailOn>,

        /// Also list rules that could not be evaluated
        #[arg(long)]
        diagnostics: bool,
    },

    /// Check two catalog components against each other
    Pair {
        #[arg(value_name = "ID")]
        first: u64,
        #[arg(value_name = "ID")]
        second: u64,
    },

    /// List catalog components compatible with a given one
    Compatible {
        #[arg(value_name = "ID")]
        id: u64,

        /// Component type to search, e.g. MOTHERBOARD or psu
        #[arg(short = 't', long = "type", value_parser = parse_component_type)]
        target_type: ComponentType,
    },

    /// Show the power budget of a build document
    Power {
        #[arg(value_name = "BUILD")]
        build: PathBuf,
    },

    /// List the loaded compatibility rules
    Rules {
        /// Show descriptions and rejected records
        #[arg(long)]
        detailed: bool,

        /// Only rules involving this component type
        #[arg(short = 't', long = "type", value_parser = parse_component_type)]
        component_type: Option<ComponentType>,

        /// Report duplicate and contradictory rules
        #[arg(long)]
        conflicts: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for scripts
    Json,
    /// GitHub Actions annotations
    Github,
}

#[derive(Clone, Copy, ValueEnum)]
enum FailOn {
    Critical,
    Warning,
    Recommendation,
}

fn parse_component_type(raw: &str) -> Result<ComponentType, String> {
    raw.parse::<ComponentType>().map_err(|e| e.to_string())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };

    process::exit(exit_code);
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<i32> {
    match &cli.command {
        Commands::Analyze {
            build,
            partial,
            format,
            fail_on,
            diagnostics,
        } => {
            let core = load_core(cli)?;
            handle_analyze(&core, build, *partial, *format, *fail_on, *diagnostics)
        }
        Commands::Pair { first, second } => {
            let core = load_core(cli)?;
            handle_pair(&core, ComponentId(*first), ComponentId(*second))
        }
        Commands::Compatible { id, target_type } => {
            let core = load_core(cli)?;
            handle_compatible(&core, ComponentId(*id), *target_type)
        }
        Commands::Power { build } => {
            let core = load_core(cli)?;
            handle_power(&core, build)
        }
        Commands::Rules {
            detailed,
            component_type,
            conflicts,
        } => {
            let rules = load_rules(cli.rules.as_deref())?;
            let config = match cli.config.as_deref() {
                Some(path) => EngineConfig::load(path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => EngineConfig::default(),
            };
            handle_rules(&rules, &config, *detailed, *component_type, *conflicts);
            Ok(0)
        }
    }
}

fn load_core(cli: &Cli) -> Result<RigGuardCore> {
    let catalog = cli
        .catalog
        .as_deref()
        .context("--catalog is required for this command")?;
    let core = RigGuardCore::from_files(catalog, cli.rules.as_deref(), cli.config.as_deref())
        .with_context(|| format!("Failed to load catalog {}", catalog.display()))?;
    tracing::debug!(
        "Loaded {} components and {} rules",
        core.catalog().len(),
        core.rules().len()
    );
    Ok(core)
}

fn load_rules(path: Option<&Path>) -> Result<RuleSet> {
    match path {
        Some(path) => RuleSet::load(path).with_context(|| format!("Failed to load rules {}", path.display())),
        None => Ok(rigguard::default_rule_set()),
    }
}

fn load_build(core: &RigGuardCore, path: &Path) -> Result<PcConfiguration> {
    core.load_configuration(path)
        .with_context(|| format!("Failed to load build {}", path.display()))
}

fn handle_analyze(
    core: &RigGuardCore,
    build: &Path,
    partial: bool,
    format: OutputFormat,
    fail_on: Option<FailOn>,
    diagnostics: bool,
) -> Result<i32> {
    let configuration = load_build(core, build)?;
    let options = AnalysisOptions { partial };
    let report = core.analyze_detailed(&configuration, options)?;

    match format {
        OutputFormat::Human => output_human(core, &configuration, &report, diagnostics),
        OutputFormat::Json => output_json(&configuration, &report)?,
        OutputFormat::Github => output_github(build, &report.result),
    }

    Ok(match fail_on {
        Some(level) if should_fail(&report.result, level) => 1,
        _ => 0,
    })
}

fn should_fail(result: &CompatibilityAnalysisResult, level: FailOn) -> bool {
    let summary = result.summary();
    match level {
        FailOn::Critical => summary.critical > 0,
        FailOn::Warning => summary.critical + summary.warnings > 0,
        FailOn::Recommendation => summary.total() > 0,
    }
}

fn component_label(core: &RigGuardCore, id: ComponentId) -> String {
    core.catalog()
        .get(id)
        .map(|c| format!("{} ({})", c.label(), id))
        .unwrap_or_else(|| id.to_string())
}

fn print_issues(core: &RigGuardCore, heading: &str, issues: &[CompatibilityIssue]) {
    if issues.is_empty() {
        return;
    }
    println!("\n  {}:", heading);
    for issue in issues {
        println!("    - {}: {}", issue.title, issue.description);
        let involved: Vec<String> = [issue.component1, issue.component2]
            .into_iter()
            .flatten()
            .map(|id| component_label(core, id))
            .collect();
        if !involved.is_empty() {
            println!("      Components: {}", involved.join(", "));
        }
        if let Some(ref fix) = issue.recommendation {
            println!("      Fix: {}", fix);
        }
    }
}

fn output_human(core: &RigGuardCore, configuration: &PcConfiguration, report: &AnalysisReport, diagnostics: bool) {
    let result = &report.result;
    println!("\nBuild: {}", configuration.name);
    println!("{}", "─".repeat(60));
    println!(
        "  Status: {} (score {})",
        result.overall_status.to_string().to_uppercase(),
        result.compatibility_score
    );
    println!("  {}", result.status_message);

    print_issues(core, "CRITICAL", &result.critical_errors);
    print_issues(core, "WARNINGS", &result.warnings);
    print_issues(core, "RECOMMENDATIONS", &result.recommendations);

    println!("\n  Power: {}", power_line(&report.power));

    if diagnostics && !report.diagnostics.is_empty() {
        println!("\n  Not evaluated:");
        for d in &report.diagnostics {
            println!("    - {} on {} / {}: {}", d.rule_id, d.components.0, d.components.1, d.reason);
        }
    }

    let summary = result.summary();
    println!("\n  Summary:");
    println!("    Critical:        {}", summary.critical);
    println!("    Warnings:        {}", summary.warnings);
    println!("    Recommendations: {}", summary.recommendations);
    println!("\n  {}", result.recommendation);
}

fn output_json(configuration: &PcConfiguration, report: &AnalysisReport) -> Result<()> {
    let output = serde_json::json!({
        "build": configuration.name,
        "result": report.result,
        "power": report.power,
        "hotspots": report.hotspots,
        "diagnostics": report.diagnostics,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn issue_to_github(issue: &CompatibilityIssue) -> &'static str {
    match issue.issue_type {
        IssueType::CriticalError => "error",
        IssueType::Warning => "warning",
        IssueType::Recommendation => "notice",
    }
}

fn output_github(build: &Path, result: &CompatibilityAnalysisResult) {
    for issue in result.issues() {
        println!(
            "::{} file={},title={}::{}",
            issue_to_github(issue),
            build.display(),
            issue.title,
            issue.description.replace('\n', " ")
        );
    }
}

fn power_line(power: &PowerReport) -> String {
    use rigguard::PowerVerdict;
    match power.verdict {
        PowerVerdict::NoSupply => format!("{}W drawn, no power supply selected", power.total_draw),
        PowerVerdict::NoLoad => "no component declares a power draw".to_string(),
        PowerVerdict::UndeclaredCapacity => {
            format!("{}W drawn, power supply rating unknown", power.total_draw)
        }
        _ => format!(
            "{}W of {}W (headroom ratio {:.2}, {:?})",
            power.total_draw, power.supply_capacity, power.headroom_ratio, power.verdict
        ),
    }
}

fn handle_pair(core: &RigGuardCore, first: ComponentId, second: ComponentId) -> Result<i32> {
    let a = core.component(first)?;
    let b = core.component(second)?;
    let report = core.analyzer().checker().evaluate_pair(a, b);

    if report.compatible() {
        println!("{} and {} are compatible", a.label(), b.label());
    } else {
        println!("{} and {} are NOT compatible", a.label(), b.label());
    }
    println!("  Rules checked: {}", report.rules_checked);
    for failure in &report.failures {
        let marker = if failure.advisory { "advisory" } else { "blocking" };
        println!("  - [{}] {} {}: {}", marker, failure.rule_id, failure.description, failure.detail);
    }
    for skipped in &report.skipped {
        println!("  - [skipped] {}: {}", skipped.rule_id, skipped.reason);
    }
    Ok(0)
}

fn handle_compatible(core: &RigGuardCore, id: ComponentId, target_type: ComponentType) -> Result<i32> {
    let source = core.component(id)?;
    let found = core.compatible_in_catalog(id, target_type)?;

    println!(
        "{} compatible with {}: {}",
        target_type.display_name(),
        source.label(),
        found.len()
    );
    for component in found {
        println!("  {}  {}  {:.2}", component.id, component.label(), component.price);
    }
    Ok(0)
}

fn handle_power(core: &RigGuardCore, build: &Path) -> Result<i32> {
    let configuration = load_build(core, build)?;
    let power = core.calculate_power_budget(&configuration)?;

    println!("Power budget for {}", configuration.name);
    for (id, watts) in &power.contributors {
        println!("  {:>5}W  {}", watts, component_label(core, *id));
    }
    println!("  Total: {}", power_line(&power));
    Ok(0)
}

fn handle_rules(
    rules: &RuleSet,
    config: &EngineConfig,
    detailed: bool,
    component_type: Option<ComponentType>,
    conflicts: bool,
) {
    let active = rules.list_active_rules(component_type, None);
    println!("Active compatibility rules: {}\n", active.len());

    for rule in &active {
        println!("  {}  {} <-> {}", rule.id, rule.source_type, rule.target_type);
        println!("    {}", rule.summary());
        if detailed {
            println!(
                "    {}.{} {} {}.{}{}",
                rule.source_type,
                rule.source_property,
                rule.kind.operator().symbol(),
                rule.target_type,
                rule.target_property,
                rule.modifier.map(|m| format!(" (modifier {})", m)).unwrap_or_default()
            );
            if config.is_advisory(rule.id) {
                println!("    advisory");
            }
        }
        println!();
    }

    if detailed && !rules.defects().is_empty() {
        println!("Rejected records:");
        for defect in rules.defects() {
            println!("  {}: {}", defect.id, defect.defect);
        }
        println!();
    }

    if conflicts {
        let found = rules.conflicts();
        if found.is_empty() {
            println!("No conflicting rules");
        }
        for conflict in found {
            println!("  {:?}: {}", conflict.kind, conflict.description);
        }
    }
}
