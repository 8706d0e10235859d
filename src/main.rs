//! tokenledger - usage and cost summaries for AI coding assistants
//!
//! Reads the usage records Claude Code, Codex, Cursor and Gemini CLI leave on
//! disk and prints what they add up to.
//!
//! ## Usage
//!
//! ```bash
//! # Summary of every source found under $HOME
//! tokenledger
//!
//! # Same data as JSON
//! tokenledger summary --json
//!
//! # Which sources are present
//! tokenledger sources
//!
//! # Verbose logging, custom config
//! tokenledger -v --config ~/dotfiles/tokenledger.yaml
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use ledger_config::Config;
use ledger_core::{LedgerError, LogGuard, init_logging};
use ledger_usage::provider::ClaudeProvider;
use ledger_usage::{
    AggregatedData, Provider, ProviderData, SourceKind, SourcePaths, UsageProvider,
    compute_burn_rate, load_all, providers,
};
use tracing::{error, info, warn};

/// Usage and cost summaries across local AI coding assistant logs
#[derive(Parser, Debug)]
#[command(name = "tokenledger")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging (increases log level)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory for log files (defaults to ~/.tokenledger/logs/)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Configuration file (defaults to ~/.config/tokenledger/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Home directory to look for source data in
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a usage and cost summary (default)
    Summary {
        /// Print the aggregated data as JSON
        #[arg(long)]
        json: bool,
    },
    /// List known sources and whether their data is present
    Sources,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match setup_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::from(1);
        }
    };

    info!("Starting tokenledger");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("tokenledger error: {:#}", e);
            eprintln!("Error: {:#}", e);
            let ledger_error = e.downcast_ref::<LedgerError>();
            if let Some(hint) = ledger_error.and_then(LedgerError::guidance) {
                eprintln!("{}", hint);
            }
            ExitCode::from(exit_status(ledger_error))
        }
    }
}

/// Exit status for a failed run: 2 for configuration problems, 1 otherwise.
fn exit_status(error: Option<&LedgerError>) -> u8 {
    if error.is_some_and(LedgerError::is_config_error) {
        2
    } else {
        1
    }
}

/// Set up logging based on CLI arguments.
fn setup_logging(cli: &Cli) -> ledger_core::Result<LogGuard> {
    init_logging(cli.log_dir.clone(), cli.verbose > 0)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    let paths = source_paths(&config, cli.home.as_deref()).context("resolving source paths")?;

    match cli.command.unwrap_or(Command::Summary { json: false }) {
        Command::Summary { json } => summary(&config, &paths, json).await,
        Command::Sources => {
            list_sources(&paths);
            Ok(())
        }
    }
}

/// Default source locations under the home directory, with config overrides
/// applied. `~` in an override means the same home the defaults use.
fn source_paths(config: &Config, home: Option<&Path>) -> ledger_core::Result<SourcePaths> {
    let home = config.effective_home(home)?;
    let overrides = config.sources.expanded(&home);
    let mut paths = SourcePaths::from_home(&home);

    if let Some(path) = overrides.claude_stats_cache {
        paths = paths.with_claude_stats_cache(path);
    }
    if let Some(path) = overrides.claude_projects_dir {
        paths = paths.with_claude_projects_dir(path);
    }
    if let Some(path) = overrides.codex_sessions_dir {
        paths = paths.with_codex_sessions_dir(path);
    }
    if let Some(path) = overrides.cursor_db {
        paths = paths.with_cursor_db(path);
    }
    if let Some(path) = overrides.gemini_dir {
        paths = paths.with_gemini_dir(path);
    }
    Ok(paths)
}

fn source_location(paths: &SourcePaths, kind: SourceKind) -> &Path {
    match kind {
        SourceKind::ClaudeCode => &paths.claude_stats_cache,
        SourceKind::Codex => &paths.codex_sessions_dir,
        SourceKind::Cursor => &paths.cursor_db,
        SourceKind::Gemini => &paths.gemini_dir,
    }
}

fn list_sources(paths: &SourcePaths) {
    for provider in providers(paths) {
        let status = if provider.available() { "found" } else { "missing" };
        println!(
            "{:<12} {:<8} {}",
            provider.name(),
            status,
            source_location(paths, provider.kind()).display()
        );
    }
}

async fn summary(config: &Config, paths: &SourcePaths, json: bool) -> anyhow::Result<()> {
    let providers = providers(paths);
    let data = load_all(&providers).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    if data.providers.is_empty() && data.failures.is_empty() {
        println!("No usage data found. Run `tokenledger sources` to see where it is looked for.");
        return Ok(());
    }

    let today = Local::now().date_naive();
    for provider_data in &data.providers {
        print_provider(provider_data);
        if provider_data.source == SourceKind::ClaudeCode {
            let claude = providers.iter().find_map(|p| match p {
                Provider::Claude(claude) => Some(claude),
                _ => None,
            });
            if let Some(claude) = claude {
                print_claude_periods(claude, provider_data, config, today).await;
            }
        }
        println!();
    }

    print_totals(&data);
    Ok(())
}

fn format_cost(cost: Option<f64>) -> String {
    match cost {
        Some(cost) => format!("${:.2}", cost),
        None => "not tracked".to_string(),
    }
}

fn format_tokens(tokens: u64) -> String {
    match tokens {
        t if t >= 1_000_000_000 => format!("{:.1}B", t as f64 / 1e9),
        t if t >= 1_000_000 => format!("{:.1}M", t as f64 / 1e6),
        t if t >= 1_000 => format!("{:.1}K", t as f64 / 1e3),
        t => t.to_string(),
    }
}

fn print_provider(data: &ProviderData) {
    println!("{}", data.name);
    println!("  Cost:       {}", format_cost(data.total_cost));
    if data.generations > 0 {
        println!("  Generations: {}", data.generations);
    } else {
        println!("  Tokens:     {}", format_tokens(data.total_tokens));
    }
    println!("  Sessions:   {}", data.sessions.len());
    if let (Some(first), Some(last)) = (data.first_seen, data.last_seen) {
        println!(
            "  Active:     {} to {}",
            first.format("%Y-%m-%d"),
            last.format("%Y-%m-%d")
        );
    }
    // Claude gets a full breakdown below
    let top_models = if data.source == SourceKind::ClaudeCode { 0 } else { 3 };
    for model in data.models.iter().take(top_models) {
        let amount = match model.cost {
            Some(cost) => format!("${:.2}", cost),
            None => format!("{} generations", model.generations),
        };
        println!("    {:<24} {}", model.model, amount);
    }
    if let Some(note) = data.metadata.get("note") {
        println!("  Note: {}", note);
    }
}

async fn print_claude_periods(
    claude: &ClaudeProvider,
    data: &ProviderData,
    config: &Config,
    today: NaiveDate,
) {
    let summaries = match claude.summaries(today).await {
        Ok(summaries) => summaries,
        Err(e) => {
            warn!(error = %e, "Could not compute period summaries");
            return;
        }
    };

    for period in [
        &summaries.today,
        &summaries.this_week,
        &summaries.this_month,
        &summaries.all_time,
    ] {
        println!(
            "  {:<11} ${:>10.2}  {:>7} msgs  {:>5} sessions  {:>8} tokens",
            period.label,
            period.cost,
            period.messages,
            period.sessions,
            format_tokens(period.total_tokens)
        );
    }

    let burn = compute_burn_rate(&data.daily_usage, today);
    println!(
        "  Burn rate:  ${:.2}/day, ${:.2}/month projected, {:+.1}% vs prior week",
        burn.daily_average, burn.projected_monthly, burn.trend_vs_prior_week_percent
    );

    let plan = &config.plan;
    if plan.provider.eq_ignore_ascii_case("claude") {
        println!(
            "  Plan:       {} at ${:.2}/month, ${:.2} API-equivalent this month",
            plan.name, plan.monthly_cost, summaries.this_month.cost
        );
    }

    println!("  Model breakdown");
    for (model, cost, percent) in model_shares(data) {
        println!("    {:<28} ${:>8.2}  ({:>5.1}%)", model, cost, percent);
    }

    if let Some(line) = activity_line(data) {
        println!("  {}", line);
    }
}

/// Models with at least a cent of cost, with their share of the source's total.
fn model_shares(data: &ProviderData) -> Vec<(&str, f64, f64)> {
    let total = data.total_cost.unwrap_or(0.0);
    data.models
        .iter()
        .filter_map(|model| {
            let cost = model.cost.filter(|c| *c >= 0.01)?;
            let percent = if total > 0.0 { cost / total * 100.0 } else { 0.0 };
            Some((model.model.as_str(), cost, percent))
        })
        .collect()
}

/// "N sessions, M messages since DATE" from the cache summary metadata.
fn activity_line(data: &ProviderData) -> Option<String> {
    let sessions = data.metadata.get("total_sessions")?;
    let messages = data.metadata.get("total_messages")?;
    let since = data.first_seen?;
    Some(format!(
        "{} sessions, {} messages since {}",
        sessions,
        messages,
        since.format("%Y-%m-%d")
    ))
}

fn print_totals(data: &AggregatedData) {
    println!("Total");
    println!("  Cost:       {}", format_cost(data.total_cost));
    println!("  Tokens:     {}", format_tokens(data.total_tokens));
    println!("  Sessions:   {}", data.total_sessions);
    println!("  Days:       {}", data.daily_usage.len());
    for failure in &data.failures {
        println!("  {} failed to load: {}", failure.source, failure.message);
    }
}
