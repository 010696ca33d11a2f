//! xharvest - Sentiment dataset harvester CLI
//!
//! Main entry point for the xharvest command-line tool.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, warn};

use xharvest::classifier::{HttpClassifier, SentimentClassifier};
use xharvest::config::ClassifierBackend;
use xharvest::http_provider::HttpProvider;
use xharvest::lexicon::LexiconClassifier;
use xharvest::logging::{OperationGuard, init_cli_logging};
use xharvest::session::{self, SessionSource, SessionStore, credentials_from_env};
use xharvest::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Credentials may live in a .env file next to the working directory
    let dotenv = dotenvy::dotenv();

    init_cli_logging(cli.quiet, cli.verbose, io::IsTerminal::is_terminal(&io::stderr()));
    if let Ok(path) = dotenv {
        debug!(path = %path.display(), "Loaded .env");
    }

    match run(&cli).await {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<ExitCode> {
    // `config --init` may name a file that does not exist yet
    let explicit = match &cli.command {
        Commands::Config(args) if args.init => cli.config.as_deref().filter(|p| p.exists()),
        _ => cli.config.as_deref(),
    };
    let config = Config::load(explicit)?;

    match &cli.command {
        Commands::Login(args) => cmd_login(&config, args).await,
        Commands::Collect(args) => cmd_collect(cli, &config, args).await,
        Commands::Label(args) => cmd_label(cli, &config, args).await,
        Commands::Config(args) => cmd_config(cli, &config, args),
        Commands::Completions(args) => cmd_completions(args.clone()),
    }
}

fn report_error(err: &anyhow::Error) {
    let xh = err.downcast_ref::<XhError>();
    let title = if xh.is_some_and(XhError::is_auth_related) {
        "Authentication failed"
    } else {
        "Command failed"
    };
    let explanation = err.to_string();
    let hint = xh.and_then(XhError::suggestion);
    eprintln!("{}", format_error(title, &explanation, hint));
}

fn build_provider(config: &Config) -> Result<HttpProvider> {
    HttpProvider::new(
        &config.provider.base_url,
        &config.provider.language,
        config.provider.timeout(),
    )
    .map_err(|e| XhError::with_context("Failed to build search client", e).into())
}

async fn cmd_login(config: &Config, args: &cli::LoginArgs) -> Result<ExitCode> {
    let store = SessionStore::new(
        args.session
            .clone()
            .unwrap_or_else(|| config.paths.session_file.clone()),
    );
    let provider = build_provider(config)?;
    let credentials = credentials_from_env()?;

    let session = session::login(&provider, &store, &credentials).await?;
    let identity = provider.probe(&session).await.map_err(XhError::from)?;

    println!(
        "{} Logged in as @{} ({})",
        "✓".green(),
        identity.screen_name.bold(),
        identity.name.as_deref().unwrap_or("unknown")
    );
    println!("  Session: {}", store.path().display());
    Ok(ExitCode::SUCCESS)
}

/// Queries for this run: the CLI list if given, otherwise the configured one.
fn resolve_queries(config: &Config, args: &cli::CollectArgs) -> Result<Vec<Query>> {
    let default_target = args.target.unwrap_or(config.collect.default_target);

    let queries: Vec<Query> = if args.queries.is_empty() {
        config
            .collect
            .queries
            .iter()
            .map(|q| match args.target {
                Some(target) => Query::new(q.term.clone(), target),
                None => q.clone(),
            })
            .collect()
    } else {
        args.queries
            .iter()
            .map(|q| q.resolve(default_target))
            .collect()
    };

    if queries.is_empty() {
        return Err(XhError::invalid_argument("no queries configured; pass --query TERM[:TARGET]").into());
    }
    Ok(queries)
}

async fn cmd_collect(cli: &Cli, config: &Config, args: &cli::CollectArgs) -> Result<ExitCode> {
    let queries = resolve_queries(config, args)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| config.paths.raw_output.clone());
    let store = SessionStore::new(
        args.session
            .clone()
            .unwrap_or_else(|| config.paths.session_file.clone()),
    );

    let mut policy = config.collect.policy();
    if let Some(n) = args.max_retries {
        policy.max_retries = n;
    }
    if let Some(secs) = args.retry_backoff {
        policy.retry_backoff = Duration::from_secs(secs);
    }
    if let Some(ranking) = args.ranking {
        policy.ranking = ranking.into();
    }

    let provider = build_provider(config)?;
    let (session, source) = session::acquire_session(&provider, &store, credentials_from_env).await?;

    if !cli.quiet {
        let how = match source {
            SessionSource::Reused => "reused",
            SessionSource::FreshLogin => "new login",
        };
        println!("{}", "Collecting posts...".bold().cyan());
        println!("  Session: {} ({how})", store.path().display());
        println!("  Output: {}", output.display());
        println!(
            "  Queries: {}",
            queries
                .iter()
                .map(|q| format!("{} ({})", q.term, q.target))
                .collect::<Vec<_>>()
                .join(", ")
        );
        println!();
    }

    // The previous dataset must survive a failed login; truncate only now.
    let writer = RecordWriter::create(&output)?;
    let guard = OperationGuard::new("collect");
    let collector = Collector::new(&provider, &session, writer, policy);

    let report = tokio::select! {
        result = collector.collect(&queries) => match result {
            Ok(report) => report,
            Err(e) => {
                guard.fail(&e);
                return Err(e.into());
            }
        },
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted");
            eprintln!(
                "{} Interrupted; rows already written remain in {}",
                "!".yellow().bold(),
                output.display()
            );
            return Ok(ExitCode::from(130));
        }
    };
    guard.complete(report.total);

    if !cli.quiet {
        print_collect_report(&report, &output);
    }

    let failed: Vec<&str> = report.failed().map(|q| q.term.as_str()).collect();
    if failed.is_empty() {
        return Ok(ExitCode::SUCCESS);
    }
    eprintln!(
        "{} {} query(ies) stopped on a provider error: {}",
        "!".yellow().bold(),
        failed.len(),
        failed.join(", ")
    );
    eprintln!("  If the session was revoked, run 'xharvest login' and collect again.");
    Ok(ExitCode::FAILURE)
}

fn print_collect_report(report: &CollectReport, output: &std::path::Path) {
    println!();
    println!("{}", "Collection complete!".bold().green());
    println!("{}", "─".repeat(CONTENT_DIVIDER_WIDTH).dimmed());
    for q in &report.queries {
        let mark = match q.outcome {
            QueryOutcome::TargetReached => "✓".green(),
            QueryOutcome::Exhausted => "•".yellow(),
            QueryOutcome::RetriesExhausted | QueryOutcome::Failed => "✗".red(),
        };
        println!(
            "  {mark} {:<24} {:>7} / {:<7} {} page(s), {} failed fetch(es), {}",
            q.term,
            format_number_usize(q.collected),
            format_number_usize(q.target),
            q.pages,
            q.failed_fetches,
            q.outcome
        );
        if let Some(error) = &q.error {
            println!("      {}", error.as_str().dimmed());
        }
    }
    println!("{}", "─".repeat(CONTENT_DIVIDER_WIDTH).dimmed());
    println!(
        "  Total records: {}",
        format_number_u64(report.total).cyan()
    );
    println!("  Written to: {}", output.display());
    println!();
    println!("Run {} to build the training set.", "xharvest label".bold());
}

fn build_classifier(
    config: &Config,
    args: &cli::LabelArgs,
) -> Result<Box<dyn SentimentClassifier>> {
    let backend = match args.classifier {
        Some(ClassifierKind::Lexicon) => ClassifierBackend::Lexicon,
        Some(ClassifierKind::Http) => ClassifierBackend::Http,
        None => config.classifier.backend,
    };

    match backend {
        ClassifierBackend::Lexicon => Ok(Box::new(LexiconClassifier::new())),
        ClassifierBackend::Http => {
            let url = args
                .classifier_url
                .clone()
                .or_else(|| config.classifier.url.clone())
                .ok_or_else(|| {
                    XhError::invalid_argument(
                        "the http classifier needs --classifier-url or XH_CLASSIFIER_URL",
                    )
                })?;
            let classifier =
                HttpClassifier::new(url, Duration::from_secs(config.classifier.timeout_secs))
                    .map_err(XhError::from)?;
            Ok(Box::new(classifier))
        }
    }
}

fn spinner(quiet: bool, message: &'static str) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

async fn cmd_label(cli: &Cli, config: &Config, args: &cli::LabelArgs) -> Result<ExitCode> {
    let input: PathBuf = args
        .input
        .clone()
        .unwrap_or_else(|| config.paths.raw_output.clone());
    let output: PathBuf = args
        .output
        .clone()
        .unwrap_or_else(|| config.paths.labeled_output.clone());
    let classifier = build_classifier(config, args)?;

    if !cli.quiet {
        println!("{}", "Labeling dataset...".bold().cyan());
        println!("  Input: {}", input.display());
        println!("  Output: {}", output.display());
        println!("  Classifier: {}", classifier.id());
        println!();
    }

    let guard = OperationGuard::new("label");
    let pb = spinner(cli.quiet, "Cleaning and classifying...");
    let result = preprocess::run_label(&input, &output, classifier.as_ref()).await;
    pb.finish_and_clear();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            guard.fail(&e);
            return Err(e.into());
        }
    };
    guard.complete(report.labeled as u64);

    if !cli.quiet {
        print_label_report(&report, &output);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_label_report(report: &LabelReport, output: &std::path::Path) {
    println!("{}", "Labeling complete!".bold().green());
    println!("{}", "─".repeat(CONTENT_DIVIDER_WIDTH).dimmed());
    println!("  Rows loaded:  {}", format_number_usize(report.loaded));
    if report.dropped > 0 {
        println!(
            "  Rows dropped: {} (missing text or query)",
            format_number_usize(report.dropped).yellow()
        );
    }
    println!("  Rows labeled: {}", format_number_usize(report.labeled).cyan());
    println!();
    for (sentiment, count) in &report.distribution {
        println!(
            "  {:<10} {:>7}  {:>5.1}%",
            sentiment.dataset_label(),
            format_number_usize(*count),
            percent(*count, report.labeled)
        );
    }
    println!("{}", "─".repeat(CONTENT_DIVIDER_WIDTH).dimmed());
    println!("  Written to: {}", output.display());
}

fn cmd_config(cli: &Cli, config: &Config, args: &cli::ConfigArgs) -> Result<ExitCode> {
    if args.init {
        let path = cli
            .config
            .clone()
            .or_else(Config::user_config_path)
            .context("Could not determine the user config directory")?;
        if path.exists() {
            println!(
                "{} Config already exists at {}",
                "•".yellow(),
                path.display()
            );
        } else {
            config.save(&path)?;
            println!("{} Wrote {}", "✓".green(), path.display());
        }
    }

    if args.show || !args.init {
        println!("{}", "Current Configuration".bold().cyan());
        match cli.config.clone().or_else(Config::user_config_path) {
            Some(path) if path.exists() => println!("  File: {}", path.display()),
            _ => println!("  File: {}", "(defaults)".dimmed()),
        }
        println!();
        print!("{}", config.to_toml());
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_completions(args: cli::CompletionsArgs) -> Result<ExitCode> {
    let mut cmd = Cli::command();
    generate(args.shell, &mut cmd, "xharvest", &mut io::stdout());
    Ok(ExitCode::SUCCESS)
}
