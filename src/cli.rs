//! CLI definitions for xharvest.
//!
//! Uses clap for argument parsing with derive macros.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::model::{QuerySpec, Ranking};

/// xharvest - Sentiment dataset harvester for X search results
#[derive(Parser, Debug)]
#[command(name = "xharvest")]
#[command(version)]
#[command(about = "Collect X posts by search term and label them for sentiment training")]
#[command(long_about = r#"
xharvest - Builds a sentiment training dataset from X search results.

Two batch jobs:
  - collect: search each term, page through results and append every post
    to a raw CSV, retrying transient failures with a fixed backoff
  - label: clean the raw texts, classify them in one batch and write the
    labeled CSV (Positivo / Negativo / Neutro)

Quick start:
  1. Put TWITTER_USERNAME, TWITTER_EMAIL and TWITTER_PASSWORD in .env
  2. Run: xharvest collect --query Palmeiras:200
  3. Run: xharvest label
"#)]
pub struct Cli {
    /// Path to a config file (defaults to ~/.config/xharvest/config.toml)
    #[arg(long, env = "XH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Be verbose (show debug info)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Be quiet (suppress non-error output)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and store a fresh session
    Login(LoginArgs),

    /// Collect posts for each query into the raw dataset
    Collect(CollectArgs),

    /// Clean and label the raw dataset
    Label(LabelArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Session file to write
    #[arg(long)]
    pub session: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Query as TERM or TERM:TARGET (repeatable; replaces configured queries).
    /// End with ':' to keep a term whose last part is a number
    #[arg(long = "query", short = 'Q')]
    pub queries: Vec<QuerySpec>,

    /// Target for queries given without one
    #[arg(long, short = 'n')]
    pub target: Option<usize>,

    /// Raw dataset to write (truncated at start)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Session file to reuse or create
    #[arg(long)]
    pub session: Option<PathBuf>,

    /// Result ordering
    #[arg(long)]
    pub ranking: Option<RankingArg>,

    /// Consecutive failed fetches before a query is abandoned
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Seconds to wait before retrying a failed fetch
    #[arg(long)]
    pub retry_backoff: Option<u64>,
}

#[derive(Args, Debug)]
pub struct LabelArgs {
    /// Raw dataset to read
    #[arg(long, short = 'i')]
    pub input: Option<PathBuf>,

    /// Labeled dataset to write
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Classifier backend
    #[arg(long, short = 'c')]
    pub classifier: Option<ClassifierKind>,

    /// Inference endpoint for the http classifier
    #[arg(long)]
    pub classifier_url: Option<String>,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Show current configuration
    #[arg(long)]
    pub show: bool,

    /// Write the current configuration to the user config file
    #[arg(long)]
    pub init: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassifierKind {
    /// Built-in word-list scorer
    Lexicon,
    /// Remote inference endpoint
    Http,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RankingArg {
    Top,
    Latest,
}

impl From<RankingArg> for Ranking {
    fn from(arg: RankingArg) -> Self {
        match arg {
            RankingArg::Top => Self::Top,
            RankingArg::Latest => Self::Latest,
        }
    }
}
