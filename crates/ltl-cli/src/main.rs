mod pipeline;
mod report;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ltl")]
#[command(about = "Likes to Loyalty: Bluesky posts to marketing funnel stages")]
struct Cli {
    /// Root directory holding raw/ and processed/ datasets
    #[arg(long, global = true)]
    data_root: Option<PathBuf>,

    /// Bluesky credentials file (JSON with identifier and app_password)
    #[arg(long, global = true)]
    auth_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Search Bluesky and save the raw posts
    Scrape(ScrapeArgs),
    /// Label a raw dataset with emotions and funnel stages
    Classify(ClassifyArgs),
    /// Scrape, then classify the result
    Run {
        #[command(flatten)]
        scrape: ScrapeArgs,

        /// Drop posts whose top emotion is neutral
        #[arg(long)]
        suppress_neutral: bool,
    },
    /// Print a markdown funnel report for a labeled dataset
    Report(ReportArgs),
    /// Print the emotion to funnel stage table
    Stages,
}

#[derive(Debug, Clone, Args)]
struct ScrapeArgs {
    /// Search query
    #[arg(long)]
    query: String,

    /// Number of posts to collect
    #[arg(long, default_value_t = 1000)]
    n_posts: usize,

    /// Append each page to disk as it arrives
    #[arg(long)]
    stream: bool,

    /// Earliest post date to keep (YYYY-MM-DD)
    #[arg(long)]
    since: Option<NaiveDate>,

    /// Latest post date to keep, inclusive (YYYY-MM-DD)
    #[arg(long)]
    until: Option<NaiveDate>,

    /// Dataset name (defaults to bsky_ plus the query's letters and digits)
    #[arg(long)]
    save_as: Option<String>,

    /// Declared post language to keep (defaults to `LTL_SEARCH_LANGUAGE`)
    #[arg(long)]
    language: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct ClassifyArgs {
    /// Name of a raw dataset under <data-root>/raw/
    #[arg(long, conflicts_with = "input", required_unless_present = "input")]
    input_name: Option<String>,

    /// Path to a raw dataset file
    #[arg(long)]
    input: Option<PathBuf>,

    /// Query used as model context (defaults to the query stored in the rows)
    #[arg(long)]
    query: Option<String>,

    /// Drop posts whose top emotion is neutral
    #[arg(long)]
    suppress_neutral: bool,

    /// Append each batch to disk as it completes
    #[arg(long)]
    stream: bool,

    /// Output dataset name (defaults to the input name)
    #[arg(long)]
    save_as: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct ReportArgs {
    /// Name of a labeled dataset under <data-root>/processed/
    #[arg(long, conflicts_with = "dataset", required_unless_present = "dataset")]
    name: Option<String>,

    /// Path to a labeled dataset file
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Show running totals instead of per-week counts
    #[arg(long)]
    cumulative: bool,

    /// Number of personas to list
    #[arg(long, default_value_t = 5)]
    top_personas: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ltl_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    if let Some(root) = cli.data_root {
        config.data_root = root;
    }
    if let Some(auth) = cli.auth_file {
        config.auth_file = auth;
    }

    match cli.command {
        Commands::Scrape(args) => pipeline::run_scrape(&config, &args).await,
        Commands::Classify(args) => pipeline::run_classify(&config, &args).await,
        Commands::Run {
            scrape,
            suppress_neutral,
        } => pipeline::run_full(&config, &scrape, suppress_neutral).await,
        Commands::Report(args) => report::run_report(&config, &args),
        Commands::Stages => {
            report::print_stage_table();
            Ok(())
        }
    }
}
