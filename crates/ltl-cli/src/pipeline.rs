//! Scrape and classify command handlers.

use std::path::{Path, PathBuf};

use anyhow::Context;
use ltl_core::dataset::read_posts;
use ltl_core::{raw_path, AppConfig, Credentials, Post, StageOutput};
use ltl_scraper::{scrape, BlueskyClient, ScrapeRequest};
use ltl_sentiment::{run_classification, ClassifierInput, ClassifyOptions, TeiClassifier};

use crate::{ClassifyArgs, ScrapeArgs};

fn scrape_request(config: &AppConfig, args: &ScrapeArgs) -> ScrapeRequest {
    ScrapeRequest {
        query: args.query.clone(),
        n_posts: args.n_posts,
        stream: args.stream,
        data_root: config.data_root.clone(),
        save_as: args.save_as.clone(),
        since: args.since,
        until: args.until,
        language: args
            .language
            .clone()
            .or_else(|| config.search_language.clone()),
    }
}

fn classifier(config: &AppConfig) -> anyhow::Result<TeiClassifier> {
    TeiClassifier::new(
        &config.classifier_url,
        config.request_timeout_secs,
        config.classifier_api_token.clone(),
    )
    .context("failed to build classifier client")
}

fn classify_options(
    config: &AppConfig,
    query: String,
    name: String,
    suppress_neutral: bool,
    stream: bool,
) -> ClassifyOptions {
    ClassifyOptions {
        query,
        name,
        data_root: config.data_root.clone(),
        suppress_neutral,
        stream,
        batch_size: config.classifier_batch_size,
        max_text_len: config.max_text_len,
    }
}

async fn scrape_stage(
    config: &AppConfig,
    request: &ScrapeRequest,
) -> anyhow::Result<StageOutput<Post>> {
    let creds = Credentials::load(&config.auth_file)?;
    let client = BlueskyClient::with_base_url(
        config.request_timeout_secs,
        &config.user_agent,
        &config.bsky_base_url,
    )?;
    let output = scrape(&client, &creds, request)
        .await
        .with_context(|| format!("scrape failed for query '{}'", request.query))?;
    Ok(output)
}

/// Scrape posts for a query and save the raw dataset.
///
/// # Errors
///
/// Returns an error if credentials are invalid, the session is refused, or
/// the dataset cannot be written.
pub(crate) async fn run_scrape(config: &AppConfig, args: &ScrapeArgs) -> anyhow::Result<()> {
    let request = scrape_request(config, args);
    let output = scrape_stage(config, &request).await?;
    tracing::info!(
        query = %request.query,
        requested = request.n_posts,
        saved = output.len(),
        "scrape stage complete"
    );
    println!(
        "saved {} posts to {}",
        output.len(),
        output.path().display()
    );
    Ok(())
}

/// Dataset name for a classify run: explicit name, else the input's.
fn output_name(args: &ClassifyArgs) -> anyhow::Result<String> {
    if let Some(name) = args.save_as.as_deref().or(args.input_name.as_deref()) {
        return Ok(name.to_string());
    }
    args.input
        .as_deref()
        .and_then(Path::file_stem)
        .and_then(|s| s.to_str())
        .map(ToOwned::to_owned)
        .ok_or_else(|| anyhow::anyhow!("cannot derive an output name; pass --save-as"))
}

fn input_path(config: &AppConfig, args: &ClassifyArgs) -> anyhow::Result<PathBuf> {
    match (&args.input, &args.input_name) {
        (Some(path), _) => Ok(path.clone()),
        (None, Some(name)) => Ok(raw_path(&config.data_root, name)),
        (None, None) => anyhow::bail!("either --input or --input-name is required"),
    }
}

/// Classify an existing raw dataset.
///
/// # Errors
///
/// Returns an error if the input cannot be read, the output would overwrite
/// it, or inference fails.
pub(crate) async fn run_classify(config: &AppConfig, args: &ClassifyArgs) -> anyhow::Result<()> {
    let path = input_path(config, args)?;
    let name = output_name(args)?;

    let query = match &args.query {
        Some(q) => q.clone(),
        None => read_posts(&path)
            .with_context(|| format!("failed to read {}", path.display()))?
            .first()
            .map(|p| p.query.clone())
            .unwrap_or_default(),
    };

    let options = classify_options(config, query, name, args.suppress_neutral, args.stream);
    let model = classifier(config)?;
    let result = run_classification(&model, ClassifierInput::File(path), &options).await?;
    tracing::info!(
        input = result.stats.input,
        retained = result.stats.retained,
        suppressed = result.stats.suppressed,
        "classify stage complete"
    );

    println!(
        "labeled {} of {} posts ({} neutral suppressed) -> {}",
        result.stats.retained,
        result.stats.input,
        result.stats.suppressed,
        result.output.path().display()
    );
    Ok(())
}

/// Scrape, then classify the fresh dataset.
///
/// # Errors
///
/// Returns an error from whichever stage fails first.
pub(crate) async fn run_full(
    config: &AppConfig,
    args: &ScrapeArgs,
    suppress_neutral: bool,
) -> anyhow::Result<()> {
    let request = scrape_request(config, args);
    let name = request.dataset_name()?;
    let scraped = scrape_stage(config, &request).await?;
    tracing::info!(
        query = %request.query,
        requested = request.n_posts,
        saved = scraped.len(),
        "scrape stage complete"
    );
    println!(
        "saved {} posts to {}",
        scraped.len(),
        scraped.path().display()
    );

    let options = classify_options(
        config,
        request.query.clone(),
        name,
        suppress_neutral,
        request.stream,
    );
    let model = classifier(config)?;
    let result = run_classification(&model, ClassifierInput::from(scraped), &options).await?;
    tracing::info!(
        input = result.stats.input,
        retained = result.stats.retained,
        suppressed = result.stats.suppressed,
        "classify stage complete"
    );

    println!(
        "labeled {} posts ({} neutral suppressed) -> {}",
        result.stats.retained,
        result.stats.suppressed,
        result.output.path().display()
    );
    Ok(())
}
