//! Query pipeline: question → store search → prompt → generation.
//!
//! [`retrieve`] is the single point where the query path touches the store.
//! It is bounded by `retrieval.timeout_secs` and a caller-supplied
//! [`CancellationToken`]; the CLI cancels the token on Ctrl-C. Retrieval is
//! never retried, and an empty result set is a normal outcome.

use anyhow::Result;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use code_companion_core::store::SnippetStore;
use code_companion_core::{build_prompt, decode, CompanionError, SearchResult};

use crate::chroma::ChromaStore;
use crate::config::Config;
use crate::embedding;
use crate::llm::{Generator, OllamaGenerator};

const PREVIEW_CHARS: usize = 100;

/// Search `store` for up to `k` examples relevant to `question`.
pub async fn retrieve(
    store: &dyn SnippetStore,
    question: &str,
    k: usize,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<Vec<SearchResult>, CompanionError> {
    if cancel.is_cancelled() {
        return Err(CompanionError::Cancelled {
            operation: "search",
        });
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CompanionError::Cancelled { operation: "search" }),
        outcome = tokio::time::timeout(timeout, store.search(question, k)) => match outcome {
            Ok(Ok(results)) => {
                tracing::debug!(results = results.len(), "retrieved examples");
                Ok(results)
            }
            Ok(Err(e)) => Err(CompanionError::storage("search", question, e)),
            Err(_) => Err(CompanionError::Timeout { operation: "search", after: timeout }),
        },
    }
}

/// Run the generator unless `cancel` fires first.
pub async fn generate_answer(
    generator: &dyn Generator,
    system_prompt: &str,
    prompt: &str,
    cancel: &CancellationToken,
) -> Result<String> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CompanionError::Cancelled { operation: "generate" }.into()),
        answer = generator.generate(system_prompt, prompt) => answer,
    }
}

/// One line per result: rank, distance, location, and a short preview.
pub fn format_result(rank: usize, result: &SearchResult) -> String {
    let decoded = decode(&result.text);
    let mut location = String::new();
    if !decoded.file_path.is_empty() {
        location.push_str(&decoded.file_path);
    }
    if !decoded.function_name.is_empty() {
        if !location.is_empty() {
            location.push(':');
        }
        location.push_str(&decoded.function_name);
    }
    if decoded.has_line_range() {
        location.push_str(&format!(" ({}-{})", decoded.start_line, decoded.end_line));
    }

    let preview = preview(&decoded.body, PREVIEW_CHARS);
    if location.is_empty() {
        format!("{}. [{:.4}] {}", rank, result.distance, preview)
    } else {
        format!("{}. [{:.4}] {}\n    {}", rank, result.distance, location, preview)
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

fn print_results(results: &[SearchResult]) {
    if results.is_empty() {
        println!("No results.");
        return;
    }
    println!("Found {} example(s):", results.len());
    for (i, result) in results.iter().enumerate() {
        println!("  {}", format_result(i + 1, result));
    }
    println!();
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, cancelling");
            child.cancel();
        }
    });
    token
}

async fn connect_store(config: &Config) -> Result<ChromaStore> {
    let embedder = embedding::create_provider(&config.embedding)?;
    ChromaStore::connect(&config.store, embedder).await
}

/// Entry point for `companion query`.
pub async fn run_query(
    config: &Config,
    question: &str,
    limit: Option<usize>,
    prompt_only: bool,
) -> Result<()> {
    let generator = if prompt_only {
        None
    } else {
        let generator = OllamaGenerator::new(&config.llm)?;
        generator.check_model().await?;
        Some(generator)
    };

    let store = connect_store(config).await?;
    let cancel = cancel_on_ctrl_c();
    let k = limit.unwrap_or(config.retrieval.examples);
    let timeout = Duration::from_secs(config.retrieval.timeout_secs);

    let results = retrieve(&store, question, k, timeout, &cancel).await?;
    print_results(&results);

    let prompt = build_prompt(question, &results);
    match generator {
        None => println!("{}", prompt),
        Some(generator) => {
            let answer =
                generate_answer(&generator, &config.llm.system_prompt, &prompt, &cancel).await?;
            println!("{}", answer);
        }
    }
    Ok(())
}

/// Entry point for `companion search`: retrieval only.
pub async fn run_search(config: &Config, question: &str, limit: Option<usize>) -> Result<()> {
    let store = connect_store(config).await?;
    let cancel = cancel_on_ctrl_c();
    let k = limit.unwrap_or(config.retrieval.examples);
    let timeout = Duration::from_secs(config.retrieval.timeout_secs);

    let results = retrieve(&store, question, k, timeout, &cancel).await?;
    print_results(&results);
    Ok(())
}
