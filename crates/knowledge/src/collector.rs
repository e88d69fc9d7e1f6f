//! Medical literature collector.
//!
//! Fetches article abstracts for a list of topic queries from the Europe PMC
//! REST search API and writes them as corpus records:
//! `{id: pmid, title, text: abstract, source: "PubMed", domain: topic}`.
//!
//! Each topic is attempted a fixed number of times with a fixed delay; a
//! topic that keeps failing (or returns nothing) is reported and skipped.

use crate::loader::save_jsonl;
use crate::types::Document;
use medrag_core::config::CollectorConfig;
use medrag_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Source label of collected records.
pub const COLLECTED_SOURCE: &str = "PubMed";

/// Fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

/// Run `operation` until it succeeds or `policy.max_attempts` is reached,
/// sleeping `policy.delay` between attempts. Returns the last error.
pub async fn retry_with_fixed_delay<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_attempts => {
                warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    label, attempt, policy.max_attempts, e, policy.delay
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[derive(Debug, Serialize)]
struct SearchParams<'a> {
    query: &'a str,
    format: &'a str,
    #[serde(rename = "pageSize")]
    page_size: u32,
    #[serde(rename = "resultType")]
    result_type: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    result_list: Option<ResultList>,
}

#[derive(Debug, Deserialize)]
struct ResultList {
    #[serde(default)]
    result: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResult {
    #[serde(default)]
    pmid: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    abstract_text: Option<String>,
}

/// Outcome of a collection run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectReport {
    /// Records written
    pub articles: usize,

    /// Topics that produced records
    pub succeeded_topics: Vec<String>,

    /// Topics given up on after the retry limit
    pub failed_topics: Vec<String>,

    /// Articles already collected under an earlier topic
    pub duplicates: usize,

    /// Output file, when anything was written
    pub output: Option<PathBuf>,
}

/// Europe PMC article collector.
#[derive(Debug, Clone)]
pub struct ArticleCollector {
    client: Client,
    endpoint: String,
    max_results: u32,
    retry: RetryPolicy,
}

impl ArticleCollector {
    pub fn new(config: &CollectorConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| {
                AppError::Knowledge(format!("Failed to create HTTP client for collector: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            max_results: config.max_results.max(1),
            retry: RetryPolicy::new(
                config.retry_limit,
                Duration::from_secs(config.retry_delay_secs),
            ),
        })
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch every topic and write the records to `output`.
    ///
    /// Nothing is written when no topic produced records.
    pub async fn collect(&self, topics: &[String], output: &Path) -> AppResult<CollectReport> {
        let mut report = CollectReport::default();
        let mut documents = Vec::new();
        let mut seen = HashSet::new();

        for topic in topics {
            let label = format!("Search for '{}'", topic);
            match retry_with_fixed_delay(&self.retry, &label, || self.fetch_topic(topic)).await {
                Ok(found) => {
                    let fetched = found.len();
                    let added = push_unique(&mut documents, &mut seen, found);
                    report.duplicates += fetched - added;
                    info!(
                        topic = %topic,
                        articles = added,
                        skipped = fetched - added,
                        "Collected articles"
                    );
                    report.succeeded_topics.push(topic.clone());
                }
                Err(e) => {
                    warn!(topic = %topic, error = %e, "Giving up on topic");
                    report.failed_topics.push(topic.clone());
                }
            }
        }

        if documents.is_empty() {
            warn!("No articles collected");
            return Ok(report);
        }

        report.articles = save_jsonl(output, &documents)?;
        report.output = Some(output.to_path_buf());

        info!(
            articles = report.articles,
            duplicates = report.duplicates,
            failed = report.failed_topics.len(),
            "Saved collected articles to {:?}",
            output
        );

        Ok(report)
    }

    /// Fetch one topic. An empty result counts as a failure.
    #[instrument(skip(self), fields(max_results = self.max_results))]
    pub async fn fetch_topic(&self, topic: &str) -> AppResult<Vec<Document>> {
        let params = SearchParams {
            query: topic,
            format: "json",
            page_size: self.max_results,
            result_type: "core",
        };

        let response = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await
            .map_err(|e| AppError::Knowledge(format!("Search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Knowledge(format!(
                "Search API error ({}) for '{}'",
                status, topic
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::Knowledge(format!("Failed to parse search response: {}", e)))?;

        let documents = to_documents(body, topic);
        if documents.is_empty() {
            return Err(AppError::NotFound(format!("No articles found for '{}'", topic)));
        }

        Ok(documents)
    }
}

/// Map search results to corpus records.
///
/// Results without a PubMed id, or without title and abstract, are dropped.
/// A title without an abstract becomes the record text.
fn to_documents(body: SearchResponse, topic: &str) -> Vec<Document> {
    body.result_list
        .map(|list| list.result)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|result| {
            let title = clean(result.title);
            let abstract_text = clean(result.abstract_text);
            let id = clean(result.pmid)?;

            let (title, text) = match (title, abstract_text) {
                (title, Some(text)) => (title.unwrap_or_default(), text),
                (Some(title), None) => (String::new(), title),
                (None, None) => return None,
            };

            Some(
                Document::new(id, text)
                    .with_title(title)
                    .with_source(COLLECTED_SOURCE)
                    .with_domain(topic),
            )
        })
        .collect()
}

/// Append the documents whose id is not in `seen`; returns how many were kept.
fn push_unique(
    documents: &mut Vec<Document>,
    seen: &mut HashSet<String>,
    found: Vec<Document>,
) -> usize {
    let before = documents.len();
    documents.extend(found.into_iter().filter(|doc| seen.insert(doc.id.clone())));
    documents.len() - before
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
