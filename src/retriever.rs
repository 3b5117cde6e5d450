use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt, stream};
use html2text::from_read;
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use crate::config::DocsConfig;
use crate::data_models::{ContentDetail, PageContent, SearchResponse, SearchResult};
use crate::error::{RetrievalError, Stage, make_snippet};

const TEXT_WIDTH: usize = 120;

/// Turns a question into the context blob handed to the model.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    async fn retrieve(&self, question: &str) -> Result<String, RetrievalError>;
}

/// Concatenates pages as `Title: <title>\n<body>\n\n`, keeping input order.
pub fn build_context(pages: &[PageContent]) -> String {
    let mut context = String::new();
    for page in pages {
        context.push_str("Title: ");
        context.push_str(&page.title);
        context.push('\n');
        context.push_str(&page.body);
        context.push_str("\n\n");
    }
    context
}

/// CQL full-text filter for `question`. Quotes and backslashes are escaped so the
/// question stays inside the string literal.
pub fn text_query(question: &str) -> String {
    let mut escaped = String::with_capacity(question.len());
    for c in question.chars() {
        if c == '"' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("text~\"{escaped}\"")
}

/// Retriever backed by the documentation service REST API.
pub struct WikiRetriever {
    client: reqwest::Client,
    base_url: Url,
    username: String,
    api_token: String,
    search_limit: usize,
    fetch_concurrency: usize,
    strip_markup: bool,
}

impl WikiRetriever {
    pub fn new(cfg: &DocsConfig, timeout: Duration) -> anyhow::Result<WikiRetriever> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build documentation HTTP client")?;
        Self::with_client(client, cfg)
    }

    pub fn with_client(client: reqwest::Client, cfg: &DocsConfig) -> anyhow::Result<WikiRetriever> {
        let base_url = Url::parse(cfg.base_url.trim())
            .with_context(|| format!("DOCS_BASE_URL is not a valid URL: {}", cfg.base_url))?;
        if base_url.cannot_be_a_base() {
            bail!("DOCS_BASE_URL cannot be used as a base URL: {}", cfg.base_url);
        }

        info!(
            base_url = %cfg.base_url,
            search_limit = cfg.search_limit,
            fetch_concurrency = cfg.fetch_concurrency,
            strip_markup = cfg.strip_markup,
            "wiki retriever initialized"
        );
        Ok(WikiRetriever {
            client,
            base_url,
            username: cfg.username.clone(),
            api_token: cfg.api_token.clone(),
            search_limit: cfg.search_limit.max(1),
            fetch_concurrency: cfg.fetch_concurrency.max(1),
            strip_markup: cfg.strip_markup,
        })
    }

    /// `base_url` plus `segments`, each segment percent-encoded on its own.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub async fn search(&self, question: &str) -> Result<Vec<SearchResult>, RetrievalError> {
        let url = self.endpoint(&["rest", "api", "search"]);
        let cql = text_query(question);
        let limit = self.search_limit.to_string();

        let response: SearchResponse = self
            .get_json(
                Stage::Search,
                url.as_str(),
                &[("cql", cql.as_str()), ("limit", limit.as_str())],
            )
            .await?;

        let results: Vec<SearchResult> = response
            .results
            .into_iter()
            .filter_map(|entry| {
                let result = entry.into_result();
                if result.is_none() {
                    warn!("skipping search entry without an id");
                }
                result
            })
            .collect();

        debug!(hits = results.len(), "search completed");
        Ok(results)
    }

    pub async fn fetch_page(&self, hit: &SearchResult) -> Result<PageContent, RetrievalError> {
        let url = self.endpoint(&["rest", "api", "content", hit.id.as_str()]);
        let detail: ContentDetail = self
            .get_json(Stage::Detail, url.as_str(), &[("expand", "body.storage")])
            .await?;

        let title = if hit.title.is_empty() {
            detail.title.clone().unwrap_or_default()
        } else {
            hit.title.clone()
        };
        let raw = detail.storage_value();
        let body = if self.strip_markup {
            self.to_plain_text(&hit.id, raw)
        } else {
            raw
        };

        Ok(PageContent { title, body })
    }

    fn to_plain_text(&self, page_id: &str, raw: String) -> String {
        match from_read(raw.as_bytes(), TEXT_WIDTH) {
            Ok(text) => text.trim_end().to_string(),
            Err(e) => {
                warn!(page_id, error = %e, "could not strip markup, using raw body");
                raw
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        stage: Stage,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, RetrievalError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .basic_auth(&self.username, Some(&self.api_token))
            .send()
            .await
            .map_err(|source| {
                error!(%stage, url, error = %source, "documentation service request failed");
                RetrievalError::Transport { stage, source }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);
            error!(
                %stage,
                %status,
                url,
                %snippet,
                "documentation service returned non-success status"
            );
            return Err(RetrievalError::Status {
                stage,
                status,
                url: url.to_string(),
                snippet,
            });
        }

        response.json::<T>().await.map_err(|source| {
            error!(%stage, url, error = %source, "failed to decode documentation service response");
            RetrievalError::Decode { stage, source }
        })
    }
}

#[async_trait]
impl ContextRetriever for WikiRetriever {
    async fn retrieve(&self, question: &str) -> Result<String, RetrievalError> {
        let started = Instant::now();
        let hits = self.search(question).await?;
        if hits.is_empty() {
            info!("no documentation pages matched");
            return Ok(String::new());
        }

        // `buffered` yields in input order whatever order the fetches finish in.
        let pages: Vec<PageContent> = stream::iter(hits)
            .map(|hit| async move { self.fetch_page(&hit).await })
            .buffered(self.fetch_concurrency)
            .try_collect()
            .await?;

        let context = build_context(&pages);
        info!(
            pages = pages.len(),
            context_len = context.len(),
            latency_ms = started.elapsed().as_millis(),
            "context assembled"
        );
        Ok(context)
    }
}
