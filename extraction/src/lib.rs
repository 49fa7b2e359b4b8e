//! Content extraction: a composite of ordered extractors,
//! each either a network-based reader or a local HTML-to-text fallback.
//! The composite tries each in order, swallowing `ExternalService`
//! failures from one to try the next, and only raises once all have
//! failed.

use std::time::Duration;

use async_trait::async_trait;
use common::{error::AppError, url_guard::ensure_url_allowed};
use dom_smoothie::{Config as ReadabilityConfig, Readability, TextMode};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedContent {
    pub url: String,
    pub title: Option<String>,
    pub content: String,
    pub content_hash: String,
    pub word_count: usize,
}

impl ExtractedContent {
    #[must_use]
    pub fn new(url: String, title: Option<String>, content: String) -> Self {
        let content_hash = format!("{:x}", Sha256::digest(content.as_bytes()));
        let word_count = content.split_whitespace().count();
        Self {
            url,
            title,
            content,
            content_hash,
            word_count,
        }
    }
}

#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<ExtractedContent, AppError>;
    fn supports(&self, url: &str) -> bool;
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent("NTLMCrawler/1.0")
        .build()
        .unwrap_or_default()
}

/// Primary extractor: the Jina Reader API (`r.jina.ai`). Only
/// `supports` a URL when an API key has been configured.
pub struct JinaReaderExtractor {
    api_key: String,
    client: reqwest::Client,
}

impl JinaReaderExtractor {
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: http_client(),
        }
    }
}

#[async_trait]
impl ContentExtractor for JinaReaderExtractor {
    fn supports(&self, _url: &str) -> bool {
        !self.api_key.is_empty()
    }

    async fn extract(&self, url: &str) -> Result<ExtractedContent, AppError> {
        let parsed = url::Url::parse(url).map_err(|e| AppError::validation(format!("invalid URL: {e}")))?;
        ensure_url_allowed(&parsed)?;

        let reader_url = format!("https://r.jina.ai/{url}");
        let response = self
            .client
            .get(reader_url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| AppError::external(format!("jina reader request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::external(format!(
                "jina reader returned status {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::external(format!("jina reader body read failed: {e}")))?;

        let (title, content) = parse_jina_response(&body);
        Ok(ExtractedContent::new(url.to_string(), title, content))
    }
}

fn parse_jina_response(body: &str) -> (Option<String>, String) {
    if let Some(rest) = body.strip_prefix("Title: ") {
        if let Some((title_line, remainder)) = rest.split_once('\n') {
            let content = remainder
                .split_once("Markdown Content:")
                .map_or_else(|| remainder.to_string(), |(_, c)| c.trim_start().to_string());
            return (Some(title_line.trim().to_string()), content);
        }
    }
    (None, body.to_string())
}

/// Local fallback: fetches the page itself and runs a
/// trafilatura-like readability pass over the raw HTML.
pub struct ReadabilityExtractor {
    client: reqwest::Client,
}

impl Default for ReadabilityExtractor {
    fn default() -> Self {
        Self {
            client: http_client(),
        }
    }
}

impl ReadabilityExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentExtractor for ReadabilityExtractor {
    fn supports(&self, url: &str) -> bool {
        url::Url::parse(url).is_ok()
    }

    async fn extract(&self, url: &str) -> Result<ExtractedContent, AppError> {
        let parsed = url::Url::parse(url).map_err(|e| AppError::validation(format!("invalid URL: {e}")))?;
        ensure_url_allowed(&parsed)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::external(format!("fetch failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::external(format!(
                "fetch returned status {}",
                response.status()
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| AppError::external(format!("body read failed: {e}")))?;

        let config = ReadabilityConfig {
            text_mode: TextMode::Markdown,
            ..Default::default()
        };
        let mut readability = Readability::new(html, Some(url), Some(config))
            .map_err(|e| AppError::external(format!("readability init failed: {e}")))?;
        let article = readability
            .parse()
            .map_err(|e| AppError::external(format!("readability parse failed: {e}")))?;

        let title = if article.title.is_empty() {
            None
        } else {
            Some(article.title.clone())
        };
        Ok(ExtractedContent::new(url.to_string(), title, article.text_content.into()))
    }
}

/// Tries each extractor in order, skipping those that don't `supports`
/// the URL, and continuing past `ExternalService` failures.
pub struct CompositeExtractor {
    extractors: Vec<Box<dyn ContentExtractor>>,
}

impl CompositeExtractor {
    #[must_use]
    pub fn new(extractors: Vec<Box<dyn ContentExtractor>>) -> Self {
        Self { extractors }
    }
}

#[async_trait]
impl ContentExtractor for CompositeExtractor {
    fn supports(&self, url: &str) -> bool {
        self.extractors.iter().any(|e| e.supports(url))
    }

    async fn extract(&self, url: &str) -> Result<ExtractedContent, AppError> {
        let mut errors = Vec::new();
        for extractor in &self.extractors {
            if !extractor.supports(url) {
                continue;
            }
            match extractor.extract(url).await {
                Ok(content) => return Ok(content),
                Err(AppError::ExternalService(message)) => errors.push(message),
                Err(other) => return Err(other),
            }
        }
        Err(AppError::external(format!(
            "all content extractors failed for {url}: {}",
            errors.join("; ")
        )))
    }
}
