//! HTML link discovery: fetch a page, extract same-domain
//! anchor targets, normalize and filter them.

use std::time::Duration;

use common::{error::AppError, url_guard::ensure_url_allowed};
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredLink {
    pub url: String,
    pub anchor_text: Option<String>,
}

const DISALLOWED_SCHEMES: &[&str] = &["mailto", "javascript", "tel", "ftp", "data"];

pub struct LinkDiscoverer {
    client: reqwest::Client,
}

impl Default for LinkDiscoverer {
    fn default() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .user_agent("NTLMCrawler/1.0")
                .redirect(reqwest::redirect::Policy::limited(10))
                .build()
                .unwrap_or_default(),
        }
    }
}

impl LinkDiscoverer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn discover_links(
        &self,
        url: &str,
        domain: &str,
        include: Option<&str>,
        exclude: Option<&str>,
    ) -> Result<Vec<DiscoveredLink>, AppError> {
        let base = Url::parse(url).map_err(|e| AppError::validation(format!("invalid URL: {e}")))?;
        ensure_url_allowed(&base)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::external(format!("fetch failed for {url}: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::external(format!(
                "fetch for {url} returned status {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::external(format!("body read failed for {url}: {e}")))?;

        let include_re = include
            .map(Regex::new)
            .transpose()
            .map_err(|e| AppError::validation(format!("invalid include pattern: {e}")))?;
        let exclude_re = exclude
            .map(Regex::new)
            .transpose()
            .map_err(|e| AppError::validation(format!("invalid exclude pattern: {e}")))?;

        Ok(extract_links(&body, &base, domain, include_re.as_ref(), exclude_re.as_ref()))
    }
}

fn extract_links(
    html: &str,
    base: &Url,
    domain: &str,
    include: Option<&Regex>,
    exclude: Option<&Regex>,
) -> Vec<DiscoveredLink> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a").expect("static selector is valid");

    let mut seen = std::collections::HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let trimmed = href.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((scheme, _)) = trimmed.split_once(':') {
            if DISALLOWED_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str()) {
                continue;
            }
        }

        let Ok(mut resolved) = base.join(trimmed) else {
            continue;
        };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            continue;
        }
        resolved.set_fragment(None);

        let normalized = resolved.to_string();
        if !seen.insert(normalized.clone()) {
            continue;
        }

        if resolved.host_str() != Some(domain) {
            continue;
        }
        if let Some(pattern) = include {
            if !pattern.is_match(&normalized) {
                continue;
            }
        }
        if let Some(pattern) = exclude {
            if pattern.is_match(&normalized) {
                continue;
            }
        }

        let anchor_text = element.text().collect::<String>();
        let anchor_text = if anchor_text.trim().is_empty() {
            None
        } else {
            Some(anchor_text.trim().to_string())
        };

        links.push(DiscoveredLink {
            url: normalized,
            anchor_text,
        });
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/articles/").expect("base url")
    }

    #[test]
    fn keeps_only_same_domain_links_and_drops_fragments() {
        let html = r##"
            <a href="/articles/one">One</a>
            <a href="https://other.com/x">Other domain</a>
            <a href="#section">Fragment only</a>
            <a href="mailto:a@example.com">Mail</a>
            <a href="two?query=1#frag">Two</a>
        "##;
        let links = extract_links(html, &base_url(), "example.com", None, None);
        let urls: Vec<_> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://example.com/articles/one", "https://example.com/articles/two?query=1"]
        );
    }

    #[test]
    fn deduplicates_by_normalized_url_keeping_first_occurrence() {
        let html = r#"
            <a href="/articles/one">First</a>
            <a href="/articles/one">Second</a>
        "#;
        let links = extract_links(html, &base_url(), "example.com", None, None);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].anchor_text.as_deref(), Some("First"));
    }

    #[test]
    fn include_and_exclude_patterns_filter_results() {
        let html = r#"
            <a href="/articles/keep-me">Keep</a>
            <a href="/articles/skip-me">Skip</a>
            <a href="/other/keep-me">Other</a>
        "#;
        let links = extract_links(
            html,
            &base_url(),
            "example.com",
            Some(&Regex::new("/articles/").unwrap()),
            Some(&Regex::new("skip").unwrap()),
        );
        let urls: Vec<_> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.com/articles/keep-me"]);
    }
}
