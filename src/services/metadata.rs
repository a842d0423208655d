use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use url::Url;

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>([^<]+)</title>").unwrap());
static DESCRIPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]*name=["']description["'][^>]*content=["']([^"']+)["']"#).unwrap()
});
static OG_DESCRIPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]*property=["']og:description["'][^>]*content=["']([^"']+)["']"#)
        .unwrap()
});
static OG_IMAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]*property=["']og:image["'][^>]*content=["']([^"']+)["']"#).unwrap()
});
static TWITTER_IMAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]*name=["']twitter:image["'][^>]*content=["']([^"']+)["']"#)
        .unwrap()
});

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Clone, Serialize)]
pub struct PageMetadata {
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl Default for PageMetadata {
    fn default() -> Self {
        PageMetadata {
            title: "Untitled".to_string(),
            description: None,
            thumbnail_url: None,
        }
    }
}

/// Best-effort page metadata scraper. Fetches the target page within a fixed
/// timeout and pattern-matches `<title>`/`<meta>` tags out of the raw HTML.
/// Every failure mode degrades to defaults; `fetch` never errors.
#[derive(Clone)]
pub struct MetadataFetcher {
    client: reqwest::Client,
}

impl MetadataFetcher {
    pub fn new(timeout_secs: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(MetadataFetcher { client })
    }

    pub async fn fetch(&self, url: &str) -> PageMetadata {
        let html = match self.fetch_body(url).await {
            Ok(body) if !body.is_empty() => body,
            Ok(_) => {
                tracing::debug!("Empty body from {}, using default metadata", url);
                return PageMetadata::default();
            }
            Err(e) => {
                tracing::debug!("Metadata fetch failed for {}: {}", url, e);
                return PageMetadata::default();
            }
        };

        parse_metadata(&html, url)
    }

    async fn fetch_body(&self, url: &str) -> Result<String, reqwest::Error> {
        self.client.get(url).send().await?.text().await
    }
}

/// Heuristic extraction over raw HTML: title from the first `<title>`
/// element, description from `meta[name=description]` falling back to
/// `og:description`, thumbnail from `og:image` falling back to
/// `twitter:image`. A relative thumbnail resolves against the page URL and is
/// dropped when resolution fails.
pub fn parse_metadata(html: &str, page_url: &str) -> PageMetadata {
    let title = TITLE_RE
        .captures(html)
        .map(|c| c[1].trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled".to_string());

    let description = DESCRIPTION_RE
        .captures(html)
        .or_else(|| OG_DESCRIPTION_RE.captures(html))
        .map(|c| c[1].trim().to_string());

    let thumbnail_url = OG_IMAGE_RE
        .captures(html)
        .or_else(|| TWITTER_IMAGE_RE.captures(html))
        .map(|c| c[1].trim().to_string())
        .and_then(|raw| resolve_thumbnail(&raw, page_url));

    PageMetadata {
        title,
        description,
        thumbnail_url,
    }
}

fn resolve_thumbnail(raw: &str, page_url: &str) -> Option<String> {
    if raw.starts_with("http") {
        return Some(raw.to_string());
    }
    let base = Url::parse(page_url).ok()?;
    base.join(raw).ok().map(|resolved| resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_title_and_resolves_relative_thumbnail() {
        let html = r#"
            <html><head>
            <title>Example Site</title>
            <meta property="og:image" content="/img.png">
            </head><body></body></html>
        "#;

        let metadata = parse_metadata(html, "https://example.com/page");
        assert_eq!(metadata.title, "Example Site");
        assert_eq!(
            metadata.thumbnail_url.as_deref(),
            Some("https://example.com/img.png")
        );
    }

    #[test]
    fn description_prefers_meta_name_over_og() {
        let html = r#"
            <meta name="description" content="plain description">
            <meta property="og:description" content="og description">
        "#;
        let metadata = parse_metadata(html, "https://example.com");
        assert_eq!(metadata.description.as_deref(), Some("plain description"));

        let og_only = r#"<meta property="og:description" content="og description">"#;
        let metadata = parse_metadata(og_only, "https://example.com");
        assert_eq!(metadata.description.as_deref(), Some("og description"));
    }

    #[test]
    fn thumbnail_falls_back_to_twitter_image() {
        let html = r#"<meta name="twitter:image" content="https://cdn.example.com/t.png">"#;
        let metadata = parse_metadata(html, "https://example.com");
        assert_eq!(
            metadata.thumbnail_url.as_deref(),
            Some("https://cdn.example.com/t.png")
        );
    }

    #[test]
    fn missing_tags_degrade_to_defaults() {
        let metadata = parse_metadata("<html><body>nothing here</body></html>", "https://x.com");
        assert_eq!(metadata.title, "Untitled");
        assert!(metadata.description.is_none());
        assert!(metadata.thumbnail_url.is_none());
    }

    #[test]
    fn unresolvable_relative_thumbnail_is_dropped() {
        let html = r#"<meta property="og:image" content="/img.png">"#;
        let metadata = parse_metadata(html, "not a parseable base");
        assert!(metadata.thumbnail_url.is_none());
    }

    #[tokio::test]
    async fn fetch_failure_returns_defaults() {
        let fetcher = MetadataFetcher::new(1).unwrap();
        // Nothing listens on this port; the connection error must be absorbed
        let metadata = fetcher.fetch("http://127.0.0.1:9/").await;
        assert_eq!(metadata.title, "Untitled");
        assert!(metadata.description.is_none());
        assert!(metadata.thumbnail_url.is_none());
    }
}
