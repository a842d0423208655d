use url::Url;

/// Prefixes `https://` when the raw input carries no scheme. Anything the
/// user pastes is accepted; full validation happens when the metadata
/// fetcher actually requests the page.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// Host of the URL minus a leading "www.", or None when the URL does not
/// parse or has no host.
pub fn extract_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

/// Initial title for a freshly saved link: the domain when one can be
/// derived, otherwise the URL truncated to 50 characters.
pub fn placeholder_title(url: &str, domain: Option<&str>) -> String {
    if let Some(domain) = domain {
        return domain.to_string();
    }
    let chars: Vec<char> = url.chars().collect();
    if chars.len() > 50 {
        format!("{}...", chars[..50].iter().collect::<String>())
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_adds_https_scheme() {
        assert_eq!(normalize_url("example.com"), "https://example.com");
        assert_eq!(normalize_url("  example.com/a  "), "https://example.com/a");
        assert_eq!(normalize_url("http://example.com"), "http://example.com");
        assert_eq!(normalize_url("https://example.com"), "https://example.com");
    }

    #[test]
    fn domain_strips_www_and_path() {
        assert_eq!(
            extract_domain("https://www.example.com/path"),
            Some("example.com".to_string())
        );
        assert_eq!(
            extract_domain("https://sub.example.com"),
            Some("sub.example.com".to_string())
        );
        assert_eq!(extract_domain("not a url"), None);
    }

    #[test]
    fn placeholder_prefers_domain() {
        assert_eq!(
            placeholder_title("https://example.com/x", Some("example.com")),
            "example.com"
        );
    }

    #[test]
    fn placeholder_truncates_long_urls() {
        let url = format!("https://{}", "a".repeat(100));
        let title = placeholder_title(&url, None);
        assert_eq!(title.chars().count(), 53);
        assert!(title.ends_with("..."));

        let short = "https://x";
        assert_eq!(placeholder_title(short, None), short);
    }
}
