use url::Url;

/// Normalizes a page URL to the bare hostname used as the tracking key.
/// Returns [None] for anything that is not a parsable http(s) URL; such
/// pages are simply not trackable.
pub fn extract_domain(raw_url: &str) -> Option<String> {
    let url = Url::parse(raw_url).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    let host = url.host_str()?;
    let domain = host.strip_prefix("www.").unwrap_or(host);
    if domain.is_empty() {
        return None;
    }
    Some(domain.to_owned())
}
