use url::Url;

/// Canonicalize a URL for equality lookups.
///
/// Lowercases the host, strips a leading `www.`, removes the trailing slash
/// from the path (unless the path is exactly `/`), and drops the query
/// string and fragment. The scheme is kept as-is. Unparseable input is
/// returned unchanged.
///
/// Only used for comparisons; original URLs are preserved in all
/// user-visible output.
pub fn normalize(raw: &str) -> String {
    let Ok(parsed) = Url::parse(raw) else {
        return raw.to_string();
    };

    let Some(host) = parsed.host_str() else {
        return raw.to_string();
    };

    let host = host.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();

    let mut path = parsed.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        path.pop();
    }

    match parsed.port() {
        Some(port) => format!("{}://{}:{}{}", parsed.scheme(), host, port, path),
        None => format!("{}://{}{}", parsed.scheme(), host, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_host_and_strips_www() {
        assert_eq!(
            normalize("http://www.Example.com/a/"),
            "http://example.com/a"
        );
        assert_eq!(normalize("http://example.com/a"), "http://example.com/a");
    }

    #[test]
    fn keeps_root_slash() {
        assert_eq!(normalize("https://example.com/"), "https://example.com/");
    }

    #[test]
    fn drops_query_and_fragment() {
        assert_eq!(
            normalize("https://example.com/page?utm=1#top"),
            "https://example.com/page"
        );
    }

    #[test]
    fn keeps_scheme_and_port() {
        assert_eq!(
            normalize("http://example.com:8080/a/"),
            "http://example.com:8080/a"
        );
    }

    #[test]
    fn returns_unparseable_input_unchanged() {
        assert_eq!(normalize("not a url"), "not a url");
    }

    #[test]
    fn normalization_is_idempotent() {
        let urls = [
            "https://www.Example.com/A/b/",
            "http://example.com/",
            "https://example.com/page?q=1",
            "garbage",
        ];
        for url in urls {
            let once = normalize(url);
            assert_eq!(normalize(&once), once, "not idempotent for {url}");
        }
    }

    #[test]
    fn equivalence_classes_collapse() {
        // www-stripping, host case, and trailing slash all land on one form
        assert_eq!(
            normalize("http://www.Example.com/a/"),
            normalize("http://example.com/a")
        );
    }
}
