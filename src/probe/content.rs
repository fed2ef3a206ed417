//! Static-mode page content extraction.
//!
//! Parses the response body with an HTML parser; no script execution. The
//! headless rendering mode lives in the `headless` module and produces the
//! same `PageContent` shape from DOM queries.

use std::collections::HashMap;
use std::sync::OnceLock;

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadingSummary {
    pub h1_count: usize,
    pub h2_count: usize,
    pub h3_count: usize,
    pub h1_text: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,
    pub og_tags: HashMap<String, String>,
    pub headings: HeadingSummary,
    pub structured_data: bool,
    pub internal_link_count: usize,
    pub external_link_count: usize,
}

/// Extract SEO-relevant content from a rendered HTML document.
pub fn extract_page_content(html: &str, page_url: &str) -> PageContent {
    let document = Html::parse_document(html);

    let (internal, external) = count_links(&document, page_url);

    PageContent {
        title: extract_title(&document),
        description: extract_meta_content(&document, "description"),
        canonical_url: extract_canonical(&document),
        og_tags: extract_og_tags(&document),
        headings: extract_headings(&document),
        structured_data: has_structured_data(&document),
        internal_link_count: internal,
        external_link_count: external,
    }
}

fn extract_title(document: &Html) -> Option<String> {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    let selector = SELECTOR.get_or_init(|| Selector::parse("title").unwrap());
    document
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_meta_content(document: &Html, name: &str) -> Option<String> {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    let selector = SELECTOR.get_or_init(|| Selector::parse("meta[name]").unwrap());
    document
        .select(selector)
        .find(|el| {
            el.value()
                .attr("name")
                .map(|n| n.eq_ignore_ascii_case(name))
                .unwrap_or(false)
        })
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_canonical(document: &Html) -> Option<String> {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    let selector = SELECTOR.get_or_init(|| Selector::parse("link[rel='canonical']").unwrap());
    document
        .select(selector)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_og_tags(document: &Html) -> HashMap<String, String> {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    let selector = SELECTOR.get_or_init(|| Selector::parse("meta[property^='og:']").unwrap());
    document
        .select(selector)
        .filter_map(|el| {
            let property = el.value().attr("property")?;
            let content = el.value().attr("content")?;
            Some((property.to_string(), content.to_string()))
        })
        .collect()
}

fn extract_headings(document: &Html) -> HeadingSummary {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    let selector = SELECTOR.get_or_init(|| Selector::parse("h1, h2, h3").unwrap());

    let mut summary = HeadingSummary::default();
    for element in document.select(selector) {
        match element.value().name() {
            "h1" => {
                summary.h1_count += 1;
                let text = element.text().collect::<String>().trim().to_string();
                if !text.is_empty() {
                    summary.h1_text.push(text);
                }
            }
            "h2" => summary.h2_count += 1,
            "h3" => summary.h3_count += 1,
            _ => {}
        }
    }
    summary
}

fn has_structured_data(document: &Html) -> bool {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    let selector =
        SELECTOR.get_or_init(|| Selector::parse("script[type='application/ld+json']").unwrap());
    document.select(selector).next().is_some()
}

fn count_links(document: &Html, page_url: &str) -> (usize, usize) {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    let selector = SELECTOR.get_or_init(|| Selector::parse("a[href]").unwrap());

    let base = Url::parse(page_url).ok();
    let base_host = base.as_ref().and_then(|u| u.host_str()).map(str::to_string);

    let mut internal = 0;
    let mut external = 0;

    for element in document.select(selector) {
        let Some(href) = element.value().attr("href").map(str::trim) else {
            continue;
        };
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
        {
            continue;
        }

        let resolved = match &base {
            Some(base) => base.join(href).ok(),
            None => Url::parse(href).ok(),
        };

        match resolved {
            Some(link) if link.host_str().map(str::to_string) == base_host => internal += 1,
            Some(_) => external += 1,
            None => {}
        }
    }

    (internal, external)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"<html>
<head>
  <title> Widget Shop </title>
  <meta name="Description" content="All the widgets you need">
  <link rel="canonical" href="https://example.com/shop">
  <meta property="og:title" content="Widget Shop">
  <meta property="og:image" content="https://example.com/og.png">
  <script type="application/ld+json">{"@type":"Store"}</script>
</head>
<body>
  <h1>Widgets</h1>
  <h2>Popular</h2>
  <h2>New</h2>
  <h3>Blue</h3>
  <a href="/shop/blue">Blue</a>
  <a href="https://example.com/shop/red">Red</a>
  <a href="https://elsewhere.com/">Elsewhere</a>
  <a href="#top">Top</a>
  <a href="mailto:hi@example.com">Mail</a>
</body>
</html>"##;

    #[test]
    fn extracts_all_fields() {
        let content = extract_page_content(PAGE, "https://example.com/shop");

        assert_eq!(content.title.as_deref(), Some("Widget Shop"));
        assert_eq!(
            content.description.as_deref(),
            Some("All the widgets you need")
        );
        assert_eq!(
            content.canonical_url.as_deref(),
            Some("https://example.com/shop")
        );
        assert_eq!(content.og_tags.len(), 2);
        assert_eq!(content.og_tags["og:title"], "Widget Shop");
        assert_eq!(content.headings.h1_count, 1);
        assert_eq!(content.headings.h2_count, 2);
        assert_eq!(content.headings.h3_count, 1);
        assert_eq!(content.headings.h1_text, vec!["Widgets"]);
        assert!(content.structured_data);
        assert_eq!(content.internal_link_count, 2);
        assert_eq!(content.external_link_count, 1);
    }

    #[test]
    fn empty_page_yields_defaults() {
        let content = extract_page_content("<html></html>", "https://example.com/");
        assert!(content.title.is_none());
        assert!(content.description.is_none());
        assert!(!content.structured_data);
        assert_eq!(content.headings.h1_count, 0);
    }
}
