//! Sitemap reading: local file or URL, urlset or sitemapindex roots.
//!
//! Sitemap indices are walked breadth-first with a visited set and a depth
//! cap, so a self-referencing index cannot loop the reader. A payload with
//! no XML root is tolerated as a plain whitespace-separated URL list.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use quick_xml::events::Event;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Nested sitemap indices deeper than this are skipped.
const MAX_INDEX_DEPTH: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapEntry {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastmod: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changefreq: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<f64>,
}

/// One parsed sitemap document.
enum SitemapDocument {
    UrlSet(Vec<SitemapEntry>),
    Index(Vec<String>),
    PlainText(Vec<SitemapEntry>),
}

pub struct SitemapReader {
    client: Client,
}

impl SitemapReader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Read a sitemap from a local path or URL, following nested indices.
    ///
    /// Entries are de-duplicated by URL string across nested sitemaps;
    /// first occurrence wins.
    pub async fn read(&self, source: &str) -> Result<Vec<SitemapEntry>> {
        let mut entries = Vec::new();
        let mut seen_urls = HashSet::new();
        let mut visited_sitemaps = HashSet::new();
        let mut queue = vec![(source.to_string(), 0usize)];
        let mut is_root = true;

        while let Some((location, depth)) = queue.pop() {
            if !visited_sitemaps.insert(location.clone()) {
                log::debug!("[SITEMAP] Skipping already visited sitemap: {}", location);
                continue;
            }

            let text = match self.load(&location).await {
                Ok(text) => text,
                Err(e) if is_root => return Err(e),
                Err(e) => {
                    log::warn!("[SITEMAP] Failed to load nested sitemap {}: {}", location, e);
                    continue;
                }
            };

            let document = match parse_document(&text) {
                Ok(document) => document,
                Err(e) if is_root => return Err(e),
                Err(e) => {
                    log::warn!("[SITEMAP] Skipping malformed nested sitemap {}: {}", location, e);
                    continue;
                }
            };
            is_root = false;

            match document {
                SitemapDocument::UrlSet(batch) | SitemapDocument::PlainText(batch) => {
                    for entry in batch {
                        if seen_urls.insert(entry.url.clone()) {
                            entries.push(entry);
                        }
                    }
                }
                SitemapDocument::Index(children) => {
                    if depth + 1 > MAX_INDEX_DEPTH {
                        log::warn!(
                            "[SITEMAP] Index nesting exceeds depth {} at {}, skipping {} children",
                            MAX_INDEX_DEPTH,
                            location,
                            children.len()
                        );
                        continue;
                    }
                    for child in children {
                        queue.push((child, depth + 1));
                    }
                }
            }
        }

        log::info!("[SITEMAP] {} entries from {}", entries.len(), source);
        Ok(entries)
    }

    async fn load(&self, location: &str) -> Result<String> {
        if is_http_url(location) {
            let response = self
                .client
                .get(location)
                .send()
                .await
                .with_context(|| format!("Failed to fetch sitemap {location}"))?;
            let text = response
                .text()
                .await
                .with_context(|| format!("Failed to read sitemap body from {location}"))?;
            Ok(text)
        } else {
            let text = tokio::fs::read_to_string(Path::new(location))
                .await
                .with_context(|| format!("Failed to read sitemap file {location}"))?;
            Ok(text)
        }
    }
}

fn is_http_url(source: &str) -> bool {
    matches!(Url::parse(source), Ok(u) if u.scheme() == "http" || u.scheme() == "https")
}

/// Parse one sitemap payload into a urlset, an index, or a plain URL list.
fn parse_document(text: &str) -> Result<SitemapDocument> {
    let mut reader = quick_xml::Reader::from_str(text);
    let mut buf = Vec::new();

    // The first start element decides the document kind.
    let root = loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => break Some(e.local_name().as_ref().to_vec()),
            Ok(Event::Eof) => break None,
            Ok(_) => {}
            Err(_) => break None,
        }
    };

    match root.as_deref() {
        Some(b"urlset") => Ok(SitemapDocument::UrlSet(parse_urlset(text))),
        Some(b"sitemapindex") => Ok(SitemapDocument::Index(parse_index(text))),
        Some(other) => Err(AppError::input_format(format!(
            "Unknown sitemap root element <{}>",
            String::from_utf8_lossy(other)
        ))),
        None => {
            // No XML at all: tolerate a plain whitespace-separated URL list.
            let entries: Vec<SitemapEntry> = text
                .split_whitespace()
                .filter(|token| is_http_url(token))
                .map(|token| SitemapEntry {
                    url: token.to_string(),
                    lastmod: None,
                    changefreq: None,
                    priority: None,
                })
                .collect();
            if entries.is_empty() {
                Err(AppError::input_format(
                    "Sitemap is neither XML nor a URL list",
                ))
            } else {
                Ok(SitemapDocument::PlainText(entries))
            }
        }
    }
}

fn parse_urlset(text: &str) -> Vec<SitemapEntry> {
    let mut reader = quick_xml::Reader::from_str(text);
    let mut entries = Vec::new();
    let mut buf = Vec::new();
    let mut current: Option<SitemapEntry> = None;
    let mut field: Option<Vec<u8>> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"url" => {
                    current = Some(SitemapEntry {
                        url: String::new(),
                        lastmod: None,
                        changefreq: None,
                        priority: None,
                    });
                }
                name @ (b"loc" | b"lastmod" | b"changefreq" | b"priority") => {
                    field = Some(name.to_vec());
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if let (Some(entry), Some(field_name)) = (current.as_mut(), field.as_deref()) {
                    match e.unescape() {
                        Ok(text) => {
                            let text = text.trim().to_string();
                            match field_name {
                                b"loc" => entry.url = text,
                                b"lastmod" => entry.lastmod = Some(text),
                                b"changefreq" => entry.changefreq = Some(text),
                                b"priority" => match text.parse::<f64>() {
                                    Ok(priority) => entry.priority = Some(priority),
                                    Err(_) => {
                                        log::warn!("[SITEMAP] Unparseable priority {:?}", text)
                                    }
                                },
                                _ => {}
                            }
                        }
                        Err(e) => log::warn!("[SITEMAP] Undecodable text in sitemap: {}", e),
                    }
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"url" => {
                    if let Some(entry) = current.take() {
                        if entry.url.is_empty() {
                            log::warn!("[SITEMAP] Skipping <url> entry without <loc>");
                        } else {
                            entries.push(entry);
                        }
                    }
                }
                b"loc" | b"lastmod" | b"changefreq" | b"priority" => field = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                log::warn!("[SITEMAP] XML error, stopping entry scan: {}", e);
                break;
            }
        }
        buf.clear();
    }

    entries
}

fn parse_index(text: &str) -> Vec<String> {
    let mut reader = quick_xml::Reader::from_str(text);
    let mut children = Vec::new();
    let mut buf = Vec::new();
    let mut in_loc = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"loc" => in_loc = true,
            Ok(Event::Text(e)) if in_loc => {
                if let Ok(text) = e.unescape() {
                    children.push(text.trim().to_string());
                }
                in_loc = false;
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"loc" => in_loc = false,
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                log::warn!("[SITEMAP] XML error in index, stopping: {}", e);
                break;
            }
        }
        buf.clear();
    }

    children
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn reader() -> SitemapReader {
        SitemapReader::new(Client::new())
    }

    const URLSET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url>
    <loc>https://example.com/</loc>
    <lastmod>2024-01-15</lastmod>
    <changefreq>daily</changefreq>
    <priority>0.8</priority>
  </url>
  <url>
    <loc>https://example.com/about</loc>
  </url>
</urlset>"#;

    #[tokio::test]
    async fn parses_urlset_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(URLSET.as_bytes()).unwrap();

        let entries = reader()
            .read(file.path().to_str().unwrap())
            .await
            .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].url, "https://example.com/");
        assert_eq!(entries[0].lastmod.as_deref(), Some("2024-01-15"));
        assert_eq!(entries[0].changefreq.as_deref(), Some("daily"));
        assert_eq!(entries[0].priority, Some(0.8));
        assert_eq!(entries[1].url, "https://example.com/about");
        assert_eq!(entries[1].priority, None);
    }

    #[tokio::test]
    async fn follows_sitemap_index() {
        let mut server = mockito::Server::new_async().await;
        let index = format!(
            r#"<sitemapindex>
<sitemap><loc>{0}/a.xml</loc></sitemap>
<sitemap><loc>{0}/b.xml</loc></sitemap>
</sitemapindex>"#,
            server.url()
        );

        let _root = server
            .mock("GET", "/sitemap.xml")
            .with_status(200)
            .with_body(&index)
            .create_async()
            .await;
        let _a = server
            .mock("GET", "/a.xml")
            .with_status(200)
            .with_body("<urlset><url><loc>https://example.com/a</loc></url></urlset>")
            .create_async()
            .await;
        let _b = server
            .mock("GET", "/b.xml")
            .with_status(200)
            .with_body(
                "<urlset><url><loc>https://example.com/b</loc></url>\
                 <url><loc>https://example.com/a</loc></url></urlset>",
            )
            .create_async()
            .await;

        let mut entries = reader()
            .read(&format!("{}/sitemap.xml", server.url()))
            .await
            .unwrap();
        entries.sort_by(|a, b| a.url.cmp(&b.url));

        // /a appears in both nested sitemaps but is kept once
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].url, "https://example.com/a");
        assert_eq!(entries[1].url, "https://example.com/b");
    }

    #[tokio::test]
    async fn self_referencing_index_terminates() {
        let mut server = mockito::Server::new_async().await;
        let body = format!(
            "<sitemapindex><sitemap><loc>{}/sitemap.xml</loc></sitemap></sitemapindex>",
            server.url()
        );
        let _root = server
            .mock("GET", "/sitemap.xml")
            .with_status(200)
            .with_body(&body)
            .expect(1)
            .create_async()
            .await;

        let entries = reader()
            .read(&format!("{}/sitemap.xml", server.url()))
            .await
            .unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn unknown_root_is_invalid_format() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"<html><body>not a sitemap</body></html>")
            .unwrap();

        let err = reader()
            .read(file.path().to_str().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InputFormat(_)));
    }

    #[tokio::test]
    async fn plain_url_list_is_tolerated() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"https://example.com/one\nhttps://example.com/two\n")
            .unwrap();

        let entries = reader()
            .read(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].url, "https://example.com/two");
    }

    #[tokio::test]
    async fn entry_without_loc_is_skipped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"<urlset><url><lastmod>2024-01-01</lastmod></url>\
              <url><loc>https://example.com/kept</loc></url></urlset>",
        )
        .unwrap();

        let entries = reader()
            .read(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "https://example.com/kept");
    }
}
