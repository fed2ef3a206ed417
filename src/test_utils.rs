//! Shared test fixtures: deterministic probe/auditor mocks and sample
//! inputs.

use std::io::Write;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::TimeZone;
use tempfile::NamedTempFile;
use url::Url;

use crate::domain::{Project, ProjectStatus, Stage};
use crate::error::Result;
use crate::headless::{
    DeviceClass, MobileTestResult, PerfMetrics, PerformanceAudit, SiteAuditor, ViewportResult,
};
use crate::probe::{
    BatchProgress, HeadingSummary, PageContent, ProbeResult, ProgressFn, UrlProber,
};
use crate::store::{MemoryProjectStore, ProjectStore};

pub const OLD_SITEMAP: &str = r#"<urlset>
<url><loc>https://old.site/</loc></url>
<url><loc>https://old.site/pricing</loc></url>
<url><loc>https://old.site/blog/post-1</loc></url>
<url><loc>https://old.site/legacy</loc></url>
<url><loc>https://old.site/gone</loc></url>
</urlset>"#;

pub const NEW_SITEMAP: &str = r#"<urlset>
<url><loc>https://new.site/</loc></url>
<url><loc>https://new.site/pricing</loc></url>
<url><loc>https://new.site/blog/post-1</loc></url>
<url><loc>https://new.site/shiny</loc></url>
<url><loc>https://new.site/brand-new</loc></url>
</urlset>"#;

pub fn write_temp_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write temp file");
    file
}

/// A probe result with a fixed timestamp so result documents are
/// reproducible.
pub fn probe_result(url: &str, status_code: u16) -> ProbeResult {
    ProbeResult {
        url: url.to_string(),
        status_code,
        status_text: match status_code {
            0 => "Network Error".to_string(),
            200 => "OK".to_string(),
            404 => "Not Found".to_string(),
            500 => "Internal Server Error".to_string(),
            other => format!("Status {other}"),
        },
        response_time_ms: 120,
        final_url: url.to_string(),
        is_redirect: false,
        redirect_chain: Vec::new(),
        content_type: Some("text/html".to_string()),
        content_length: Some(2048),
        server: None,
        timestamp: chrono::Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        error: if status_code == 0 {
            Some("connection refused".to_string())
        } else {
            None
        },
    }
}

fn path_of(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string())
}

/// Deterministic prober: URLs containing "missing" 404, "broken" 500,
/// "down" transport-fail, everything else 200 with stable page content.
#[derive(Default)]
pub struct MockProber;

fn mock_status(url: &str) -> u16 {
    if url.contains("missing") {
        404
    } else if url.contains("broken") {
        500
    } else if url.contains("down") {
        0
    } else {
        200
    }
}

#[async_trait]
impl UrlProber for MockProber {
    async fn check_urls(
        &self,
        urls: &[String],
        on_progress: Option<ProgressFn>,
        _cancel: Arc<AtomicBool>,
    ) -> Vec<ProbeResult> {
        let total = urls.len();
        urls.iter()
            .enumerate()
            .map(|(index, url)| {
                if let Some(callback) = on_progress.as_ref() {
                    callback(BatchProgress {
                        completed: index + 1,
                        total,
                        percentage: (index + 1) as f64 / total as f64 * 100.0,
                        current_url: url.clone(),
                    });
                }
                probe_result(url, mock_status(url))
            })
            .collect()
    }

    async fn fetch_page(&self, url: &str) -> (ProbeResult, Option<PageContent>) {
        let status = mock_status(url);
        let result = probe_result(url, status);
        if status != 200 {
            return (result, None);
        }

        let path = path_of(url);
        let content = PageContent {
            title: Some(format!("Page {path}")),
            description: Some(format!("Description for {path}")),
            canonical_url: Some(url.trim_end_matches('/').to_string()),
            og_tags: Default::default(),
            headings: HeadingSummary {
                h1_count: 1,
                h2_count: 2,
                h3_count: 0,
                h1_text: vec![format!("Heading {path}")],
            },
            structured_data: true,
            internal_link_count: 10,
            external_link_count: 2,
        };
        (result, Some(content))
    }
}

/// Deterministic auditor: metric values derived from the URL path length;
/// URLs containing "overflow" get a layout issue.
#[derive(Default)]
pub struct MockAuditor;

#[async_trait]
impl SiteAuditor for MockAuditor {
    async fn performance_batch(&self, urls: &[String]) -> Vec<PerformanceAudit> {
        urls.iter()
            .map(|url| {
                let path = path_of(url);
                let weight = path.len() as f64;
                let metrics = PerfMetrics {
                    performance_score: (95.0 - weight).max(10.0),
                    lcp: 1500.0 + weight * 100.0,
                    cls: 0.01 * weight,
                    inp: 100.0 + weight * 10.0,
                    fcp: 900.0 + weight * 50.0,
                    ttfb: 200.0 + weight * 10.0,
                    tti: 1800.0 + weight * 100.0,
                    tbt: 50.0 + weight * 5.0,
                    speed_index: 1000.0 + weight * 80.0,
                    total_bytes: 250_000 + path.len() as u64 * 1000,
                    request_count: 20 + path.len() as u64,
                };
                PerformanceAudit::success(url, metrics)
            })
            .collect()
    }

    async fn fetch_page_content(&self, url: &str) -> anyhow::Result<PageContent> {
        if url.contains("missing") {
            anyhow::bail!("navigation failed for {url}");
        }
        let path = path_of(url);
        Ok(PageContent {
            title: Some(format!("Rendered {path}")),
            description: Some(format!("Rendered description for {path}")),
            canonical_url: Some(url.trim_end_matches('/').to_string()),
            og_tags: Default::default(),
            headings: HeadingSummary {
                h1_count: 1,
                h2_count: 1,
                h3_count: 0,
                h1_text: vec![format!("Rendered heading {path}")],
            },
            structured_data: false,
            internal_link_count: 5,
            external_link_count: 1,
        })
    }

    async fn mobile_batch(&self, urls: &[String], _screenshot_dir: &Path) -> Vec<MobileTestResult> {
        urls.iter()
            .map(|url| {
                let issues = if url.contains("overflow") {
                    vec!["Horizontal scrollbar detected".to_string()]
                } else {
                    Vec::new()
                };
                let viewports = vec![ViewportResult {
                    device: DeviceClass::Mobile,
                    screenshot_ref: None,
                    issues: issues.clone(),
                    has_overflow: !issues.is_empty(),
                    error: None,
                }];
                MobileTestResult::from_viewports(url, viewports)
            })
            .collect()
    }
}

/// What one checkpoint looked like when it was saved.
#[derive(Debug, Clone)]
pub struct SaveRecord {
    pub stage: Stage,
    pub percentage: u8,
    pub status: ProjectStatus,
}

/// Store wrapper that records every checkpoint, for asserting progress
/// ordering.
pub struct RecordingStore {
    inner: MemoryProjectStore,
    records: Mutex<Vec<SaveRecord>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryProjectStore::new(),
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn saves(&self) -> Vec<SaveRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProjectStore for RecordingStore {
    async fn load(&self, project_id: &str) -> Result<Project> {
        self.inner.load(project_id).await
    }

    async fn save(&self, project: &Project) -> Result<()> {
        self.records.lock().unwrap().push(SaveRecord {
            stage: project.progress.stage,
            percentage: project.progress.percentage,
            status: project.status,
        });
        self.inner.save(project).await
    }

    async fn delete(&self, project_id: &str) -> Result<()> {
        self.inner.delete(project_id).await
    }
}
