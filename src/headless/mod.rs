//! Headless-browser audits: Core Web Vitals and mobile responsiveness.
//!
//! A browser instance is launched per audit batch and torn down on every
//! exit path. URL visits are strictly serial within a batch, spaced by the
//! configured delay so audits do not contend for CPU and skew the metrics.

mod browser;
mod mobile;
mod performance;

pub use browser::{find_chromium, BrowserAuditor};
pub use mobile::{DeviceClass, MobileTestResult, Viewport, ViewportResult, VIEWPORTS};
pub use performance::{
    rate_vital, PerfMetrics, PerformanceAudit, Vital, VitalAssessment, VitalRating,
};

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::probe::PageContent;

/// Tunables for the headless auditor.
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    /// Per-navigation cap
    pub navigation_timeout_ms: u64,
    /// Spacing between audited URLs
    pub delay_ms: u64,
    /// How long the network must stay quiet before metrics are read
    pub quiescence_window_ms: u64,
    /// Explicit browser binary; discovered on PATH when unset
    pub chrome_path: Option<PathBuf>,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: 30_000,
            delay_ms: 2_000,
            quiescence_window_ms: 500,
            chrome_path: None,
        }
    }
}

/// Headless audit capability consumed by the pipeline. The browser-backed
/// implementation is `BrowserAuditor`; tests substitute a deterministic
/// mock. Implementations own the browser lifecycle per batch.
#[async_trait]
pub trait SiteAuditor: Send + Sync {
    /// Audit each URL's rendering performance, serially. Per-URL failures
    /// are reported in the corresponding `PerformanceAudit`; the batch
    /// never aborts.
    async fn performance_batch(&self, urls: &[String]) -> Vec<PerformanceAudit>;

    /// Audit each URL under the mobile, tablet and desktop viewports,
    /// writing full-page screenshots under `screenshot_dir`.
    async fn mobile_batch(&self, urls: &[String], screenshot_dir: &Path) -> Vec<MobileTestResult>;

    /// Headless-mode page content: render the URL, wait for the network to
    /// settle, extract via DOM queries.
    async fn fetch_page_content(&self, url: &str) -> anyhow::Result<PageContent>;
}
