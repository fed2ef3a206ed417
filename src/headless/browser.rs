//! Browser-backed implementation of the headless audits.
//!
//! Flags disable sandboxing, GPU, and shared-memory usage so the browser
//! can run inside restricted containers. The launched instance is closed on
//! every exit path of a batch.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetTouchEmulationEnabledParams,
};
use chromiumoxide::page::{Page, ScreenshotParams};
use chrono::Utc;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

use super::mobile::{layout_issues, LayoutProbe, LAYOUT_JS};
use super::performance::{CollectedMetrics, COLLECTOR_JS};
use super::{
    HeadlessConfig, MobileTestResult, PerfMetrics, PerformanceAudit, SiteAuditor, Viewport,
    ViewportResult, VIEWPORTS,
};
use crate::probe::PageContent;

/// DOM-query extractor producing the same shape as the static parser.
const CONTENT_JS: &str = r#"
(() => {
  const attr = (selector, name) => {
    const el = document.querySelector(selector);
    return el ? (el.getAttribute(name) || '').trim() || null : null;
  };

  const ogTags = {};
  for (const el of document.querySelectorAll('meta[property^="og:"]')) {
    const property = el.getAttribute('property');
    const content = el.getAttribute('content');
    if (property && content) ogTags[property] = content;
  }

  const h1s = Array.from(document.querySelectorAll('h1'));
  const host = window.location.host;
  let internal = 0;
  let external = 0;
  for (const a of document.querySelectorAll('a[href]')) {
    const href = a.getAttribute('href') || '';
    if (!href || href.startsWith('#') || href.startsWith('javascript:')
        || href.startsWith('mailto:') || href.startsWith('tel:')) continue;
    try {
      const target = new URL(href, window.location.href);
      if (target.host === host) internal += 1; else external += 1;
    } catch (e) {}
  }

  const title = (document.title || '').trim();
  return {
    title: title || null,
    description: attr('meta[name="description" i]', 'content'),
    canonicalUrl: attr('link[rel="canonical"]', 'href'),
    ogTags,
    headings: {
      h1Count: h1s.length,
      h2Count: document.querySelectorAll('h2').length,
      h3Count: document.querySelectorAll('h3').length,
      h1Text: h1s.map((el) => el.textContent.trim()).filter((t) => t.length > 0),
    },
    structuredData: document.querySelector('script[type="application/ld+json"]') !== null,
    internalLinkCount: internal,
    externalLinkCount: external,
  };
})()
"#;

/// Locate a Chromium/Chrome binary: explicit env override first, then PATH.
pub fn find_chromium() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("MIGRAUDIT_CHROME") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    for name in ["google-chrome", "chromium", "chromium-browser", "chrome"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    None
}

pub struct BrowserAuditor {
    config: HeadlessConfig,
}

impl BrowserAuditor {
    pub fn new(config: HeadlessConfig) -> Self {
        Self { config }
    }

    /// Whether a usable browser binary is present.
    pub fn is_available(&self) -> bool {
        self.config.chrome_path.is_some() || find_chromium().is_some()
    }

    async fn launch(&self) -> Result<(Browser, JoinHandle<()>)> {
        let chrome_path = self
            .config
            .chrome_path
            .clone()
            .or_else(find_chromium)
            .context("No Chromium binary found (set MIGRAUDIT_CHROME or install chromium)")?;

        let browser_config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .context("failed to launch headless browser")?;

        let handle = tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok((browser, handle))
    }

    async fn navigate(&self, page: &Page, url: &str) -> Result<()> {
        timeout(
            Duration::from_millis(self.config.navigation_timeout_ms),
            page.goto(url),
        )
        .await
        .map_err(|_| {
            anyhow!(
                "navigation timed out after {}ms",
                self.config.navigation_timeout_ms
            )
        })?
        .context("navigation failed")?;

        let _ = page.wait_for_navigation().await;
        // Let late requests settle before metrics are read
        sleep(Duration::from_millis(self.config.quiescence_window_ms)).await;
        Ok(())
    }

    async fn collect_performance(&self, browser: &Browser, url: &str) -> Result<PerfMetrics> {
        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to open page")?;

        let result = async {
            self.navigate(&page, url).await?;
            let collected: CollectedMetrics = page
                .evaluate(COLLECTOR_JS)
                .await
                .context("metric collection failed")?
                .into_value()
                .map_err(|e| anyhow!("unexpected collector output: {e:?}"))?;
            Ok(collected.into_metrics())
        }
        .await;

        let _ = page.close().await;
        result
    }

    async fn audit_viewport(
        &self,
        browser: &Browser,
        url: &str,
        viewport: &Viewport,
        screenshot_dir: &Path,
    ) -> Result<ViewportResult> {
        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to open page")?;

        let result = async {
            let metrics = SetDeviceMetricsOverrideParams::builder()
                .width(viewport.width as i64)
                .height(viewport.height as i64)
                .device_scale_factor(viewport.device_scale_factor)
                .mobile(viewport.is_mobile)
                .build()
                .map_err(|e| anyhow!("invalid viewport params: {e}"))?;
            page.execute(metrics).await.context("viewport override failed")?;

            let touch = SetTouchEmulationEnabledParams::builder()
                .enabled(viewport.has_touch)
                .build()
                .map_err(|e| anyhow!("invalid touch params: {e}"))?;
            page.execute(touch).await.context("touch emulation failed")?;

            self.navigate(&page, url).await?;

            // Millisecond-stamped filenames keep repeated audits collision-free
            let filename = format!(
                "{}-{}.png",
                viewport.device.as_str(),
                Utc::now().timestamp_millis()
            );
            let screenshot_path = screenshot_dir.join(filename);
            let screenshot_ref = match page
                .save_screenshot(
                    ScreenshotParams::builder().full_page(true).build(),
                    &screenshot_path,
                )
                .await
            {
                Ok(_) => Some(screenshot_path),
                Err(e) => {
                    log::warn!("[HEADLESS] Screenshot failed for {}: {}", url, e);
                    None
                }
            };

            let probe: LayoutProbe = page
                .evaluate(LAYOUT_JS)
                .await
                .context("layout inspection failed")?
                .into_value()
                .map_err(|e| anyhow!("unexpected layout output: {e:?}"))?;

            Ok(ViewportResult {
                device: viewport.device,
                screenshot_ref,
                issues: layout_issues(&probe, viewport.device),
                has_overflow: probe.has_overflow,
                error: None,
            })
        }
        .await;

        let _ = page.close().await;
        result
    }
}

#[async_trait]
impl SiteAuditor for BrowserAuditor {
    async fn performance_batch(&self, urls: &[String]) -> Vec<PerformanceAudit> {
        let (mut browser, handler) = match self.launch().await {
            Ok(launched) => launched,
            Err(e) => {
                log::error!("[HEADLESS] Browser launch failed: {:#}", e);
                return urls
                    .iter()
                    .map(|url| PerformanceAudit::failure(url, format!("{e:#}")))
                    .collect();
            }
        };

        let mut audits = Vec::with_capacity(urls.len());
        for (index, url) in urls.iter().enumerate() {
            if index > 0 {
                sleep(Duration::from_millis(self.config.delay_ms)).await;
            }

            log::info!("[HEADLESS] Performance audit {}/{}: {}", index + 1, urls.len(), url);
            match self.collect_performance(&browser, url).await {
                Ok(metrics) => audits.push(PerformanceAudit::success(url, metrics)),
                Err(e) => {
                    log::warn!("[HEADLESS] Performance audit failed for {}: {:#}", url, e);
                    audits.push(PerformanceAudit::failure(url, format!("{e:#}")));
                }
            }
        }

        let _ = browser.close().await;
        handler.abort();
        audits
    }

    async fn mobile_batch(&self, urls: &[String], screenshot_dir: &Path) -> Vec<MobileTestResult> {
        if let Err(e) = tokio::fs::create_dir_all(screenshot_dir).await {
            log::warn!(
                "[HEADLESS] Could not create screenshot dir {}: {}",
                screenshot_dir.display(),
                e
            );
        }

        let (mut browser, handler) = match self.launch().await {
            Ok(launched) => launched,
            Err(e) => {
                log::error!("[HEADLESS] Browser launch failed: {:#}", e);
                let message = format!("{e:#}");
                return urls
                    .iter()
                    .map(|url| {
                        let viewports = VIEWPORTS
                            .iter()
                            .map(|viewport| ViewportResult {
                                device: viewport.device,
                                screenshot_ref: None,
                                issues: Vec::new(),
                                has_overflow: false,
                                error: Some(message.clone()),
                            })
                            .collect();
                        MobileTestResult::from_viewports(url, viewports)
                    })
                    .collect();
            }
        };

        let mut results = Vec::with_capacity(urls.len());
        for (index, url) in urls.iter().enumerate() {
            if index > 0 {
                sleep(Duration::from_millis(self.config.delay_ms)).await;
            }

            log::info!("[HEADLESS] Mobile audit {}/{}: {}", index + 1, urls.len(), url);
            let mut viewports = Vec::with_capacity(VIEWPORTS.len());
            for viewport in &VIEWPORTS {
                let result = match self
                    .audit_viewport(&browser, url, viewport, screenshot_dir)
                    .await
                {
                    Ok(result) => result,
                    Err(e) => {
                        log::warn!(
                            "[HEADLESS] {} audit failed for {}: {:#}",
                            viewport.device.as_str(),
                            url,
                            e
                        );
                        ViewportResult {
                            device: viewport.device,
                            screenshot_ref: None,
                            issues: Vec::new(),
                            has_overflow: false,
                            error: Some(format!("{e:#}")),
                        }
                    }
                };
                viewports.push(result);
            }
            results.push(MobileTestResult::from_viewports(url, viewports));
        }

        let _ = browser.close().await;
        handler.abort();
        results
    }

    async fn fetch_page_content(&self, url: &str) -> Result<PageContent> {
        let (mut browser, handler) = self.launch().await?;

        let result = async {
            let page = browser
                .new_page("about:blank")
                .await
                .context("failed to open page")?;
            let extracted = async {
                self.navigate(&page, url).await?;
                page.evaluate(CONTENT_JS)
                    .await
                    .context("content extraction failed")?
                    .into_value::<PageContent>()
                    .map_err(|e| anyhow!("unexpected content output: {e:?}"))
            }
            .await;
            let _ = page.close().await;
            extracted
        }
        .await;

        let _ = browser.close().await;
        handler.abort();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires a Chromium binary
    async fn audits_a_data_url() {
        let auditor = BrowserAuditor::new(HeadlessConfig {
            delay_ms: 0,
            ..HeadlessConfig::default()
        });

        let urls = vec!["data:text/html,<h1>Hello</h1>".to_string()];
        let audits = auditor.performance_batch(&urls).await;

        assert_eq!(audits.len(), 1);
        let audit = &audits[0];
        assert!(audit.error.is_none(), "audit failed: {:?}", audit.error);
        assert!(audit.metrics.is_some());
    }

    #[tokio::test]
    #[ignore] // Requires a Chromium binary
    async fn mobile_audit_writes_screenshots() {
        let auditor = BrowserAuditor::new(HeadlessConfig {
            delay_ms: 0,
            ..HeadlessConfig::default()
        });
        let dir = tempfile::tempdir().unwrap();

        let urls = vec![
            "data:text/html,<p style=\"font-size:8px\">tiny</p>".to_string(),
        ];
        let results = auditor.mobile_batch(&urls, dir.path()).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].viewports.len(), 3);
        assert!(!results[0].responsive);
    }
}
