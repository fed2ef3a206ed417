//! The migration audit pipeline.
//!
//! A single worker task per project drives the linear stage graph, updating
//! the project's progress record and checkpointing the aggregate to the
//! store after every stage. Per-URL failures stay inside stage results; an
//! error escaping a stage body marks the project failed and stops the run.

mod selection;

pub use selection::{fetchable_pairs, select_audit_pairs, UrlPair};

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::sleep;

use crate::compare::{
    compare_mobile_batches, compare_performance_batches, compare_seo, summarize_seo,
    SeoPairComparison, SeoValidationReport,
};
use crate::domain::{Project, Stage};
use crate::error::{AppError, Result};
use crate::headless::SiteAuditor;
use crate::input::{
    extract_url_list, read_analytics, read_redirect_map, AnalyticsEntry, RedirectMap,
    SitemapReader,
};
use crate::matching::{detect_pattern_renames, resolve_correspondence};
use crate::probe::{categorize, BatchProgress, PageContent, ProgressFn, RenderMode, UrlProber};
use crate::store::ProjectStore;

/// Stage budgets and pacing for one pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Per-side cap on status-checked URLs
    pub status_check_budget: usize,
    /// Cap on SEO-compared pairs
    pub seo_sample_size: usize,
    /// Cap on performance-audited pairs
    pub performance_sample_size: usize,
    /// Cap on mobile-audited pairs
    pub mobile_sample_size: usize,
    /// Pause between SEO content fetches
    pub seo_fetch_delay_ms: u64,
    /// How SEO page content is rendered
    pub render_mode: RenderMode,
    /// Root directory for per-project screenshot output
    pub screenshot_root: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            status_check_budget: 100,
            seo_sample_size: 20,
            performance_sample_size: 10,
            mobile_sample_size: 5,
            seo_fetch_delay_ms: 500,
            render_mode: RenderMode::Static,
            screenshot_root: PathBuf::from("screenshots"),
        }
    }
}

/// Working state threaded through the stages; never persisted.
#[derive(Default)]
struct StageContext {
    old_urls: Vec<String>,
    new_urls: Vec<String>,
    analytics: Vec<AnalyticsEntry>,
    redirect_map: RedirectMap,
}

pub struct AuditPipeline {
    store: Arc<dyn ProjectStore>,
    prober: Arc<dyn UrlProber>,
    auditor: Arc<dyn SiteAuditor>,
    sitemaps: SitemapReader,
    config: PipelineConfig,
    /// In-flight runs keyed by project id; doubles as the cancel registry
    running: DashMap<String, Arc<AtomicBool>>,
}

impl AuditPipeline {
    pub fn new(
        store: Arc<dyn ProjectStore>,
        prober: Arc<dyn UrlProber>,
        auditor: Arc<dyn SiteAuditor>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            prober,
            auditor,
            sitemaps: SitemapReader::new(reqwest::Client::new()),
            config,
            running: DashMap::new(),
        }
    }

    /// Run the full audit for a project. Stage failures are recorded on the
    /// project (status `failed`) rather than returned; the result is the
    /// project's final state.
    pub async fn run(&self, project_id: &str) -> Result<Project> {
        self.run_with_cancellation(project_id, Arc::new(AtomicBool::new(false)))
            .await
    }

    /// Like `run`, with a caller-owned cancel flag. The flag is polled
    /// before every stage and before every probe dispatch.
    pub async fn run_with_cancellation(
        &self,
        project_id: &str,
        cancel: Arc<AtomicBool>,
    ) -> Result<Project> {
        self.begin(project_id, Arc::clone(&cancel))?;
        let result = self.run_inner(project_id, cancel).await;
        self.running.remove(project_id);
        result
    }

    /// Request cancellation of an in-flight run. Returns false when the
    /// project is not running.
    pub fn cancel(&self, project_id: &str) -> bool {
        match self.running.get(project_id) {
            Some(flag) => {
                log::info!("[PIPELINE] Cancelling project {}", project_id);
                flag.store(true, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Double-start guard: at most one run per project.
    fn begin(&self, project_id: &str, cancel: Arc<AtomicBool>) -> Result<()> {
        use dashmap::mapref::entry::Entry;
        match self.running.entry(project_id.to_string()) {
            Entry::Occupied(_) => Err(AppError::PipelineBusy(project_id.to_string())),
            Entry::Vacant(vacant) => {
                vacant.insert(cancel);
                Ok(())
            }
        }
    }

    async fn run_inner(&self, project_id: &str, cancel: Arc<AtomicBool>) -> Result<Project> {
        let mut project = self.store.load(project_id).await?;
        log::info!(
            "[PIPELINE] Starting audit {}: {} -> {}",
            project.id,
            project.old_base_url,
            project.new_base_url
        );

        match self.run_stages(&mut project, &cancel).await {
            Ok(()) => {
                project.complete();
                self.store.save(&project).await?;
                log::info!("[PIPELINE] Audit {} completed", project.id);
            }
            Err(e) => {
                let message = e.to_string();
                log::error!("[PIPELINE] Audit {} failed: {}", project.id, message);
                project.fail(message);
                self.store.save(&project).await?;
            }
        }

        Ok(project)
    }

    async fn run_stages(&self, project: &mut Project, cancel: &Arc<AtomicBool>) -> Result<()> {
        let mut ctx = StageContext::default();

        // --- parsing_sitemaps ---
        ensure_not_cancelled(cancel)?;
        project.enter_stage(Stage::ParsingSitemaps);
        if let Some(source) = project.inputs.old_sitemap.clone() {
            ctx.old_urls = self
                .sitemaps
                .read(&source)
                .await?
                .into_iter()
                .map(|entry| entry.url)
                .collect();
        }
        if let Some(source) = project.inputs.new_sitemap.clone() {
            ctx.new_urls = self
                .sitemaps
                .read(&source)
                .await?
                .into_iter()
                .map(|entry| entry.url)
                .collect();
        }
        self.store.save(project).await?;

        // --- parsing_analytics ---
        ensure_not_cancelled(cancel)?;
        project.enter_stage(Stage::ParsingAnalytics);
        if let Some(path) = project.inputs.analytics_export.clone() {
            let path = Path::new(&path);
            let urls: Vec<String> = match read_analytics(path) {
                Ok(entries) => {
                    ctx.analytics = entries;
                    ctx.analytics.iter().map(|entry| entry.url.clone()).collect()
                }
                // Not analytics-shaped: treat the upload as a plain URL list
                Err(AppError::InputFormat(reason)) => {
                    log::info!(
                        "[PIPELINE] Analytics export read as plain URL list ({})",
                        reason
                    );
                    extract_url_list(path)?
                }
                Err(e) => return Err(e),
            };

            let known: std::collections::HashSet<&str> =
                ctx.old_urls.iter().map(String::as_str).collect();
            let extra: Vec<String> = urls
                .into_iter()
                .filter(|url| !known.contains(url.as_str()))
                .collect();
            ctx.old_urls.extend(extra);
        }
        self.store.save(project).await?;

        // --- parsing_redirects ---
        ensure_not_cancelled(cancel)?;
        project.enter_stage(Stage::ParsingRedirects);
        if let Some(path) = project.inputs.redirect_map.clone() {
            ctx.redirect_map = read_redirect_map(Path::new(&path))?;
        }
        self.store.save(project).await?;

        // --- comparing_urls ---
        ensure_not_cancelled(cancel)?;
        project.enter_stage(Stage::ComparingUrls);
        let correspondence =
            resolve_correspondence(&ctx.old_urls, &ctx.new_urls, &ctx.redirect_map);
        project.results.pattern_analysis =
            Some(detect_pattern_renames(&ctx.old_urls, &ctx.new_urls));
        project.results.correspondence = Some(correspondence.clone());
        self.store.save(project).await?;

        // --- checking_old_urls ---
        ensure_not_cancelled(cancel)?;
        project.enter_stage(Stage::CheckingOldUrls);
        let sample: Vec<String> = ctx
            .old_urls
            .iter()
            .take(self.config.status_check_budget)
            .cloned()
            .collect();
        let results = self
            .prober
            .check_urls(&sample, Some(log_progress("old")), Arc::clone(cancel))
            .await;
        project.results.old_status_check = Some(categorize(&results));
        self.store.save(project).await?;

        // --- checking_new_urls ---
        ensure_not_cancelled(cancel)?;
        project.enter_stage(Stage::CheckingNewUrls);
        let sample: Vec<String> = ctx
            .new_urls
            .iter()
            .take(self.config.status_check_budget)
            .cloned()
            .collect();
        let results = self
            .prober
            .check_urls(&sample, Some(log_progress("new")), Arc::clone(cancel))
            .await;
        project.results.new_status_check = Some(categorize(&results));
        self.store.save(project).await?;

        // --- validating_seo ---
        ensure_not_cancelled(cancel)?;
        project.enter_stage(Stage::ValidatingSeo);
        let pairs = fetchable_pairs(&correspondence, &project.new_base_url);
        let seo_report = self.validate_seo(&pairs, cancel).await?;
        project.results.seo_validation = Some(seo_report);
        self.store.save(project).await?;

        // --- finalizing ---
        ensure_not_cancelled(cancel)?;
        project.enter_stage(Stage::Finalizing);
        // Broken links on the side going live; redirect behavior of the
        // side being retired
        project.results.broken_links = project
            .results
            .new_status_check
            .as_ref()
            .map(|report| report.broken_links());
        project.results.redirect_analysis = project
            .results
            .old_status_check
            .as_ref()
            .map(|report| report.redirect_analysis());
        self.store.save(project).await?;

        // --- testing_performance ---
        ensure_not_cancelled(cancel)?;
        project.enter_stage(Stage::TestingPerformance);
        let selected = select_audit_pairs(
            &pairs,
            &ctx.analytics,
            self.config.performance_sample_size,
        );
        let old_urls: Vec<String> = selected.iter().map(|p| p.old_url.clone()).collect();
        let new_urls: Vec<String> = selected.iter().map(|p| p.new_url.clone()).collect();
        let old_audits = self.auditor.performance_batch(&old_urls).await;
        let new_audits = self.auditor.performance_batch(&new_urls).await;
        project.results.performance =
            Some(compare_performance_batches(&old_audits, &new_audits));
        self.store.save(project).await?;

        // --- testing_mobile ---
        ensure_not_cancelled(cancel)?;
        project.enter_stage(Stage::TestingMobile);
        let mobile_count = self.config.mobile_sample_size.min(selected.len());
        let mobile_pairs = &selected[..mobile_count];
        let old_urls: Vec<String> = mobile_pairs.iter().map(|p| p.old_url.clone()).collect();
        let new_urls: Vec<String> = mobile_pairs.iter().map(|p| p.new_url.clone()).collect();
        let old_dir = self.screenshot_dir(project, "old");
        let new_dir = self.screenshot_dir(project, "new");
        let old_results = self.auditor.mobile_batch(&old_urls, &old_dir).await;
        let new_results = self.auditor.mobile_batch(&new_urls, &new_dir).await;
        project.results.mobile = Some(compare_mobile_batches(&old_results, &new_results));
        self.store.save(project).await?;

        Ok(())
    }

    async fn validate_seo(
        &self,
        pairs: &[UrlPair],
        cancel: &Arc<AtomicBool>,
    ) -> Result<SeoValidationReport> {
        let sample: Vec<&UrlPair> = pairs.iter().take(self.config.seo_sample_size).collect();
        let mut comparisons = Vec::with_capacity(sample.len());

        for (index, pair) in sample.iter().enumerate() {
            ensure_not_cancelled(cancel)?;
            if index > 0 {
                sleep(Duration::from_millis(self.config.seo_fetch_delay_ms)).await;
            }

            let old_page = self.fetch_side(&pair.old_url).await;
            sleep(Duration::from_millis(self.config.seo_fetch_delay_ms)).await;
            let new_page = self.fetch_side(&pair.new_url).await;

            let entry = match (old_page, new_page) {
                (Ok(old_page), Ok(new_page)) => SeoPairComparison {
                    old_url: pair.old_url.clone(),
                    new_url: pair.new_url.clone(),
                    comparison: Some(compare_seo(&old_page, &new_page, &pair.new_url)),
                    error: None,
                },
                (old_page, new_page) => {
                    let (side, reason) = match (old_page, new_page) {
                        (Err(reason), _) => ("old", reason),
                        (_, Err(reason)) => ("new", reason),
                        _ => unreachable!("at least one side failed"),
                    };
                    log::warn!(
                        "[PIPELINE] SEO fetch failed for {} side of {}: {}",
                        side,
                        pair.old_url,
                        reason
                    );
                    SeoPairComparison {
                        old_url: pair.old_url.clone(),
                        new_url: pair.new_url.clone(),
                        comparison: None,
                        error: Some(format!("{side} page: {reason}")),
                    }
                }
            };
            comparisons.push(entry);
        }

        let summary = summarize_seo(&comparisons);
        Ok(SeoValidationReport {
            comparisons,
            summary,
        })
    }

    /// Fetch one side's page content in the configured rendering mode.
    async fn fetch_side(&self, url: &str) -> std::result::Result<PageContent, String> {
        match self.config.render_mode {
            RenderMode::Static => {
                let (result, content) = self.prober.fetch_page(url).await;
                content.ok_or_else(|| format!("fetch failed with status {}", result.status_code))
            }
            RenderMode::Headless => self
                .auditor
                .fetch_page_content(url)
                .await
                .map_err(|e| format!("{e:#}")),
        }
    }

    fn screenshot_dir(&self, project: &Project, side: &str) -> PathBuf {
        self.config
            .screenshot_root
            .join(&project.id)
            .join(side)
    }
}

fn ensure_not_cancelled(cancel: &Arc<AtomicBool>) -> Result<()> {
    if cancel.load(Ordering::Relaxed) {
        Err(AppError::Cancelled)
    } else {
        Ok(())
    }
}

fn log_progress(side: &'static str) -> ProgressFn {
    Box::new(move |progress: BatchProgress| {
        log::debug!(
            "[PIPELINE] {} status check {}/{} ({:.0}%): {}",
            side,
            progress.completed,
            progress.total,
            progress.percentage,
            progress.current_url
        );
    })
}
