//! Command-line interface: argument parsing, wiring the pipeline's
//! collaborators together, and rendering the final report.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use crate::domain::{InputFiles, Project, ProjectStatus};
use crate::headless::{BrowserAuditor, HeadlessConfig};
use crate::pipeline::{AuditPipeline, PipelineConfig};
use crate::probe::{HttpProber, ProbeConfig, RenderMode};
use crate::store::{ProjectStore, SqliteProjectStore};

#[derive(Parser, Debug)]
#[command(name = "migraudit")]
#[command(
    about = "Audit a site migration: URL coverage, SEO, performance and mobile regressions",
    long_about = None
)]
pub struct Cli {
    /// Base URL of the site being replaced
    #[arg(value_name = "OLD_BASE_URL")]
    pub old_base_url: String,

    /// Base URL of the replacement site
    #[arg(value_name = "NEW_BASE_URL")]
    pub new_base_url: String,

    /// Old site's sitemap (local path or URL)
    #[arg(long)]
    pub old_sitemap: Option<String>,

    /// New site's sitemap (local path or URL)
    #[arg(long)]
    pub new_sitemap: Option<String>,

    /// Search-analytics CSV export for the old site
    #[arg(long)]
    pub analytics: Option<String>,

    /// Redirect-map CSV (old URL, new URL)
    #[arg(long)]
    pub redirects: Option<String>,

    /// SQLite store path; in-memory when omitted
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Screenshot output directory
    #[arg(long, default_value = "screenshots")]
    pub screenshots: PathBuf,

    /// Number of concurrent status probes
    #[arg(short = 'c', long, default_value_t = 5)]
    pub concurrency: usize,

    /// Maximum URLs status-checked per side
    #[arg(long, default_value_t = 100)]
    pub status_budget: usize,

    /// SEO content rendering: static or headless
    #[arg(long, default_value = "static")]
    pub render: String,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    pub output: String,
}

pub async fn run(cli: Cli) -> Result<()> {
    for base in [&cli.old_base_url, &cli.new_base_url] {
        let parsed = url::Url::parse(base)
            .map_err(|_| crate::error::AppError::InvalidUrl(base.clone()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(crate::error::AppError::InvalidUrl(base.clone()).into());
        }
    }

    let store: Arc<dyn ProjectStore> = match &cli.db {
        Some(path) => Arc::new(SqliteProjectStore::open(path).await?),
        None => Arc::new(SqliteProjectStore::open_in_memory().await?),
    };

    let prober = Arc::new(HttpProber::new(ProbeConfig {
        concurrency: cli.concurrency,
        ..ProbeConfig::default()
    }));

    let auditor = BrowserAuditor::new(HeadlessConfig::default());
    if !auditor.is_available() {
        log::warn!(
            "No Chromium binary found; performance and mobile audits will record errors"
        );
    }

    let render_mode = match cli.render.as_str() {
        "headless" => RenderMode::Headless,
        _ => RenderMode::Static,
    };

    let pipeline = AuditPipeline::new(
        Arc::clone(&store),
        prober,
        Arc::new(auditor),
        PipelineConfig {
            status_check_budget: cli.status_budget,
            render_mode,
            screenshot_root: cli.screenshots.clone(),
            ..PipelineConfig::default()
        },
    );

    let project = Project::new(
        &cli.old_base_url,
        &cli.new_base_url,
        InputFiles {
            old_sitemap: cli.old_sitemap.clone(),
            new_sitemap: cli.new_sitemap.clone(),
            analytics_export: cli.analytics.clone(),
            redirect_map: cli.redirects.clone(),
        },
    );
    store.save(&project).await?;

    let finished = pipeline.run(&project.id).await?;

    match cli.output.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&finished)?),
        _ => print_summary(&finished),
    }

    if finished.status == ProjectStatus::Failed {
        anyhow::bail!(
            "audit failed: {}",
            finished
                .progress
                .error
                .as_deref()
                .unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn print_summary(project: &Project) {
    println!("Migration audit: {} -> {}", project.old_base_url, project.new_base_url);
    println!("Status: {}", project.status.as_str());

    let results = &project.results;

    if let Some(correspondence) = &results.correspondence {
        let summary = &correspondence.summary;
        println!();
        println!("URL correspondence");
        println!("  matched      {}", summary.matched);
        println!("  redirected   {}", summary.redirected);
        println!("  missing      {}", summary.missing);
        println!("  new only     {}", summary.new_only);
        println!("  match rate   {:.2}%", summary.match_rate);
    }

    if let Some(renames) = &results.pattern_analysis {
        for rename in renames {
            println!(
                "  likely rename: {} ({} urls) -> {} ({} urls), confidence {:.2}",
                rename.old_pattern, rename.old_count, rename.new_pattern, rename.new_count,
                rename.confidence
            );
        }
    }

    if let Some(broken) = &results.broken_links {
        println!();
        println!("Broken links on the new site: {}", broken.len());
        for link in broken.iter().take(10) {
            println!("  {} {}", link.status_code, link.url);
        }
    }

    if let Some(seo) = &results.seo_validation {
        let summary = &seo.summary;
        println!();
        println!(
            "SEO validation: {} pairs compared, average score {:.1}",
            summary.compared, summary.average_score
        );
        println!(
            "  severities: {} none / {} minor / {} moderate / {} major",
            summary.severity_counts.none,
            summary.severity_counts.minor,
            summary.severity_counts.moderate,
            summary.severity_counts.major
        );
    }

    if let Some(performance) = &results.performance {
        let summary = &performance.summary;
        println!();
        println!(
            "Performance: {} pairs, avg score {:.1} -> {:.1}",
            summary.total_pairs, summary.average_old_score, summary.average_new_score
        );
        println!(
            "  {} improved / {} regressed / {} unchanged",
            summary.improved, summary.regressed, summary.unchanged
        );
    }

    if let Some(mobile) = &results.mobile {
        let summary = &mobile.summary;
        println!();
        println!(
            "Mobile: {} pairs, {} improved / {} regressed / {} unchanged, {} responsive",
            summary.total_pairs,
            summary.improved,
            summary.regressed,
            summary.unchanged,
            summary.new_responsive
        );
    }

    if let Some(error) = &project.progress.error {
        println!();
        println!("Error: {error}");
    }
}
