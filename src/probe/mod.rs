//! Bounded-concurrency URL probing.
//!
//! A probe is a single outbound GET with full result capture: any HTTP
//! response, including 4xx/5xx, produces a `ProbeResult` rather than an
//! error. Only transport failures (DNS, reset, timeout) are special-cased,
//! as status code `0` with `error` populated.

mod categorize;
mod content;
mod executor;
mod fetch;

pub use categorize::{categorize, BrokenLink, LongRedirect, RedirectAnalysis, StatusCheckReport};
pub use content::{extract_page_content, HeadingSummary, PageContent};
pub use executor::HttpProber;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tunables for the probe executor.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Maximum in-flight probes
    pub concurrency: usize,
    /// Spacing between dispatches per worker, and the retry backoff unit
    pub delay_ms: u64,
    /// Per-request timeout
    pub timeout_ms: u64,
    pub follow_redirects: bool,
    pub max_redirect_hops: usize,
    pub retry_attempts: u32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            delay_ms: 150,
            timeout_ms: 10_000,
            follow_redirects: true,
            max_redirect_hops: 10,
            retry_attempts: 3,
        }
    }
}

/// How page content is produced for SEO sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Parse the response bytes; no script execution
    #[default]
    Static,
    /// Render in the controlled browser and extract via DOM queries
    Headless,
}

/// One hop of a followed redirect chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectHop {
    pub url: String,
    pub status_code: u16,
    pub index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    pub url: String,
    /// HTTP status of the final response; 0 signals a transport failure
    pub status_code: u16,
    pub status_text: String,
    pub response_time_ms: u64,
    pub final_url: String,
    pub is_redirect: bool,
    pub redirect_chain: Vec<RedirectHop>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn is_network_error(&self) -> bool {
        self.status_code == 0
    }
}

/// Progress snapshot emitted after each completed URL.
#[derive(Debug, Clone)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
    pub percentage: f64,
    pub current_url: String,
}

/// Serialized progress callback; never invoked concurrently with itself.
pub type ProgressFn = Box<dyn Fn(BatchProgress) + Send + Sync>;

/// Probing capability consumed by the pipeline. The HTTP implementation is
/// `HttpProber`; tests substitute a deterministic mock.
#[async_trait]
pub trait UrlProber: Send + Sync {
    /// Status-check a batch. Results arrive in completion order; every
    /// input URL yields exactly one result unless the batch is cancelled.
    async fn check_urls(
        &self,
        urls: &[String],
        on_progress: Option<ProgressFn>,
        cancel: Arc<AtomicBool>,
    ) -> Vec<ProbeResult>;

    /// Status check plus page-content extraction on a 2xx HTML response.
    async fn fetch_page(&self, url: &str) -> (ProbeResult, Option<PageContent>);
}
