//! The bounded probe executor.
//!
//! A fixed-size worker pool consumes a bounded queue of input URLs and
//! delivers results on an output channel in completion order. Progress
//! callbacks fire from the collector only, so they never overlap; per-URL
//! retries complete before that URL's result is emitted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::{mpsc, Mutex};
use tokio::time::sleep;

use super::content::PageContent;
use super::fetch::{build_client, fetch_page_with_retry, probe_with_retry};
use super::{BatchProgress, ProbeConfig, ProbeResult, ProgressFn, UrlProber};

/// HTTP implementation of `UrlProber`.
pub struct HttpProber {
    client: Client,
    config: ProbeConfig,
}

impl HttpProber {
    pub fn new(config: ProbeConfig) -> Self {
        Self {
            client: build_client(&config),
            config,
        }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }
}

#[async_trait]
impl UrlProber for HttpProber {
    async fn check_urls(
        &self,
        urls: &[String],
        on_progress: Option<ProgressFn>,
        cancel: Arc<AtomicBool>,
    ) -> Vec<ProbeResult> {
        let total = urls.len();
        if total == 0 {
            return Vec::new();
        }

        let workers = self.config.concurrency.max(1).min(total);
        log::info!("[PROBE] Checking {} URLs with {} workers", total, workers);

        let (job_tx, job_rx) = mpsc::channel::<String>(workers);
        let (result_tx, mut result_rx) = mpsc::channel::<ProbeResult>(workers);
        let job_rx = Arc::new(Mutex::new(job_rx));

        for _ in 0..workers {
            let job_rx = Arc::clone(&job_rx);
            let result_tx = result_tx.clone();
            let client = self.client.clone();
            let config = self.config.clone();
            let cancel = Arc::clone(&cancel);

            tokio::spawn(async move {
                loop {
                    let Some(url) = job_rx.lock().await.recv().await else {
                        break;
                    };
                    if cancel.load(Ordering::Relaxed) {
                        break;
                    }

                    sleep(Duration::from_millis(config.delay_ms)).await;
                    let result = probe_with_retry(&client, &config, &url).await;
                    if result_tx.send(result).await.is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        // Feed jobs from a separate task so the pool drains while we collect.
        let feed_urls: Vec<String> = urls.to_vec();
        let feed_cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            for url in feed_urls {
                if feed_cancel.load(Ordering::Relaxed) {
                    break;
                }
                if job_tx.send(url).await.is_err() {
                    break;
                }
            }
        });

        let mut results = Vec::with_capacity(total);
        while let Some(result) = result_rx.recv().await {
            results.push(result);
            if let Some(callback) = on_progress.as_ref() {
                let completed = results.len();
                callback(BatchProgress {
                    completed,
                    total,
                    percentage: completed as f64 / total as f64 * 100.0,
                    current_url: results[completed - 1].url.clone(),
                });
            }
        }

        if results.len() < total {
            log::warn!(
                "[PROBE] Batch stopped early: {}/{} URLs probed",
                results.len(),
                total
            );
        }
        results
    }

    async fn fetch_page(&self, url: &str) -> (ProbeResult, Option<PageContent>) {
        fetch_page_with_retry(&self.client, &self.config, url).await
    }
}
