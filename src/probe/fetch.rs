//! Single-URL probing: manual redirect chain, retry policy, content fetch.

use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::header::LOCATION;
use reqwest::{Client, StatusCode};
use tokio::time::sleep;
use url::Url;

use super::content::{extract_page_content, PageContent};
use super::{ProbeConfig, ProbeResult, RedirectHop};

/// Fixed browser-like user agent for all outbound probes.
pub(crate) const USER_AGENT: &str = "Mozilla/5.0 (compatible; MigrationAuditBot/1.0; \
     +https://github.com/migraudit/migraudit)";

pub(crate) fn build_client(config: &ProbeConfig) -> Client {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_millis(config.timeout_ms))
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap_or_default()
}

/// Probe a URL with the configured retry policy.
///
/// Retries apply only to transport failures and 5xx responses, with linear
/// backoff (`delay_ms * attempt`). A single-attempt config never sleeps.
/// Exhaustion yields the last observed result.
pub(crate) async fn probe_with_retry(
    client: &Client,
    config: &ProbeConfig,
    url: &str,
) -> ProbeResult {
    let (mut last, _) = execute(client, config, url, false).await;
    let mut attempt = 1u32;

    while attempt < config.retry_attempts && should_retry(&last) {
        let backoff = config.delay_ms * attempt as u64;
        log::debug!(
            "[PROBE] Retry {}/{} for {} after {}ms (status {})",
            attempt + 1,
            config.retry_attempts,
            url,
            backoff,
            last.status_code
        );
        sleep(Duration::from_millis(backoff)).await;
        attempt += 1;
        last = execute(client, config, url, false).await.0;
    }

    last
}

/// Probe a URL and, on a 2xx HTML response, extract its page content.
pub(crate) async fn fetch_page_with_retry(
    client: &Client,
    config: &ProbeConfig,
    url: &str,
) -> (ProbeResult, Option<PageContent>) {
    let (mut result, mut body) = execute(client, config, url, true).await;
    let mut attempt = 1u32;

    while attempt < config.retry_attempts && should_retry(&result) {
        sleep(Duration::from_millis(config.delay_ms * attempt as u64)).await;
        attempt += 1;
        (result, body) = execute(client, config, url, true).await;
    }

    let is_html = result
        .content_type
        .as_deref()
        .map(|ct| ct.contains("text/html"))
        .unwrap_or(false);

    let content = match body {
        Some(body) if result.is_ok() && is_html => {
            Some(extract_page_content(&body, &result.final_url))
        }
        _ => None,
    };

    (result, content)
}

fn should_retry(result: &ProbeResult) -> bool {
    result.status_code == 0 || result.status_code >= 500
}

/// One probe attempt: follow redirects manually so each hop is recorded,
/// then capture the terminal response (and optionally its body).
async fn execute(
    client: &Client,
    config: &ProbeConfig,
    url: &str,
    want_body: bool,
) -> (ProbeResult, Option<String>) {
    let start = Instant::now();
    let mut chain: Vec<RedirectHop> = Vec::new();
    let mut current = url.to_string();

    loop {
        let response = match client.get(&current).send().await {
            Ok(response) => response,
            Err(e) => {
                return (
                    transport_failure(url, &current, chain, start, e.to_string()),
                    None,
                )
            }
        };

        let status = response.status();
        if status.is_redirection()
            && config.follow_redirects
            && chain.len() < config.max_redirect_hops
        {
            if let Some(next) = next_location(&response, &current) {
                chain.push(RedirectHop {
                    url: current.clone(),
                    status_code: status.as_u16(),
                    index: chain.len(),
                });
                current = next;
                continue;
            }
        }

        let headers = response.headers();
        let content_type = headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let server = headers
            .get(reqwest::header::SERVER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_length = response.content_length();

        let body = if want_body {
            match response.text().await {
                Ok(body) => Some(body),
                Err(e) => {
                    log::warn!("[PROBE] Failed to read body from {}: {}", current, e);
                    None
                }
            }
        } else {
            None
        };

        let result = ProbeResult {
            url: url.to_string(),
            status_code: status.as_u16(),
            status_text: status_text(status),
            response_time_ms: start.elapsed().as_millis() as u64,
            final_url: current.clone(),
            is_redirect: !chain.is_empty(),
            redirect_chain: chain,
            content_type,
            content_length: content_length.or_else(|| body.as_ref().map(|b| b.len() as u64)),
            server,
            timestamp: Utc::now(),
            error: None,
        };

        return (result, body);
    }
}

fn next_location(response: &reqwest::Response, current: &str) -> Option<String> {
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    match Url::parse(location) {
        Ok(absolute) => Some(absolute.to_string()),
        Err(_) => Url::parse(current)
            .and_then(|base| base.join(location))
            .map(|u| u.to_string())
            .ok(),
    }
}

fn status_text(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("Unknown").to_string()
}

fn transport_failure(
    url: &str,
    current: &str,
    chain: Vec<RedirectHop>,
    start: Instant,
    error: String,
) -> ProbeResult {
    ProbeResult {
        url: url.to_string(),
        status_code: 0,
        status_text: "Network Error".to_string(),
        response_time_ms: start.elapsed().as_millis() as u64,
        final_url: current.to_string(),
        is_redirect: !chain.is_empty(),
        redirect_chain: chain,
        content_type: None,
        content_length: None,
        server: None,
        timestamp: Utc::now(),
        error: Some(error),
    }
}
