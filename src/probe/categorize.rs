//! Probe batch categorization: status partitions, broken links, redirect
//! analysis.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::ProbeResult;

/// Redirect chains longer than this are flagged.
const LONG_CHAIN_THRESHOLD: usize = 2;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCheckReport {
    pub ok: Vec<ProbeResult>,
    pub redirects: Vec<ProbeResult>,
    pub client_errors: Vec<ProbeResult>,
    pub server_errors: Vec<ProbeResult>,
    pub network_errors: Vec<ProbeResult>,
    pub total: usize,
    pub average_response_time_ms: f64,
    /// Sum of content lengths where the header was present
    pub total_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokenLink {
    pub url: String,
    pub status_code: u16,
    pub status_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LongRedirect {
    pub url: String,
    pub final_url: String,
    pub chain_length: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectAnalysis {
    pub total_redirects: usize,
    /// Hop counts keyed by redirect status code (301/302/307/308)
    pub counts_by_code: HashMap<u16, usize>,
    pub average_chain_length: f64,
    pub long_chains: Vec<LongRedirect>,
}

/// Partition a batch of probe results by status class.
pub fn categorize(results: &[ProbeResult]) -> StatusCheckReport {
    let mut report = StatusCheckReport {
        total: results.len(),
        ..StatusCheckReport::default()
    };

    let mut time_sum = 0u64;
    for result in results {
        time_sum += result.response_time_ms;
        report.total_bytes += result.content_length.unwrap_or(0);

        let bucket = match result.status_code {
            0 => &mut report.network_errors,
            200..=299 => &mut report.ok,
            300..=399 => &mut report.redirects,
            400..=499 => &mut report.client_errors,
            _ => &mut report.server_errors,
        };
        bucket.push(result.clone());
    }

    if !results.is_empty() {
        report.average_response_time_ms = time_sum as f64 / results.len() as f64;
    }

    report
}

impl StatusCheckReport {
    /// Client errors rendered as the broken-link list.
    pub fn broken_links(&self) -> Vec<BrokenLink> {
        self.client_errors
            .iter()
            .map(|result| BrokenLink {
                url: result.url.clone(),
                status_code: result.status_code,
                status_text: result.status_text.clone(),
            })
            .collect()
    }

    /// Counts and chain statistics over everything that redirected,
    /// including probes whose final response was a non-3xx after following
    /// the chain.
    pub fn redirect_analysis(&self) -> RedirectAnalysis {
        let redirected: Vec<&ProbeResult> = self
            .ok
            .iter()
            .chain(self.redirects.iter())
            .chain(self.client_errors.iter())
            .chain(self.server_errors.iter())
            .filter(|result| result.is_redirect)
            .collect();

        let mut analysis = RedirectAnalysis {
            total_redirects: redirected.len(),
            ..RedirectAnalysis::default()
        };

        let mut chain_sum = 0usize;
        for result in &redirected {
            chain_sum += result.redirect_chain.len();
            for hop in &result.redirect_chain {
                *analysis.counts_by_code.entry(hop.status_code).or_insert(0) += 1;
            }
            if result.redirect_chain.len() > LONG_CHAIN_THRESHOLD {
                analysis.long_chains.push(LongRedirect {
                    url: result.url.clone(),
                    final_url: result.final_url.clone(),
                    chain_length: result.redirect_chain.len(),
                });
            }
        }

        if !redirected.is_empty() {
            analysis.average_chain_length = chain_sum as f64 / redirected.len() as f64;
        }

        analysis
    }
}
