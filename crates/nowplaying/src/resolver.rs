//! Probe orchestration: fan out against the candidate bases, wait for every
//! probe to settle, then pick the winner by confidence rather than by
//! completion order.

use crate::base::{derive_base, strip_query};
use crate::probe::{Probe, PROBE_ORDER};
use crate::sanitize;
use futures_util::future::join_all;
use std::time::Duration;
use tracing::debug;

/// Tuning knobs for [`MetadataResolver`].
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Optional relay prefix prepended verbatim to every probe URL, for
    /// environments that cannot issue cross-origin requests directly. The
    /// relay is a swappable intermediary; resolution behaves identically
    /// with or without it.
    pub relay_prefix: Option<String>,
    /// Upper bound on each individual probe, connect time included. Keeps
    /// one unreachable status endpoint from stalling the whole call.
    pub probe_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            relay_prefix: None,
            probe_timeout: Duration::from_secs(6),
        }
    }
}

/// Best-effort "now playing" resolver for a stream URL.
///
/// Holds only an HTTP client and configuration; every [`resolve`] call is
/// independent and idempotent, so one resolver may serve concurrent callers
/// for different streams.
///
/// [`resolve`]: MetadataResolver::resolve
pub struct MetadataResolver {
    client: reqwest::Client,
    config: ResolverConfig,
}

impl MetadataResolver {
    pub fn new() -> Self {
        Self::with_config(ResolverConfig::default())
    }

    pub fn with_config(config: ResolverConfig) -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.probe_timeout)
            .build()
            .expect("failed to build reqwest client for metadata probes");
        Self { client, config }
    }

    /// Resolve the currently-playing title for `stream_url`.
    ///
    /// Returns `None` for blank input without touching the network.
    /// Otherwise launches the full probe plan concurrently, waits for all
    /// probes to settle and returns the sanitized title from the first
    /// probe in the fixed plan order that produced one. Never fails: probe
    /// errors, timeouts and even probe panics all count as a miss.
    pub async fn resolve(&self, stream_url: &str) -> Option<String> {
        let stream_url = stream_url.trim();
        if stream_url.is_empty() {
            return None;
        }

        let plan = probe_plan(stream_url);
        debug!("probing {} endpoints for {}", plan.len(), stream_url);

        let handles: Vec<_> = plan
            .iter()
            .map(|(probe, endpoint)| {
                let client = self.client.clone();
                let url = self.request_url(endpoint);
                let probe = *probe;
                let timeout = self.config.probe_timeout;
                tokio::spawn(async move {
                    match tokio::time::timeout(timeout, probe.run(&client, &url)).await {
                        Ok(result) => result,
                        Err(_) => {
                            debug!("probe {:?} timed out after {:?} at {}", probe, timeout, url);
                            None
                        }
                    }
                })
            })
            .collect();

        let results = join_all(handles).await;

        for ((probe, endpoint), joined) in plan.iter().zip(results) {
            let raw = joined.unwrap_or_else(|e| {
                debug!("probe {:?} task failed at {}: {}", probe, endpoint, e);
                None
            });
            if let Some(raw) = raw {
                let title = sanitize::clean(&raw);
                if !title.is_empty() {
                    debug!("resolved via {:?} at {}: {}", probe, endpoint, title);
                    return Some(title);
                }
            }
        }

        debug!("no probe produced metadata for {}", stream_url);
        None
    }

    fn request_url(&self, url: &str) -> String {
        match &self.config.relay_prefix {
            Some(prefix) => format!("{}{}", prefix, url),
            None => url.to_string(),
        }
    }
}

impl Default for MetadataResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the fixed probe plan for one resolve call: every probe against the
/// derived base, then every probe against the query-stripped stream URL
/// itself. The second candidate covers servers where the mount-point
/// heuristic guessed wrong; it is skipped when it equals the first. Plan
/// position doubles as result priority.
fn probe_plan(stream_url: &str) -> Vec<(Probe, String)> {
    let mut candidates = vec![derive_base(stream_url)];
    let raw = strip_query(stream_url);
    if !candidates.contains(&raw) {
        candidates.push(raw);
    }

    let mut plan = Vec::with_capacity(candidates.len() * PROBE_ORDER.len());
    for candidate in &candidates {
        for probe in PROBE_ORDER {
            plan.push((probe, probe.endpoint(candidate)));
        }
    }
    plan
}
