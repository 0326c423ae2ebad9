//! Manual HTTP redirect chain tracing.

use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use log::debug;
use reqwest::header::LOCATION;
use reqwest::{Client, Response, StatusCode};
use url::Url;

use crate::error::ProbeError;
use crate::types::{RedirectHop, RedirectOutcome};

/// Default number of redirects followed before the sentinel hop is emitted.
pub const DEFAULT_MAX_HOPS: u32 = 10;

/// Per-hop request timeout.
const HOP_TIMEOUT_SECS: u64 = 30;

/// `to_url` of the sentinel hop appended when the hop limit is reached.
const LIMIT_SENTINEL: &str = "Maximum redirect limit reached";
/// `status_text` of the sentinel hop.
const LIMIT_STATUS_TEXT: &str = "ERR_TOO_MANY_REDIRECTS";

/// Shared HTTP client with automatic redirect following disabled.
static TRACE_CLIENT: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(HOP_TIMEOUT_SECS))
        .user_agent(concat!("netkit-probe/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
});

/// Sequential bounded state machine following HTTP redirect responses.
///
/// Hops are strictly sequential; hop *n+1* depends on hop *n*'s Location
/// header, so there is no internal parallelism and no cancellation hook —
/// only the per-hop timeout bounds worst-case latency.
pub struct RedirectTracer {
    client: Client,
}

impl RedirectTracer {
    pub fn new() -> Self {
        Self {
            client: TRACE_CLIENT.clone(),
        }
    }

    /// Trace with the default hop limit of 10.
    pub async fn trace(&self, url: &str) -> RedirectOutcome {
        self.trace_with_limit(url, DEFAULT_MAX_HOPS).await
    }

    /// Follow redirects from `url` for at most `max_hops` steps.
    ///
    /// Reaching the limit is not a failure: the traced chain is valid data,
    /// reported with `success = true`, `limit_reached = true` and a sentinel
    /// hop. Transport failures and redirects without a Location header fail
    /// the trace without appending a hop for the step that never resolved.
    pub async fn trace_with_limit(&self, url: &str, max_hops: u32) -> RedirectOutcome {
        let start = Instant::now();
        let mut outcome = RedirectOutcome::new(url.trim());

        if outcome.url.is_empty() {
            outcome.error = Some(ProbeError::InvalidInput("URL cannot be empty".to_string()));
            return outcome;
        }

        // Default to a secure scheme when none was given.
        if !outcome.url.starts_with("http://") && !outcome.url.starts_with("https://") {
            outcome.url = format!("https://{}", outcome.url);
        }

        debug!("[TRACE] Following redirects for {} (max {max_hops})", outcome.url);

        let mut current_url = outcome.url.clone();
        let mut hop_count: u32 = 0;

        while hop_count < max_hops {
            let hop_start = Instant::now();

            let response = match self.client.get(&current_url).send().await {
                Ok(response) => response,
                Err(e) => {
                    // No response was received; no hop is appended.
                    outcome.error = Some(ProbeError::Transport(if e.is_timeout() {
                        format!("Request timeout at hop {}", hop_count + 1)
                    } else {
                        format!("HTTP error at hop {}: {e}", hop_count + 1)
                    }));
                    outcome.elapsed_ms = super::elapsed_ms(start);
                    return outcome;
                }
            };

            let status = response.status();
            let hop_elapsed = super::elapsed_ms(hop_start);
            let headers = collect_headers(&response);

            if status.is_redirection() {
                let next_url = match redirect_target(&response, &current_url, status) {
                    Ok(next_url) => next_url,
                    Err(e) => {
                        outcome.error = Some(e);
                        outcome.elapsed_ms = super::elapsed_ms(start);
                        return outcome;
                    }
                };

                outcome.hops.push(RedirectHop {
                    from_url: current_url.clone(),
                    to_url: next_url.clone(),
                    status_code: status.as_u16(),
                    status_text: status_text(status),
                    elapsed_ms: hop_elapsed,
                    headers,
                });

                current_url = next_url;
                hop_count += 1;
                continue;
            }

            // Terminal response: the chain ends here.
            outcome.hops.push(RedirectHop {
                from_url: current_url.clone(),
                to_url: current_url.clone(),
                status_code: status.as_u16(),
                status_text: status_text(status),
                elapsed_ms: hop_elapsed,
                headers,
            });
            outcome.final_url = current_url;
            outcome.total_hops = hop_count;
            outcome.success = true;
            outcome.elapsed_ms = super::elapsed_ms(start);

            debug!(
                "[TRACE] Chain complete: {} hops, final {} ({})",
                outcome.total_hops, outcome.final_url, status
            );
            return outcome;
        }

        // Hop limit reached: report the chain collected so far plus a
        // sentinel marking the cut-off.
        outcome.hops.push(RedirectHop {
            from_url: current_url.clone(),
            to_url: LIMIT_SENTINEL.to_string(),
            status_code: 0,
            status_text: LIMIT_STATUS_TEXT.to_string(),
            elapsed_ms: 0,
            headers: HashMap::new(),
        });
        outcome.final_url = current_url;
        outcome.total_hops = hop_count;
        outcome.limit_reached = true;
        outcome.success = true;
        outcome.elapsed_ms = super::elapsed_ms(start);

        debug!(
            "[TRACE] Redirect limit reached after {hop_count} hops for {}",
            outcome.url
        );
        outcome
    }
}

impl Default for RedirectTracer {
    fn default() -> Self {
        Self::new()
    }
}

/// Capture all response headers, unfiltered; duplicate names joined.
fn collect_headers(response: &Response) -> HashMap<String, String> {
    let mut headers: HashMap<String, String> = HashMap::new();
    for (name, value) in response.headers() {
        let value = value.to_str().unwrap_or("<binary>").to_string();
        headers
            .entry(name.to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    headers
}

/// Resolve the Location header of a 3xx response against the current URL.
fn redirect_target(
    response: &Response,
    current_url: &str,
    status: StatusCode,
) -> Result<String, ProbeError> {
    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            ProbeError::ProtocolViolation(format!(
                "Redirect response {} without Location header",
                status.as_u16()
            ))
        })?;

    // Location may be absolute or relative per RFC 3986 reference
    // resolution.
    let base = Url::parse(current_url).map_err(|e| {
        ProbeError::ProtocolViolation(format!("Invalid current URL '{current_url}': {e}"))
    })?;
    let next = base.join(location).map_err(|e| {
        ProbeError::ProtocolViolation(format!("Invalid redirect Location '{location}': {e}"))
    })?;
    Ok(next.to_string())
}

fn status_text(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("Unknown").to_string()
}
