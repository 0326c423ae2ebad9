//! Probe engine facade.

mod dns;
mod redirect;

use std::time::Instant;

pub use dns::DnsResolver;
pub use redirect::{RedirectTracer, DEFAULT_MAX_HOPS};

use crate::gate::ShutdownSignal;
use crate::types::{DnsOutcome, RecordType, RedirectOutcome};

/// Milliseconds since `start`.
// u128 -> u64: elapsed millis for a probe operation will never exceed u64::MAX
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Entry point for the network probing engine.
///
/// Construction wires the process-scoped pieces once: the concurrency gate
/// (capacity 5), the shutdown signal, the DNS resolver and the redirect
/// tracer. Everything an operation produces is scoped to that one call.
///
/// ```rust,no_run
/// use netkit_probe::{ProbeService, RecordType};
/// # async fn demo() {
/// let probe = ProbeService::new();
/// let dns = probe.lookup("example.com", RecordType::A).await;
/// let chain = probe.trace("http://example.com").await;
/// probe.shutdown();
/// # }
/// ```
pub struct ProbeService {
    dns: DnsResolver,
    tracer: RedirectTracer,
    shutdown: ShutdownSignal,
}

impl ProbeService {
    pub fn new() -> Self {
        let shutdown = ShutdownSignal::new();
        Self {
            dns: DnsResolver::new(shutdown.clone()),
            tracer: RedirectTracer::new(),
            shutdown,
        }
    }

    /// Resolve DNS records for a domain.
    ///
    /// `record_type` selects one of the seven typed sub-resolvers, or
    /// [`RecordType::All`] to fan out to every type concurrently and merge
    /// the answers in fixed type order.
    pub async fn lookup(&self, domain: &str, record_type: RecordType) -> DnsOutcome {
        self.dns.lookup(domain, record_type).await
    }

    /// Follow the redirect chain from `url` with the default hop limit.
    pub async fn trace(&self, url: &str) -> RedirectOutcome {
        self.tracer.trace(url).await
    }

    /// Follow the redirect chain from `url` for at most `max_hops` steps.
    pub async fn trace_with_limit(&self, url: &str, max_hops: u32) -> RedirectOutcome {
        self.tracer.trace_with_limit(url, max_hops).await
    }

    /// Signal shutdown: new lookups are rejected immediately and in-flight
    /// MX/TXT queries are cancelled cooperatively.
    ///
    /// Idempotent, non-blocking, safe to call repeatedly. OS-level host
    /// resolution exposes no cancellation hook, so cancellation of A/AAAA
    /// sub-operations is best-effort.
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_triggered()
    }
}

impl Default for ProbeService {
    fn default() -> Self {
        Self::new()
    }
}
