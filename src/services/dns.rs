//! DNS lookup module: typed sub-resolvers behind a shared concurrency gate.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use futures::future::join_all;
use hickory_resolver::{
    config::{ResolverConfig, ResolverOpts},
    name_server::TokioConnectionProvider,
    ResolveError, TokioResolver,
};
use log::debug;
use tokio::net::lookup_host;

use crate::error::{ProbeError, ProbeResult};
use crate::gate::{ConcurrencyGate, ShutdownSignal};
use crate::types::{DnsOutcome, DnsRecord, RecordType};

use super::elapsed_ms;

/// Upstream DNS query timeout.
const QUERY_TIMEOUT_SECS: u64 = 10;
/// Retries after a failed upstream query.
const QUERY_RETRIES: usize = 2;

/// Maximum domain length accepted before any network activity.
const MAX_DOMAIN_LEN: usize = 255;

/// MX answers kept per call; the rest are truncated, not dropped.
const MAX_MX_RECORDS: usize = 50;
/// TXT answers kept per call; lower because TXT payloads can be very large.
const MAX_TXT_RECORDS: usize = 25;
/// MX exchange values longer than this are cut to 497 chars plus `"..."`.
const MAX_MX_VALUE_LEN: usize = 500;
/// Concatenated TXT values longer than this are cut to 1997 chars plus `"..."`.
const MAX_TXT_VALUE_LEN: usize = 2000;

/// Label reported when the system resolver configuration cannot be read.
const FALLBACK_DNS_LABEL: &str = "8.8.8.8, 1.1.1.1";

/// Multi-record-type DNS resolver with bounded concurrency and cooperative
/// cancellation.
///
/// Every lookup acquires the gate exactly once before dispatch; ALL-mode
/// fan-out never re-acquires it, so concurrent outbound load is bounded at
/// gate capacity rather than seven times that.
pub struct DnsResolver {
    resolver: TokioResolver,
    gate: ConcurrencyGate,
    shutdown: ShutdownSignal,
    server_label: String,
}

impl DnsResolver {
    pub fn new(shutdown: ShutdownSignal) -> Self {
        Self::with_gate(shutdown, ConcurrencyGate::default())
    }

    /// Build a resolver sharing an externally owned gate.
    pub fn with_gate(shutdown: ShutdownSignal, gate: ConcurrencyGate) -> Self {
        Self {
            resolver: build_resolver(),
            gate,
            shutdown,
            server_label: system_dns_label(),
        }
    }

    /// Build a resolver against a specific upstream configuration; used by
    /// tests with unroutable or silent upstreams.
    #[cfg(test)]
    fn with_upstream(
        shutdown: ShutdownSignal,
        gate: ConcurrencyGate,
        config: ResolverConfig,
        opts: ResolverOpts,
    ) -> Self {
        let provider = TokioConnectionProvider::default();
        let resolver = TokioResolver::builder_with_config(config, provider)
            .with_options(opts)
            .build();
        Self {
            resolver,
            gate,
            shutdown,
            server_label: system_dns_label(),
        }
    }

    /// Resolve `record_type` records for `domain`.
    ///
    /// Never fails outright: validation errors, gate timeouts, cancellation
    /// and transport failures are all reported through the returned
    /// [`DnsOutcome`]. Elapsed time is measured from call entry, inclusive
    /// of gate wait.
    pub async fn lookup(&self, domain: &str, record_type: RecordType) -> DnsOutcome {
        let start = Instant::now();
        let mut outcome = DnsOutcome::new(domain.trim(), record_type);

        if self.shutdown.is_triggered() {
            outcome.error = Some(ProbeError::Cancelled(
                "DNS lookup cancelled - service is shutting down".to_string(),
            ));
            outcome.elapsed_ms = elapsed_ms(start);
            return outcome;
        }

        let domain = match normalize_domain(domain) {
            Ok(domain) => domain,
            Err(e) => {
                outcome.error = Some(e);
                outcome.elapsed_ms = elapsed_ms(start);
                return outcome;
            }
        };
        outcome.domain.clone_from(&domain);
        outcome.server_used.clone_from(&self.server_label);

        debug!("[DNS] Lookup {domain} type={record_type}");

        // Scoped acquisition: the permit drops on every exit path below.
        let _permit = match self.gate.acquire(&self.shutdown).await {
            Ok(permit) => permit,
            Err(e) => {
                outcome.error = Some(e);
                outcome.elapsed_ms = elapsed_ms(start);
                return outcome;
            }
        };

        match record_type {
            RecordType::All => self.resolve_all(&domain, &mut outcome).await,
            typed => self.resolve_typed(typed, &domain, &mut outcome).await,
        }

        outcome.elapsed_ms = elapsed_ms(start);
        // Zero records with no error is a valid outcome (e.g. AAAA against
        // an IPv4-only host).
        outcome.success = !outcome.records.is_empty() || outcome.error.is_none();

        debug!(
            "[DNS] Lookup completed: {domain} type={record_type} records={} time={}ms",
            outcome.records.len(),
            outcome.elapsed_ms
        );
        outcome
    }

    /// Dispatch one concrete record type. `All` is routed through
    /// [`Self::resolve_all`] and never reaches this table.
    async fn resolve_typed(&self, record_type: RecordType, domain: &str, out: &mut DnsOutcome) {
        match record_type {
            RecordType::A => self.resolve_a(domain, out).await,
            RecordType::Aaaa => self.resolve_aaaa(domain, out).await,
            RecordType::Cname => self.resolve_cname(domain, out).await,
            RecordType::Mx => self.resolve_mx(domain, out).await,
            RecordType::Txt => self.resolve_txt(domain, out).await,
            RecordType::Ns => self.resolve_ns(domain, out).await,
            RecordType::Ptr => self.resolve_ptr(domain, out).await,
            RecordType::All => {}
        }
    }

    /// Fan out to all seven sub-resolvers concurrently and merge in fixed
    /// type order, independent of completion order.
    ///
    /// Individual failures are swallowed so one bad branch never voids its
    /// siblings; the aggregate errors only when the merged list is empty.
    async fn resolve_all(&self, domain: &str, out: &mut DnsOutcome) {
        let lookups = RecordType::FAN_OUT.map(|record_type| async move {
            let mut sub = DnsOutcome::new(domain, record_type);
            self.resolve_typed(record_type, domain, &mut sub).await;
            sub
        });

        // join_all preserves the fan-out order regardless of completion
        // order, so the merge below is deterministic.
        merge_fan_out(out, join_all(lookups).await);
    }

    /// A records via OS-level host resolution; no TTL available.
    async fn resolve_a(&self, domain: &str, out: &mut DnsOutcome) {
        match lookup_host((domain, 0u16)).await {
            Ok(addrs) => {
                for addr in addrs.filter(std::net::SocketAddr::is_ipv4) {
                    out.records.push(DnsRecord {
                        record_type: "A".to_string(),
                        name: domain.to_string(),
                        value: addr.ip().to_string(),
                        ttl: 0,
                        priority: None,
                    });
                }
            }
            Err(e) => out.error = Some(ProbeError::Transport(format!("A lookup failed: {e}"))),
        }
    }

    /// AAAA records via OS-level host resolution; no TTL available.
    async fn resolve_aaaa(&self, domain: &str, out: &mut DnsOutcome) {
        match lookup_host((domain, 0u16)).await {
            Ok(addrs) => {
                for addr in addrs.filter(std::net::SocketAddr::is_ipv6) {
                    out.records.push(DnsRecord {
                        record_type: "AAAA".to_string(),
                        name: domain.to_string(),
                        value: addr.ip().to_string(),
                        ttl: 0,
                        priority: None,
                    });
                }
            }
            Err(e) => out.error = Some(ProbeError::Transport(format!("AAAA lookup failed: {e}"))),
        }
    }

    /// CNAME query; a record is emitted only when the canonical name
    /// differs from the query domain.
    async fn resolve_cname(&self, domain: &str, out: &mut DnsOutcome) {
        match self
            .resolver
            .lookup(domain, hickory_resolver::proto::rr::RecordType::CNAME)
            .await
        {
            Ok(response) => {
                for record in response.record_iter() {
                    if let Some(cname) = record.data().as_cname() {
                        let value = cname.0.to_string().trim_end_matches('.').to_string();
                        if value != domain {
                            out.records.push(DnsRecord {
                                record_type: "CNAME".to_string(),
                                name: domain.to_string(),
                                value,
                                ttl: record.ttl(),
                                priority: None,
                            });
                        }
                    }
                }
            }
            Err(e) => {
                // A domain without a CNAME is not a failure.
                if !e.is_no_records_found() {
                    out.error =
                        Some(ProbeError::Transport(format!("CNAME lookup failed: {e}")));
                }
            }
        }
    }

    /// MX query via the typed resolver; cancellable, capped at 50 answers.
    async fn resolve_mx(&self, domain: &str, out: &mut DnsOutcome) {
        let response = tokio::select! {
            () = self.shutdown.cancelled() => {
                out.error = Some(ProbeError::Cancelled("MX lookup was cancelled".to_string()));
                return;
            }
            res = self.resolver.mx_lookup(domain) => res,
        };

        match response {
            Ok(response) => {
                let ttl = response
                    .as_lookup()
                    .record_iter()
                    .next()
                    .map_or(0, hickory_resolver::proto::rr::Record::ttl);
                let records = response.iter().map(|mx| DnsRecord {
                    record_type: "MX".to_string(),
                    name: domain.to_string(),
                    value: clamp_value(
                        mx.exchange().to_string().trim_end_matches('.').to_string(),
                        MAX_MX_VALUE_LEN,
                    ),
                    ttl,
                    priority: Some(mx.preference()),
                });
                extend_with_cap(out, records, MAX_MX_RECORDS, "MX");
            }
            Err(e) => out.error = Some(classify_lookup_error("MX", &e)),
        }

        if out.records.is_empty() && out.error.is_none() {
            out.error = Some(ProbeError::NotFound("No MX records found".to_string()));
        }
    }

    /// TXT query via the typed resolver; cancellable, capped at 25 answers.
    async fn resolve_txt(&self, domain: &str, out: &mut DnsOutcome) {
        let response = tokio::select! {
            () = self.shutdown.cancelled() => {
                out.error = Some(ProbeError::Cancelled("TXT lookup was cancelled".to_string()));
                return;
            }
            res = self.resolver.txt_lookup(domain) => res,
        };

        match response {
            Ok(response) => {
                let ttl = response
                    .as_lookup()
                    .record_iter()
                    .next()
                    .map_or(0, hickory_resolver::proto::rr::Record::ttl);
                let records = response.iter().map(|txt| {
                    let joined = txt
                        .iter()
                        .map(|data| String::from_utf8_lossy(data))
                        .collect::<Vec<_>>()
                        .join(" ");
                    DnsRecord {
                        record_type: "TXT".to_string(),
                        name: domain.to_string(),
                        value: clamp_value(joined, MAX_TXT_VALUE_LEN),
                        ttl,
                        priority: None,
                    }
                });
                extend_with_cap(out, records, MAX_TXT_RECORDS, "TXT");
            }
            Err(e) => out.error = Some(classify_lookup_error("TXT", &e)),
        }

        if out.records.is_empty() && out.error.is_none() {
            out.error = Some(ProbeError::NotFound("No TXT records found".to_string()));
        }
    }

    /// NS query via the typed resolver; no cap.
    async fn resolve_ns(&self, domain: &str, out: &mut DnsOutcome) {
        match self.resolver.ns_lookup(domain).await {
            Ok(response) => {
                let ttl = response
                    .as_lookup()
                    .record_iter()
                    .next()
                    .map_or(0, hickory_resolver::proto::rr::Record::ttl);
                for ns in response.iter() {
                    out.records.push(DnsRecord {
                        record_type: "NS".to_string(),
                        name: domain.to_string(),
                        value: ns.to_string().trim_end_matches('.').to_string(),
                        ttl,
                        priority: None,
                    });
                }
            }
            Err(e) => out.error = Some(classify_lookup_error("NS", &e)),
        }

        if out.records.is_empty() && out.error.is_none() {
            out.error = Some(ProbeError::NotFound("No NS records found".to_string()));
        }
    }

    /// Reverse lookup; accepts only a literal IP address, never a hostname.
    async fn resolve_ptr(&self, domain: &str, out: &mut DnsOutcome) {
        let Ok(ip) = domain.parse::<IpAddr>() else {
            out.error = Some(ProbeError::InvalidInput(
                "PTR lookup requires an IP address".to_string(),
            ));
            return;
        };

        match self.resolver.reverse_lookup(ip).await {
            Ok(response) => {
                for ptr in response.iter() {
                    out.records.push(DnsRecord {
                        record_type: "PTR".to_string(),
                        name: domain.to_string(),
                        value: ptr.0.to_string().trim_end_matches('.').to_string(),
                        ttl: 0,
                        priority: None,
                    });
                }
            }
            Err(e) => out.error = Some(classify_lookup_error("PTR", &e)),
        }
    }
}

/// Validate and strip a raw domain input.
///
/// Rejects empty or overlong input, then removes any scheme prefix and
/// anything from the first `/` onward. No network activity.
fn normalize_domain(raw: &str) -> ProbeResult<String> {
    let domain = raw.trim();
    if domain.is_empty() {
        return Err(ProbeError::InvalidInput("Domain cannot be empty".to_string()));
    }
    if domain.len() > MAX_DOMAIN_LEN {
        return Err(ProbeError::InvalidInput(
            "Domain name too long (max 255 characters)".to_string(),
        ));
    }

    let domain = domain
        .strip_prefix("http://")
        .or_else(|| domain.strip_prefix("https://"))
        .unwrap_or(domain);
    let domain = domain.split('/').next().unwrap_or(domain);
    Ok(domain.to_string())
}

/// Cut `value` down to `max_len` bytes, ending in `"..."` when truncated.
fn clamp_value(mut value: String, max_len: usize) -> String {
    if value.len() > max_len {
        let mut cut = max_len - 3;
        while !value.is_char_boundary(cut) {
            cut -= 1;
        }
        value.truncate(cut);
        value.push_str("...");
    }
    value
}

/// Merge fan-out sub-outcomes, in the order given, into the aggregate.
///
/// Branch errors are swallowed; truncation flags and notes carry over; the
/// aggregate errors only when the merged record list is empty.
fn merge_fan_out(out: &mut DnsOutcome, subs: Vec<DnsOutcome>) {
    for sub in subs {
        out.truncated |= sub.truncated;
        if let Some(note) = sub.note {
            out.note = Some(match out.note.take() {
                Some(prev) => format!("{prev}; {note}"),
                None => note,
            });
        }
        if !sub.records.is_empty() {
            out.records.extend(sub.records);
        }
    }

    if out.records.is_empty() {
        out.error = Some(ProbeError::NotFound(
            "No records found for any record type".to_string(),
        ));
    }
}

/// Append records up to `cap`; excess answers are truncated, not dropped,
/// and a descriptive non-fatal note is set.
fn extend_with_cap(
    out: &mut DnsOutcome,
    records: impl Iterator<Item = DnsRecord>,
    cap: usize,
    label: &str,
) {
    let mut count = 0;
    for record in records {
        if count >= cap {
            out.truncated = true;
            out.note = Some(format!("Too many {label} records (showing first {cap})"));
            break;
        }
        out.records.push(record);
        count += 1;
    }
}

/// Distinguish "nothing there" from real transport failure.
fn classify_lookup_error(record_type: &str, err: &ResolveError) -> ProbeError {
    if err.is_no_records_found() || err.is_nx_domain() {
        ProbeError::NotFound(format!("No {record_type} records found"))
    } else {
        ProbeError::Transport(format!("{record_type} lookup failed: {err}"))
    }
}

fn probe_resolver_opts() -> ResolverOpts {
    let mut opts = ResolverOpts::default();
    opts.timeout = Duration::from_secs(QUERY_TIMEOUT_SECS);
    opts.attempts = QUERY_RETRIES;
    opts
}

/// Build a resolver using the host system DNS configuration (with fallback).
fn build_resolver() -> TokioResolver {
    #[cfg(any(unix, target_os = "windows"))]
    {
        match TokioResolver::builder_tokio() {
            Ok(mut builder) => {
                *builder.options_mut() = probe_resolver_opts();
                return builder.build();
            }
            Err(e) => {
                log::warn!(
                    "Failed to load system DNS configuration, falling back to defaults: {e}"
                );
            }
        }
    }

    let provider = TokioConnectionProvider::default();
    TokioResolver::builder_with_config(ResolverConfig::default(), provider)
        .with_options(probe_resolver_opts())
        .build()
}

/// Best-effort label for the resolvers the host is configured to use.
fn system_dns_label() -> String {
    #[cfg(any(unix, target_os = "windows"))]
    {
        if let Ok((config, _opts)) = hickory_resolver::system_conf::read_system_conf() {
            let mut ips: Vec<String> = Vec::new();
            for ns in config.name_servers() {
                let ip = ns.socket_addr.ip().to_string();
                if !ips.contains(&ip) {
                    ips.push(ip);
                }
            }
            if !ips.is_empty() {
                return ips.join(", ");
            }
        }
    }

    FALLBACK_DNS_LABEL.to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // ==================== normalize_domain tests ====================

    #[test]
    fn test_normalize_domain_plain() {
        assert_eq!(normalize_domain("example.com").unwrap(), "example.com");
    }

    #[test]
    fn test_normalize_domain_strips_scheme_and_path() {
        assert_eq!(
            normalize_domain("https://example.com/some/path").unwrap(),
            "example.com"
        );
        assert_eq!(
            normalize_domain("http://example.com/").unwrap(),
            "example.com"
        );
    }

    #[test]
    fn test_normalize_domain_trims_whitespace() {
        assert_eq!(normalize_domain("  example.com  ").unwrap(), "example.com");
    }

    #[test]
    fn test_normalize_domain_empty() {
        let err = normalize_domain("").unwrap_err();
        assert_eq!(
            err,
            ProbeError::InvalidInput("Domain cannot be empty".to_string())
        );
        assert!(normalize_domain("   ").is_err());
    }

    #[test]
    fn test_normalize_domain_too_long_exact_message() {
        let long = "a".repeat(256);
        let err = normalize_domain(&long).unwrap_err();
        assert_eq!(
            err,
            ProbeError::InvalidInput("Domain name too long (max 255 characters)".to_string())
        );
        // 255 is still accepted.
        assert!(normalize_domain(&"a".repeat(255)).is_ok());
    }

    // ==================== clamp_value tests ====================

    #[test]
    fn test_clamp_value_short_untouched() {
        assert_eq!(clamp_value("mail.example.com".to_string(), 500), "mail.example.com");
    }

    #[test]
    fn test_clamp_value_at_cap_untouched() {
        let exact = "x".repeat(500);
        assert_eq!(clamp_value(exact.clone(), 500), exact);
    }

    #[test]
    fn test_clamp_value_over_cap() {
        let long = "x".repeat(600);
        let clamped = clamp_value(long, 500);
        assert_eq!(clamped.len(), 500);
        assert!(clamped.ends_with("..."));
    }

    #[test]
    fn test_clamp_value_respects_char_boundaries() {
        let long = "é".repeat(1200);
        let clamped = clamp_value(long, 2000);
        assert!(clamped.len() <= 2000);
        assert!(clamped.ends_with("..."));
    }

    // ==================== extend_with_cap tests ====================

    fn synthetic_records(n: usize, record_type: &str) -> Vec<DnsRecord> {
        (0..n)
            .map(|i| DnsRecord {
                record_type: record_type.to_string(),
                name: "example.com".to_string(),
                value: format!("host{i}.example.com"),
                ttl: 300,
                priority: None,
            })
            .collect()
    }

    #[test]
    fn test_extend_with_cap_under_cap() {
        let mut out = DnsOutcome::new("example.com", RecordType::Mx);
        extend_with_cap(
            &mut out,
            synthetic_records(10, "MX").into_iter(),
            MAX_MX_RECORDS,
            "MX",
        );
        assert_eq!(out.records.len(), 10);
        assert!(!out.truncated);
        assert!(out.note.is_none());
    }

    #[test]
    fn test_extend_with_cap_truncates_and_retains() {
        let mut out = DnsOutcome::new("example.com", RecordType::Mx);
        extend_with_cap(
            &mut out,
            synthetic_records(80, "MX").into_iter(),
            MAX_MX_RECORDS,
            "MX",
        );
        assert_eq!(out.records.len(), MAX_MX_RECORDS);
        assert!(out.truncated);
        assert_eq!(
            out.note.as_deref(),
            Some("Too many MX records (showing first 50)")
        );
        // Truncation is non-fatal.
        assert!(out.error.is_none());
    }

    #[test]
    fn test_extend_with_cap_txt_limit() {
        let mut out = DnsOutcome::new("example.com", RecordType::Txt);
        extend_with_cap(
            &mut out,
            synthetic_records(40, "TXT").into_iter(),
            MAX_TXT_RECORDS,
            "TXT",
        );
        assert_eq!(out.records.len(), MAX_TXT_RECORDS);
        assert_eq!(
            out.note.as_deref(),
            Some("Too many TXT records (showing first 25)")
        );
    }

    // ==================== merge_fan_out tests ====================

    fn sub_with_records(record_type: RecordType, records: Vec<DnsRecord>) -> DnsOutcome {
        let mut sub = DnsOutcome::new("example.com", record_type);
        sub.records = records;
        sub
    }

    #[test]
    fn test_merge_fan_out_preserves_type_order() {
        let mut out = DnsOutcome::new("example.com", RecordType::All);
        // Sub-outcomes arrive in fan-out order; NS before A here would be a
        // bug in the caller, so feed them as the fan-out produces them.
        let subs = vec![
            sub_with_records(RecordType::A, synthetic_records(2, "A")),
            sub_with_records(RecordType::Aaaa, vec![]),
            sub_with_records(RecordType::Cname, vec![]),
            sub_with_records(RecordType::Mx, synthetic_records(1, "MX")),
            sub_with_records(RecordType::Txt, vec![]),
            sub_with_records(RecordType::Ns, synthetic_records(2, "NS")),
            sub_with_records(RecordType::Ptr, vec![]),
        ];
        merge_fan_out(&mut out, subs);

        let types: Vec<&str> = out.records.iter().map(|r| r.record_type.as_str()).collect();
        assert_eq!(types, ["A", "A", "MX", "NS", "NS"]);
        assert!(out.error.is_none());
    }

    #[test]
    fn test_merge_fan_out_swallows_failed_branches() {
        let mut out = DnsOutcome::new("example.com", RecordType::All);
        let mut failed = DnsOutcome::new("example.com", RecordType::Mx);
        failed.error = Some(ProbeError::Transport("MX lookup failed: timeout".to_string()));
        let subs = vec![
            sub_with_records(RecordType::A, synthetic_records(1, "A")),
            failed,
        ];
        merge_fan_out(&mut out, subs);

        // One failed branch never voids its siblings.
        assert_eq!(out.records.len(), 1);
        assert!(out.error.is_none());
    }

    #[test]
    fn test_merge_fan_out_empty_yields_not_found() {
        let mut out = DnsOutcome::new("example.com", RecordType::All);
        let subs = RecordType::FAN_OUT
            .map(|t| DnsOutcome::new("example.com", t))
            .into_iter()
            .collect();
        merge_fan_out(&mut out, subs);

        assert_eq!(
            out.error,
            Some(ProbeError::NotFound(
                "No records found for any record type".to_string()
            ))
        );
    }

    #[test]
    fn test_merge_fan_out_combines_truncation_notes() {
        let mut out = DnsOutcome::new("example.com", RecordType::All);
        let mut mx = sub_with_records(RecordType::Mx, synthetic_records(50, "MX"));
        mx.truncated = true;
        mx.note = Some("Too many MX records (showing first 50)".to_string());
        let mut txt = sub_with_records(RecordType::Txt, synthetic_records(25, "TXT"));
        txt.truncated = true;
        txt.note = Some("Too many TXT records (showing first 25)".to_string());
        merge_fan_out(&mut out, vec![mx, txt]);

        assert!(out.truncated);
        assert_eq!(
            out.note.as_deref(),
            Some(
                "Too many MX records (showing first 50); \
                 Too many TXT records (showing first 25)"
            )
        );
        assert!(out.error.is_none());
    }

    // ==================== cancellation tests (silent upstream) ==========

    /// An upstream that accepts queries on loopback and never answers, on
    /// both transports. The sockets must stay alive for the test duration.
    fn silent_upstream() -> (std::net::UdpSocket, std::net::TcpListener, ResolverConfig) {
        let udp = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = udp.local_addr().unwrap().port();
        let tcp = std::net::TcpListener::bind(("127.0.0.1", port)).unwrap();
        let config = ResolverConfig::from_parts(
            None,
            vec![],
            hickory_resolver::config::NameServerConfigGroup::from_ips_clear(
                &[IpAddr::from([127, 0, 0, 1])],
                port,
                true,
            ),
        );
        (udp, tcp, config)
    }

    #[tokio::test]
    async fn test_mx_lookup_cancelled_by_shutdown() {
        let (_udp, _tcp, config) = silent_upstream();
        let shutdown = ShutdownSignal::new();
        let resolver = DnsResolver::with_upstream(
            shutdown.clone(),
            ConcurrencyGate::default(),
            config,
            probe_resolver_opts(),
        );

        let lookup = tokio::spawn(async move {
            resolver.lookup("example.com", RecordType::Mx).await
        });
        // Let the lookup pass its entry check and park on the in-flight
        // query before signalling.
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.trigger();

        let out = lookup.await.unwrap();
        assert!(!out.success);
        assert_eq!(
            out.error,
            Some(ProbeError::Cancelled("MX lookup was cancelled".to_string()))
        );
        assert!(out.records.is_empty());
    }

    #[tokio::test]
    async fn test_txt_lookup_cancelled_by_shutdown() {
        let (_udp, _tcp, config) = silent_upstream();
        let shutdown = ShutdownSignal::new();
        let resolver = DnsResolver::with_upstream(
            shutdown.clone(),
            ConcurrencyGate::default(),
            config,
            probe_resolver_opts(),
        );

        let lookup = tokio::spawn(async move {
            resolver.lookup("example.com", RecordType::Txt).await
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.trigger();

        let out = lookup.await.unwrap();
        assert!(!out.success);
        assert_eq!(
            out.error,
            Some(ProbeError::Cancelled("TXT lookup was cancelled".to_string()))
        );
    }

    #[tokio::test]
    async fn test_lookup_all_tolerates_failed_branches() {
        // Silent upstream with a short timeout: every typed query fails
        // while OS-level resolution of a loopback literal still succeeds.
        let (_udp, _tcp, config) = silent_upstream();
        let mut opts = ResolverOpts::default();
        opts.timeout = Duration::from_millis(200);
        opts.attempts = 0;
        let resolver = DnsResolver::with_upstream(
            ShutdownSignal::new(),
            ConcurrencyGate::default(),
            config,
            opts,
        );

        let out = resolver.lookup("127.0.0.1", RecordType::All).await;
        assert!(out.success, "ALL lookup failed: {:?}", out.error);
        assert!(out.error.is_none());
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].record_type, "A");
        assert_eq!(out.records[0].value, "127.0.0.1");
    }

    // ==================== lookup tests (no network) ====================

    #[tokio::test]
    async fn test_lookup_empty_domain() {
        let resolver = DnsResolver::new(ShutdownSignal::new());
        let out = resolver.lookup("", RecordType::A).await;
        assert!(!out.success);
        assert_eq!(
            out.error,
            Some(ProbeError::InvalidInput("Domain cannot be empty".to_string()))
        );
        assert!(out.records.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_overlong_domain_exact_message() {
        let resolver = DnsResolver::new(ShutdownSignal::new());
        let out = resolver.lookup(&"a".repeat(256), RecordType::A).await;
        assert!(!out.success);
        assert_eq!(
            out.error,
            Some(ProbeError::InvalidInput(
                "Domain name too long (max 255 characters)".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_lookup_ptr_rejects_hostname() {
        let resolver = DnsResolver::new(ShutdownSignal::new());
        let out = resolver.lookup("example.com", RecordType::Ptr).await;
        assert!(!out.success);
        assert_eq!(
            out.error,
            Some(ProbeError::InvalidInput(
                "PTR lookup requires an IP address".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_lookup_rejected_after_shutdown() {
        let shutdown = ShutdownSignal::new();
        let resolver = DnsResolver::new(shutdown.clone());
        shutdown.trigger();

        let out = resolver.lookup("example.com", RecordType::A).await;
        assert!(!out.success);
        assert!(matches!(out.error, Some(ProbeError::Cancelled(_))));
    }

    #[tokio::test]
    async fn test_lookup_gate_exhaustion() {
        let gate = ConcurrencyGate::new(1).with_wait_timeout(Duration::from_millis(20));
        let shutdown = ShutdownSignal::new();
        let resolver = DnsResolver::with_gate(shutdown.clone(), gate.clone());

        let _held = gate.acquire(&shutdown).await.unwrap();
        let out = resolver.lookup("example.com", RecordType::Ns).await;
        assert!(!out.success);
        assert!(matches!(out.error, Some(ProbeError::ResourceExhausted(_))));
    }

    // ==================== integration tests ====================
    // NOTE: these depend on external networks; failures may be network
    // issues, not code bugs.

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_lookup_a_real() {
        let resolver = DnsResolver::new(ShutdownSignal::new());
        let out = resolver.lookup("example.com", RecordType::A).await;
        assert!(out.success, "A lookup failed: {:?}", out.error);
        assert!(!out.records.is_empty());
        assert!(out.records.iter().all(|r| r.record_type == "A" && r.ttl == 0));
        assert!(!out.server_used.is_empty());
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_lookup_mx_real() {
        let resolver = DnsResolver::new(ShutdownSignal::new());
        let out = resolver.lookup("gmail.com", RecordType::Mx).await;
        assert!(out.success, "MX lookup failed: {:?}", out.error);
        assert!(out.records.len() <= MAX_MX_RECORDS);
        assert!(out.records.iter().all(|r| r.priority.is_some()));
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_lookup_all_merges_in_type_order_real() {
        let resolver = DnsResolver::new(ShutdownSignal::new());
        let out = resolver.lookup("google.com", RecordType::All).await;
        assert!(out.success, "ALL lookup failed: {:?}", out.error);

        // Merged output follows the fixed fan-out order regardless of
        // completion order.
        let order = ["A", "AAAA", "CNAME", "MX", "TXT", "NS", "PTR"];
        let positions: Vec<usize> = out
            .records
            .iter()
            .map(|r| order.iter().position(|t| *t == r.record_type).unwrap())
            .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_lookup_ptr_real() {
        let resolver = DnsResolver::new(ShutdownSignal::new());
        let out = resolver.lookup("8.8.8.8", RecordType::Ptr).await;
        assert!(out.success, "PTR lookup failed: {:?}", out.error);
        assert!(!out.records.is_empty());
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_lookup_strips_scheme_real() {
        let resolver = DnsResolver::new(ShutdownSignal::new());
        let out = resolver
            .lookup("https://example.com/index.html", RecordType::A)
            .await;
        assert_eq!(out.domain, "example.com");
        assert!(out.success, "A lookup failed: {:?}", out.error);
    }
}
