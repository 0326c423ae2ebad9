//! Public types returned by probe operations.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProbeError;

/// DNS query type for lookup operations.
///
/// Includes the seven supported record types plus [`All`](Self::All) to fan
/// out to every type at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// IPv4 address record.
    A,
    /// IPv6 address record.
    Aaaa,
    /// Canonical name (alias) record.
    Cname,
    /// Mail exchange record.
    Mx,
    /// Text record.
    Txt,
    /// Name server record.
    Ns,
    /// Pointer record (reverse DNS).
    Ptr,
    /// Query all supported record types concurrently.
    All,
}

impl RecordType {
    /// The seven concrete types queried by ALL mode, in merge order.
    pub(crate) const FAN_OUT: [Self; 7] = [
        Self::A,
        Self::Aaaa,
        Self::Cname,
        Self::Mx,
        Self::Txt,
        Self::Ns,
        Self::Ptr,
    ];
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::Aaaa => write!(f, "AAAA"),
            Self::Cname => write!(f, "CNAME"),
            Self::Mx => write!(f, "MX"),
            Self::Txt => write!(f, "TXT"),
            Self::Ns => write!(f, "NS"),
            Self::Ptr => write!(f, "PTR"),
            Self::All => write!(f, "ALL"),
        }
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "A" => Ok(Self::A),
            "AAAA" => Ok(Self::Aaaa),
            "CNAME" => Ok(Self::Cname),
            "MX" => Ok(Self::Mx),
            "TXT" => Ok(Self::Txt),
            "NS" => Ok(Self::Ns),
            "PTR" => Ok(Self::Ptr),
            "ALL" => Ok(Self::All),
            _ => Err(format!("Unsupported record type: {s}")),
        }
    }
}

/// A single DNS record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsRecord {
    /// Record type (e.g. `"A"`, `"MX"`, `"CNAME"`).
    pub record_type: String,
    /// Record name (the queried domain).
    pub name: String,
    /// Record value / rdata. Trailing dots are trimmed from domain values.
    pub value: String,
    /// Time-to-live in seconds. `0` when the resolution path exposes no TTL
    /// (OS-level host resolution for A/AAAA, reverse lookups for PTR).
    pub ttl: u32,
    /// Priority (MX records only).
    pub priority: Option<u16>,
}

/// Structured result of one DNS lookup.
///
/// Records are appended during the call and never mutated after return.
/// `success` with zero records is a valid outcome (e.g. an AAAA query
/// against an IPv4-only host); callers must check both `success` and
/// `error`/`records`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsOutcome {
    /// The queried domain (after scheme/path stripping).
    pub domain: String,
    /// The queried record type.
    pub record_type: RecordType,
    /// Whether the lookup produced usable data.
    pub success: bool,
    /// Fatal failure classification, if any.
    pub error: Option<ProbeError>,
    /// Whether a per-type record cap truncated the answer set.
    ///
    /// Truncation is non-fatal: the capped records are retained and
    /// [`note`](Self::note) describes what was cut.
    pub truncated: bool,
    /// Human-readable truncation note.
    pub note: Option<String>,
    /// Resolved records, in merge order for ALL queries.
    pub records: Vec<DnsRecord>,
    /// Best-effort label for the DNS servers consulted. Diagnostic only;
    /// never affects success classification.
    pub server_used: String,
    /// Wall-clock time from call entry (inclusive of gate wait), in ms.
    pub elapsed_ms: u64,
}

impl DnsOutcome {
    pub(crate) fn new(domain: &str, record_type: RecordType) -> Self {
        Self {
            domain: domain.to_string(),
            record_type,
            success: false,
            error: None,
            truncated: false,
            note: None,
            records: Vec::new(),
            server_used: String::new(),
            elapsed_ms: 0,
        }
    }
}

/// One step of a redirect chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectHop {
    /// URL the request was sent to.
    pub from_url: String,
    /// URL the response pointed at (equal to `from_url` for the terminal
    /// hop; a sentinel message when the hop limit was reached).
    pub to_url: String,
    /// HTTP status code; `0` for the sentinel hop.
    pub status_code: u16,
    /// HTTP status text (e.g. `"Moved Permanently"`), or
    /// `"ERR_TOO_MANY_REDIRECTS"` for the sentinel hop.
    pub status_text: String,
    /// Round-trip time for this hop, in ms.
    pub elapsed_ms: u64,
    /// All response headers, unfiltered. Duplicate names are joined with
    /// `", "`.
    pub headers: HashMap<String, String>,
}

/// Structured result of one redirect trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectOutcome {
    /// The traced URL (after scheme defaulting).
    pub url: String,
    /// Whether the trace produced a usable chain. Reaching the hop limit is
    /// still a success; the chain up to the limit is valid data.
    pub success: bool,
    /// Fatal failure classification, if any.
    pub error: Option<ProbeError>,
    /// Traversal-ordered hops, at most `max_hops` plus one sentinel.
    pub hops: Vec<RedirectHop>,
    /// Last URL reached.
    pub final_url: String,
    /// Number of redirects followed (terminal hop excluded).
    pub total_hops: u32,
    /// Whether the trace stopped because the hop limit was reached.
    pub limit_reached: bool,
    /// End-to-end wall-clock time, in ms.
    pub elapsed_ms: u64,
}

impl RedirectOutcome {
    pub(crate) fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            success: false,
            error: None,
            hops: Vec::new(),
            final_url: String::new(),
            total_hops: 0,
            limit_reached: false,
            elapsed_ms: 0,
        }
    }
}
