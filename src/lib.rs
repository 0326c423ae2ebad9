//! Concurrent network probing engine for a desktop diagnostics toolkit.
//!
//! Two probe operations are exposed through [`ProbeService`]:
//!
//! - **DNS lookup**: seven typed sub-resolvers (A, AAAA, CNAME, MX, TXT, NS,
//!   PTR) plus an ALL mode that fans out to every type concurrently and
//!   merges the answers in fixed type order. Outbound load is bounded by a
//!   concurrency gate (capacity 5, 5 s timed acquisition) and MX/TXT queries
//!   cancel cooperatively on shutdown.
//! - **Redirect trace**: a manual, bounded redirect-chain walk with
//!   automatic redirect following disabled, collecting one hop per response
//!   up to a configurable limit (default 10) plus a sentinel hop when the
//!   limit is reached.
//!
//! Neither operation fails outright: validation errors, gate timeouts,
//! cancellation, transport failures and empty answers are all reported
//! through the returned outcome, preferring partial results to empty ones.

mod error;
mod gate;
mod services;
mod types;

pub use error::{ProbeError, ProbeResult};
pub use gate::{ConcurrencyGate, GatePermit, ShutdownSignal, DEFAULT_GATE_CAPACITY};
pub use services::{DnsResolver, ProbeService, RedirectTracer, DEFAULT_MAX_HOPS};
pub use types::{DnsOutcome, DnsRecord, RecordType, RedirectHop, RedirectOutcome};
