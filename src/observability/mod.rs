//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline stages and clients produce:
//!     → logging.rs (structured log events, per-transfer span)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stderr (pretty or JSON lines)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Each transfer runs inside a span carrying its invocation ID
//! - Key ids and signed payloads never appear in full
//! - Metrics are cheap no-ops when no recorder is installed

pub mod logging;
pub mod metrics;
