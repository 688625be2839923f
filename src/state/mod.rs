//! State module for tracking scrape progress
//!
//! # Components
//!
//! - `ScrapeSession`: Runtime state of one invocation (current URL, pages, records, status)
//! - `ScrapeOutcome`: The aggregate result a finished session hands to the sinks
//! - `HostState`: Per-key request history used by the rate limiter

mod host_state;
mod session;

pub use host_state::HostState;
pub use session::{ScrapeOutcome, ScrapeSession, SessionFailure, SessionStatus};
