/// Session state definitions for one scrape invocation
///
/// A session is created when the orchestrator starts on a listing URL,
/// mutated only by the orchestrator's loop, and turned into a
/// [`ScrapeOutcome`] once it reaches a terminal status.
use std::fmt;

use chrono::{DateTime, Utc};
use url::Url;

use crate::adapters::PageResult;
use crate::model::ProductRecord;
use crate::ErrorKind;

/// Current status of a scrape session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    // ===== Active State =====
    /// Pages are still being fetched
    Running,

    // ===== Terminal Success States =====
    /// The last page had no next-page link
    CompletedNormal,

    /// The configured page limit was reached before pagination ran out
    CompletedPageLimit,

    // ===== Terminal Error States =====
    /// A fetch or extraction failed; records gathered so far are kept
    Failed,

    /// The caller cancelled the session; records gathered so far are kept
    Cancelled,
}

impl SessionStatus {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }

    /// Returns true if the session ran to a normal end
    pub fn is_success(&self) -> bool {
        matches!(self, Self::CompletedNormal | Self::CompletedPageLimit)
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::CompletedNormal => "completed",
            Self::CompletedPageLimit => "completed_page_limit",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::CompletedNormal),
            "completed_page_limit" => Some(Self::CompletedPageLimit),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Why a session ended in `Failed` (or `Cancelled`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFailure {
    pub kind: ErrorKind,
    pub message: String,

    /// 1-based number of the page being fetched when the failure happened
    pub page_number: u32,

    pub url: String,
}

impl fmt::Display for SessionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] page {} ({}): {}",
            self.kind, self.page_number, self.url, self.message
        )
    }
}

/// Mutable state of a running session
#[derive(Debug)]
pub struct ScrapeSession {
    pub current_url: Url,
    pub pages_fetched: u32,
    pub records: Vec<ProductRecord>,
    pub skipped: usize,
    pub status: SessionStatus,
    pub failure: Option<SessionFailure>,
    pub started_at: DateTime<Utc>,
}

impl ScrapeSession {
    pub fn new(start_url: Url) -> Self {
        Self {
            current_url: start_url,
            pages_fetched: 0,
            records: Vec::new(),
            skipped: 0,
            status: SessionStatus::Running,
            failure: None,
            started_at: Utc::now(),
        }
    }

    /// Page number of the page currently being fetched
    pub fn current_page(&self) -> u32 {
        self.pages_fetched + 1
    }

    /// Appends one page's records and counts the page as fetched
    ///
    /// Returns the next-page URL the page pointed at, if any.
    pub fn absorb(&mut self, page: PageResult) -> Option<Url> {
        if self.status.is_terminal() {
            return None;
        }
        self.records.extend(page.records);
        self.skipped += page.skipped;
        self.pages_fetched += 1;
        page.next_page_url
    }

    /// Moves to a successful terminal status
    pub fn complete(&mut self, status: SessionStatus) {
        if !self.status.is_terminal() && status.is_success() {
            self.status = status;
        }
    }

    /// Moves to `Failed`, recording the failure on the current page
    pub fn fail(&mut self, kind: ErrorKind, message: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.failure = Some(SessionFailure {
            kind,
            message: message.into(),
            page_number: self.current_page(),
            url: self.current_url.to_string(),
        });
        self.status = SessionStatus::Failed;
    }

    /// Moves to `Cancelled`, keeping every record gathered so far
    pub fn cancel(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.failure = Some(SessionFailure {
            kind: ErrorKind::Cancelled,
            message: "cancelled by caller".to_string(),
            page_number: self.current_page(),
            url: self.current_url.to_string(),
        });
        self.status = SessionStatus::Cancelled;
    }

    /// Consumes the session into its aggregate result
    pub fn finish(
        self,
        source_id: &str,
        source_display_name: &str,
        start_url: &Url,
    ) -> ScrapeOutcome {
        ScrapeOutcome {
            source_id: source_id.to_string(),
            source_display_name: source_display_name.to_string(),
            start_url: start_url.to_string(),
            records: self.records,
            status: self.status,
            pages_fetched: self.pages_fetched,
            skipped: self.skipped,
            failure: self.failure,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Aggregate result of a finished session, handed to the sinks
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub source_id: String,
    pub source_display_name: String,
    pub start_url: String,

    /// Records in page order, then in-page order
    pub records: Vec<ProductRecord>,

    pub status: SessionStatus,
    pub pages_fetched: u32,

    /// Product nodes that could not become records
    pub skipped: usize,

    pub failure: Option<SessionFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ScrapeOutcome {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// Product nodes seen across all fetched pages
    pub fn total_found(&self) -> usize {
        self.records.len() + self.skipped
    }

    /// Percentage of found nodes that became records (0 when nothing was found)
    pub fn success_rate(&self) -> f64 {
        let found = self.total_found();
        if found == 0 {
            return 0.0;
        }
        self.records.len() as f64 / found as f64 * 100.0
    }

    /// True when the session did not finish normally but still recovered records
    pub fn is_partial(&self) -> bool {
        !self.status.is_success() && !self.records.is_empty()
    }
}
