//! Per-request context handed to tools and prompts.
//!
//! Nothing here is ambient: callers build a [`ToolContext`] for each
//! conversation turn and pass it down explicitly.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

/// Identity, locale and clock of the user a tool acts for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolContext {
    pub user_id: String,
    pub org_id: String,
    /// Offset of the user's clock from UTC, in minutes
    pub timezone_offset_minutes: i32,
    /// Preferred response language, if known
    pub language: Option<String>,
    /// Description of what the client is currently showing
    pub ui_context: Option<String>,
    /// Instant the turn started, in UTC
    pub now: DateTime<Utc>,
}

impl ToolContext {
    /// Context for a user at the current instant, in UTC.
    pub fn new(user_id: impl Into<String>, org_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            org_id: org_id.into(),
            timezone_offset_minutes: 0,
            language: None,
            ui_context: None,
            now: Utc::now(),
        }
    }

    pub fn with_timezone_offset(mut self, minutes: i32) -> Self {
        self.timezone_offset_minutes = minutes;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_ui_context(mut self, ui_context: impl Into<String>) -> Self {
        self.ui_context = Some(ui_context.into());
        self
    }

    /// Pin the clock, mostly for tests.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// The user's UTC offset. Out-of-range offsets fall back to UTC.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.timezone_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }

    /// Current instant on the user's clock.
    pub fn local_now(&self) -> DateTime<FixedOffset> {
        self.now.with_timezone(&self.offset())
    }

    /// Today's date on the user's clock.
    pub fn today(&self) -> NaiveDate {
        self.local_now().date_naive()
    }

    /// Human-readable local time, e.g. `Monday, 10 March 2025 09:15:00`.
    pub fn current_datetime_display(&self) -> String {
        self.local_now().format("%A, %d %B %Y %H:%M:%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 23, 30, 0).unwrap()
    }

    #[test]
    fn test_local_now_applies_offset() {
        let ctx = ToolContext::new("u1", "o1").with_timezone_offset(60).at(fixed_now());
        assert_eq!(ctx.today(), NaiveDate::from_ymd_opt(2025, 3, 11).unwrap());
        assert_eq!(ctx.current_datetime_display(), "Tuesday, 11 March 2025 00:30:00");
    }

    #[test]
    fn test_negative_offset() {
        let ctx = ToolContext::new("u1", "o1").with_timezone_offset(-300).at(fixed_now());
        assert_eq!(ctx.today(), NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(ctx.current_datetime_display(), "Monday, 10 March 2025 18:30:00");
    }

    #[test]
    fn test_out_of_range_offset_falls_back_to_utc() {
        let ctx = ToolContext::new("u1", "o1")
            .with_timezone_offset(100_000)
            .at(fixed_now());
        assert_eq!(ctx.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_builders() {
        let ctx = ToolContext::new("u1", "o1")
            .with_language("de")
            .with_ui_context("Shifts page");
        assert_eq!(ctx.language.as_deref(), Some("de"));
        assert_eq!(ctx.ui_context.as_deref(), Some("Shifts page"));
    }
}
