//! Timestamp formatting utilities
//!
//! Record timestamps are wall-clock seconds shifted by a fixed timezone
//! offset. Text output uses `YYYY-MM-DD HH:MM:SS`, JSON output uses the
//! ISO 8601 `YYYY-MM-DDTHH:MM:SS` form.

use chrono::format::{DelayedFormat, StrftimeItems};
use chrono::{DateTime, FixedOffset, Offset, Utc};

/// Largest accepted offset magnitude (one day, exclusive)
pub const MAX_OFFSET_SECONDS: i32 = 86_400;

/// Timestamp layout used by a rendering format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimestampFormat {
    /// `2025-01-08 10:30:45`
    #[default]
    Text,

    /// `2025-01-08T10:30:45`
    Iso8601,
}

impl TimestampFormat {
    #[must_use]
    pub fn pattern(&self) -> &'static str {
        match self {
            TimestampFormat::Text => "%Y-%m-%d %H:%M:%S",
            TimestampFormat::Iso8601 => "%Y-%m-%dT%H:%M:%S",
        }
    }

    /// Lazily format a timestamp; the result implements `Display` so it can be
    /// written straight into a record buffer without an intermediate `String`.
    #[must_use]
    pub fn format(&self, datetime: &DateTime<FixedOffset>) -> DelayedFormat<StrftimeItems<'static>> {
        datetime.format(self.pattern())
    }
}

/// Resolve an offset in seconds east of UTC, falling back to UTC when the
/// value is out of range
#[must_use]
pub fn fixed_offset(offset_seconds: i32) -> FixedOffset {
    FixedOffset::east_opt(offset_seconds).unwrap_or_else(|| Utc.fix())
}

/// Current time shifted by `offset_seconds`
#[must_use]
pub fn now_with_offset(offset_seconds: i32) -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&fixed_offset(offset_seconds))
}
