//! Output format selection and record rendering
//!
//! Provides three renderings of a record:
//! - Text: `2025-01-08 10:30:45 [INFO] (api) Request processed status=200`
//! - Json: `{"time":"2025-01-08T10:30:45","level":"INFO","module":"api","msg":"Request processed","status":200}`
//! - Colored: the text layout wrapped in ANSI escape sequences
//!
//! Rendering writes into a [`RecordBuffer`] of fixed capacity. A record that
//! does not fit is rejected as a whole; nothing is truncated.

use super::field::FieldValue;
use super::log_entry::LogEntry;
use super::timestamp::TimestampFormat;
use colored::Color;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::str::FromStr;

const RESET: &str = "\x1b[0m";
const TIMESTAMP_COLOR: Color = Color::BrightBlack;
const MODULE_COLOR: Color = Color::Cyan;
const KEY_COLOR: Color = Color::Magenta;

/// Output format for log records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text format (default)
    #[default]
    Text,

    /// One JSON object per line
    Json,

    /// Text format with ANSI colors per level and decoration segment
    Colored,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "colored" | "color" => Ok(OutputFormat::Colored),
            _ => Err(format!("Invalid output format: '{}'", s)),
        }
    }
}

/// Decoration switches taken from the logger configuration
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub include_timestamp: bool,
    pub include_module: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            include_timestamp: true,
            include_module: true,
        }
    }
}

/// Fixed-capacity byte buffer a record is rendered into
#[derive(Debug)]
pub struct RecordBuffer {
    bytes: Vec<u8>,
    capacity: usize,
}

impl RecordBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    fn push_bytes(&mut self, data: &[u8]) -> fmt::Result {
        if self.bytes.len() + data.len() > self.capacity {
            return Err(fmt::Error);
        }
        self.bytes.extend_from_slice(data);
        Ok(())
    }
}

impl fmt::Write for RecordBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_bytes(s.as_bytes())
    }
}

/// `io::Write` view used for serde_json string escaping
struct JsonSink<'a>(&'a mut RecordBuffer);

impl std::io::Write for JsonSink<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .push_bytes(buf)
            .map_err(|_| std::io::Error::from(std::io::ErrorKind::WriteZero))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl OutputFormat {
    /// Render `entry` into `buf`, replacing its previous contents.
    ///
    /// Returns `Err` when the rendered record exceeds the buffer capacity;
    /// the buffer is then left empty.
    pub fn render(
        &self,
        entry: &LogEntry<'_>,
        options: RenderOptions,
        buf: &mut RecordBuffer,
    ) -> fmt::Result {
        buf.clear();
        let result = match self {
            OutputFormat::Text => render_text(entry, options, buf, false),
            OutputFormat::Colored => render_text(entry, options, buf, true),
            OutputFormat::Json => render_json(entry, options, buf),
        };
        if result.is_err() {
            buf.clear();
        }
        result
    }
}

fn write_colored(buf: &mut RecordBuffer, color: Color, args: fmt::Arguments<'_>) -> fmt::Result {
    write!(buf, "\x1b[{}m", color.to_fg_str())?;
    buf.write_fmt(args)?;
    buf.write_str(RESET)
}

/// Escape characters that would let a message forge extra log lines
fn write_sanitized(buf: &mut RecordBuffer, message: &str) -> fmt::Result {
    let mut start = 0;
    for (idx, ch) in message.char_indices() {
        let escaped = match ch {
            '\n' => "\\n",
            '\r' => "\\r",
            '\t' => "\\t",
            _ => continue,
        };
        buf.write_str(&message[start..idx])?;
        buf.write_str(escaped)?;
        start = idx + ch.len_utf8();
    }
    buf.write_str(&message[start..])
}

fn render_text(
    entry: &LogEntry<'_>,
    options: RenderOptions,
    buf: &mut RecordBuffer,
    colored: bool,
) -> fmt::Result {
    if options.include_timestamp {
        let ts = TimestampFormat::Text.format(&entry.timestamp);
        if colored {
            write_colored(buf, TIMESTAMP_COLOR, format_args!("{}", ts))?;
        } else {
            write!(buf, "{}", ts)?;
        }
        buf.write_char(' ')?;
    }

    if colored {
        write_colored(buf, entry.level.color_code(), format_args!("[{}]", entry.level))?;
    } else {
        write!(buf, "[{}]", entry.level)?;
    }
    buf.write_char(' ')?;

    if let Some(module) = entry.module.filter(|_| options.include_module) {
        if colored {
            write_colored(buf, MODULE_COLOR, format_args!("({})", module))?;
        } else {
            write!(buf, "({})", module)?;
        }
        buf.write_char(' ')?;
    }

    write_sanitized(buf, entry.message)?;

    for field in entry.fields() {
        buf.write_char(' ')?;
        if colored {
            write_colored(buf, KEY_COLOR, format_args!("{}", field.key))?;
            write!(buf, "={}", field.value)?;
        } else {
            write!(buf, "{}", field)?;
        }
    }

    buf.write_char('\n')
}

fn write_json_str(buf: &mut RecordBuffer, s: &str) -> fmt::Result {
    serde_json::to_writer(JsonSink(buf), s).map_err(|_| fmt::Error)
}

fn write_json_value(buf: &mut RecordBuffer, value: &FieldValue) -> fmt::Result {
    match value {
        FieldValue::Int(i) => write!(buf, "{}", i),
        FieldValue::Uint(u) => write!(buf, "{}", u),
        FieldValue::Float(f) if f.is_finite() => write!(buf, "{}", f),
        FieldValue::Float(_) | FieldValue::Null => buf.write_str("null"),
        FieldValue::Bool(b) => write!(buf, "{}", b),
        FieldValue::Str(s) | FieldValue::Error(s) => write_json_str(buf, s),
    }
}

fn render_json(entry: &LogEntry<'_>, options: RenderOptions, buf: &mut RecordBuffer) -> fmt::Result {
    buf.write_char('{')?;

    if options.include_timestamp {
        write!(
            buf,
            "\"time\":\"{}\",",
            TimestampFormat::Iso8601.format(&entry.timestamp)
        )?;
    }

    write!(buf, "\"level\":\"{}\",", entry.level)?;

    if let Some(module) = entry.module.filter(|_| options.include_module) {
        buf.write_str("\"module\":")?;
        write_json_str(buf, module)?;
        buf.write_char(',')?;
    }

    // JSON string escaping already keeps control characters off the line
    buf.write_str("\"msg\":")?;
    write_json_str(buf, entry.message)?;

    for field in entry.fields() {
        buf.write_char(',')?;
        write_json_str(buf, &field.key)?;
        buf.write_char(':')?;
        write_json_value(buf, &field.value)?;
    }

    buf.write_str("}\n")
}

/// Convenience for callers that want a rendered line as a `String`
pub fn render_to_string(
    format: OutputFormat,
    entry: &LogEntry<'_>,
    options: RenderOptions,
    capacity: usize,
) -> Option<String> {
    let mut buf = RecordBuffer::with_capacity(capacity);
    format.render(entry, options, &mut buf).ok()?;
    String::from_utf8(buf.as_bytes().to_vec()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::Field;
    use crate::core::log_level::LogLevel;
    use crate::core::timestamp::fixed_offset;
    use chrono::{DateTime, FixedOffset, TimeZone, Utc};

    const ALL: RenderOptions = RenderOptions {
        include_timestamp: true,
        include_module: true,
    };

    fn fixed_time() -> DateTime<FixedOffset> {
        Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45)
            .single()
            .expect("valid datetime")
            .with_timezone(&fixed_offset(0))
    }

    fn render(format: OutputFormat, entry: &LogEntry<'_>, options: RenderOptions) -> String {
        render_to_string(format, entry, options, 1024).expect("record fits")
    }

    #[test]
    fn test_text_format() {
        let fields = [Field::new("status", 200), Field::new("path", "/users")];
        let entry = LogEntry::new(LogLevel::Info, "Request processed", fixed_time())
            .with_module(Some("api"))
            .with_fields(&[], &fields);

        assert_eq!(
            render(OutputFormat::Text, &entry, ALL),
            "2025-01-08 10:30:45 [INFO] (api) Request processed status=200 path=\"/users\"\n"
        );
    }

    #[test]
    fn test_text_format_without_decorations() {
        let entry = LogEntry::new(LogLevel::Warn, "disk low", fixed_time()).with_module(Some("fs"));
        let options = RenderOptions {
            include_timestamp: false,
            include_module: false,
        };

        assert_eq!(render(OutputFormat::Text, &entry, options), "[WARN] disk low\n");
    }

    #[test]
    fn test_json_format() {
        let bound = [Field::new("service", "api")];
        let call = [
            Field::new("latency", 1.5),
            Field::new("ok", true),
            Field::new("user", None::<&str>),
        ];
        let entry = LogEntry::new(LogLevel::Error, "failed", fixed_time())
            .with_module(Some("db"))
            .with_fields(&bound, &call);

        let line = render(OutputFormat::Json, &entry, ALL);
        assert_eq!(
            line,
            "{\"time\":\"2025-01-08T10:30:45\",\"level\":\"ERROR\",\"module\":\"db\",\"msg\":\"failed\",\"service\":\"api\",\"latency\":1.5,\"ok\":true,\"user\":null}\n"
        );

        let parsed: serde_json::Value = serde_json::from_str(line.trim_end()).expect("valid JSON");
        assert_eq!(parsed["service"], "api");
    }

    #[test]
    fn test_json_escapes_quotes() {
        let entry = LogEntry::new(LogLevel::Info, "say \"hi\"", fixed_time());
        let line = render(OutputFormat::Json, &entry, ALL);
        let parsed: serde_json::Value = serde_json::from_str(line.trim_end()).expect("valid JSON");
        assert_eq!(parsed["msg"], "say \"hi\"");
    }

    #[test]
    fn test_json_message_control_chars_roundtrip() {
        let entry = LogEntry::new(LogLevel::Info, "line1\nline2\ttab", fixed_time());
        let line = render(OutputFormat::Json, &entry, ALL);

        assert_eq!(line.matches('\n').count(), 1);
        assert!(line.contains("\"msg\":\"line1\\nline2\\ttab\""));
        let parsed: serde_json::Value = serde_json::from_str(line.trim_end()).expect("valid JSON");
        assert_eq!(parsed["msg"], "line1\nline2\ttab");
    }

    #[test]
    fn test_json_non_finite_float_is_null() {
        let fields = [Field::new("ratio", f64::NAN)];
        let entry = LogEntry::new(LogLevel::Info, "m", fixed_time()).with_fields(&[], &fields);
        let line = render(OutputFormat::Json, &entry, ALL);
        assert!(line.contains("\"ratio\":null"));
    }

    #[test]
    fn test_colored_format() {
        let fields = [Field::new("id", 7)];
        let entry = LogEntry::new(LogLevel::Warn, "slow", fixed_time())
            .with_module(Some("net"))
            .with_fields(&[], &fields);

        let line = render(OutputFormat::Colored, &entry, ALL);
        assert_eq!(
            line,
            "\x1b[90m2025-01-08 10:30:45\x1b[0m \x1b[33m[WARN]\x1b[0m \x1b[36m(net)\x1b[0m slow \x1b[35mid\x1b[0m=7\n"
        );
    }

    #[test]
    fn test_message_sanitized() {
        let entry = LogEntry::new(LogLevel::Info, "line1\nFAKE [ERROR]\tx", fixed_time());
        let options = RenderOptions {
            include_timestamp: false,
            include_module: false,
        };
        assert_eq!(
            render(OutputFormat::Text, &entry, options),
            "[INFO] line1\\nFAKE [ERROR]\\tx\n"
        );
    }

    #[test]
    fn test_overflow_rejects_whole_record() {
        let entry = LogEntry::new(LogLevel::Info, "a message that is too long", fixed_time());
        let mut buf = RecordBuffer::with_capacity(16);

        assert!(OutputFormat::Text.render(&entry, ALL, &mut buf).is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_exact_fit() {
        let entry = LogEntry::new(LogLevel::Info, "hi", fixed_time());
        let options = RenderOptions {
            include_timestamp: false,
            include_module: false,
        };
        // "[INFO] hi\n" is 10 bytes
        let mut buf = RecordBuffer::with_capacity(10);
        assert!(OutputFormat::Text.render(&entry, options, &mut buf).is_ok());
        assert_eq!(buf.as_bytes(), b"[INFO] hi\n");
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("color".parse::<OutputFormat>(), Ok(OutputFormat::Colored));
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
