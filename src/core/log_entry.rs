//! Log entry structure
//!
//! A `LogEntry` borrows everything it renders, so building one on the hot
//! path allocates nothing.

use super::field::Field;
use super::log_level::LogLevel;
use chrono::{DateTime, FixedOffset};

#[derive(Debug, Clone)]
pub struct LogEntry<'a> {
    pub level: LogLevel,
    pub message: &'a str,
    pub timestamp: DateTime<FixedOffset>,
    pub module: Option<&'a str>,
    /// Fields captured by a `with_fields` child logger
    bound_fields: &'a [Field],
    /// Fields passed with this call
    call_fields: &'a [Field],
}

impl<'a> LogEntry<'a> {
    pub fn new(level: LogLevel, message: &'a str, timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            level,
            message,
            timestamp,
            module: None,
            bound_fields: &[],
            call_fields: &[],
        }
    }

    pub fn with_module(mut self, module: Option<&'a str>) -> Self {
        self.module = module;
        self
    }

    pub fn with_fields(mut self, bound: &'a [Field], call: &'a [Field]) -> Self {
        self.bound_fields = bound;
        self.call_fields = call;
        self
    }

    /// Bound fields first, then per-call fields
    pub fn fields(&self) -> impl Iterator<Item = &'a Field> + 'a {
        self.bound_fields.iter().chain(self.call_fields.iter())
    }
}
