//! Appointment date formatting.
//!
//! Two modes exist because the upstream webhooks disagree on what they send:
//! - `rome_today_offset`: the value is a UTC timestamp. It is shifted by the
//!   `Europe/Rome` offset in effect *now* (not on the appointment date), so a
//!   winter appointment rendered in summer gets the summer offset.
//! - `literal`: the value is a `YY-MM-DD HH:MM` wall-clock string, rendered
//!   as-is without any zone adjustment.
//!
//! Both render as `DD/MM/YYYY alle HH:MM`.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Europe::Rome;
use serde::Deserialize;

const OUTPUT_FORMAT: &str = "%d/%m/%Y alle %H:%M";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentDateMode {
    #[default]
    RomeTodayOffset,
    Literal,
}

/// Formats appointment timestamps for message bodies
#[derive(Debug, Clone, Copy)]
pub struct DateFormatter {
    mode: AppointmentDateMode,
    clock: fn() -> DateTime<Utc>,
}

impl DateFormatter {
    pub fn new(mode: AppointmentDateMode) -> Self {
        Self {
            mode,
            clock: Utc::now,
        }
    }

    /// Replace the clock used to pick the Rome offset
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn mode(&self) -> AppointmentDateMode {
        self.mode
    }

    /// Format a raw appointment value. Unparseable input is returned verbatim.
    pub fn format(&self, raw: &str) -> String {
        let formatted = match self.mode {
            AppointmentDateMode::RomeTodayOffset => format_rome_today_offset(raw, (self.clock)()),
            AppointmentDateMode::Literal => format_literal(raw),
        };

        formatted.unwrap_or_else(|| {
            tracing::warn!(value = %raw, mode = ?self.mode, "Unparseable appointment date");
            raw.to_string()
        })
    }
}

impl Default for DateFormatter {
    fn default() -> Self {
        Self::new(AppointmentDateMode::default())
    }
}

/// Current `Europe/Rome` offset at `now`
fn rome_offset_at(now: DateTime<Utc>) -> FixedOffset {
    Rome.offset_from_utc_datetime(&now.naive_utc()).fix()
}

/// Parse a timestamp, treating values without an explicit offset as UTC
fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

pub fn format_rome_today_offset(raw: &str, now: DateTime<Utc>) -> Option<String> {
    let timestamp = parse_utc(raw)?;
    let offset = rome_offset_at(now);
    Some(timestamp.with_timezone(&offset).format(OUTPUT_FORMAT).to_string())
}

pub fn format_literal(raw: &str) -> Option<String> {
    let expanded = format!("20{}", raw.trim());
    let naive = NaiveDateTime::parse_from_str(&expanded, "%Y-%m-%d %H:%M").ok()?;
    Some(naive.format(OUTPUT_FORMAT).to_string())
}
