//! Subscriber facing message rendering.

use chrono::DateTime;
use chrono::FixedOffset;
use chrono::NaiveDateTime;

use crate::entity::OutageRecord;

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";
const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A feed timestamp that could be parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ParsedTimestamp {
    Offset(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

impl ParsedTimestamp {
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        DateTime::parse_from_rfc3339(raw)
            .map(Self::Offset)
            .or_else(|_| NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT).map(Self::Naive))
            .ok()
    }

    /// Wall clock time in the timestamp's own offset.
    fn wall_clock(&self) -> NaiveDateTime {
        match self {
            Self::Offset(dt) => dt.naive_local(),
            Self::Naive(dt) => *dt,
        }
    }

    /// Seconds since the epoch. Naive timestamps are read as UTC.
    pub(crate) fn epoch_seconds(&self) -> i64 {
        match self {
            Self::Offset(dt) => dt.timestamp(),
            Self::Naive(dt) => dt.and_utc().timestamp(),
        }
    }
}

/// Renders `raw` as `YYYY-MM-DD HH:MM`, or returns it unchanged if it does
/// not parse.
pub fn render_timestamp(raw: &str) -> String {
    match ParsedTimestamp::parse(raw) {
        Some(ts) => ts.wall_clock().format(DISPLAY_FORMAT).to_string(),
        None => raw.to_string(),
    }
}

/// Escapes text for Telegram's HTML parse mode.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders an outage notification. Never fails.
pub fn format(outage: &OutageRecord) -> String {
    format!(
        "Поточні відключення:\nМісто: {}\nВулиця: {}\n<b>{} - {}</b>\nКоментар: {}\nБудинки: {}",
        escape_html(&outage.city_name),
        escape_html(&outage.street_name),
        escape_html(&render_timestamp(&outage.start_timestamp)),
        escape_html(&render_timestamp(&outage.end_timestamp)),
        escape_html(&outage.comment),
        escape_html(&outage.affected_buildings),
    )
}
