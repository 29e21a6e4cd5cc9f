//! Finds the outage relevant to a subscriber.

use std::cmp::Ordering;
use std::str::FromStr;

use crate::entity::OutageRecord;
use crate::entity::Subscriber;
use crate::notification::formatter::ParsedTimestamp;

/// How to choose between several outages matching the same subscriber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TieBreak {
    /// First matching record in feed order.
    #[default]
    FeedOrder,
    /// Last matching record in feed order.
    LastInFeed,
    /// Record with the earliest start. Unparseable starts sort last, ties keep
    /// feed order.
    EarliestStart,
}

impl FromStr for TieBreak {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first" | "feed" => Ok(Self::FeedOrder),
            "last" => Ok(Self::LastInFeed),
            "earliest" => Ok(Self::EarliestStart),
            other => Err(format!(
                "unknown tie-break `{other}`, expected one of: first, last, earliest"
            )),
        }
    }
}

/// Whole-token building comparison. Case and surrounding whitespace are ignored.
fn same_building(a: &str, b: &str) -> bool {
    a.trim().to_uppercase() == b.trim().to_uppercase()
}

/// Whether `outage` lists the subscriber's street and building.
pub fn covers(outage: &OutageRecord, subscriber: &Subscriber) -> bool {
    outage.street_id == subscriber.street_id
        && outage
            .building_tokens()
            .any(|token| same_building(token, &subscriber.building))
}

fn start_cmp(a: &OutageRecord, b: &OutageRecord) -> Ordering {
    let key = |o: &OutageRecord| ParsedTimestamp::parse(&o.start_timestamp).map(|t| t.epoch_seconds());
    match (key(a), key(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Matcher {
    tie_break: TieBreak,
}

impl Matcher {
    pub fn new(tie_break: TieBreak) -> Self {
        Self { tie_break }
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Returns the single most relevant outage for `subscriber`, if any.
    pub fn find<'a>(
        &self,
        subscriber: &Subscriber,
        outages: &'a [OutageRecord],
    ) -> Option<&'a OutageRecord> {
        let mut matching = outages.iter().filter(|o| covers(o, subscriber));
        match self.tie_break {
            TieBreak::FeedOrder => matching.next(),
            TieBreak::LastInFeed => matching.last(),
            TieBreak::EarliestStart => matching.min_by(|a, b| start_cmp(a, b)),
        }
    }
}
