//! Plain data types shared by the feed, the store and the notification cycle.

use serde::Deserialize;
use serde::Serialize;

/// Chat identifier of a subscriber on the delivery transport.
pub type ChatId = i64;

/// One reported or planned power interruption for a street and a set of buildings.
///
/// Timestamps are kept exactly as the feed reported them. They are compared
/// verbatim by the idempotency guard and only parsed for display.
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq, Eq)]
pub struct OutageRecord {
    #[serde(default)]
    pub id: i64,
    pub start_timestamp: String,
    pub end_timestamp: String,
    pub city_name: String,
    pub street_id: i64,
    pub street_name: String,
    /// Comma separated building list, e.g. `"271, 273, 273-А"`.
    pub affected_buildings: String,
    #[serde(default)]
    pub comment: String,
}

impl OutageRecord {
    /// Iterates over the whole building tokens of this outage.
    pub fn building_tokens(&self) -> impl Iterator<Item = &str> {
        self.affected_buildings
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Returns the name of the first missing required field, if any.
    ///
    /// Records with a missing field cannot be matched reliably and are dropped
    /// before matching.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.street_id <= 0 {
            Some("street_id")
        } else if self.start_timestamp.trim().is_empty() {
            Some("start_timestamp")
        } else if self.end_timestamp.trim().is_empty() {
            Some("end_timestamp")
        } else if self.building_tokens().next().is_none() {
            Some("affected_buildings")
        } else {
            None
        }
    }
}

/// Identity of the last outage successfully communicated to a subscriber.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Watermark {
    pub start: String,
    pub end: String,
    pub comment: String,
}

impl Watermark {
    /// Watermark that records `outage` as delivered.
    pub fn of(outage: &OutageRecord) -> Self {
        Self {
            start: outage.start_timestamp.clone(),
            end: outage.end_timestamp.clone(),
            comment: outage.comment.clone(),
        }
    }
}

/// A chat endpoint registered for notifications about one street and building.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Subscriber {
    pub chat_id: ChatId,
    pub street_id: i64,
    pub street_name: String,
    pub building: String,
    /// `None` until the first confirmed delivery.
    pub watermark: Option<Watermark>,
}

impl Subscriber {
    pub fn new(
        chat_id: ChatId,
        street_id: i64,
        street_name: impl Into<String>,
        building: impl Into<String>,
    ) -> Self {
        Self {
            chat_id,
            street_id,
            street_name: street_name.into(),
            building: building.into(),
            watermark: None,
        }
    }

    /// Returns a copy of this subscriber carrying `watermark`.
    pub fn with_watermark(&self, watermark: Watermark) -> Self {
        Self {
            watermark: Some(watermark),
            ..self.clone()
        }
    }

    /// Whether this subscriber points to the same street and building as `other`.
    pub fn same_address(&self, other: &Subscriber) -> bool {
        self.street_id == other.street_id && self.building == other.building
    }
}
