//! Lviv regional power company (LOE) outage API integration.

use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use log::info;
use log::warn;
use regex::Regex;
use serde_json::Map;
use serde_json::Value;

use crate::entity::OutageRecord;
use crate::feed::FeedInfo;
use crate::feed::OutageSource;
use crate::feed::error::FeedError;

pub const DEFAULT_API_URL: &str =
    "https://power-api.loe.lviv.ua/api/pw_accidents?pagination=false&otg.id=28&city.id=693";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/137.0.0.0 Safari/537.36";

static NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\r\n]+").unwrap());

type Json<'a> = &'a Map<String, Value>;

/// Outage source backed by the LOE `pw_accidents` endpoint.
pub struct LoeOutageFeed {
    info: FeedInfo,
    client: reqwest::Client,
}

impl LoeOutageFeed {
    pub fn new(api_url: impl Into<String>) -> Result<Self, FeedError> {
        let info = FeedInfo {
            name: "LOE".to_string(),
            api_url: api_url.into(),
        };
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { info, client })
    }

    fn get_members<'a>(&self, resp: &'a Value) -> Result<&'a Vec<Value>, FeedError> {
        resp.get("hydra:member")
            .and_then(|v| v.as_array())
            .ok_or_else(|| FeedError::MissingField {
                field: "hydra:member".to_string(),
            })
    }

    /// Converts one API row. Returns `None` for rows that are not objects.
    fn parse_row(&self, row: &Value) -> Option<OutageRecord> {
        let row = row.as_object()?;
        let street = row.get("street").and_then(|v| v.as_object());

        Some(OutageRecord {
            id: Self::get_int(row.get("id")),
            start_timestamp: Self::get_str(row, "dateEvent"),
            end_timestamp: Self::get_str(row, "datePlanIn"),
            city_name: row
                .get("city")
                .and_then(|c| c.get("name"))
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            street_id: Self::get_int(street.and_then(|s| s.get("id"))),
            street_name: street
                .map(|s| Self::get_str(s, "name"))
                .unwrap_or_default(),
            affected_buildings: Self::get_buildings(row.get("buildingNames")),
            comment: Self::clean_comment(&Self::get_str(row, "koment")),
        })
    }

    fn get_str(obj: Json, key: &str) -> String {
        obj.get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    }

    /// Accepts numbers and numeric strings. Anything else becomes 0.
    fn get_int(value: Option<&Value>) -> i64 {
        match value {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
                .unwrap_or(0),
            Some(Value::String(s)) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
                    .unwrap_or(0)
            }
            _ => 0,
        }
    }

    /// Normalizes `buildingNames` (a string or an array) to `"a, b, c"`.
    fn get_buildings(value: Option<&Value>) -> String {
        let tokens: Vec<String> = match value {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.trim().to_string(),
                    other => other.to_string(),
                })
                .collect(),
            Some(Value::String(s)) => s.split(',').map(|p| p.trim().to_string()).collect(),
            _ => Vec::new(),
        };

        tokens
            .into_iter()
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn clean_comment(raw: &str) -> String {
        NEWLINES.replace_all(raw, " ").trim().to_string()
    }

    /// Later rows describing the same street, buildings and period replace
    /// earlier ones in place.
    fn dedup(records: Vec<OutageRecord>) -> Vec<OutageRecord> {
        let mut out: Vec<OutageRecord> = Vec::with_capacity(records.len());
        let mut seen: HashMap<(i64, String, String, String), usize> = HashMap::new();

        for record in records {
            let key = (
                record.street_id,
                record.affected_buildings.clone(),
                record.start_timestamp.clone(),
                record.end_timestamp.clone(),
            );
            match seen.get(&key) {
                Some(&idx) => out[idx] = record,
                None => {
                    seen.insert(key, out.len());
                    out.push(record);
                }
            }
        }
        out
    }

    fn parse_response(&self, body: &str) -> Result<Vec<OutageRecord>, FeedError> {
        let resp: Value = serde_json::from_str(body)?;
        let members = self.get_members(&resp)?;

        let mut records = Vec::with_capacity(members.len());
        for (i, row) in members.iter().enumerate() {
            match self.parse_row(row) {
                Some(record) => records.push(record),
                None => warn!("Skipping malformed row #{i} from {}.", self.info.name),
            }
        }
        Ok(Self::dedup(records))
    }
}

#[async_trait]
impl OutageSource for LoeOutageFeed {
    async fn list_current_outages(&self) -> Result<Vec<OutageRecord>, FeedError> {
        debug!("Fetching outages from {}: {}", self.info.name, self.info.api_url);

        let response = self.client.get(&self.info.api_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let records = self.parse_response(&body)?;
        info!("Fetched {} outages from {}.", records.len(), self.info.name);
        Ok(records)
    }

    fn info(&self) -> &FeedInfo {
        &self.info
    }
}
