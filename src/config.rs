//! Environment based configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;
use crate::feed::loe_feed;
use crate::notification::CycleOptions;
use crate::notification::CycleOptionsBuilder;
use crate::notification::TieBreak;
use crate::sender::telegram_sender;
use crate::task::quiet_hours::QuietHours;

#[derive(Clone, Debug)]
pub struct Config {
    pub poll_interval: Duration,
    pub send_timeout: Duration,
    pub max_concurrent_deliveries: usize,
    pub tie_break: TieBreak,
    pub quiet_hours: Option<QuietHours>,
    pub telegram_token: Option<String>,
    pub telegram_api_url: String,
    pub outage_api_url: String,
    pub data_path: PathBuf,
    pub logs_path: PathBuf,
}

impl Config {
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_secs(300),
            send_timeout: Duration::from_secs(30),
            max_concurrent_deliveries: 4,
            tie_break: TieBreak::default(),
            quiet_hours: None,
            telegram_token: None,
            telegram_api_url: telegram_sender::DEFAULT_API_URL.to_string(),
            outage_api_url: loe_feed::DEFAULT_API_URL.to_string(),
            data_path: PathBuf::from("data"),
            logs_path: PathBuf::from("logs"),
        }
    }

    /// Overrides defaults with values from the process environment.
    pub fn load(&mut self) -> Result<(), AppError> {
        self.load_from(|key| std::env::var(key).ok())
    }

    /// Overrides defaults with values returned by `lookup`. Empty values are
    /// treated as unset.
    pub fn load_from<F>(&mut self, lookup: F) -> Result<(), AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("POLL_INTERVAL") {
            self.poll_interval = Duration::from_secs(parse("POLL_INTERVAL", &v)?);
        }
        if let Some(v) = get("SEND_TIMEOUT") {
            self.send_timeout = Duration::from_secs(parse("SEND_TIMEOUT", &v)?);
        }
        if let Some(v) = get("MAX_CONCURRENT_DELIVERIES") {
            self.max_concurrent_deliveries = parse("MAX_CONCURRENT_DELIVERIES", &v)?;
        }
        if let Some(v) = get("OUTAGE_TIE_BREAK") {
            self.tie_break = parse("OUTAGE_TIE_BREAK", &v)?;
        }
        if let Some(v) = get("QUIET_HOURS") {
            self.quiet_hours = Some(parse("QUIET_HOURS", &v)?);
        }
        if let Some(v) = get("TELEGRAM_BOT_TOKEN") {
            self.telegram_token = Some(v);
        }
        if let Some(v) = get("TELEGRAM_API_URL") {
            self.telegram_api_url = v;
        }
        if let Some(v) = get("OUTAGE_API_URL") {
            self.outage_api_url = v;
        }
        if let Some(v) = get("DATA_PATH") {
            self.data_path = PathBuf::from(v);
        }
        if let Some(v) = get("LOGS_PATH") {
            self.logs_path = PathBuf::from(v);
        }

        if self.poll_interval.is_zero() {
            return Err(AppError::InvalidConfig {
                key: "POLL_INTERVAL".to_string(),
                value: "0".to_string(),
                msg: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    pub fn telegram_token(&self) -> Result<&str, AppError> {
        self.telegram_token
            .as_deref()
            .ok_or_else(|| AppError::MissingConfig {
                key: "TELEGRAM_BOT_TOKEN".to_string(),
            })
    }

    /// Directory holding one file per subscriber.
    pub fn subscribers_path(&self) -> PathBuf {
        self.data_path.join("users")
    }

    pub fn cycle_options(&self) -> Result<CycleOptions, AppError> {
        Ok(CycleOptionsBuilder::default()
            .max_concurrent_deliveries(self.max_concurrent_deliveries)
            .send_timeout(self.send_timeout)
            .tie_break(self.tie_break)
            .build()?)
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| AppError::InvalidConfig {
        key: key.to_string(),
        value: value.to_string(),
        msg: e.to_string(),
    })
}
