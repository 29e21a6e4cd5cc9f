use std::fmt;
use std::str::FromStr;

/// Daily window, in local hours, during which no notifications are sent.
///
/// `start` is inclusive and `end` exclusive. A window whose start is after its
/// end wraps past midnight, e.g. `23-6`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuietHours {
    start: u32,
    end: u32,
}

impl QuietHours {
    pub fn new(start: u32, end: u32) -> Result<Self, String> {
        if start > 23 || end > 23 {
            return Err(format!("hours must be within 0-23, got {start}-{end}"));
        }
        if start == end {
            return Err(format!("empty quiet window {start}-{end}"));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, hour: u32) -> bool {
        if self.start < self.end {
            (self.start..self.end).contains(&hour)
        } else {
            hour >= self.start || hour < self.end
        }
    }
}

impl FromStr for QuietHours {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| format!("expected `START-END`, got `{s}`"))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|e| format!("invalid hour `{v}`: {e}"))
        };
        Self::new(parse(start)?, parse(end)?)
    }
}

impl fmt::Display for QuietHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00-{:02}:00", self.start, self.end)
    }
}
