use crate::reading::Reading;
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ZoneError {
    #[error("Invalid UTC offset {0:?}, expected +HH:MM, -HH:MM, Z or UTC")]
    Malformed(String),

    #[error("UTC offset {0:?} is out of range")]
    OutOfRange(String),
}

/// The time zone readings are displayed, filtered and exported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetZone(FixedOffset);

impl TargetZone {
    pub fn new(offset: FixedOffset) -> Self {
        Self(offset)
    }

    pub fn utc() -> Self {
        Self(Utc.fix())
    }

    pub fn offset(&self) -> FixedOffset {
        self.0
    }

    pub fn localise(&self, timestamp: &DateTime<Utc>) -> DateTime<FixedOffset> {
        timestamp.with_timezone(&self.0)
    }

    pub fn date_of(&self, timestamp: &DateTime<Utc>) -> NaiveDate {
        self.localise(timestamp).date_naive()
    }

    pub fn today(&self) -> NaiveDate {
        self.date_of(&Utc::now())
    }
}

impl Default for TargetZone {
    fn default() -> Self {
        Self::utc()
    }
}

impl fmt::Display for TargetZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TargetZone {
    type Err = ZoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
            return Ok(Self::utc());
        }

        let malformed = || ZoneError::Malformed(s.to_string());

        let (sign, rest) = match s.chars().next() {
            Some('+') => (1, &s[1..]),
            Some('-') => (-1, &s[1..]),
            _ => return Err(malformed()),
        };

        let (hours, minutes) = match rest.split_once(':') {
            Some((h, m)) => (h, m),
            None if rest.len() == 4 && rest.is_ascii() => rest.split_at(2),
            None => (rest, "0"),
        };

        let hours: u32 = hours.parse().map_err(|_| malformed())?;
        let minutes: u32 = minutes.parse().map_err(|_| malformed())?;

        if hours > 23 || minutes > 59 {
            return Err(ZoneError::OutOfRange(s.to_string()));
        }

        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60) as i32)
            .map(Self)
            .ok_or_else(|| ZoneError::OutOfRange(s.to_string()))
    }
}

/// Keeps the readings taken on `date` in `zone`, in their original order.
pub fn filter_by_date(readings: &[Reading], date: NaiveDate, zone: &TargetZone) -> Vec<Reading> {
    readings
        .iter()
        .filter(|r| zone.date_of(&r.timestamp) == date)
        .cloned()
        .collect()
}
