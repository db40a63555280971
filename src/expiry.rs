use std::{fmt, str::FromStr};

use chrono::{Duration, NaiveDateTime, Timelike};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Serialized timestamp form. Fixed-width and zero-padded, so the string
/// ordering of two markers matches their chronological ordering.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const PERMANENT: &str = "permanent";

/// Validation failures when resolving a requested duration. The messages are
/// the exact strings surfaced to clients.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Missing parameters: time or type")]
    MissingTimeOrType,
    #[error("Invalid time value. Must be an integer.")]
    InvalidTime,
    #[error("Invalid type. Use \"days\", \"months\", \"years\", or \"seconds\".")]
    InvalidUnit,
}

/// Expiration marker of a stored UID: either the `"permanent"` sentinel or
/// an absolute local timestamp with second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Permanent,
    At(NaiveDateTime),
}

impl Expiry {
    pub fn is_permanent(&self) -> bool {
        matches!(self, Expiry::Permanent)
    }
}

impl fmt::Display for Expiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expiry::Permanent => f.write_str(PERMANENT),
            Expiry::At(when) => write!(f, "{}", when.format(TIMESTAMP_FORMAT)),
        }
    }
}

impl FromStr for Expiry {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == PERMANENT {
            return Ok(Expiry::Permanent);
        }
        NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).map(Expiry::At)
    }
}

impl Serialize for Expiry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Expiry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(|_| {
            de::Error::invalid_value(
                de::Unexpected::Str(&raw),
                &"\"permanent\" or a \"YYYY-MM-DD HH:MM:SS\" timestamp",
            )
        })
    }
}

/// Duration unit accepted by the add operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Days,
    Months,
    Years,
    Seconds,
}

impl FromStr for Unit {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "days" => Ok(Unit::Days),
            "months" => Ok(Unit::Months),
            "years" => Ok(Unit::Years),
            "seconds" => Ok(Unit::Seconds),
            _ => Err(PolicyError::InvalidUnit),
        }
    }
}

/// Resolves a requested duration to an expiration marker relative to `now`.
///
/// `permanent` wins over `time`/`unit`. Months are 30 days and years 365
/// days, with no calendar awareness.
pub fn compute(
    now: NaiveDateTime,
    permanent: bool,
    time: Option<&str>,
    unit: Option<&str>,
) -> Result<Expiry, PolicyError> {
    if permanent {
        return Ok(Expiry::Permanent);
    }

    let (time, unit) = match (time, unit) {
        (Some(t), Some(u)) if !t.is_empty() && !u.is_empty() => (t, u),
        _ => return Err(PolicyError::MissingTimeOrType),
    };

    let amount: i64 = time.trim().parse().map_err(|_| PolicyError::InvalidTime)?;
    let delta = match unit.parse::<Unit>()? {
        Unit::Days => Duration::try_days(amount),
        Unit::Months => amount.checked_mul(30).and_then(Duration::try_days),
        Unit::Years => amount.checked_mul(365).and_then(Duration::try_days),
        Unit::Seconds => Duration::try_seconds(amount),
    }
    .ok_or(PolicyError::InvalidTime)?;

    let base = now.with_nanosecond(0).unwrap_or(now);
    let when = base
        .checked_add_signed(delta)
        .ok_or(PolicyError::InvalidTime)?;
    Ok(Expiry::At(when))
}

/// Expired means a non-permanent marker at or before `now`. The sweep and
/// the read path both use this predicate.
pub fn is_expired(marker: &Expiry, now: NaiveDateTime) -> bool {
    match marker {
        Expiry::Permanent => false,
        Expiry::At(when) => *when <= now,
    }
}

/// Time left until a marker, decomposed into whole days plus an
/// hours/minutes/seconds remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Remaining {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

/// Floor decomposition of `when - now`; clamps to zero when `when` has
/// already passed.
pub fn remaining(when: NaiveDateTime, now: NaiveDateTime) -> Remaining {
    let total = (when - now).num_seconds().max(0);
    Remaining {
        days: total / 86_400,
        hours: total % 86_400 / 3_600,
        minutes: total % 3_600 / 60,
        seconds: total % 60,
    }
}
