//! Calendar periods (`YYYYMM`) and period list parsing.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on the number of periods a single range spec may expand to.
pub const MAX_RANGE_PERIODS: usize = 600;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    #[error("period list is empty")]
    Empty,

    #[error("malformed period '{0}': expected YYYYMM")]
    Malformed(String),

    #[error("period '{0}' appears more than once")]
    Duplicate(String),

    #[error("malformed range '{0}': expected YYYYMM-YYYYMM")]
    MalformedRange(String),

    #[error("range start {from} is after range end {to}")]
    InvertedRange { from: String, to: String },

    #[error("range expands to {0} periods, more than the allowed {MAX_RANGE_PERIODS}")]
    RangeTooLarge(usize),
}

/// One calendar month of backlog, processed by exactly one external job.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period(String);

impl Period {
    pub fn parse(raw: &str) -> Result<Self, PeriodError> {
        let raw = raw.trim();
        if raw.len() != 6 || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PeriodError::Malformed(raw.to_string()));
        }

        let year: u32 = raw[..4]
            .parse()
            .map_err(|_| PeriodError::Malformed(raw.to_string()))?;
        let month: u32 = raw[4..]
            .parse()
            .map_err(|_| PeriodError::Malformed(raw.to_string()))?;

        Self::from_parts(year, month).ok_or_else(|| PeriodError::Malformed(raw.to_string()))
    }

    fn from_parts(year: u32, month: u32) -> Option<Self> {
        if !(1970..=9999).contains(&year) || !(1..=12).contains(&month) {
            return None;
        }
        Some(Self(format!("{:04}{:02}", year, month)))
    }

    pub fn year(&self) -> u32 {
        self.0[..4].parse().unwrap_or_default()
    }

    pub fn month(&self) -> u32 {
        self.0[4..].parse().unwrap_or_default()
    }

    /// The following calendar month, if it is still representable.
    pub fn next(&self) -> Option<Self> {
        let (year, month) = match self.month() {
            12 => (self.year() + 1, 1),
            m => (self.year(), m + 1),
        };
        Self::from_parts(year, month)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Period {
    type Error = PeriodError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.0
    }
}

/// Parse an explicit operator-supplied list. Order is preserved.
pub fn parse_period_list<S: AsRef<str>>(items: &[S]) -> Result<Vec<Period>, PeriodError> {
    if items.is_empty() {
        return Err(PeriodError::Empty);
    }

    let mut seen = HashSet::with_capacity(items.len());
    let mut periods = Vec::with_capacity(items.len());
    for item in items {
        let period = Period::parse(item.as_ref())?;
        if !seen.insert(period.clone()) {
            return Err(PeriodError::Duplicate(period.0));
        }
        periods.push(period);
    }

    Ok(periods)
}

/// Expand an inclusive `YYYYMM-YYYYMM` range into consecutive months.
pub fn expand_range(spec: &str) -> Result<Vec<Period>, PeriodError> {
    let (from, to) = spec
        .split_once('-')
        .ok_or_else(|| PeriodError::MalformedRange(spec.to_string()))?;
    let from = Period::parse(from).map_err(|_| PeriodError::MalformedRange(spec.to_string()))?;
    let to = Period::parse(to).map_err(|_| PeriodError::MalformedRange(spec.to_string()))?;

    if from > to {
        return Err(PeriodError::InvertedRange {
            from: from.0,
            to: to.0,
        });
    }

    let span = ((to.year() - from.year()) * 12 + to.month()) as usize - from.month() as usize + 1;
    if span > MAX_RANGE_PERIODS {
        return Err(PeriodError::RangeTooLarge(span));
    }

    let mut periods = Vec::with_capacity(span);
    let mut cursor = Some(from);
    while let Some(period) = cursor {
        if period > to {
            break;
        }
        cursor = period.next();
        periods.push(period);
    }

    Ok(periods)
}
