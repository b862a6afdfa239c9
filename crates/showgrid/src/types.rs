use std::fmt::Display;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::pricing::FetchError;

/// Inclusive range of performance dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub earliest: NaiveDate,
    pub latest: NaiveDate,
}

impl DateRange {
    pub fn new(earliest: NaiveDate, latest: NaiveDate) -> Self {
        Self { earliest, latest }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.earliest <= date && date <= self.latest
    }

    /// Number of days in the range, both ends included.
    pub fn day_count(&self) -> usize {
        let span = (self.latest - self.earliest).num_days();
        if span < 0 { 0 } else { span as usize + 1 }
    }

    /// Every date in the range in ascending order.
    pub fn days(self) -> impl Iterator<Item = NaiveDate> {
        self.earliest
            .iter_days()
            .take_while(move |date| *date <= self.latest)
    }
}

impl Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.earliest == self.latest {
            write!(f, "{}", self.earliest)
        } else {
            write!(f, "{} to {}", self.earliest, self.latest)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Show {
    /// Site slug, e.g. `wicked`.
    pub id: String,
    pub name: String,
    pub url: String,
    pub date_range: DateRange,
}

impl Display for Show {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.name, self.id, self.date_range)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid price '{0}'")]
pub struct PriceParseError(String);

/// A currency amount as shown on the pricing grid, kept in cents. Some
/// tiers list a range (`$99.00 - $299.00`) instead of a single amount.
///
/// `Display` writes what follows the leading `$`: a whole number when there
/// are no cents (`$169.00` shows as `169`), two decimals otherwise (`98.50`),
/// and `99 - $299` for a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Price {
    cents: u64,
    high: Option<u64>,
}

impl Price {
    pub fn from_cents(cents: u64) -> Self {
        Self { cents, high: None }
    }

    pub fn whole(dollars: u64) -> Self {
        Self::from_cents(dollars * 100)
    }

    /// A `low` to `high` range in cents. Equal bounds collapse to one amount.
    pub fn range(low: u64, high: u64) -> Option<Self> {
        match low.cmp(&high) {
            std::cmp::Ordering::Less => Some(Self {
                cents: low,
                high: Some(high),
            }),
            std::cmp::Ordering::Equal => Some(Self::from_cents(low)),
            std::cmp::Ordering::Greater => None,
        }
    }

    /// The amount, or the lower bound of a range.
    pub fn cents(&self) -> u64 {
        self.cents
    }

    pub fn high_cents(&self) -> Option<u64> {
        self.high
    }

    pub fn is_range(&self) -> bool {
        self.high.is_some()
    }
}

fn parse_amount(s: &str) -> Option<u64> {
    let cleaned: String = s
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    let (dollars, fraction) = match cleaned.split_once('.') {
        Some((d, f)) => (d, f),
        None => (cleaned.as_str(), ""),
    };

    if dollars.is_empty()
        || !dollars.chars().all(|c| c.is_ascii_digit())
        || fraction.len() > 2
        || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }

    let dollars: u64 = dollars.parse().ok()?;
    let cents: u64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<u64>().ok()? * 10,
        _ => fraction.parse().ok()?,
    };

    dollars.checked_mul(100)?.checked_add(cents)
}

fn write_amount(f: &mut std::fmt::Formatter<'_>, cents: u64) -> std::fmt::Result {
    if cents % 100 == 0 {
        write!(f, "{}", cents / 100)
    } else {
        write!(f, "{}.{:02}", cents / 100, cents % 100)
    }
}

impl FromStr for Price {
    type Err = PriceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PriceParseError(s.to_string());

        match s.split_once(['-', '\u{2013}']) {
            Some((low, high)) => {
                let low = parse_amount(low).ok_or_else(invalid)?;
                let high = parse_amount(high).ok_or_else(invalid)?;
                Price::range(low, high).ok_or_else(invalid)
            }
            None => parse_amount(s).map(Price::from_cents).ok_or_else(invalid),
        }
    }
}

impl Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_amount(f, self.cents)?;
        if let Some(high) = self.high {
            write!(f, " - $")?;
            write_amount(f, high)?;
        }
        Ok(())
    }
}

impl From<Price> for String {
    fn from(price: Price) -> Self {
        price.to_string()
    }
}

impl TryFrom<String> for Price {
    type Error = PriceParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One seating tier of a pricing grid, in grid order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRow {
    pub label: String,
    pub price: Price,
}

impl PriceRow {
    pub fn new(label: impl Into<String>, price: Price) -> Self {
        Self {
            label: label.into(),
            price,
        }
    }
}

impl Display for PriceRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - ${}", self.label, self.price)
    }
}

/// Outcome of fetching the pricing grid of one show on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateResult {
    pub date: NaiveDate,
    pub rows: Vec<PriceRow>,
    pub error: Option<FetchError>,
}

impl DateResult {
    pub fn success(date: NaiveDate, rows: Vec<PriceRow>) -> Self {
        Self {
            date,
            rows,
            error: None,
        }
    }

    pub fn failure(date: NaiveDate, error: FetchError) -> Self {
        Self {
            date,
            rows: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.error, Some(FetchError::Cancelled))
    }
}
