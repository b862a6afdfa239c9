use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;

pub(crate) fn http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(format!(
            "{}/{}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        ))
        .build()
}

/// Parses a date typed by a user: `MM/DD/YYYY` (single digits allowed) or `YYYY-MM-DD`.
pub fn parse_user_date(s: &str) -> Result<NaiveDate, String> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .map_err(|_| format!("Invalid date '{s}', expected MM/DD/YYYY or YYYY-MM-DD"))
}

/// Parses a catalog performance date such as `9/17/2019` or `9/17/2019 12:00:00 AM`.
pub(crate) fn parse_show_date(s: &str) -> Option<NaiveDate> {
    let first = s.split_whitespace().next()?;
    NaiveDate::parse_from_str(first, "%m/%d/%Y").ok()
}

/// A task as typed on the command line: `SHOW_ID:START[:END]`.
///
/// A missing end date means a single day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub show_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl TaskSpec {
    pub fn new(show_id: &str, start: &str, end: Option<&str>) -> Result<Self, String> {
        let show_id = show_id.trim().trim_matches('/');
        if show_id.is_empty() {
            return Err("Show selection is required".to_string());
        }
        let start_date = parse_user_date(start)?;
        let end_date = match end.map(str::trim).filter(|e| !e.is_empty()) {
            Some(end) => parse_user_date(end)?,
            None => start_date,
        };
        Ok(Self {
            show_id: show_id.to_string(),
            start_date,
            end_date,
        })
    }
}

impl FromStr for TaskSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let show_id = parts.next().unwrap_or_default();
        let start = parts
            .next()
            .ok_or_else(|| format!("Missing start date in task '{s}', expected SHOW:START[:END]"))?;
        Self::new(show_id, start, parts.next())
    }
}
