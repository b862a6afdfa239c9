use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::task::{Task, TaskId, TaskStatus};
use crate::types::{DateResult, Price, PriceRow};

/// One line of the flattened pricing table of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    pub date: NaiveDate,
    pub label: String,
    pub price: Price,
}

/// Flattens the successful dates of a task into `{date, label, price}` rows.
///
/// Dates are in ascending order and rows keep grid order. Failed dates
/// contribute nothing; the task status is what reports them.
pub fn format_table(task: &Task) -> Vec<TableRow> {
    task.results()
        .iter()
        .filter(|r| r.is_success())
        .flat_map(|r| {
            r.rows.iter().map(move |row| TableRow {
                date: r.date,
                label: row.label.clone(),
                price: row.price,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct TextOptions {
    /// Names the show and spells out the weekday in the header.
    pub show_name: Option<String>,
    /// Lists each section of a combined label such as `Orchestra/Mezzanine`
    /// on its own line with the shared price.
    pub split_combined_labels: bool,
    /// Drops repeated `label - price` lines, keeping the first.
    pub dedupe: bool,
}

fn header(date: NaiveDate, show_name: Option<&str>) -> String {
    match show_name {
        Some(show) => format!(
            "Below is the group pricing for {} on {}, subject to change and availability.",
            show,
            date.format("%A, %-m/%-d/%Y")
        ),
        None => format!(
            "Below is the group pricing for {}, subject to change and availability.",
            date
        ),
    }
}

fn price_lines(rows: &[PriceRow], options: &TextOptions) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut lines = Vec::new();

    for row in rows {
        let sections: Vec<&str> = if options.split_combined_labels {
            row.label
                .split('/')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect()
        } else {
            vec![row.label.as_str()]
        };

        for section in sections {
            let line = format!("{} - ${}", section, row.price);
            if options.dedupe && !seen.insert(line.clone()) {
                continue;
            }
            lines.push(line);
        }
    }

    lines
}

/// Renders the copy-ready email text for one date:
///
/// ```text
/// Below is the group pricing for 2024-05-01, subject to change and availability.
///
/// Orchestra - $125
/// Mezzanine - $98
/// ```
///
/// A date without rows renders the header alone.
pub fn format_text(result: &DateResult) -> String {
    format_text_with(result, &TextOptions::default())
}

pub fn format_text_with(result: &DateResult, options: &TextOptions) -> String {
    let mut text = header(result.date, options.show_name.as_deref());
    text.push('\n');
    for line in price_lines(&result.rows, options) {
        text.push('\n');
        text.push_str(&line);
    }
    text
}

#[derive(Debug, Clone, Serialize)]
pub struct DateText {
    pub date: NaiveDate,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DateFailure {
    pub date: NaiveDate,
    pub error: String,
}

/// Everything a display surface needs about one finished task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub id: TaskId,
    pub show_id: String,
    pub show_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: TaskStatus,
    pub table: Vec<TableRow>,
    pub texts: Vec<DateText>,
    pub failures: Vec<DateFailure>,
}

impl TaskReport {
    pub fn new(task: &Task, options: &TextOptions) -> Self {
        let texts = task
            .results()
            .iter()
            .filter(|r| r.is_success())
            .map(|r| DateText {
                date: r.date,
                text: format_text_with(r, options),
            })
            .collect();
        let failures = task
            .failed_dates()
            .filter_map(|r| {
                r.error.as_ref().map(|e| DateFailure {
                    date: r.date,
                    error: e.to_string(),
                })
            })
            .collect();

        Self {
            id: task.id(),
            show_id: task.show().id.clone(),
            show_name: task.show().name.clone(),
            start_date: task.start_date(),
            end_date: task.end_date(),
            status: task.status(),
            table: format_table(task),
            texts,
            failures,
        }
    }
}
