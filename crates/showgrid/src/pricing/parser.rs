use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::FetchError;
use crate::types::{Price, PriceRow};

const HEADER_ID_PREFIX: &str = "product-date-time-";

static RE_HEADER_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})/(\d{1,2})/(\d{4})").expect("invalid regex: header date")
});

static SEL_GRID: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#pricing-grid").expect("invalid selector: grid"));
static SEL_HEADER: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h3[id^='product-date-time-']").expect("invalid selector: header")
});
static SEL_LABEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".product-data-column.product-section span").expect("invalid selector: label")
});
static SEL_PRICE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".product-data-column.price span").expect("invalid selector: price")
});

fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_performance_header(element: &ElementRef) -> bool {
    element.value().name() == "h3"
        && element
            .value()
            .id()
            .is_some_and(|id| id.starts_with(HEADER_ID_PREFIX))
}

/// Reads the date out of a performance header such as `SUNDAY, 3/8/2026 6:30PM`.
fn parse_header_date(header: &str) -> Option<NaiveDate> {
    let caps = RE_HEADER_DATE.captures(header)?;
    let month: u32 = caps[1].parse().ok()?;
    let day: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Extracts the price rows listed under one performance section.
fn parse_section_rows(
    node: ElementRef,
    header: &str,
    rows: &mut Vec<PriceRow>,
) -> Result<(), FetchError> {
    let labels: Vec<String> = node
        .select(&SEL_LABEL)
        .map(|e| normalize_whitespace(&elem_text(e)))
        .collect();
    let prices: Vec<String> = node
        .select(&SEL_PRICE)
        .map(|e| normalize_whitespace(&elem_text(e)))
        .collect();

    if labels.len() != prices.len() {
        return Err(FetchError::ParseMismatch(format!(
            "{} labels but {} prices under '{}'",
            labels.len(),
            prices.len(),
            header
        )));
    }

    for (label, price) in labels.into_iter().zip(prices) {
        if label.is_empty() {
            return Err(FetchError::ParseMismatch(format!(
                "empty seating label under '{}'",
                header
            )));
        }
        // Status cells such as "Sold Out" carry no amount at all.
        if !price.chars().any(|c| c.is_ascii_digit()) {
            log::warn!("Skipping '{}' under '{}': no price ('{}')", label, header, price);
            continue;
        }
        let price: Price = price
            .parse()
            .map_err(|e| FetchError::ParseMismatch(format!("{e} for '{label}'")))?;
        rows.push(PriceRow::new(label, price));
    }

    Ok(())
}

/// Parses the pricing grid of a show page and keeps the rows of every
/// performance on `date`, in grid order.
///
/// Each `h3#product-date-time-*` header owns the sibling elements that follow
/// it up to the next header. A page without a `#pricing-grid`, a grid with no
/// performance headers at all (not rendered yet) or label and price columns
/// that do not line up is a [`FetchError::ParseMismatch`]. A rendered grid
/// with no performance on `date` yields no rows, and tiers whose price cell
/// holds no amount (`Sold Out`) are skipped.
pub fn parse_pricing_grid(html: &str, date: NaiveDate) -> Result<Vec<PriceRow>, FetchError> {
    let document = Html::parse_document(html);
    let grid = document
        .select(&SEL_GRID)
        .next()
        .ok_or_else(|| FetchError::ParseMismatch("no #pricing-grid element".to_string()))?;

    let mut rows = Vec::new();
    let mut headers = 0;

    for header in grid.select(&SEL_HEADER) {
        headers += 1;
        let header_text = normalize_whitespace(&elem_text(header));
        let Some(header_date) = parse_header_date(&header_text) else {
            log::debug!("Skipping performance header without a date: '{}'", header_text);
            continue;
        };
        if header_date != date {
            continue;
        }

        for node in header.next_siblings().filter_map(ElementRef::wrap) {
            if is_performance_header(&node) {
                break;
            }
            parse_section_rows(node, &header_text, &mut rows)?;
        }
    }

    if headers == 0 {
        return Err(FetchError::ParseMismatch(
            "pricing grid has no performance headers".to_string(),
        ));
    }

    Ok(rows)
}
