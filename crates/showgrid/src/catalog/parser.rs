use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;

use super::CatalogError;
use crate::types::{DateRange, Show};
use crate::utils::parse_show_date;

static RE_SHOWS_ARRAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)var shows\s*=\s*(\[\{.*?\}\]);").expect("invalid regex: shows array")
});

static RE_SHOWS_ARRAY_FALLBACKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?s)shows\s*=\s*(\[\{.*?\}\])",
        r"(?s)showsList\s*=\s*(\[\{.*?\}\])",
        r"(?s)data\.shows\s*=\s*(\[\{.*?\}\])",
        r#"(?s)"shows"\s*:\s*(\[\{.*?\}\])"#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid regex: shows array fallback"))
    .collect()
});

/// Used when the catalog does not say when a show opens.
pub(crate) fn default_earliest() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid constant date")
}

/// Used when the catalog does not say how far ahead a show is on sale.
pub(crate) fn default_latest() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 12, 31).expect("valid constant date")
}

#[derive(Debug, Deserialize)]
struct RawShow {
    #[serde(rename = "ShowLetUsKnow")]
    let_us_know: Option<bool>,
    #[serde(rename = "Url")]
    url: Option<String>,
    #[serde(rename = "ShowUrlEN")]
    url_en: Option<String>,
    #[serde(rename = "ShowName")]
    show_name: Option<String>,
    #[serde(rename = "SortName")]
    sort_name: Option<String>,
    #[serde(rename = "FirstPerformance")]
    first_performance: Option<String>,
    #[serde(rename = "OnSaleThrough")]
    on_sale_through: Option<String>,
}

impl RawShow {
    fn title(&self) -> Option<&str> {
        [&self.show_name, &self.sort_name]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
    }

    fn slug(&self) -> Option<&str> {
        [&self.url, &self.url_en]
            .into_iter()
            .flatten()
            .map(|s| s.trim().trim_matches('/'))
            .find(|s| !s.is_empty())
    }

    fn into_show(self, base_url: &str) -> Option<Show> {
        let name = self.title()?.to_string();
        let id = self.slug()?.to_string();

        let earliest = self
            .first_performance
            .as_deref()
            .and_then(parse_show_date)
            .unwrap_or_else(default_earliest);
        let latest = self
            .on_sale_through
            .as_deref()
            .and_then(parse_show_date)
            .unwrap_or_else(default_latest);

        Some(Show {
            url: format!("{}/{}", base_url.trim_end_matches('/'), id),
            id,
            name,
            date_range: DateRange::new(earliest, latest),
        })
    }
}

fn find_shows_array(html: &str) -> Option<&str> {
    if let Some(caps) = RE_SHOWS_ARRAY.captures(html) {
        return caps.get(1).map(|m| m.as_str());
    }
    RE_SHOWS_ARRAY_FALLBACKS.iter().find_map(|re| {
        let found = re.captures(html)?.get(1)?.as_str();
        log::debug!("Found shows array with fallback pattern {}", re.as_str());
        Some(found)
    })
}

/// Extracts the priced shows from the inline `shows` array of the `/shows` page.
///
/// Shows still flagged `ShowLetUsKnow` have no published pricing and are
/// skipped, as are entries without a name or slug.
pub fn parse_shows(html: &str, base_url: &str) -> Result<Vec<Show>, CatalogError> {
    let json = find_shows_array(html).ok_or(CatalogError::ShowsArrayNotFound)?;
    let raw: Vec<RawShow> = serde_json::from_str(json)?;
    log::debug!("Parsed {} catalog entries", raw.len());

    let mut shows = Vec::new();
    for entry in raw {
        if entry.let_us_know != Some(false) {
            log::debug!(
                "Skipping show without pricing: {}",
                entry.title().unwrap_or("Unknown")
            );
            continue;
        }
        match entry.into_show(base_url) {
            Some(show) => shows.push(show),
            None => log::warn!("Skipping catalog entry without name or url"),
        }
    }

    Ok(shows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const BASE: &str = "https://www.broadwayinbound.com";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_shows_from_fixture() {
        let html = fs::read_to_string("fixtures/shows_page.html").expect("Failed to read fixture");

        let shows = parse_shows(&html, BASE).expect("Failed to parse shows");

        let ids: Vec<_> = shows.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["wicked", "hamilton", "the-lion-king"]);

        let wicked = &shows[0];
        assert_eq!(wicked.name, "Wicked");
        assert_eq!(wicked.url, "https://www.broadwayinbound.com/wicked");
        assert_eq!(
            wicked.date_range,
            DateRange::new(date(2019, 9, 17), date(2026, 1, 3))
        );
    }

    #[test]
    fn test_parse_shows_uses_fallbacks_for_missing_fields() {
        let html = fs::read_to_string("fixtures/shows_page.html").expect("Failed to read fixture");

        let shows = parse_shows(&html, BASE).expect("Failed to parse shows");

        let hamilton = shows.iter().find(|s| s.id == "hamilton").unwrap();
        assert_eq!(hamilton.date_range.earliest, default_earliest());
        assert_eq!(hamilton.date_range.latest, date(2025, 6, 29));

        let lion_king = shows.iter().find(|s| s.id == "the-lion-king").unwrap();
        assert_eq!(lion_king.name, "Lion King, The");
        assert_eq!(lion_king.date_range.latest, default_latest());
    }

    #[test]
    fn test_parse_shows_alternative_pattern() {
        let html = r#"<script>
            window.data = {};
            data.shows = [{"ShowLetUsKnow": false, "Url": "/aladdin", "ShowName": "Aladdin",
                           "FirstPerformance": "3/20/2014", "OnSaleThrough": "9/27/2025"}];
        </script>"#;

        let shows = parse_shows(html, BASE).expect("Failed to parse shows");
        assert_eq!(shows.len(), 1);
        assert_eq!(shows[0].id, "aladdin");
        assert_eq!(shows[0].date_range.earliest, date(2014, 3, 20));
    }

    #[test]
    fn test_missing_array_is_an_error_not_an_empty_list() {
        let html = "<html><body><h1>Shows</h1></body></html>";
        let err = parse_shows(html, BASE).unwrap_err();
        assert!(matches!(err, CatalogError::ShowsArrayNotFound));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let html = r#"<script>var shows = [{"ShowName": "Wicked", }];</script>"#;
        let err = parse_shows(html, BASE).unwrap_err();
        assert!(matches!(err, CatalogError::Json(_)));
    }

    #[test]
    fn test_no_priced_shows_is_an_empty_catalog() {
        let html = r#"<script>var shows = [{"ShowLetUsKnow": true, "Url": "/new-show", "ShowName": "New Show"}];</script>"#;
        let shows = parse_shows(html, BASE).expect("Failed to parse shows");
        assert!(shows.is_empty());
    }
}
