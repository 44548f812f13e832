//! Reporting windows
//!
//! Harvest seasons ("safras") run from May 1 to April 30 of the following
//! year. Windows are inclusive on both ends and may be open on either side.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::ReportPeriod;

/// First month of a harvest season
pub const SEASON_START_MONTH: u32 = 5;

/// Inclusive date window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn up_to(end: NaiveDate) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }

    pub fn contains_datetime(&self, at: NaiveDateTime) -> bool {
        self.contains(at.date())
    }

    /// Start of the first day
    pub fn start_datetime(&self) -> Option<NaiveDateTime> {
        self.start.and_then(|d| d.and_hms_opt(0, 0, 0))
    }

    /// Last second of the last day
    pub fn end_datetime(&self) -> Option<NaiveDateTime> {
        self.end.and_then(|d| d.and_hms_opt(23, 59, 59))
    }

    pub fn to_period(&self) -> ReportPeriod {
        let fmt = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();
        ReportPeriod {
            from: fmt(self.start),
            to: fmt(self.end),
        }
    }
}

/// Calendar month from `YYYY-MM`
pub fn month_window(month: &str) -> Result<DateWindow> {
    let re = Regex::new(r"^\s*(\d{4})-(\d{1,2})\s*$").expect("valid regex");
    let caps = re
        .captures(month)
        .ok_or_else(|| Error::InvalidData(format!("Invalid month '{}', expected YYYY-MM", month)))?;

    let year: i32 = caps[1]
        .parse()
        .map_err(|_| Error::InvalidData(format!("Invalid year in '{}'", month)))?;
    let month_num: u32 = caps[2]
        .parse()
        .map_err(|_| Error::InvalidData(format!("Invalid month in '{}'", month)))?;

    let start = NaiveDate::from_ymd_opt(year, month_num, 1)
        .ok_or_else(|| Error::InvalidData(format!("Invalid month '{}'", month)))?;
    let next = if month_num == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month_num + 1, 1)
    };
    let end = next
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| Error::InvalidData(format!("Invalid month '{}'", month)))?;

    Ok(DateWindow::between(start, end))
}

/// Season starting May 1 of `start_year`
pub fn season_window(start_year: i32) -> Result<DateWindow> {
    let start = NaiveDate::from_ymd_opt(start_year, SEASON_START_MONTH, 1);
    let end = NaiveDate::from_ymd_opt(start_year + 1, SEASON_START_MONTH, 1)
        .and_then(|d| d.pred_opt());
    match (start, end) {
        (Some(start), Some(end)) => Ok(DateWindow::between(start, end)),
        _ => Err(Error::InvalidData(format!("Invalid season year {}", start_year))),
    }
}

/// Season from a `YYYY/YYYY+1` label
pub fn safra_window(label: &str) -> Result<DateWindow> {
    let re = Regex::new(r"^\s*(\d{4})\s*/\s*(\d{4})\s*$").expect("valid regex");
    let caps = re.captures(label).ok_or_else(|| {
        Error::InvalidData(format!("Invalid safra '{}', expected YYYY/YYYY", label))
    })?;

    let first: i32 = caps[1]
        .parse()
        .map_err(|_| Error::InvalidData(format!("Invalid safra '{}'", label)))?;
    let second: i32 = caps[2]
        .parse()
        .map_err(|_| Error::InvalidData(format!("Invalid safra '{}'", label)))?;

    if second != first + 1 {
        return Err(Error::InvalidData(format!(
            "Invalid safra '{}': years must be consecutive",
            label
        )));
    }

    season_window(first)
}

/// Today's date in local time
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Season containing `today`
pub fn current_season(today: NaiveDate) -> DateWindow {
    let start_year = season_start_year(today);
    // only fails at the edge of chrono's date range
    season_window(start_year).unwrap_or_else(|_| DateWindow::up_to(today))
}

pub fn season_start_year(date: NaiveDate) -> i32 {
    if date.month() >= SEASON_START_MONTH {
        date.year()
    } else {
        date.year() - 1
    }
}

/// `2024/2025` style label for a season start year
pub fn season_label(start_year: i32) -> String {
    format!("{}/{}", start_year, start_year + 1)
}

/// Window for a report: month beats safra, safra beats the current season
pub fn resolve_window(
    month: Option<&str>,
    safra: Option<&str>,
    today: NaiveDate,
) -> Result<DateWindow> {
    let month = month.map(str::trim).filter(|m| !m.is_empty());
    let safra = safra.map(str::trim).filter(|s| !s.is_empty());

    match (month, safra) {
        (Some(month), _) => month_window(month),
        (None, Some(safra)) => safra_window(safra),
        (None, None) => Ok(current_season(today)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_safra_window_bounds() {
        let w = safra_window("2024/2025").unwrap();
        assert_eq!(w.start, Some(date(2024, 5, 1)));
        assert_eq!(w.end, Some(date(2025, 4, 30)));
        assert_eq!(
            w.start_datetime().unwrap().to_string(),
            "2024-05-01 00:00:00"
        );
        assert_eq!(w.end_datetime().unwrap().to_string(), "2025-04-30 23:59:59");

        assert!(w.contains(date(2025, 4, 30)));
        assert!(!w.contains(date(2025, 5, 1)));
        assert!(w.contains(date(2024, 5, 1)));
        assert!(!w.contains(date(2024, 4, 30)));
    }

    #[test]
    fn test_safra_label_validation() {
        assert!(safra_window(" 2023 / 2024 ").is_ok());
        assert!(safra_window("2024/2026").is_err());
        assert!(safra_window("2024-2025").is_err());
        assert!(safra_window("safra").is_err());
    }

    #[test]
    fn test_month_window() {
        let w = month_window("2024-02").unwrap();
        assert_eq!(w.start, Some(date(2024, 2, 1)));
        assert_eq!(w.end, Some(date(2024, 2, 29)));

        let w = month_window("2024-12").unwrap();
        assert_eq!(w.end, Some(date(2024, 12, 31)));

        assert!(month_window("2024-13").is_err());
        assert!(month_window("2024/03").is_err());
    }

    #[test]
    fn test_current_season_turns_over_in_may() {
        assert_eq!(current_season(date(2025, 4, 30)), safra_window("2024/2025").unwrap());
        assert_eq!(current_season(date(2025, 5, 1)), safra_window("2025/2026").unwrap());
        assert_eq!(current_season(date(2025, 12, 25)), safra_window("2025/2026").unwrap());
        assert_eq!(season_label(season_start_year(date(2026, 1, 10))), "2025/2026");
    }

    #[test]
    fn test_resolve_window_precedence() {
        let today = date(2025, 8, 1);
        let w = resolve_window(Some("2025-03"), Some("2023/2024"), today).unwrap();
        assert_eq!(w, month_window("2025-03").unwrap());

        let w = resolve_window(Some(" "), Some("2023/2024"), today).unwrap();
        assert_eq!(w, safra_window("2023/2024").unwrap());

        let w = resolve_window(None, None, today).unwrap();
        assert_eq!(w, safra_window("2025/2026").unwrap());
    }

    #[test]
    fn test_open_windows() {
        let w = DateWindow::up_to(date(2025, 1, 31));
        assert!(w.contains(date(1990, 1, 1)));
        assert!(w.contains(date(2025, 1, 31)));
        assert!(!w.contains(date(2025, 2, 1)));
        assert!(DateWindow::unbounded().contains(date(2100, 1, 1)));
        assert_eq!(DateWindow::unbounded().to_period().from, "");
    }
}
