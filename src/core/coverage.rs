//! Acquisition search window checks.
//!
//! Edge composites can only be interpolated when observations exist on both
//! sides of the first and last grid targets. The extract stage uses these
//! helpers to decide whether its catalog search must be widened.

use crate::core::grid::TemporalGrid;
use chrono::{Duration, NaiveDate};

/// True iff some date lies strictly before and some strictly after `target`
pub fn has_dates_around(dates: &[NaiveDate], target: NaiveDate) -> bool {
    let before = dates.iter().any(|&d| d < target);
    let after = dates.iter().any(|&d| d > target);
    before && after
}

/// Outcome of checking a search window against a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchCoverage {
    pub needs_earlier: bool,
    pub needs_later: bool,
}

impl SearchCoverage {
    pub fn is_sufficient(&self) -> bool {
        !self.needs_earlier && !self.needs_later
    }

    /// Widen `[start, end]` by one step on each side that lacks support
    pub fn widen(&self, start: NaiveDate, end: NaiveDate, step_days: i64) -> (NaiveDate, NaiveDate) {
        let step = Duration::days(step_days);
        let start = if self.needs_earlier {
            start.checked_sub_signed(step).unwrap_or(start)
        } else {
            start
        };
        let end = if self.needs_later {
            end.checked_add_signed(step).unwrap_or(end)
        } else {
            end
        };
        (start, end)
    }
}

/// Check that the first and last grid targets are bracketed by acquisitions
pub fn check_search_window(dates: &[NaiveDate], grid: &TemporalGrid) -> SearchCoverage {
    let (first, last) = match (grid.first(), grid.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return SearchCoverage {
                needs_earlier: false,
                needs_later: false,
            }
        }
    };

    let coverage = SearchCoverage {
        needs_earlier: !has_dates_around(dates, first),
        needs_later: !has_dates_around(dates, last),
    };
    if coverage.needs_earlier {
        log::info!("Not enough data around the first target {}", first);
    }
    if coverage.needs_later {
        log::info!("Not enough data around the last target {}", last);
    }
    coverage
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_has_dates_around() {
        let dates = [ymd(2025, 8, 3), ymd(2025, 8, 8)];
        assert!(has_dates_around(&dates, ymd(2025, 8, 5)));
        assert!(!has_dates_around(&dates, ymd(2025, 8, 3)));
        assert!(!has_dates_around(&dates, ymd(2025, 8, 9)));
        assert!(!has_dates_around(&[], ymd(2025, 8, 5)));
    }

    #[test]
    fn test_window_check_and_widen() {
        let grid = TemporalGrid::build(ymd(2025, 8, 1), ymd(2025, 8, 31), 10).unwrap();
        let dates = [ymd(2025, 8, 4), ymd(2025, 8, 17), ymd(2025, 9, 2)];

        let coverage = check_search_window(&dates, &grid);
        assert!(coverage.needs_earlier);
        assert!(!coverage.needs_later);
        assert!(!coverage.is_sufficient());

        let (start, end) = coverage.widen(ymd(2025, 8, 1), ymd(2025, 8, 31), 10);
        assert_eq!(start, ymd(2025, 7, 22));
        assert_eq!(end, ymd(2025, 8, 31));

        let dates = [ymd(2025, 7, 28), ymd(2025, 9, 2)];
        assert!(check_search_window(&dates, &grid).is_sufficient());
    }
}
