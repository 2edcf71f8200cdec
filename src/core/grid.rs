use crate::types::{DekadError, DekadResult};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Standard dekad length in days
pub const DEKAD_DAYS: i64 = 10;

/// Calendar days on which a calendar dekad starts
const CALENDAR_DEKAD_DAYS: [u32; 3] = [1, 11, 21];

/// How grid targets are laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridKind {
    /// `start, start + step, ...` up to `end`
    Fixed { step_days: i64 },
    /// 1st, 11th and 21st of every month within `[start, end]`
    CalendarDekad,
}

impl Default for GridKind {
    fn default() -> Self {
        GridKind::Fixed { step_days: DEKAD_DAYS }
    }
}

/// Ordered target timestamps onto which acquisitions are aggregated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporalGrid {
    timestamps: Vec<NaiveDate>,
    step_days: i64,
    /// Exclusive upper bound of the last bucket
    end_bound: NaiveDate,
}

impl TemporalGrid {
    /// Build a fixed-step grid starting at `start` and never overshooting `end`
    pub fn build(start: NaiveDate, end: NaiveDate, step_days: i64) -> DekadResult<Self> {
        if end < start {
            return Err(DekadError::InvalidRange(format!(
                "end {} is before start {}",
                end, start
            )));
        }
        if step_days <= 0 {
            return Err(DekadError::InvalidRange(format!(
                "step must be positive, got {} days",
                step_days
            )));
        }

        let step = Duration::days(step_days);
        let mut timestamps = Vec::new();
        let mut current = start;
        while current <= end {
            timestamps.push(current);
            current = match current.checked_add_signed(step) {
                Some(next) => next,
                None => break,
            };
        }

        let end_bound = match timestamps.last() {
            Some(last) => last.checked_add_signed(step).unwrap_or(NaiveDate::MAX),
            None => start,
        };

        log::debug!(
            "Built fixed grid {}..{} with {} targets every {} days",
            start,
            end,
            timestamps.len(),
            step_days
        );

        Ok(Self {
            timestamps,
            step_days,
            end_bound,
        })
    }

    /// Build the calendar dekad grid (1st, 11th and 21st of each month)
    pub fn calendar_dekads(start: NaiveDate, end: NaiveDate) -> DekadResult<Self> {
        if end < start {
            return Err(DekadError::InvalidRange(format!(
                "end {} is before start {}",
                end, start
            )));
        }

        let mut timestamps = Vec::new();
        let (mut year, mut month) = (start.year(), start.month());
        while (year, month) <= (end.year(), end.month()) {
            for day in CALENDAR_DEKAD_DAYS {
                if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                    if date >= start && date <= end {
                        timestamps.push(date);
                    }
                }
            }
            if month == 12 {
                month = 1;
                year += 1;
            } else {
                month += 1;
            }
        }

        let end_bound = match timestamps.last() {
            Some(&last) => next_calendar_dekad(last),
            None => start,
        };

        log::debug!(
            "Built calendar dekad grid {}..{} with {} targets",
            start,
            end,
            timestamps.len()
        );

        Ok(Self {
            timestamps,
            step_days: DEKAD_DAYS,
            end_bound,
        })
    }

    /// Build a grid of the requested kind
    pub fn from_kind(kind: GridKind, start: NaiveDate, end: NaiveDate) -> DekadResult<Self> {
        match kind {
            GridKind::Fixed { step_days } => Self::build(start, end, step_days),
            GridKind::CalendarDekad => Self::calendar_dekads(start, end),
        }
    }

    pub fn timestamps(&self) -> &[NaiveDate] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn step_days(&self) -> i64 {
        self.step_days
    }

    pub fn first(&self) -> Option<NaiveDate> {
        self.timestamps.first().copied()
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.timestamps.last().copied()
    }

    /// Half-open interval `[start, end)` covered by bucket `index`
    pub fn bucket_bounds(&self, index: usize) -> Option<(NaiveDate, NaiveDate)> {
        let start = *self.timestamps.get(index)?;
        let end = self
            .timestamps
            .get(index + 1)
            .copied()
            .unwrap_or(self.end_bound);
        Some((start, end))
    }

    /// Index of the bucket `date` falls into, if any
    pub fn bucket_of(&self, date: NaiveDate) -> Option<usize> {
        let first = self.first()?;
        if date < first || date >= self.end_bound {
            return None;
        }
        // Latest grid point not exceeding `date`
        let index = self.timestamps.partition_point(|&t| t <= date) - 1;
        Some(index)
    }
}

/// First calendar dekad start strictly after `date`
fn next_calendar_dekad(date: NaiveDate) -> NaiveDate {
    let next = match date.day() {
        d if d < 11 => NaiveDate::from_ymd_opt(date.year(), date.month(), 11),
        d if d < 21 => NaiveDate::from_ymd_opt(date.year(), date.month(), 21),
        _ if date.month() == 12 => NaiveDate::from_ymd_opt(date.year() + 1, 1, 1),
        _ => NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1),
    };
    next.unwrap_or(NaiveDate::MAX)
}
