use chrono::{DateTime, Duration, Month, NaiveDate, Utc};
use thiserror::Error;

use crate::models::Period;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("month must be between 1 and 12, got {0}")]
    InvalidMonth(u32),

    #[error("year {0} is out of range")]
    InvalidYear(i32),

    #[error("start {start} is after end {end}")]
    InvertedRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Caller-supplied window parameters for summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowQuery {
    pub days: Option<u32>,
    pub month: Option<u32>,
    pub year: Option<i32>,
}

/// Resolved inclusive bounds plus the period echoed back to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub period: Period,
}

/// Month + year wins, then a trailing `days` window ending now, else
/// unbounded. Month bounds are UTC.
pub fn resolve(query: WindowQuery, now: DateTime<Utc>) -> Result<TimeWindow, WindowError> {
    if let (Some(month), Some(year)) = (query.month, query.year) {
        let (from, to) = month_bounds(year, month)?;
        return Ok(TimeWindow {
            from: Some(from),
            to: Some(to),
            period: Period {
                days: None,
                month: Some(month),
                year: Some(year),
                start: Some(from),
                end: Some(to),
                is_month_filter: true,
                month_name: month_name(month),
            },
        });
    }

    match query.days.filter(|d| *d > 0) {
        Some(days) => {
            // Absurdly long windows saturate to all time.
            let from = now.checked_sub_signed(Duration::days(i64::from(days)));
            Ok(TimeWindow {
                from,
                to: None,
                period: Period {
                    days: Some(days),
                    start: from,
                    end: Some(now),
                    ..unbounded_period()
                },
            })
        }
        None => Ok(TimeWindow {
            from: None,
            to: None,
            period: unbounded_period(),
        }),
    }
}

/// Explicit inclusive range. Either end may be open.
pub fn resolve_range(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<TimeWindow, WindowError> {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(WindowError::InvertedRange { start, end });
        }
    }
    Ok(TimeWindow {
        from: start,
        to: end,
        period: Period {
            start,
            end,
            ..unbounded_period()
        },
    })
}

/// First and last instant (microsecond resolution) of a UTC month.
pub fn month_bounds(year: i32, month: u32) -> Result<(DateTime<Utc>, DateTime<Utc>), WindowError> {
    if !(1..=12).contains(&month) {
        return Err(WindowError::InvalidMonth(month));
    }
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or(WindowError::InvalidYear(year))?;
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let next = NaiveDate::from_ymd_opt(next_year, next_month, 1).ok_or(WindowError::InvalidYear(year))?;

    let midnight = |d: NaiveDate| d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    let start = midnight(first).ok_or(WindowError::InvalidYear(year))?;
    let end = midnight(next).ok_or(WindowError::InvalidYear(year))? - Duration::microseconds(1);
    Ok((start, end))
}

fn month_name(month: u32) -> Option<String> {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.name().to_string())
}

fn unbounded_period() -> Period {
    Period {
        days: None,
        month: None,
        year: None,
        start: None,
        end: None,
        is_month_filter: false,
        month_name: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_month_window_covers_whole_month() {
        let w = resolve(
            WindowQuery { days: Some(7), month: Some(3), year: Some(2024) },
            now(),
        )
        .unwrap();

        assert_eq!(w.from, Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()));
        let end = w.to.unwrap();
        assert_eq!(end.format("%Y-%m-%d %H:%M:%S%.6f").to_string(), "2024-03-31 23:59:59.999999");
        assert!(w.period.is_month_filter);
        assert_eq!(w.period.month_name.as_deref(), Some("March"));
        assert_eq!(w.period.days, None);
    }

    #[test]
    fn test_month_window_includes_mid_month_and_excludes_next_month() {
        let w = resolve(WindowQuery { month: Some(3), year: Some(2024), ..Default::default() }, now()).unwrap();
        let inside = Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap();
        let outside = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();

        assert!(w.from.unwrap() <= inside && inside <= w.to.unwrap());
        assert!(outside > w.to.unwrap());
    }

    #[test]
    fn test_december_rolls_into_next_year() {
        let (start, end) = month_bounds(2023, 12).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2023, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end + Duration::microseconds(1), Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_leap_february() {
        let (_, end) = month_bounds(2024, 2).unwrap();
        assert_eq!(end.format("%Y-%m-%d").to_string(), "2024-02-29");
    }

    #[test]
    fn test_invalid_month_rejected() {
        let err = resolve(WindowQuery { month: Some(13), year: Some(2024), ..Default::default() }, now())
            .unwrap_err();
        assert_eq!(err, WindowError::InvalidMonth(13));
        assert_eq!(month_bounds(2024, 0).unwrap_err(), WindowError::InvalidMonth(0));
    }

    #[test]
    fn test_trailing_days_window() {
        let w = resolve(WindowQuery { days: Some(30), ..Default::default() }, now()).unwrap();
        assert_eq!(w.from, Some(now() - Duration::days(30)));
        assert_eq!(w.to, None);
        assert_eq!(w.period.days, Some(30));
        assert!(!w.period.is_month_filter);
    }

    #[test]
    fn test_month_without_year_falls_back_to_days() {
        let w = resolve(WindowQuery { days: Some(1), month: Some(3), year: None }, now()).unwrap();
        assert_eq!(w.from, Some(now() - Duration::days(1)));
    }

    #[test]
    fn test_no_parameters_is_all_time() {
        let w = resolve(WindowQuery::default(), now()).unwrap();
        assert_eq!(w.from, None);
        assert_eq!(w.to, None);

        let zero = resolve(WindowQuery { days: Some(0), ..Default::default() }, now()).unwrap();
        assert_eq!(zero.from, None);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let a = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert!(matches!(resolve_range(Some(a), Some(b)), Err(WindowError::InvertedRange { .. })));
        assert_eq!(resolve_range(Some(b), Some(a)).unwrap().from, Some(b));
    }
}
