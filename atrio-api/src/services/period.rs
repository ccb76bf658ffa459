/// Reporting period buckets
///
/// Each named bucket independently defines its own start/end boundary and,
/// where meaningful, a comparable prior window of equal length for delta
/// computation. Rolling buckets (`7d`, `30d`, `90d`) slide back from now;
/// calendar buckets align to month/year starts.
///
/// All windows are inclusive on both ends.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

/// Named reporting period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportingPeriod {
    /// Last 7 days
    SevenDays,

    /// Last 30 days
    ThirtyDays,

    /// Last 90 days
    NinetyDays,

    /// Start of the current calendar month until now
    CurrentMonth,

    /// The full previous calendar month
    LastMonth,

    /// Start of the current calendar year until now
    CurrentYear,
}

/// A resolved date window with an optional comparable prior window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodWindow {
    /// Window start (inclusive)
    pub start: DateTime<Utc>,

    /// Window end (inclusive)
    pub end: DateTime<Utc>,

    /// Prior window of equal length, when the bucket defines one
    pub previous: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0).expect("midnight is valid").and_utc()
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(23, 59, 59).expect("end of day is valid").and_utc()
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).expect("first of month is valid")
}

fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

impl ReportingPeriod {
    /// Parses a wire-format period name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "7d" => Some(ReportingPeriod::SevenDays),
            "30d" => Some(ReportingPeriod::ThirtyDays),
            "90d" => Some(ReportingPeriod::NinetyDays),
            "current_month" => Some(ReportingPeriod::CurrentMonth),
            "last_month" => Some(ReportingPeriod::LastMonth),
            "current_year" => Some(ReportingPeriod::CurrentYear),
            _ => None,
        }
    }

    /// Wire-format name of the bucket
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportingPeriod::SevenDays => "7d",
            ReportingPeriod::ThirtyDays => "30d",
            ReportingPeriod::NinetyDays => "90d",
            ReportingPeriod::CurrentMonth => "current_month",
            ReportingPeriod::LastMonth => "last_month",
            ReportingPeriod::CurrentYear => "current_year",
        }
    }

    /// Resolves the window relative to the current instant
    pub fn window(&self) -> PeriodWindow {
        self.window_at(Utc::now())
    }

    /// Resolves the window relative to a given instant
    ///
    /// Split out from [`ReportingPeriod::window`] so boundary behavior is
    /// testable with a fixed clock.
    pub fn window_at(&self, now: DateTime<Utc>) -> PeriodWindow {
        match self {
            ReportingPeriod::SevenDays => Self::rolling(now, 7),
            ReportingPeriod::ThirtyDays => Self::rolling(now, 30),
            ReportingPeriod::NinetyDays => Self::rolling(now, 90),
            ReportingPeriod::CurrentMonth => {
                let today = now.date_naive();
                let start = first_of_month(today.year(), today.month());
                let (prev_year, prev_month) = previous_month(today.year(), today.month());
                let prev_start = first_of_month(prev_year, prev_month);
                let prev_end = start.pred_opt().expect("month start has a predecessor");

                PeriodWindow {
                    start: start_of_day(start),
                    end: now,
                    previous: Some((start_of_day(prev_start), end_of_day(prev_end))),
                }
            }
            ReportingPeriod::LastMonth => {
                let today = now.date_naive();
                let current_start = first_of_month(today.year(), today.month());
                let (prev_year, prev_month) = previous_month(today.year(), today.month());
                let start = first_of_month(prev_year, prev_month);
                let end = current_start.pred_opt().expect("month start has a predecessor");

                let (pp_year, pp_month) = previous_month(prev_year, prev_month);
                let prev_start = first_of_month(pp_year, pp_month);
                let prev_end = start.pred_opt().expect("month start has a predecessor");

                PeriodWindow {
                    start: start_of_day(start),
                    end: end_of_day(end),
                    previous: Some((start_of_day(prev_start), end_of_day(prev_end))),
                }
            }
            ReportingPeriod::CurrentYear => {
                let today = now.date_naive();
                let start = first_of_month(today.year(), 1);
                let prev_start = first_of_month(today.year() - 1, 1);
                let prev_end = NaiveDate::from_ymd_opt(today.year() - 1, 12, 31)
                    .expect("december 31 is valid");

                PeriodWindow {
                    start: start_of_day(start),
                    end: now,
                    previous: Some((start_of_day(prev_start), end_of_day(prev_end))),
                }
            }
        }
    }

    fn rolling(now: DateTime<Utc>, days: i64) -> PeriodWindow {
        let start = now - Duration::days(days);
        let prev_start = start - Duration::days(days);

        PeriodWindow {
            start,
            end: now,
            previous: Some((prev_start, start)),
        }
    }
}

impl PeriodWindow {
    /// Window bounds as dates, for queries over DATE columns
    pub fn date_bounds(&self) -> (NaiveDate, NaiveDate) {
        (self.start.date_naive(), self.end.date_naive())
    }

    /// Prior window bounds as dates
    pub fn previous_date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.previous
            .map(|(start, end)| (start.date_naive(), end.date_naive()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        // A Wednesday in mid-March
        Utc.with_ymd_and_hms(2025, 3, 19, 15, 30, 0).unwrap()
    }

    #[test]
    fn test_parse_roundtrip() {
        for name in ["7d", "30d", "90d", "current_month", "last_month", "current_year"] {
            let period = ReportingPeriod::parse(name).unwrap();
            assert_eq!(period.as_str(), name);
        }
        assert!(ReportingPeriod::parse("fortnight").is_none());
    }

    #[test]
    fn test_rolling_window() {
        let window = ReportingPeriod::SevenDays.window_at(fixed_now());

        assert_eq!(window.end, fixed_now());
        assert_eq!(window.start, fixed_now() - Duration::days(7));

        let (prev_start, prev_end) = window.previous.unwrap();
        assert_eq!(prev_end, window.start);
        assert_eq!(prev_start, window.start - Duration::days(7));
    }

    #[test]
    fn test_current_month_window() {
        let window = ReportingPeriod::CurrentMonth.window_at(fixed_now());

        assert_eq!(
            window.start,
            Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(window.end, fixed_now());

        let (prev_start, prev_end) = window.previous.unwrap();
        assert_eq!(prev_start, Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap());
        assert_eq!(prev_end, Utc.with_ymd_and_hms(2025, 2, 28, 23, 59, 59).unwrap());
    }

    #[test]
    fn test_last_month_window() {
        let window = ReportingPeriod::LastMonth.window_at(fixed_now());

        assert_eq!(
            window.start,
            Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            window.end,
            Utc.with_ymd_and_hms(2025, 2, 28, 23, 59, 59).unwrap()
        );

        let (prev_start, prev_end) = window.previous.unwrap();
        assert_eq!(prev_start, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(prev_end, Utc.with_ymd_and_hms(2025, 1, 31, 23, 59, 59).unwrap());
    }

    #[test]
    fn test_last_month_across_year_boundary() {
        let january = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();
        let window = ReportingPeriod::LastMonth.window_at(january);

        assert_eq!(
            window.start,
            Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            window.end,
            Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap()
        );

        let (prev_start, _) = window.previous.unwrap();
        assert_eq!(prev_start, Utc.with_ymd_and_hms(2024, 11, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_current_year_window() {
        let window = ReportingPeriod::CurrentYear.window_at(fixed_now());

        assert_eq!(
            window.start,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
        );

        let (prev_start, prev_end) = window.previous.unwrap();
        assert_eq!(prev_start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(prev_end, Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap());
    }

    #[test]
    fn test_date_bounds() {
        let window = ReportingPeriod::CurrentMonth.window_at(fixed_now());
        let (start, end) = window.date_bounds();

        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 3, 19).unwrap());
    }
}
