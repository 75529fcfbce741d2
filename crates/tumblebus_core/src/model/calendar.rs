//! Calendar-month arithmetic for date-of-birth searches.
//!
//! Month windows are computed explicitly with chrono month arithmetic; an
//! invalid day-of-month is never used to mean "start of month".

use chrono::{Datelike, Days, Months, NaiveDate};

/// Returns the first day of `month` in `year`, or `None` for an invalid month.
pub fn month_start(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Returns the half-open window `[start, start + 1 month)`.
///
/// The upper bound keeps the day of month; days past the end of the
/// following month roll forward, so `2001-01-31` yields
/// `[2001-01-31, 2001-03-03)`.
pub fn one_month_window(start: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let next_month = start
        .with_day(1)?
        .checked_add_months(Months::new(1))?;
    let end = next_month.checked_add_days(Days::new(u64::from(start.day0())))?;
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::{month_start, one_month_window};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_start_rejects_invalid_months() {
        assert_eq!(month_start(1999, 4), Some(date(1999, 4, 1)));
        assert_eq!(month_start(1999, 0), None);
        assert_eq!(month_start(1999, 13), None);
    }

    #[test]
    fn window_rolls_over_year_end() {
        assert_eq!(
            one_month_window(date(2001, 12, 1)),
            Some((date(2001, 12, 1), date(2002, 1, 1)))
        );
    }

    #[test]
    fn window_rolls_past_short_months() {
        assert_eq!(
            one_month_window(date(2001, 1, 31)),
            Some((date(2001, 1, 31), date(2001, 3, 3)))
        );
        assert_eq!(
            one_month_window(date(2004, 1, 30)),
            Some((date(2004, 1, 30), date(2004, 3, 1)))
        );
        assert_eq!(
            one_month_window(date(1999, 4, 13)),
            Some((date(1999, 4, 13), date(1999, 5, 13)))
        );
    }
}
