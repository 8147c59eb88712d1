//! Month stepping and trading-day adjustment
//!
//! Sessions are assumed to run Monday through Thursday. Friday is treated as
//! a non-trading day together with the weekend; the sampled dates depend on
//! this rule, so it is kept as is.

use chrono::{Datelike, Days, Months, NaiveDate, Utc, Weekday};

/// Source of "today" for date arithmetic
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    /// Current calendar date
    fn today(&self) -> NaiveDate;
}

/// Wall clock in UTC
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Clock pinned to a single date
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Days on which no session is assumed
pub fn is_excluded_weekday(weekday: Weekday) -> bool {
    matches!(weekday, Weekday::Fri | Weekday::Sat | Weekday::Sun)
}

/// `today` minus `months` calendar months, clamped to the target month's last day
pub fn month_offset(today: NaiveDate, months: u32) -> NaiveDate {
    today
        .checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

fn step_back(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
}

/// Move `date` to the most recent day with a completed session
///
/// The current day is never complete, so `today` first steps back two days.
pub fn adjust_to_trading_day(date: NaiveDate, today: NaiveDate) -> NaiveDate {
    let mut adjusted = if date == today {
        step_back(date, 2)
    } else {
        date
    };

    // Fri/Sat/Sun is at most three consecutive days.
    for _ in 0..3 {
        if !is_excluded_weekday(adjusted.weekday()) {
            break;
        }
        adjusted = step_back(adjusted, 1);
    }

    adjusted
}

/// Adjusted sample date for month step `step`
pub fn target_date(today: NaiveDate, step: u32) -> NaiveDate {
    adjust_to_trading_day(month_offset(today, step), today)
}

/// Adjusted sample dates for steps `0..months`, newest first
pub fn target_dates(today: NaiveDate, months: u32) -> Vec<NaiveDate> {
    (0..months).map(|step| target_date(today, step)).collect()
}
