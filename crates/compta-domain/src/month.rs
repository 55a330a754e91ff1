//! Calendar-month keys, the time axis of every monthly series.

use std::{fmt, str::FromStr};

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::DomainError;

/// A calendar month. Ordered chronologically; every date inside the month maps
/// to the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct MonthKey(NaiveDate);

impl MonthKey {
    /// Builds a key from a year and a 1-based month.
    pub fn new(year: i32, month: u32) -> Result<Self, DomainError> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::InvalidMonth(month));
        }
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(Self)
            .ok_or(DomainError::InvalidMonth(month))
    }

    /// Truncates `date` to the first day of its month.
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date - Duration::days(i64::from(date.day0())))
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// Shifts the key by `months`, saturating at the edges of the calendar.
    pub fn translate(&self, months: i32) -> Self {
        let index = i64::from(self.year()) * 12 + i64::from(self.month0()) + i64::from(months);
        let year = index.div_euclid(12);
        let month0 = index.rem_euclid(12);
        i32::try_from(year)
            .ok()
            .and_then(|year| NaiveDate::from_ymd_opt(year, month0 as u32 + 1, 1))
            .map(Self)
            .unwrap_or_else(|| {
                if months < 0 {
                    Self::from_date(NaiveDate::MIN)
                } else {
                    Self::from_date(NaiveDate::MAX)
                }
            })
    }

    pub fn next(&self) -> Self {
        self.translate(1)
    }

    pub fn previous(&self) -> Self {
        self.translate(-1)
    }

    /// Signed number of months from `self` to `other`.
    pub fn months_until(&self, other: MonthKey) -> i32 {
        (other.year() - self.year()) * 12 + other.month0() as i32 - self.month0() as i32
    }

    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    pub fn last_day(&self) -> NaiveDate {
        self.0 + Duration::days(i64::from(self.day_count()) - 1)
    }

    pub fn day_count(&self) -> u32 {
        match self.month() {
            2 if is_leap_year(self.year()) => 29,
            2 => 28,
            4 | 6 | 9 | 11 => 30,
            _ => 31,
        }
    }

    /// The given day of this month, `None` when the month is shorter.
    pub fn day(&self, day: u32) -> Option<NaiveDate> {
        if day == 0 || day > self.day_count() {
            return None;
        }
        Some(self.0 + Duration::days(i64::from(day) - 1))
    }

    /// The given day of this month, clamped into `1..=day_count()`.
    pub fn clamp_day(&self, day: u32) -> NaiveDate {
        let day = day.clamp(1, self.day_count());
        self.0 + Duration::days(i64::from(day) - 1)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        MonthKey::from_date(date) == *self
    }

    /// Every calendar day of the month in ascending order.
    pub fn days(&self) -> impl DoubleEndedIterator<Item = NaiveDate> {
        let first = self.0;
        (0..i64::from(self.day_count())).map(move |offset| first + Duration::days(offset))
    }

    /// Months from `self` through `end`, both inclusive. Empty when `end < self`.
    pub fn through(self, end: MonthKey) -> impl Iterator<Item = MonthKey> {
        let count = self.months_until(end).max(-1) + 1;
        (0..count).map(move |offset| self.translate(offset))
    }

    fn month0(&self) -> u32 {
        self.0.month0()
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

impl From<NaiveDate> for MonthKey {
    fn from(date: NaiveDate) -> Self {
        Self::from_date(date)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for MonthKey {
    type Err = DomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::InvalidMonthKey(raw.to_string());
        let (year, month) = raw.trim().rsplit_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        MonthKey::new(year, month)
    }
}

impl From<MonthKey> for String {
    fn from(key: MonthKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for MonthKey {
    type Error = DomainError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}
