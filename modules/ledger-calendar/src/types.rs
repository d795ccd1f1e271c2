use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{CalendarError, CalendarResult};

// --- Game Date ---

/// A game day, stored and compared as `YYYY-MM-DD`.
///
/// The string form is persisted in `record_date` columns, so `Display` and
/// `FromStr` must stay byte-identical across releases. Only years 0-9999 are
/// representable; anything outside would print with a sign or a fifth digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GameDate(NaiveDate);

impl GameDate {
    pub const FORMAT: &'static str = "%Y-%m-%d";

    pub const MIN_YEAR: i32 = 0;
    pub const MAX_YEAR: i32 = 9999;

    pub fn new(date: NaiveDate) -> CalendarResult<Self> {
        if !(Self::MIN_YEAR..=Self::MAX_YEAR).contains(&date.year()) {
            return Err(CalendarError::invalid(format!(
                "game dates must fall in years {}-{}, got {date}",
                Self::MIN_YEAR,
                Self::MAX_YEAR
            )));
        }
        Ok(Self(date))
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> CalendarResult<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            CalendarError::invalid(format!("no such date: {year:04}-{month:02}-{day:02}"))
        })?;
        Self::new(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The game date `days` after this one (negative goes back).
    pub fn add_days(&self, days: i64) -> CalendarResult<Self> {
        let date = Duration::try_days(days)
            .and_then(|delta| self.0.checked_add_signed(delta))
            .ok_or_else(|| CalendarError::invalid(format!("{self} + {days} days is out of range")))?;
        Self::new(date)
    }
}

impl fmt::Display for GameDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(Self::FORMAT))
    }
}

impl FromStr for GameDate {
    type Err = CalendarError;

    /// Only the canonical zero-padded form is accepted, so that a parsed value
    /// always prints back to the exact input.
    fn from_str(s: &str) -> CalendarResult<Self> {
        let date = NaiveDate::parse_from_str(s, Self::FORMAT)
            .map_err(|e| CalendarError::invalid(format!("expected YYYY-MM-DD, got {s:?}: {e}")))?;
        let parsed = Self::new(date)?;
        if parsed.to_string() != s {
            return Err(CalendarError::invalid(format!(
                "expected zero-padded YYYY-MM-DD, got {s:?}"
            )));
        }
        Ok(parsed)
    }
}

impl TryFrom<String> for GameDate {
    type Error = CalendarError;

    fn try_from(s: String) -> CalendarResult<Self> {
        s.parse()
    }
}

impl From<GameDate> for String {
    fn from(d: GameDate) -> Self {
        d.to_string()
    }
}

impl TryFrom<NaiveDate> for GameDate {
    type Error = CalendarError;

    fn try_from(d: NaiveDate) -> CalendarResult<Self> {
        Self::new(d)
    }
}

// --- Week Key ---

/// Identifier of a game week, `YYYY-W##`.
///
/// Numbering is `ceil(ordinal / 7)` of the week's first day within that day's
/// own year. This is not ISO 8601: a week starting on Dec 31 is `W53` of the
/// old year and the next one is `W01` of the new year. Field order makes the
/// derived `Ord` agree with the string order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WeekKey {
    year: i32,
    week: u32,
}

impl WeekKey {
    pub fn new(year: i32, week: u32) -> CalendarResult<Self> {
        if !(0..=9999).contains(&year) {
            return Err(CalendarError::invalid(format!("year must be 0-9999, got {year}")));
        }
        if !(1..=53).contains(&week) {
            return Err(CalendarError::invalid(format!("week must be 1-53, got {week}")));
        }
        Ok(Self { year, week })
    }

    /// Key for the week whose first game day is `start`. Infallible because a
    /// `GameDate` year is always four digits and `ceil(ordinal / 7)` is 1-53.
    pub fn for_week_start(start: GameDate) -> Self {
        Self {
            year: start.date().year(),
            week: start.date().ordinal().div_ceil(7),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn week(&self) -> u32 {
        self.week
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-W{:02}", self.year, self.week)
    }
}

impl FromStr for WeekKey {
    type Err = CalendarError;

    fn from_str(s: &str) -> CalendarResult<Self> {
        let malformed = || CalendarError::invalid(format!("expected YYYY-W##, got {s:?}"));

        let (year, week) = s.split_once("-W").ok_or_else(malformed)?;
        if year.len() != 4 || week.len() != 2 {
            return Err(malformed());
        }
        if !year.bytes().chain(week.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let year: i32 = year.parse().map_err(|_| malformed())?;
        let week: u32 = week.parse().map_err(|_| malformed())?;
        Self::new(year, week)
    }
}

impl TryFrom<String> for WeekKey {
    type Error = CalendarError;

    fn try_from(s: String) -> CalendarResult<Self> {
        s.parse()
    }
}

impl From<WeekKey> for String {
    fn from(k: WeekKey) -> Self {
        k.to_string()
    }
}

// --- Week Range ---

/// First and last game day of a game week, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekRange {
    pub key: WeekKey,
    pub start: GameDate,
    pub end: GameDate,
}

impl WeekRange {
    /// Fails only for a week starting in the last six days of year 9999.
    pub fn starting(start: GameDate) -> CalendarResult<Self> {
        Ok(Self {
            key: WeekKey::for_week_start(start),
            start,
            end: start.add_days(6)?,
        })
    }

    pub fn contains(&self, date: GameDate) -> bool {
        self.start <= date && date <= self.end
    }
}

// --- Game Date Time ---

/// Game date paired with the unshifted local wall-clock time,
/// rendered as `YYYY-MM-DDTHH:MM:SS`.
///
/// At 03:00 local before a 05:00 reset this reads as the previous date with
/// `T03:00:00`, which is how activity timestamps are stamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub struct GameDateTime {
    pub date: GameDate,
    pub time: NaiveTime,
}

impl fmt::Display for GameDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}T{}", self.date, self.time.format("%H:%M:%S"))
    }
}

impl From<GameDateTime> for String {
    fn from(dt: GameDateTime) -> Self {
        dt.to_string()
    }
}
