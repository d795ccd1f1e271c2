use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDateTime, TimeZone, Timelike};
use tracing::debug;

use crate::clock::Clock;
use crate::config::CalendarConfig;
use crate::error::{CalendarError, CalendarResult};
use crate::types::{GameDate, GameDateTime, WeekKey, WeekRange};

/// Maps instants onto game days and game weeks.
///
/// Every operation takes the instant explicitly and is a pure function of it;
/// the `*_now` style wrappers read a [`Clock`] once and delegate. Instants whose
/// game date would leave years 0-9999 are rejected with `InvalidArgument`
/// instead of producing a key in a different format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameCalendar {
    offset: FixedOffset,
    daily_reset_hour: u32,
    weekly_reset_weekday: u32,
    weekly_reset_hour: u32,
}

impl GameCalendar {
    pub fn new(config: &CalendarConfig) -> CalendarResult<Self> {
        config.validate()?;
        let offset = config.offset()?;

        debug!(
            offset = %offset,
            daily_reset_hour = config.daily_reset_hour,
            weekly_reset_weekday = config.weekly_reset_weekday,
            weekly_reset_hour = config.weekly_reset_hour,
            "Game calendar ready"
        );

        Ok(Self {
            offset,
            daily_reset_hour: config.daily_reset_hour,
            weekly_reset_weekday: config.weekly_reset_weekday,
            weekly_reset_hour: config.weekly_reset_hour,
        })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Wall-clock time of `instant` in the reference offset.
    fn local_time<Tz: TimeZone>(&self, instant: &DateTime<Tz>) -> CalendarResult<NaiveDateTime> {
        let utc = instant.naive_utc();
        utc.checked_add_signed(Duration::seconds(self.offset.local_minus_utc().into()))
            .ok_or_else(|| {
                CalendarError::invalid(format!("{utc} UTC has no local time at {}", self.offset))
            })
    }

    // --- Daily ---

    /// Game day containing `instant`. Local times before the daily reset hour
    /// belong to the previous civil day; the reset instant itself starts the new day.
    pub fn to_game_date<Tz: TimeZone>(&self, instant: &DateTime<Tz>) -> CalendarResult<GameDate> {
        shifted_date(self.local_time(instant)?, self.daily_reset_hour)
    }

    /// Game date plus the unshifted local time of day.
    pub fn game_datetime<Tz: TimeZone>(
        &self,
        instant: &DateTime<Tz>,
    ) -> CalendarResult<GameDateTime> {
        let local = self.local_time(instant)?;
        Ok(GameDateTime {
            date: shifted_date(local, self.daily_reset_hour)?,
            time: local.time().with_nanosecond(0).unwrap_or_else(|| local.time()),
        })
    }

    /// Edits are only allowed on the game day that `now` falls in.
    ///
    /// Takes a parsed `GameDate`; stored strings that are not canonical
    /// `YYYY-MM-DD` never match, see [`is_editable_str`](Self::is_editable_str).
    /// A `now` outside the supported years has no game day, so nothing is editable.
    pub fn is_editable<Tz: TimeZone>(&self, target: GameDate, now: &DateTime<Tz>) -> bool {
        self.to_game_date(now).is_ok_and(|today| today == target)
    }

    /// String form of [`is_editable`](Self::is_editable): a malformed date is
    /// simply not editable.
    pub fn is_editable_str<Tz: TimeZone>(&self, target: &str, now: &DateTime<Tz>) -> bool {
        target
            .parse::<GameDate>()
            .is_ok_and(|date| self.is_editable(date, now))
    }

    pub fn today(&self, clock: &dyn Clock) -> CalendarResult<GameDate> {
        self.to_game_date(&clock.now())
    }

    pub fn is_editable_now(&self, target: GameDate, clock: &dyn Clock) -> bool {
        self.is_editable(target, &clock.now())
    }

    // --- Weekly ---

    /// First game day of the week containing `instant`.
    ///
    /// The weekly reset hour shifts early-morning instants back a day on its
    /// own, independent of the daily reset hour.
    pub fn week_start<Tz: TimeZone>(&self, instant: &DateTime<Tz>) -> CalendarResult<GameDate> {
        let day = shifted_date(self.local_time(instant)?, self.weekly_reset_hour)?;
        self.week_start_of_day(day)
    }

    /// Week key of the game week containing `instant`.
    pub fn to_week_key<Tz: TimeZone>(&self, instant: &DateTime<Tz>) -> CalendarResult<WeekKey> {
        Ok(WeekKey::for_week_start(self.week_start(instant)?))
    }

    pub fn week_range<Tz: TimeZone>(&self, instant: &DateTime<Tz>) -> CalendarResult<WeekRange> {
        WeekRange::starting(self.week_start(instant)?)
    }

    pub fn current_week(&self, clock: &dyn Clock) -> CalendarResult<WeekRange> {
        self.week_range(&clock.now())
    }

    /// Week of a stored game date, treating the date as already past the
    /// weekly reset hour.
    pub fn week_range_of(&self, date: GameDate) -> CalendarResult<WeekRange> {
        WeekRange::starting(self.week_start_of_day(date)?)
    }

    pub fn week_key_of(&self, date: GameDate) -> CalendarResult<WeekKey> {
        Ok(WeekKey::for_week_start(self.week_start_of_day(date)?))
    }

    pub fn is_same_week(&self, a: GameDate, b: GameDate) -> CalendarResult<bool> {
        Ok(self.week_range_of(a)?.contains(b))
    }

    fn week_start_of_day(&self, day: GameDate) -> CalendarResult<GameDate> {
        let weekday = day.date().weekday().num_days_from_sunday();
        let days_since_reset = (weekday + 7 - self.weekly_reset_weekday) % 7;
        day.add_days(-i64::from(days_since_reset))
    }
}

impl Default for GameCalendar {
    /// KST, daily reset at 05:00, weekly reset Wednesday 05:00.
    fn default() -> Self {
        Self::new(&CalendarConfig::default()).expect("default calendar config is valid")
    }
}

/// Game date of `local`, moved back one day if the hour is before `reset_hour`.
fn shifted_date(local: NaiveDateTime, reset_hour: u32) -> CalendarResult<GameDate> {
    let date = if local.hour() < reset_hour {
        local.date().pred_opt()
    } else {
        Some(local.date())
    };
    date.ok_or_else(|| CalendarError::invalid(format!("no day before {local}")))
        .and_then(GameDate::new)
}
