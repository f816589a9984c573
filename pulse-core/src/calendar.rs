use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Timelike, Weekday};
use chrono_tz::Asia::Shanghai;
use chrono_tz::Tz;

/// Gates scheduler cadence and trading-hours-dependent staleness checks.
///
/// The default implementation ([`ShanghaiShenzhenCalendar`]) treats every
/// weekday as a trading day; it does not model exchange holidays (see
/// `DESIGN.md` for why that's left open).
pub trait TradingCalendar: Send + Sync {
    /// Whether `at` (any timezone) falls within a continuous trading
    /// session: 09:30-11:30 or 13:00-15:00 Shanghai time on a trading day.
    fn is_trading_minute(&self, at: DateTime<chrono::Utc>) -> bool;

    /// Whether `at`'s calendar date is a trading day (weekday, not a
    /// holiday).
    fn is_trading_day(&self, at: DateTime<chrono::Utc>) -> bool;

    /// The nearest trading day at or before `at`'s calendar date.
    fn nearest_prior_trading_day(&self, at: DateTime<chrono::Utc>) -> DateTime<chrono::Utc>;

    /// When `at` falls in a pre-open or lunch-break gap on a trading day,
    /// how long until the next session opens. `None` means the scheduler
    /// should fall back to its ordinary trading/non-trading cadence.
    fn time_until_next_open(&self, at: DateTime<chrono::Utc>) -> Option<Duration> {
        let _ = at;
        None
    }
}

/// Weekday-only trading calendar for the Shanghai/Shenzhen exchanges.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShanghaiShenzhenCalendar;

impl ShanghaiShenzhenCalendar {
    fn local(at: DateTime<chrono::Utc>) -> DateTime<Tz> {
        at.with_timezone(&Shanghai)
    }

    #[allow(clippy::unwrap_used)]
    fn pre_open() -> NaiveTime {
        NaiveTime::from_hms_opt(9, 10, 0).unwrap()
    }

    #[allow(clippy::unwrap_used)]
    fn morning_open() -> NaiveTime {
        NaiveTime::from_hms_opt(9, 30, 0).unwrap()
    }

    #[allow(clippy::unwrap_used)]
    fn morning_close() -> NaiveTime {
        NaiveTime::from_hms_opt(11, 30, 0).unwrap()
    }

    #[allow(clippy::unwrap_used)]
    fn afternoon_open() -> NaiveTime {
        NaiveTime::from_hms_opt(13, 0, 0).unwrap()
    }

    #[allow(clippy::unwrap_used)]
    fn afternoon_close() -> NaiveTime {
        NaiveTime::from_hms_opt(15, 0, 0).unwrap()
    }
}

impl TradingCalendar for ShanghaiShenzhenCalendar {
    fn is_trading_day(&self, at: DateTime<chrono::Utc>) -> bool {
        !matches!(Self::local(at).weekday(), Weekday::Sat | Weekday::Sun)
    }

    fn is_trading_minute(&self, at: DateTime<chrono::Utc>) -> bool {
        if !self.is_trading_day(at) {
            return false;
        }
        let local = Self::local(at);
        let Some(time) = NaiveTime::from_hms_opt(local.hour(), local.minute(), local.second())
        else {
            return false;
        };
        (Self::morning_open()..=Self::morning_close()).contains(&time)
            || (Self::afternoon_open()..=Self::afternoon_close()).contains(&time)
    }

    fn nearest_prior_trading_day(&self, at: DateTime<chrono::Utc>) -> DateTime<chrono::Utc> {
        let mut candidate = at;
        while !self.is_trading_day(candidate) {
            candidate -= chrono::Duration::days(1);
        }
        candidate
    }

    fn time_until_next_open(&self, at: DateTime<chrono::Utc>) -> Option<Duration> {
        if !self.is_trading_day(at) {
            return None;
        }
        let local = Self::local(at);
        let time = NaiveTime::from_hms_opt(local.hour(), local.minute(), local.second())?;
        let target = if time < Self::pre_open() {
            Self::pre_open()
        } else if time >= Self::morning_close() && time < Self::afternoon_open() {
            Self::afternoon_open()
        } else {
            return None;
        };
        let target_local = local.date_naive().and_time(target);
        let target_utc = Shanghai.from_local_datetime(&target_local).single()?.with_timezone(&chrono::Utc);
        (target_utc - at).to_std().ok()
    }
}
