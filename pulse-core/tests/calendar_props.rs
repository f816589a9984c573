//! Property tests for the trading calendar's weekday gating.

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use chrono_tz::Asia::Shanghai;
use proptest::prelude::*;
use pulse_core::{ShanghaiShenzhenCalendar, TradingCalendar};

fn arb_utc() -> impl Strategy<Value = DateTime<Utc>> {
    // Spans a little over ten years of epoch seconds, comfortably past any
    // leap-second or timezone-transition edge case chrono_tz would reject.
    (1_600_000_000i64..1_920_000_000i64).prop_map(|secs| Utc.timestamp_opt(secs, 0).single().unwrap())
}

proptest! {
    /// A trading minute only ever falls on a trading day.
    #[test]
    fn trading_minute_implies_trading_day(at in arb_utc()) {
        let cal = ShanghaiShenzhenCalendar;
        if cal.is_trading_minute(at) {
            prop_assert!(cal.is_trading_day(at));
        }
    }

    /// `is_trading_day` depends only on the Shanghai-local calendar date,
    /// not on the time of day within it.
    #[test]
    fn trading_day_is_stable_across_the_same_local_day(at in arb_utc(), minute_offset in 0i64..1440) {
        let cal = ShanghaiShenzhenCalendar;
        let local_midnight = at.with_timezone(&Shanghai).date_naive().and_hms_opt(0, 0, 0).unwrap();
        let start_of_day = Shanghai.from_local_datetime(&local_midnight).single().unwrap().with_timezone(&Utc);
        let other_minute = start_of_day + ChronoDuration::minutes(minute_offset);
        prop_assert_eq!(cal.is_trading_day(start_of_day), cal.is_trading_day(other_minute));
    }
}
