//! Lateness of an unreturned leave. Derived on every read, never stored.

use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lateness {
    pub days_late: i64,
}

/// Compares `now` against the due date on the local wall clock.
///
/// Late iff `now` is strictly after `due`. `days_late` counts whole days, so
/// a santri a few hours late is late by 0 days.
pub fn lateness<Tz1: TimeZone, Tz2: TimeZone>(
    now: &DateTime<Tz1>,
    due: &DateTime<Tz2>,
) -> Option<Lateness> {
    let now = now.with_timezone(&Local);
    let due = due.with_timezone(&Local);

    if now <= due {
        return None;
    }

    Some(Lateness {
        days_late: (now - due).num_days().max(0),
    })
}

pub fn days_late<Tz1: TimeZone, Tz2: TimeZone>(now: &DateTime<Tz1>, due: &DateTime<Tz2>) -> i64 {
    lateness(now, due).map_or(0, |l| l.days_late)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn three_days_past_due_is_three_days_late() {
        let now = Utc::now();
        let due = now - Duration::days(3);
        assert_eq!(lateness(&now, &due), Some(Lateness { days_late: 3 }));
    }

    #[test]
    fn due_tomorrow_is_not_late() {
        let now = Utc::now();
        assert_eq!(lateness(&now, &(now + Duration::days(1))), None);
        assert_eq!(days_late(&now, &(now + Duration::days(1))), 0);
    }

    #[test]
    fn exactly_due_is_not_late() {
        let now = Utc::now();
        assert_eq!(lateness(&now, &now), None);
    }

    #[test]
    fn partial_days_round_down() {
        let now = Utc::now();
        let due = now - Duration::hours(47);
        assert_eq!(days_late(&now, &due), 1);

        let due = now - Duration::hours(5);
        assert_eq!(lateness(&now, &due), Some(Lateness { days_late: 0 }));
    }

    #[test]
    fn mixed_timezones_compare_the_same_instant() {
        let now = Utc::now();
        let due = (now - Duration::days(2)).with_timezone(&Local);
        assert_eq!(days_late(&now, &due), 2);
    }
}
