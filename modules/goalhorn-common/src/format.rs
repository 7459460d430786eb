//! Pure formatting helpers shared by post-building handlers.
//!
//! Free functions, no state. Handlers compose these into post text; none of
//! them touch the network or the store.

use chrono::{DateTime, FixedOffset, Utc};

use crate::types::{PeriodDescriptor, PeriodType};

/// Long-form period name: "the 1st period", "overtime", "the shootout".
pub fn period_name(period: &PeriodDescriptor) -> String {
    match period.period_type {
        PeriodType::Regulation => format!("the {} period", ordinal(period.number)),
        PeriodType::Overtime => {
            if period.number <= 4 {
                "overtime".to_string()
            } else {
                // Playoff multi-OT: period 5 is 2OT, 6 is 3OT...
                format!("{}OT", period.number - 3)
            }
        }
        PeriodType::Shootout => "the shootout".to_string(),
    }
}

/// Short period label for scorelines: "1st", "OT", "SO".
pub fn period_label(period: &PeriodDescriptor) -> String {
    match period.period_type {
        PeriodType::Regulation => ordinal(period.number),
        PeriodType::Overtime => {
            if period.number <= 4 {
                "OT".to_string()
            } else {
                format!("{}OT", period.number - 3)
            }
        }
        PeriodType::Shootout => "SO".to_string(),
    }
}

pub fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (1, 11) | (2, 12) | (3, 13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

/// "MM:SS" from a seconds count. Used for time-on-ice lines.
pub fn mmss(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Puck-drop time in the team's local zone, e.g. "7:08 PM".
pub fn local_start_time(start: DateTime<Utc>, offset: FixedOffset) -> String {
    start
        .with_timezone(&offset)
        .format("%-I:%M %p")
        .to_string()
}

/// Label for a player we couldn't resolve from the roster. The post still
/// goes out; attribution fills in on a later correction if needed.
pub const UNKNOWN_PLAYER: &str = "unknown player";

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ordinals() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(2), "2nd");
        assert_eq!(ordinal(3), "3rd");
        assert_eq!(ordinal(4), "4th");
        assert_eq!(ordinal(11), "11th");
        assert_eq!(ordinal(12), "12th");
        assert_eq!(ordinal(13), "13th");
        assert_eq!(ordinal(21), "21st");
    }

    #[test]
    fn period_names() {
        let reg = PeriodDescriptor {
            number: 2,
            period_type: PeriodType::Regulation,
        };
        assert_eq!(period_name(&reg), "the 2nd period");
        assert_eq!(period_label(&reg), "2nd");

        let ot = PeriodDescriptor {
            number: 4,
            period_type: PeriodType::Overtime,
        };
        assert_eq!(period_name(&ot), "overtime");
        assert_eq!(period_label(&ot), "OT");

        let double_ot = PeriodDescriptor {
            number: 5,
            period_type: PeriodType::Overtime,
        };
        assert_eq!(period_label(&double_ot), "2OT");

        let so = PeriodDescriptor {
            number: 5,
            period_type: PeriodType::Shootout,
        };
        assert_eq!(period_label(&so), "SO");
    }

    #[test]
    fn toi_formatting() {
        assert_eq!(mmss(754), "12:34");
        assert_eq!(mmss(59), "0:59");
        assert_eq!(mmss(1200), "20:00");
    }

    #[test]
    fn local_start_time_applies_offset() {
        let start = Utc.with_ymd_and_hms(2026, 1, 15, 0, 8, 0).unwrap();
        let eastern: FixedOffset = "-05:00".parse().unwrap();
        assert_eq!(local_start_time(start, eastern), "7:08 PM");
    }
}
