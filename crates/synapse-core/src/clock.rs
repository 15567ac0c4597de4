//! Maps timestamps onto hourly and weekday slots

use chrono::{DateTime, Datelike, FixedOffset, Local, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};

const MAX_OFFSET_MINUTES: i32 = 24 * 60;

/// Which wall clock hour/weekday slots are computed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SlotClock {
    /// The host's local timezone
    #[default]
    Local,
    /// A fixed offset from UTC, in minutes east
    FixedOffset { minutes: i32 },
}

impl SlotClock {
    pub fn utc() -> Self {
        SlotClock::FixedOffset { minutes: 0 }
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        match self {
            SlotClock::Local => Ok(()),
            SlotClock::FixedOffset { minutes } if minutes.abs() < MAX_OFFSET_MINUTES => Ok(()),
            SlotClock::FixedOffset { minutes } => {
                Err(format!("clock offset {minutes} minutes is out of range"))
            }
        }
    }

    /// Hour of day (0-23) and weekday (Monday = 0 .. Sunday = 6)
    pub fn slots(&self, ts: &DateTime<Utc>) -> (u32, u32) {
        match self {
            SlotClock::Local => {
                let local = ts.with_timezone(&Local);
                (local.hour(), local.weekday().num_days_from_monday())
            }
            SlotClock::FixedOffset { minutes } => {
                let offset = FixedOffset::east_opt(minutes * 60).unwrap_or_else(|| Utc.fix());
                let shifted = ts.with_timezone(&offset);
                (shifted.hour(), shifted.weekday().num_days_from_monday())
            }
        }
    }

    pub fn hour_slot(&self, ts: &DateTime<Utc>) -> String {
        self.slots(ts).0.to_string()
    }

    pub fn weekday_slot(&self, ts: &DateTime<Utc>) -> String {
        self.slots(ts).1.to_string()
    }
}
