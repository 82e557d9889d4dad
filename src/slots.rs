//! Slot policy: the fixed catalog of bookable consultation slots.
//!
//! A doctor's day is split into a morning block (09:00–12:00) and an afternoon
//! block (14:00–17:00) with a break at 13:00. Availability is always the
//! catalog minus whatever is currently occupied, in catalog order.

use crate::models::UnknownVariant;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::macros::time;
use time::{Date, OffsetDateTime, Time};

/// One bookable consultation window, named by its start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimeSlot {
    #[serde(rename = "09:00")]
    NineAm,
    #[serde(rename = "10:00")]
    TenAm,
    #[serde(rename = "11:00")]
    ElevenAm,
    #[serde(rename = "12:00")]
    Noon,
    #[serde(rename = "14:00")]
    TwoPm,
    #[serde(rename = "15:00")]
    ThreePm,
    #[serde(rename = "16:00")]
    FourPm,
    #[serde(rename = "17:00")]
    FivePm,
}

/// Every slot the clinic offers, in the order they occur during the day.
pub const SLOT_CATALOG: [TimeSlot; 8] = [
    TimeSlot::NineAm,
    TimeSlot::TenAm,
    TimeSlot::ElevenAm,
    TimeSlot::Noon,
    TimeSlot::TwoPm,
    TimeSlot::ThreePm,
    TimeSlot::FourPm,
    TimeSlot::FivePm,
];

impl TimeSlot {
    /// The label used on the wire and in storage, e.g. `"10:00"`.
    pub fn as_str(self) -> &'static str {
        match self {
            TimeSlot::NineAm => "09:00",
            TimeSlot::TenAm => "10:00",
            TimeSlot::ElevenAm => "11:00",
            TimeSlot::Noon => "12:00",
            TimeSlot::TwoPm => "14:00",
            TimeSlot::ThreePm => "15:00",
            TimeSlot::FourPm => "16:00",
            TimeSlot::FivePm => "17:00",
        }
    }

    /// Time of day at which the consultation starts.
    pub fn start_time(self) -> Time {
        match self {
            TimeSlot::NineAm => time!(9:00),
            TimeSlot::TenAm => time!(10:00),
            TimeSlot::ElevenAm => time!(11:00),
            TimeSlot::Noon => time!(12:00),
            TimeSlot::TwoPm => time!(14:00),
            TimeSlot::ThreePm => time!(15:00),
            TimeSlot::FourPm => time!(16:00),
            TimeSlot::FivePm => time!(17:00),
        }
    }

    /// The UTC instant at which this slot starts on `day`.
    pub fn starts_on(self, day: Date) -> OffsetDateTime {
        day.with_time(self.start_time()).assume_utc()
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeSlot {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SLOT_CATALOG
            .iter()
            .copied()
            .find(|slot| slot.as_str() == s.trim())
            .ok_or_else(|| UnknownVariant::new("time slot", s))
    }
}

/// Catalog minus `booked`, preserving catalog order.
pub fn available_slots(booked: &[TimeSlot]) -> Vec<TimeSlot> {
    SLOT_CATALOG
        .iter()
        .copied()
        .filter(|slot| !booked.contains(slot))
        .collect()
}
