use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveTime, TimeDelta, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AgendaError;

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(EstablishmentId);
entity_id!(ServiceId);
entity_id!(ProfessionalId);
entity_id!(ClientId);
entity_id!(AppointmentId);
entity_id!(WindowId);
entity_id!(ShiftId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Active,
    Completed,
    Canceled,
}

/// Set of weekdays stored as a bitmask, bit 0 = Sunday through bit 6 = Saturday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    /// Build from day numbers where 0 is Sunday and 6 is Saturday.
    pub fn from_numbers(days: &[u8]) -> Result<Self, AgendaError> {
        let mut mask = 0u8;
        for &day in days {
            if day > 6 {
                return Err(AgendaError::InvalidInput(format!(
                    "Weekday {day} is out of range 0..6"
                )));
            }
            mask |= 1 << day;
        }
        Ok(Self(mask))
    }

    pub fn contains(&self, weekday: Weekday) -> bool {
        self.0 & (1 << weekday.num_days_from_sunday()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone)]
pub struct Establishment {
    pub id: EstablishmentId,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Service {
    pub id: ServiceId,
    pub establishment_id: EstablishmentId,
    pub name: String,
    /// Stored as a time-of-day value, e.g. `01:30` for ninety minutes.
    pub duration: NaiveTime,
    pub status: RecordStatus,
}

impl Service {
    pub fn duration_minutes(&self) -> u32 {
        self.duration.hour() * 60 + self.duration.minute()
    }

    pub fn is_active(&self) -> bool {
        self.status == RecordStatus::Active
    }
}

#[derive(Debug, Clone)]
pub struct Professional {
    pub id: ProfessionalId,
    pub establishment_id: EstablishmentId,
    pub name: String,
    pub service_ids: BTreeSet<ServiceId>,
    pub status: RecordStatus,
}

impl Professional {
    pub fn offers(&self, service_id: &ServiceId) -> bool {
        self.service_ids.contains(service_id)
    }

    pub fn is_active(&self) -> bool {
        self.status == RecordStatus::Active
    }
}

/// Recurring open interval. Without a professional it applies to the whole
/// establishment.
#[derive(Debug, Clone)]
pub struct WorkingWindow {
    pub id: WindowId,
    pub establishment_id: EstablishmentId,
    pub professional_id: Option<ProfessionalId>,
    pub weekdays: WeekdaySet,
    pub start: NaiveTime,
    pub end: NaiveTime,
    /// Empty means the window is open to every service.
    pub service_ids: BTreeSet<ServiceId>,
    pub status: RecordStatus,
}

impl WorkingWindow {
    pub fn validate(&self) -> Result<(), AgendaError> {
        if self.start >= self.end {
            return Err(AgendaError::InvalidRange(format!(
                "Working window {} starts at {} but ends at {}",
                self.id, self.start, self.end
            )));
        }
        Ok(())
    }

    pub fn allows_service(&self, service_id: &ServiceId) -> bool {
        self.service_ids.is_empty() || self.service_ids.contains(service_id)
    }

    pub fn is_active(&self) -> bool {
        self.status == RecordStatus::Active
    }
}

/// Named business-hours template ("turno").
#[derive(Debug, Clone)]
pub struct Shift {
    pub id: ShiftId,
    pub establishment_id: EstablishmentId,
    pub name: String,
    pub weekdays: WeekdaySet,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub status: RecordStatus,
}

impl Shift {
    pub fn validate(&self) -> Result<(), AgendaError> {
        if self.start >= self.end {
            return Err(AgendaError::InvalidRange(format!(
                "Shift '{}' starts at {} but ends at {}",
                self.name, self.start, self.end
            )));
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.status == RecordStatus::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub establishment_id: EstablishmentId,
    pub professional_id: ProfessionalId,
    pub service_id: ServiceId,
    pub client_id: ClientId,
    /// Storage (UTC) instant.
    pub start: DateTime<Utc>,
    pub duration_minutes: u32,
    pub status: AppointmentStatus,
}

impl Appointment {
    pub fn end(&self) -> DateTime<Utc> {
        self.start + TimeDelta::minutes(self.duration_minutes as i64)
    }

    pub fn is_active(&self) -> bool {
        self.status == AppointmentStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekday_set_uses_sunday_as_zero() {
        let set = WeekdaySet::from_numbers(&[0, 6]).unwrap();
        assert!(set.contains(Weekday::Sun));
        assert!(set.contains(Weekday::Sat));
        assert!(!set.contains(Weekday::Mon));
    }

    #[test]
    fn weekday_set_rejects_out_of_range() {
        assert!(WeekdaySet::from_numbers(&[7]).is_err());
    }

    #[test]
    fn service_duration_from_time_of_day() {
        let service = Service {
            id: ServiceId::new(),
            establishment_id: EstablishmentId::new(),
            name: "Cut".to_string(),
            duration: NaiveTime::from_hms_opt(1, 30, 0).unwrap(),
            status: RecordStatus::Active,
        };
        assert_eq!(service.duration_minutes(), 90);
    }

    #[test]
    fn window_with_inverted_bounds_is_invalid() {
        let window = WorkingWindow {
            id: WindowId::new(),
            establishment_id: EstablishmentId::new(),
            professional_id: None,
            weekdays: WeekdaySet::from_numbers(&[1]).unwrap(),
            start: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            service_ids: BTreeSet::new(),
            status: RecordStatus::Active,
        };
        assert!(matches!(window.validate(), Err(AgendaError::InvalidRange(_))));
    }
}
