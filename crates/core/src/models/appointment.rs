use crate::constants::APPOINTMENTS_COLLECTION;
use crate::store::Document;
use crate::{NonEmptyText, RecordId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 4] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::NoShow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no-show",
        }
    }

    /// Only a scheduled appointment can move, and only to a terminal state.
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        self == AppointmentStatus::Scheduled && next != AppointmentStatus::Scheduled
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown appointment status: {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[schema(value_type = String)]
    pub id: RecordId,
    #[schema(value_type = String)]
    pub patient_id: RecordId,
    #[schema(value_type = String)]
    pub doctor_id: RecordId,
    pub appointment_date: NaiveDate,
    /// `HH:MM`
    pub time_slot: String,
    pub duration_minutes: u32,
    pub status: AppointmentStatus,
    #[schema(value_type = String)]
    pub reason: NonEmptyText,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[schema(value_type = String)]
    pub created_by: RecordId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn involves(&self, account_id: &RecordId) -> bool {
        &self.patient_id == account_id || &self.doctor_id == account_id
    }

    /// True when another scheduled appointment already holds this doctor's slot.
    pub fn clashes_with(&self, other: &Appointment) -> bool {
        self.id != other.id
            && other.status == AppointmentStatus::Scheduled
            && self.doctor_id == other.doctor_id
            && self.appointment_date == other.appointment_date
            && self.time_slot == other.time_slot
    }
}

impl Document for Appointment {
    const COLLECTION: &'static str = APPOINTMENTS_COLLECTION;
    const KIND: &'static str = "Appointment";

    fn id(&self) -> &RecordId {
        &self.id
    }
}
