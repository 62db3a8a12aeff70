use crate::constants::LAB_TESTS_COLLECTION;
use crate::store::Document;
use crate::{NonEmptyText, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Lab workflow stage. Stages only move forward; `cancelled` is reachable from any
/// non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum LabTestStatus {
    Ordered,
    SampleCollected,
    InProgress,
    Completed,
    Cancelled,
}

impl LabTestStatus {
    pub const ALL: [LabTestStatus; 5] = [
        LabTestStatus::Ordered,
        LabTestStatus::SampleCollected,
        LabTestStatus::InProgress,
        LabTestStatus::Completed,
        LabTestStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LabTestStatus::Ordered => "ordered",
            LabTestStatus::SampleCollected => "sample-collected",
            LabTestStatus::InProgress => "in-progress",
            LabTestStatus::Completed => "completed",
            LabTestStatus::Cancelled => "cancelled",
        }
    }

    fn stage(self) -> u8 {
        match self {
            LabTestStatus::Ordered => 0,
            LabTestStatus::SampleCollected => 1,
            LabTestStatus::InProgress => 2,
            LabTestStatus::Completed => 3,
            LabTestStatus::Cancelled => 4,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LabTestStatus::Completed | LabTestStatus::Cancelled)
    }

    pub fn can_transition_to(self, next: LabTestStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == LabTestStatus::Cancelled || next.stage() > self.stage()
    }
}

impl fmt::Display for LabTestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LabTestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown lab test status: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LabPriority {
    #[default]
    Routine,
    Urgent,
    Stat,
}

impl FromStr for LabPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "routine" => Ok(LabPriority::Routine),
            "urgent" => Ok(LabPriority::Urgent),
            "stat" => Ok(LabPriority::Stat),
            _ => Err(format!("unknown priority: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResultFlag {
    Normal,
    Low,
    High,
}

impl ResultFlag {
    /// Flags a numeric value against a `low-high` reference range.
    ///
    /// Returns `None` when either side is not numeric, so qualitative results
    /// ("negative", "< 0.5") stay unflagged.
    pub fn evaluate(value: &str, reference_range: &str) -> Option<ResultFlag> {
        let value: f64 = value.trim().parse().ok()?;
        let (low, high) = reference_range.trim().split_once('-')?;
        let low: f64 = low.trim().parse().ok()?;
        let high: f64 = high.trim().parse().ok()?;
        if low > high {
            return None;
        }

        Some(if value < low {
            ResultFlag::Low
        } else if value > high {
            ResultFlag::High
        } else {
            ResultFlag::Normal
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LabParameter {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag: Option<ResultFlag>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LabTest {
    #[schema(value_type = String)]
    pub id: RecordId,
    #[schema(value_type = String)]
    pub patient_id: RecordId,
    #[schema(value_type = String)]
    pub ordered_by: RecordId,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub appointment_id: Option<RecordId>,
    #[schema(value_type = String)]
    pub test_name: NonEmptyText,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub priority: LabPriority,
    #[serde(default)]
    pub parameters: Vec<LabParameter>,
    pub status: LabTestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub ordered_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_collected_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl LabTest {
    /// Moves to `next` and stamps the stage timestamp.
    pub fn advance(&mut self, next: LabTestStatus, at: DateTime<Utc>) {
        match next {
            LabTestStatus::SampleCollected => self.sample_collected_at = Some(at),
            LabTestStatus::Completed => self.completed_at = Some(at),
            LabTestStatus::Cancelled => self.cancelled_at = Some(at),
            LabTestStatus::Ordered | LabTestStatus::InProgress => {}
        }
        self.status = next;
        self.updated_at = at;
    }
}

impl Document for LabTest {
    const COLLECTION: &'static str = LAB_TESTS_COLLECTION;
    const KIND: &'static str = "Lab test";

    fn id(&self) -> &RecordId {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_move_forward_only() {
        use LabTestStatus::*;
        assert!(Ordered.can_transition_to(SampleCollected));
        assert!(Ordered.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Cancelled));
        assert!(!InProgress.can_transition_to(SampleCollected));
        assert!(!SampleCollected.can_transition_to(SampleCollected));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Ordered));
    }

    #[test]
    fn flags_numeric_results() {
        assert_eq!(ResultFlag::evaluate("14.2", "13.5-17.5"), Some(ResultFlag::Normal));
        assert_eq!(ResultFlag::evaluate("12", "13.5 - 17.5"), Some(ResultFlag::Low));
        assert_eq!(ResultFlag::evaluate("18", "13.5-17.5"), Some(ResultFlag::High));
        assert_eq!(ResultFlag::evaluate("negative", "13.5-17.5"), None);
        assert_eq!(ResultFlag::evaluate("5", "< 10"), None);
    }
}
