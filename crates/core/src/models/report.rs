use crate::constants::REPORTS_COLLECTION;
use crate::store::Document;
use crate::{NonEmptyText, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ReportType {
    LabReport,
    Radiology,
    Prescription,
    DischargeSummary,
    #[default]
    Other,
}

impl FromStr for ReportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lab-report" => Ok(ReportType::LabReport),
            "radiology" => Ok(ReportType::Radiology),
            "prescription" => Ok(ReportType::Prescription),
            "discharge-summary" => Ok(ReportType::DischargeSummary),
            "other" => Ok(ReportType::Other),
            _ => Err(format!("unknown report type: {s}")),
        }
    }
}

/// Processing state. `unprocessed` may go to `processed` (by extraction) or straight to
/// `reviewed`; `processed` may go to `reviewed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Unprocessed,
    Processed,
    Reviewed,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 3] = [
        ReportStatus::Unprocessed,
        ReportStatus::Processed,
        ReportStatus::Reviewed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Unprocessed => "unprocessed",
            ReportStatus::Processed => "processed",
            ReportStatus::Reviewed => "reviewed",
        }
    }

    pub fn can_transition_to(self, next: ReportStatus) -> bool {
        matches!(
            (self, next),
            (ReportStatus::Unprocessed, ReportStatus::Processed)
                | (ReportStatus::Unprocessed, ReportStatus::Reviewed)
                | (ReportStatus::Processed, ReportStatus::Reviewed)
        )
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown report status: {s}"))
    }
}

/// Where the uploaded bytes live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub url: String,
    pub storage_id: String,
    pub original_filename: String,
    pub content_type: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedMetric {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_range: Option<String>,
}

/// Fields pulled out of a report by the extraction service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub metrics: Vec<ExtractedMetric>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[schema(value_type = String)]
    pub id: RecordId,
    #[schema(value_type = String)]
    pub patient_id: RecordId,
    #[schema(value_type = String)]
    pub uploaded_by: RecordId,
    #[schema(value_type = String)]
    pub title: NonEmptyText,
    pub report_type: ReportType,
    pub file: StoredFile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted: Option<ExtractedData>,
    pub ai_processed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_error: Option<String>,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub reviewed_by: Option<RecordId>,
}

impl Report {
    /// Records the outcome of an extraction attempt.
    pub fn apply_extraction(&mut self, outcome: Result<ExtractedData, String>) {
        match outcome {
            Ok(data) => {
                self.extracted = Some(data);
                self.ai_processed = true;
                self.extraction_error = None;
                if self.status == ReportStatus::Unprocessed {
                    self.status = ReportStatus::Processed;
                }
            }
            Err(message) => {
                self.ai_processed = false;
                self.extraction_error = Some(message);
            }
        }
    }
}

impl Document for Report {
    const COLLECTION: &'static str = REPORTS_COLLECTION;
    const KIND: &'static str = "Report";

    fn id(&self) -> &RecordId {
        &self.id
    }
}
