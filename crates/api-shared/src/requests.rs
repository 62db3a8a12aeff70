//! Request bodies and query strings.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

// ============================================================================
// ACCOUNTS
// ============================================================================

/// Role-specific profile fields accepted on signup, admin creation and profile update.
///
/// Which fields are required depends on the role: doctors need `specialization` and
/// `licenseNumber`, nurses need `licenseNumber`. Fields that do not apply to the role are
/// ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFields {
    /// Patient date of birth, `YYYY-MM-DD`
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    /// One of `A+`, `A-`, `B+`, `B-`, `AB+`, `AB-`, `O+`, `O-`
    pub blood_group: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
    pub allergies: Option<Vec<String>>,
    pub specialization: Option<String>,
    pub license_number: Option<String>,
    pub department: Option<String>,
    pub years_of_experience: Option<u32>,
    pub consultation_fee: Option<f64>,
    pub shift: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupReq {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    /// `patient`, `doctor`, `nurse`, `receptionist` (admins are created by admins)
    pub role: String,
    #[serde(flatten)]
    pub profile: ProfileFields,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginReq {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileReq {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    #[serde(flatten)]
    pub profile: ProfileFields,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordReq {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountStatusReq {
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AccountQuery {
    /// Restrict to one role
    pub role: Option<String>,
}

// ============================================================================
// APPOINTMENTS
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentReq {
    /// Required unless the caller is the patient
    pub patient_id: Option<String>,
    pub doctor_id: String,
    /// `YYYY-MM-DD`
    pub appointment_date: String,
    /// `HH:MM`, 24-hour clock
    pub time_slot: String,
    pub duration_minutes: Option<u32>,
    pub reason: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentReq {
    pub appointment_date: Option<String>,
    pub time_slot: Option<String>,
    pub duration_minutes: Option<u32>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AppointmentQuery {
    pub patient_id: Option<String>,
    pub doctor_id: Option<String>,
    pub status: Option<String>,
    /// `YYYY-MM-DD`
    pub date: Option<String>,
}

/// Status transition body shared by appointments, lab tests, prescriptions and reports.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusReq {
    pub status: String,
    pub notes: Option<String>,
}

// ============================================================================
// LAB TESTS
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LabParameterReq {
    pub name: String,
    pub unit: Option<String>,
    /// Numeric ranges are written `low-high`, e.g. `13.5-17.5`
    pub reference_range: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLabTestReq {
    pub patient_id: String,
    pub appointment_id: Option<String>,
    pub test_name: String,
    pub category: Option<String>,
    /// `routine` (default), `urgent` or `stat`
    pub priority: Option<String>,
    #[serde(default)]
    pub parameters: Vec<LabParameterReq>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LabResultReq {
    pub name: String,
    pub value: String,
    pub unit: Option<String>,
    pub reference_range: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordLabResultsReq {
    pub results: Vec<LabResultReq>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LabTestQuery {
    pub patient_id: Option<String>,
    pub status: Option<String>,
}

// ============================================================================
// PRESCRIPTIONS
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MedicationReq {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePrescriptionReq {
    pub patient_id: String,
    /// Required when an admin issues on behalf of a doctor
    pub doctor_id: Option<String>,
    pub appointment_id: Option<String>,
    pub medications: Vec<MedicationReq>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
    /// `YYYY-MM-DD`
    pub valid_until: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PrescriptionQuery {
    pub patient_id: Option<String>,
    pub doctor_id: Option<String>,
    pub status: Option<String>,
}

// ============================================================================
// REPORTS
// ============================================================================

/// Non-file fields of a report upload (sent as multipart text parts).
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadReportMeta {
    /// Defaults to the caller when the caller is a patient
    pub patient_id: Option<String>,
    pub title: String,
    /// `lab-report`, `radiology`, `prescription`, `discharge-summary` or `other` (default)
    pub report_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ReportQuery {
    pub patient_id: Option<String>,
    pub status: Option<String>,
}
