//! Persisted record types.
//!
//! Every type here serialises to camelCase JSON, which is both the on-disk format and the API
//! representation (except [`Account`], which is exposed through [`AccountView`]).

pub mod account;
pub mod appointment;
pub mod lab_test;
pub mod prescription;
pub mod report;

pub use account::{
    format_display_id, Account, AccountView, BloodGroup, DoctorProfile, NurseProfile,
    PatientProfile, Role, RoleProfile, StaffProfile,
};
pub use appointment::{Appointment, AppointmentStatus};
pub use lab_test::{LabParameter, LabPriority, LabTest, LabTestStatus, ResultFlag};
pub use prescription::{Medication, Prescription, PrescriptionStatus};
pub use report::{
    ExtractedData, ExtractedMetric, Report, ReportStatus, ReportType, StoredFile,
};
