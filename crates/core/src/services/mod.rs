//! Domain services.
//!
//! Each service validates its input, enforces the caller's access rights and performs one
//! persistence operation against the [`Database`](crate::store::Database). Services are
//! synchronous; the REST layer moves slow work (report extraction) onto the blocking pool.
//!
//! **No transport concerns**: HTTP status codes, headers and sockets belong in `api-rest`.

pub mod accounts;
pub mod admin;
pub mod appointments;
pub mod lab_tests;
pub mod prescriptions;
pub mod reports;

pub use accounts::AccountService;
pub use admin::{AdminService, HospitalStats};
pub use appointments::AppointmentService;
pub use lab_tests::LabTestService;
pub use prescriptions::PrescriptionService;
pub use reports::{ReportService, UploadedFile};

use crate::models::{Account, Role};
use crate::store::Database;
use crate::validation;
use crate::{HospitalError, HospitalResult, RecordId};

/// Rejects callers whose role is not in `allowed`.
fn require_role(actor: &Account, allowed: &[Role], action: &str) -> HospitalResult<()> {
    if allowed.contains(&actor.role()) {
        Ok(())
    } else {
        tracing::debug!(account = %actor.id, role = %actor.role(), action, "role not permitted");
        Err(HospitalError::forbidden(format!(
            "Your role is not permitted to {action}"
        )))
    }
}

/// Resolves `field` to an existing account with the given role.
///
/// Unknown ids and ids of accounts with another role are both reported as missing.
fn existing_account(
    db: &Database,
    field: &str,
    value: &str,
    role: Role,
) -> HospitalResult<Account> {
    let id = validation::record_id(field, value)?;
    db.accounts
        .get(&id)
        .filter(|a| a.role() == role)
        .ok_or(match role {
            Role::Patient => HospitalError::NotFound("Patient"),
            Role::Doctor => HospitalError::NotFound("Doctor"),
            _ => HospitalError::NotFound("Account"),
        })
}

/// Parses an optional id filter from a query string.
fn optional_id(field: &str, value: Option<&str>) -> HospitalResult<Option<RecordId>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => validation::record_id(field, v).map(Some),
    }
}

/// Whether `doctor` has an appointment, in any state, with `patient`.
///
/// Doctors see lab tests and reports only for patients they are booked with.
fn treats(db: &Database, doctor: &RecordId, patient: &RecordId) -> bool {
    db.appointments
        .find_one(|a| a.involves(doctor) && a.involves(patient))
        .is_some()
}
