//! Administrator dashboard figures.

use crate::models::{AppointmentStatus, LabTestStatus, PrescriptionStatus, ReportStatus, Role};
use crate::presence::{OnlineAccount, PresenceRegistry};
use crate::store::Database;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HospitalStats {
    pub accounts_total: usize,
    pub accounts_active: usize,
    /// Keyed by role name
    pub accounts_by_role: BTreeMap<String, usize>,
    pub appointments_total: usize,
    pub appointments_today: usize,
    /// Keyed by status name
    pub appointments_by_status: BTreeMap<String, usize>,
    pub lab_tests_pending: usize,
    pub lab_tests_completed: usize,
    pub prescriptions_active: usize,
    pub reports_total: usize,
    pub reports_by_status: BTreeMap<String, usize>,
    pub reports_extraction_failed: usize,
    pub online_now: usize,
}

#[derive(Clone)]
pub struct AdminService {
    db: Arc<Database>,
    presence: Arc<PresenceRegistry>,
}

impl AdminService {
    pub fn new(db: Arc<Database>, presence: Arc<PresenceRegistry>) -> Self {
        Self { db, presence }
    }

    pub fn stats(&self) -> HospitalStats {
        let today = Utc::now().date_naive();
        let accounts_by_role = Role::ALL
            .into_iter()
            .map(|r| (r.to_string(), self.db.accounts.count(|a| a.role() == r)))
            .collect();
        let appointments_by_status = AppointmentStatus::ALL
            .into_iter()
            .map(|s| (s.to_string(), self.db.appointments.count(|a| a.status == s)))
            .collect();
        let reports_by_status = ReportStatus::ALL
            .into_iter()
            .map(|s| (s.to_string(), self.db.reports.count(|r| r.status == s)))
            .collect();

        HospitalStats {
            accounts_total: self.db.accounts.len(),
            accounts_active: self.db.accounts.count(|a| a.is_active),
            accounts_by_role,
            appointments_total: self.db.appointments.len(),
            appointments_today: self.db.appointments.count(|a| a.appointment_date == today),
            appointments_by_status,
            lab_tests_pending: self.db.lab_tests.count(|t| !t.status.is_terminal()),
            lab_tests_completed: self
                .db
                .lab_tests
                .count(|t| t.status == LabTestStatus::Completed),
            prescriptions_active: self
                .db
                .prescriptions
                .count(|p| p.status == PrescriptionStatus::Active),
            reports_total: self.db.reports.len(),
            reports_by_status,
            reports_extraction_failed: self.db.reports.count(|r| r.extraction_error.is_some()),
            online_now: self.presence.len(),
        }
    }

    pub fn online(&self) -> Vec<OnlineAccount> {
        self.presence.online()
    }
}
