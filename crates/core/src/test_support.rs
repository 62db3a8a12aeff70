//! Fixtures shared by the service tests.

use crate::config::CoreConfig;
use crate::constants::MIN_PASSWORD_ITERATIONS;
use crate::models::{Account, Appointment};
use crate::presence::PresenceRegistry;
use crate::services::{
    AccountService, AdminService, AppointmentService, LabTestService, PrescriptionService,
};
use crate::store::Database;
use crate::RecordId;
use api_shared::{CreateAppointmentReq, ProfileFields, SignupReq};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tempfile::TempDir;

pub(crate) struct TestHospital {
    pub _dir: TempDir,
    pub cfg: Arc<CoreConfig>,
    pub db: Arc<Database>,
    pub presence: Arc<PresenceRegistry>,
    pub accounts: AccountService,
    pub appointments: AppointmentService,
    pub lab_tests: LabTestService,
    pub prescriptions: PrescriptionService,
    pub admin_service: AdminService,
}

impl TestHospital {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = Arc::new(
            CoreConfig::new(
                dir.path().to_path_buf(),
                MIN_PASSWORD_ITERATIONS,
                "http://localhost:3000".into(),
            )
            .expect("valid config"),
        );
        let db = Arc::new(Database::open(&cfg).expect("database opens"));
        let presence = Arc::new(PresenceRegistry::new());

        Self {
            accounts: AccountService::new(db.clone(), cfg.clone()),
            appointments: AppointmentService::new(db.clone()),
            lab_tests: LabTestService::new(db.clone()),
            prescriptions: PrescriptionService::new(db.clone()),
            admin_service: AdminService::new(db.clone(), presence.clone()),
            _dir: dir,
            cfg,
            db,
            presence,
        }
    }

    /// Creates an administrator with a unique e-mail.
    pub fn admin(&self) -> Account {
        self.accounts
            .create_account(signup_req("admin", &format!("admin-{}@x.com", RecordId::new())))
            .expect("admin created")
    }

    pub fn account(&self, role: &str, email: &str) -> Account {
        self.accounts
            .create_account(signup_req(role, email))
            .expect("account created")
    }

    /// Books `patient` with `doctor` for tomorrow, as the patient.
    pub fn book(&self, patient: &Account, doctor: &Account) -> Appointment {
        self.appointments
            .create(
                patient,
                CreateAppointmentReq {
                    doctor_id: doctor.id.to_string(),
                    appointment_date: (Utc::now().date_naive() + Duration::days(1)).to_string(),
                    time_slot: "10:00".into(),
                    reason: "Follow-up".into(),
                    ..Default::default()
                },
            )
            .expect("appointment booked")
    }
}

/// Signup body that satisfies every role's required fields. Password is `password123`.
pub(crate) fn signup_req(role: &str, email: &str) -> SignupReq {
    SignupReq {
        email: email.into(),
        password: "password123".into(),
        first_name: "Test".into(),
        last_name: role.into(),
        phone: None,
        role: role.into(),
        profile: ProfileFields {
            specialization: Some("General Medicine".into()),
            license_number: Some("LIC-001".into()),
            ..Default::default()
        },
    }
}
