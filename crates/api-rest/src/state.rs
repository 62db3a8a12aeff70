use hms_core::auth::TokenService;
use hms_core::config::CoreConfig;
use hms_core::extraction::ReportExtractor;
use hms_core::notifications::Notifier;
use hms_core::presence::PresenceRegistry;
use hms_core::services::{
    AccountService, AdminService, AppointmentService, LabTestService, PrescriptionService,
    ReportService,
};
use hms_core::store::Database;
use hms_core::HospitalResult;
use hms_files::ObjectStorage;
use std::sync::Arc;

/// Application state shared across REST and WebSocket handlers.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<CoreConfig>,
    pub tokens: TokenService,
    pub accounts: AccountService,
    pub admin: AdminService,
    pub appointments: AppointmentService,
    pub lab_tests: LabTestService,
    pub prescriptions: PrescriptionService,
    pub reports: ReportService,
    pub presence: Arc<PresenceRegistry>,
    pub notifier: Notifier,
}

impl AppState {
    /// Opens the document store under the configured data directory and wires every service.
    pub fn new(
        cfg: Arc<CoreConfig>,
        tokens: TokenService,
        storage: Arc<dyn ObjectStorage>,
        extractor: Option<Arc<dyn ReportExtractor>>,
    ) -> HospitalResult<Self> {
        let db = Arc::new(Database::open(&cfg)?);
        let presence = Arc::new(PresenceRegistry::new());

        Ok(Self {
            tokens,
            accounts: AccountService::new(db.clone(), cfg.clone()),
            admin: AdminService::new(db.clone(), presence.clone()),
            appointments: AppointmentService::new(db.clone()),
            lab_tests: LabTestService::new(db.clone()),
            prescriptions: PrescriptionService::new(db.clone()),
            reports: ReportService::new(db.clone(), storage, extractor),
            notifier: Notifier::new(db, presence.clone()),
            presence,
            cfg,
        })
    }
}
