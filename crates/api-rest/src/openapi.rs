use crate::handlers::{
    admin, appointments, auth, files, health, lab_tests, prescriptions, reports, users,
};
use api_shared::{
    ChangePasswordReq, CreateAppointmentReq, CreateLabTestReq, CreatePrescriptionReq,
    ErrorResponse, HealthRes, LabParameterReq, LabResultReq, LoginReq, MedicationReq,
    ProfileFields, RecordLabResultsReq, SignupReq, UpdateAccountStatusReq, UpdateAppointmentReq,
    UpdateProfileReq, UpdateStatusReq,
};
use hms_core::models::{
    AccountView, Appointment, AppointmentStatus, BloodGroup, DoctorProfile, ExtractedData,
    ExtractedMetric, LabParameter, LabPriority, LabTest, LabTestStatus, Medication,
    NurseProfile, PatientProfile, Prescription, PrescriptionStatus, Report, ReportStatus,
    ReportType, ResultFlag, Role, RoleProfile, StaffProfile, StoredFile,
};
use hms_core::presence::OnlineAccount;
use hms_core::services::HospitalStats;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(title = "Hospital Management API"),
    paths(
        health::health,
        auth::signup,
        auth::login,
        auth::me,
        auth::update_me,
        auth::change_password,
        users::list_patients,
        users::list_doctors,
        users::get_user,
        admin::list_users,
        admin::create_user,
        admin::set_user_status,
        admin::delete_user,
        admin::stats,
        admin::online,
        appointments::create,
        appointments::list,
        appointments::get_one,
        appointments::update,
        appointments::update_status,
        lab_tests::create,
        lab_tests::list,
        lab_tests::get_one,
        lab_tests::update_status,
        lab_tests::record_results,
        prescriptions::create,
        prescriptions::list,
        prescriptions::get_one,
        prescriptions::update_status,
        reports::upload,
        reports::list,
        reports::get_one,
        reports::update_status,
        reports::reprocess,
        reports::delete,
        files::download,
    ),
    components(schemas(
        HealthRes,
        ErrorResponse,
        ProfileFields,
        SignupReq,
        LoginReq,
        UpdateProfileReq,
        ChangePasswordReq,
        UpdateAccountStatusReq,
        CreateAppointmentReq,
        UpdateAppointmentReq,
        UpdateStatusReq,
        LabParameterReq,
        CreateLabTestReq,
        LabResultReq,
        RecordLabResultsReq,
        MedicationReq,
        CreatePrescriptionReq,
        auth::AuthRes,
        reports::UploadReportForm,
        Role,
        BloodGroup,
        PatientProfile,
        DoctorProfile,
        NurseProfile,
        StaffProfile,
        RoleProfile,
        AccountView,
        Appointment,
        AppointmentStatus,
        LabTest,
        LabTestStatus,
        LabPriority,
        LabParameter,
        ResultFlag,
        Prescription,
        PrescriptionStatus,
        Medication,
        Report,
        ReportStatus,
        ReportType,
        StoredFile,
        ExtractedData,
        ExtractedMetric,
        HospitalStats,
        OnlineAccount,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Signup, login and the caller's own account"),
        (name = "admin", description = "Administrator account management and dashboards"),
        (name = "reports", description = "Uploaded reports and field extraction"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_resource() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/auth/signup",
            "/api/appointments/{id}/status",
            "/api/lab-tests/{id}/results",
            "/api/reports/upload",
            "/api/admin/online",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        assert!(doc
            .components
            .unwrap()
            .security_schemes
            .contains_key("bearer"));
    }
}
