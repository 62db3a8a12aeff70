use super::{existing_account, optional_id, require_role};
use crate::models::{Account, Medication, Prescription, PrescriptionStatus, Role};
use crate::store::Database;
use crate::validation::{self, optional_text, required_text};
use crate::{HospitalError, HospitalResult, RecordId};
use api_shared::{CreatePrescriptionReq, PrescriptionQuery, UpdateStatusReq};
use chrono::Utc;
use std::sync::Arc;

const VIEW_ROLES: &[Role] = &[Role::Patient, Role::Doctor, Role::Nurse, Role::Admin];

#[derive(Clone)]
pub struct PrescriptionService {
    db: Arc<Database>,
}

impl PrescriptionService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Issues a prescription. Doctors issue under their own name; administrators must name the
    /// prescribing doctor.
    pub fn create(&self, actor: &Account, req: CreatePrescriptionReq) -> HospitalResult<Prescription> {
        require_role(actor, &[Role::Doctor, Role::Admin], "issue prescriptions")?;

        let doctor_id = match actor.role() {
            Role::Doctor => {
                let named = optional_id("doctorId", req.doctor_id.as_deref())?;
                if named.is_some_and(|id| id != actor.id) {
                    return Err(HospitalError::forbidden(
                        "Doctors can only issue prescriptions under their own name",
                    ));
                }
                actor.id.clone()
            }
            _ => {
                let value = req.doctor_id.as_deref().unwrap_or_default();
                existing_account(&self.db, "doctorId", value, Role::Doctor)?.id
            }
        };
        let patient = existing_account(&self.db, "patientId", &req.patient_id, Role::Patient)?;

        let appointment_id = optional_id("appointmentId", req.appointment_id.as_deref())?;
        if let Some(appointment_id) = &appointment_id {
            let linked = self
                .db
                .appointments
                .get(appointment_id)
                .ok_or(HospitalError::NotFound("Appointment"))?;
            if linked.patient_id != patient.id {
                return Err(HospitalError::validation(
                    "appointmentId",
                    "Appointment belongs to a different patient",
                ));
            }
        }

        if req.medications.is_empty() {
            return Err(HospitalError::validation(
                "medications",
                "At least one medication is required",
            ));
        }
        let medications = req
            .medications
            .into_iter()
            .enumerate()
            .map(|(i, m)| -> HospitalResult<Medication> {
                let field = |name: &str| format!("medications[{i}].{name}");
                Ok(Medication {
                    name: required_text(&field("name"), &m.name)?,
                    dosage: required_text(&field("dosage"), &m.dosage)?,
                    frequency: required_text(&field("frequency"), &m.frequency)?,
                    duration: required_text(&field("duration"), &m.duration)?,
                    instructions: optional_text(m.instructions),
                })
            })
            .collect::<HospitalResult<Vec<_>>>()?;

        let valid_until = optional_text(req.valid_until)
            .map(|d| validation::date("validUntil", &d))
            .transpose()?;
        if valid_until.is_some_and(|d| d < Utc::now().date_naive()) {
            return Err(HospitalError::validation(
                "validUntil",
                "validUntil cannot be in the past",
            ));
        }

        let now = Utc::now();
        let prescription = self.db.prescriptions.insert(Prescription {
            id: RecordId::new(),
            patient_id: patient.id,
            doctor_id,
            appointment_id,
            medications,
            diagnosis: optional_text(req.diagnosis),
            notes: optional_text(req.notes),
            status: PrescriptionStatus::Active,
            valid_until,
            issued_at: now,
            updated_at: now,
        })?;

        tracing::info!(
            prescription = %prescription.id,
            patient = %prescription.patient_id,
            doctor = %prescription.doctor_id,
            "prescription issued"
        );
        Ok(prescription)
    }

    /// Newest first. Patients see their own, doctors the ones they issued.
    pub fn list(&self, actor: &Account, query: &PrescriptionQuery) -> HospitalResult<Vec<Prescription>> {
        require_role(actor, VIEW_ROLES, "view prescriptions")?;
        let mut patient_id = optional_id("patientId", query.patient_id.as_deref())?;
        let mut doctor_id = optional_id("doctorId", query.doctor_id.as_deref())?;
        let status: Option<PrescriptionStatus> = query
            .status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| validation::choice("status", s))
            .transpose()?;

        match actor.role() {
            Role::Patient => {
                if patient_id.as_ref().is_some_and(|id| id != &actor.id) {
                    return Ok(Vec::new());
                }
                patient_id = Some(actor.id.clone());
            }
            Role::Doctor => {
                if doctor_id.as_ref().is_some_and(|id| id != &actor.id) {
                    return Ok(Vec::new());
                }
                doctor_id = Some(actor.id.clone());
            }
            _ => {}
        }

        let mut prescriptions = self.db.prescriptions.find(|p| {
            patient_id.as_ref().map_or(true, |id| &p.patient_id == id)
                && doctor_id.as_ref().map_or(true, |id| &p.doctor_id == id)
                && status.map_or(true, |s| p.status == s)
        });
        prescriptions.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(prescriptions)
    }

    pub fn get(&self, actor: &Account, id: &str) -> HospitalResult<Prescription> {
        require_role(actor, VIEW_ROLES, "view prescriptions")?;
        let id = validation::record_id("id", id)?;
        let prescription = self
            .db
            .prescriptions
            .get(&id)
            .ok_or(HospitalError::NotFound("Prescription"))?;

        let visible = match actor.role() {
            Role::Patient => prescription.patient_id == actor.id,
            Role::Doctor => prescription.doctor_id == actor.id,
            _ => true,
        };
        if !visible {
            return Err(HospitalError::forbidden(
                "You do not have access to this prescription",
            ));
        }
        Ok(prescription)
    }

    /// Completes or cancels an active prescription. Only the issuing doctor or an
    /// administrator may do this.
    pub fn update_status(
        &self,
        actor: &Account,
        id: &str,
        req: UpdateStatusReq,
    ) -> HospitalResult<Prescription> {
        require_role(actor, &[Role::Doctor, Role::Admin], "update prescriptions")?;
        let next: PrescriptionStatus = validation::choice("status", &req.status)?;
        let existing = self.get(actor, id)?;
        let notes = optional_text(req.notes);

        let prescription = self.db.prescriptions.update(&existing.id, |p| {
            if !p.status.can_transition_to(next) {
                return Err(HospitalError::validation(
                    "status",
                    format!("Cannot change prescription status from {} to {}", p.status, next),
                ));
            }
            p.status = next;
            if notes.is_some() {
                p.notes = notes;
            }
            p.updated_at = Utc::now();
            Ok(())
        })?;

        tracing::info!(prescription = %prescription.id, status = %next, by = %actor.id, "prescription status changed");
        Ok(prescription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestHospital;
    use api_shared::MedicationReq;

    fn amoxicillin(patient: &Account) -> CreatePrescriptionReq {
        CreatePrescriptionReq {
            patient_id: patient.id.to_string(),
            medications: vec![MedicationReq {
                name: "Amoxicillin".into(),
                dosage: "500mg".into(),
                frequency: "3x daily".into(),
                duration: "7 days".into(),
                instructions: Some("After meals".into()),
            }],
            diagnosis: Some("Sinusitis".into()),
            ..Default::default()
        }
    }

    #[test]
    fn doctor_issues_under_own_name() {
        let h = TestHospital::new();
        let patient = h.account("patient", "p@x.com");
        let doctor = h.account("doctor", "d@x.com");

        let rx = h.prescriptions.create(&doctor, amoxicillin(&patient)).unwrap();
        assert_eq!(rx.doctor_id, doctor.id);
        assert_eq!(rx.status, PrescriptionStatus::Active);
        assert_eq!(rx.medications.len(), 1);
    }

    #[test]
    fn admin_must_name_a_doctor() {
        let h = TestHospital::new();
        let patient = h.account("patient", "p@x.com");
        let doctor = h.account("doctor", "d@x.com");
        let admin = h.admin();

        assert!(matches!(
            h.prescriptions.create(&admin, amoxicillin(&patient)),
            Err(HospitalError::Validation { .. })
        ));

        let mut req = amoxicillin(&patient);
        req.doctor_id = Some(doctor.id.to_string());
        assert_eq!(h.prescriptions.create(&admin, req).unwrap().doctor_id, doctor.id);
    }

    #[test]
    fn medications_are_required_and_validated() {
        let h = TestHospital::new();
        let patient = h.account("patient", "p@x.com");
        let doctor = h.account("doctor", "d@x.com");

        let mut req = amoxicillin(&patient);
        req.medications.clear();
        assert!(matches!(
            h.prescriptions.create(&doctor, req),
            Err(HospitalError::Validation { ref field, .. }) if field == "medications"
        ));

        let mut req = amoxicillin(&patient);
        req.medications[0].dosage = " ".into();
        assert!(matches!(
            h.prescriptions.create(&doctor, req),
            Err(HospitalError::Validation { ref field, .. }) if field == "medications[0].dosage"
        ));
    }

    #[test]
    fn patients_and_nurses_cannot_prescribe() {
        let h = TestHospital::new();
        let patient = h.account("patient", "p@x.com");
        let nurse = h.account("nurse", "n@x.com");
        assert!(h.prescriptions.create(&patient, amoxicillin(&patient)).is_err());
        assert!(h.prescriptions.create(&nurse, amoxicillin(&patient)).is_err());
    }

    #[test]
    fn status_changes_once() {
        let h = TestHospital::new();
        let patient = h.account("patient", "p@x.com");
        let doctor = h.account("doctor", "d@x.com");
        let other_doctor = h.account("doctor", "d2@x.com");
        let rx = h.prescriptions.create(&doctor, amoxicillin(&patient)).unwrap();
        let id = rx.id.to_string();
        let req = |s: &str| UpdateStatusReq {
            status: s.into(),
            notes: None,
        };

        assert!(matches!(
            h.prescriptions.update_status(&other_doctor, &id, req("completed")),
            Err(HospitalError::Forbidden(_))
        ));
        h.prescriptions.update_status(&doctor, &id, req("completed")).unwrap();
        assert!(h.prescriptions.update_status(&doctor, &id, req("cancelled")).is_err());

        let mine = h.prescriptions.list(&patient, &PrescriptionQuery::default()).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].status, PrescriptionStatus::Completed);
    }
}
