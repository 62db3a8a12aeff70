//! Lab test orders, workflow stages and results.

use super::{existing_account, optional_id, require_role, treats};
use crate::models::{Account, LabParameter, LabTest, LabTestStatus, ResultFlag, Role};
use crate::store::Database;
use crate::validation::{self, optional_text, required_text};
use crate::{HospitalError, HospitalResult, RecordId};
use api_shared::{CreateLabTestReq, LabTestQuery, RecordLabResultsReq, UpdateStatusReq};
use chrono::Utc;
use std::sync::Arc;

const CLINICAL_ROLES: &[Role] = &[Role::Doctor, Role::Nurse, Role::Admin];
const VIEW_ROLES: &[Role] = &[Role::Patient, Role::Doctor, Role::Nurse, Role::Admin];

#[derive(Clone)]
pub struct LabTestService {
    db: Arc<Database>,
}

impl LabTestService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(&self, actor: &Account, req: CreateLabTestReq) -> HospitalResult<LabTest> {
        require_role(actor, CLINICAL_ROLES, "order lab tests")?;

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

        let test_name = required_text("testName", &req.test_name)?;
        let priority = match optional_text(req.priority) {
            Some(p) => validation::choice("priority", &p)?,
            None => Default::default(),
        };
        let parameters = req
            .parameters
            .into_iter()
            .map(|p| -> HospitalResult<LabParameter> {
                Ok(LabParameter {
                    name: required_text("parameters", &p.name)?.as_str().to_string(),
                    value: None,
                    unit: optional_text(p.unit),
                    reference_range: optional_text(p.reference_range),
                    flag: None,
                })
            })
            .collect::<HospitalResult<Vec<_>>>()?;

        let now = Utc::now();
        let test = self.db.lab_tests.insert(LabTest {
            id: RecordId::new(),
            patient_id: patient.id,
            ordered_by: actor.id.clone(),
            appointment_id,
            test_name,
            category: optional_text(req.category),
            priority,
            parameters,
            status: LabTestStatus::Ordered,
            notes: optional_text(req.notes),
            ordered_at: now,
            sample_collected_at: None,
            completed_at: None,
            cancelled_at: None,
            updated_at: now,
        })?;

        tracing::info!(lab_test = %test.id, patient = %test.patient_id, by = %actor.id, "lab test ordered");
        Ok(test)
    }

    /// Patients see their own tests; doctors see tests they ordered or for patients they are
    /// booked with; nurses and administrators see all.
    fn visible(&self, actor: &Account, test: &LabTest) -> bool {
        match actor.role() {
            Role::Patient => test.patient_id == actor.id,
            Role::Doctor => {
                test.ordered_by == actor.id || treats(&self.db, &actor.id, &test.patient_id)
            }
            _ => true,
        }
    }

    /// Newest orders first, limited to what the caller may see.
    pub fn list(&self, actor: &Account, query: &LabTestQuery) -> HospitalResult<Vec<LabTest>> {
        require_role(actor, VIEW_ROLES, "view lab tests")?;
        let mut patient_id = optional_id("patientId", query.patient_id.as_deref())?;
        let status: Option<LabTestStatus> = query
            .status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| validation::choice("status", s))
            .transpose()?;

        if actor.role() == Role::Patient {
            if patient_id.as_ref().is_some_and(|id| id != &actor.id) {
                return Ok(Vec::new());
            }
            patient_id = Some(actor.id.clone());
        }

        let mut tests = self.db.lab_tests.find(|t| {
            patient_id.as_ref().map_or(true, |id| &t.patient_id == id)
                && status.map_or(true, |s| t.status == s)
                && self.visible(actor, t)
        });
        tests.sort_by(|a, b| b.ordered_at.cmp(&a.ordered_at));
        Ok(tests)
    }

    pub fn get(&self, actor: &Account, id: &str) -> HospitalResult<LabTest> {
        require_role(actor, VIEW_ROLES, "view lab tests")?;
        let id = validation::record_id("id", id)?;
        let test = self
            .db
            .lab_tests
            .get(&id)
            .ok_or(HospitalError::NotFound("Lab test"))?;
        if !self.visible(actor, &test) {
            return Err(HospitalError::forbidden(
                "You do not have access to this lab test",
            ));
        }
        Ok(test)
    }

    pub fn update_status(
        &self,
        actor: &Account,
        id: &str,
        req: UpdateStatusReq,
    ) -> HospitalResult<LabTest> {
        require_role(actor, CLINICAL_ROLES, "update lab tests")?;
        let id = validation::record_id("id", id)?;
        let next: LabTestStatus = validation::choice("status", &req.status)?;
        let notes = optional_text(req.notes);

        let test = self.db.lab_tests.update(&id, |test| {
            if !self.visible(actor, test) {
                return Err(HospitalError::forbidden(
                    "You do not have access to this lab test",
                ));
            }
            if !test.status.can_transition_to(next) {
                return Err(HospitalError::validation(
                    "status",
                    format!("Cannot change lab test status from {} to {}", test.status, next),
                ));
            }
            test.advance(next, Utc::now());
            if notes.is_some() {
                test.notes = notes;
            }
            Ok(())
        })?;

        tracing::info!(lab_test = %test.id, status = %next, by = %actor.id, "lab test status changed");
        Ok(test)
    }

    /// Records result values, flags them against their reference ranges and completes the test.
    pub fn record_results(
        &self,
        actor: &Account,
        id: &str,
        req: RecordLabResultsReq,
    ) -> HospitalResult<LabTest> {
        require_role(actor, CLINICAL_ROLES, "record lab results")?;
        let id = validation::record_id("id", id)?;
        if req.results.is_empty() {
            return Err(HospitalError::validation(
                "results",
                "At least one result is required",
            ));
        }
        for result in &req.results {
            required_text("results", &result.name)?;
            required_text("results", &result.value)?;
        }
        let notes = optional_text(req.notes);

        let test = self.db.lab_tests.update(&id, |test| {
            if !self.visible(actor, test) {
                return Err(HospitalError::forbidden(
                    "You do not have access to this lab test",
                ));
            }
            if test.status.is_terminal() {
                return Err(HospitalError::validation(
                    "status",
                    format!("Cannot record results for a {} lab test", test.status),
                ));
            }

            for result in req.results {
                let name = result.name.trim().to_string();
                let idx = match test
                    .parameters
                    .iter()
                    .position(|p| p.name.eq_ignore_ascii_case(&name))
                {
                    Some(idx) => idx,
                    None => {
                        test.parameters.push(LabParameter {
                            name,
                            value: None,
                            unit: None,
                            reference_range: None,
                            flag: None,
                        });
                        test.parameters.len() - 1
                    }
                };

                let param = &mut test.parameters[idx];
                let value = result.value.trim().to_string();
                if let Some(unit) = optional_text(result.unit) {
                    param.unit = Some(unit);
                }
                if let Some(range) = optional_text(result.reference_range) {
                    param.reference_range = Some(range);
                }
                param.flag = param
                    .reference_range
                    .as_deref()
                    .and_then(|range| ResultFlag::evaluate(&value, range));
                param.value = Some(value);
            }

            test.advance(LabTestStatus::Completed, Utc::now());
            if notes.is_some() {
                test.notes = notes;
            }
            Ok(())
        })?;

        tracing::info!(lab_test = %test.id, by = %actor.id, "lab results recorded");
        Ok(test)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestHospital;
    use api_shared::{LabParameterReq, LabResultReq};

    fn order(patient: &Account) -> CreateLabTestReq {
        CreateLabTestReq {
            patient_id: patient.id.to_string(),
            test_name: "Complete Blood Count".into(),
            priority: Some("urgent".into()),
            parameters: vec![LabParameterReq {
                name: "Hemoglobin".into(),
                unit: Some("g/dL".into()),
                reference_range: Some("13.5-17.5".into()),
            }],
            ..Default::default()
        }
    }

    fn status(s: &str) -> UpdateStatusReq {
        UpdateStatusReq {
            status: s.into(),
            notes: None,
        }
    }

    #[test]
    fn only_clinical_staff_order_tests() {
        let h = TestHospital::new();
        let patient = h.account("patient", "p@x.com");
        let receptionist = h.account("receptionist", "r@x.com");
        let doctor = h.account("doctor", "d@x.com");

        assert!(matches!(
            h.lab_tests.create(&patient, order(&patient)),
            Err(HospitalError::Forbidden(_))
        ));
        assert!(matches!(
            h.lab_tests.create(&receptionist, order(&patient)),
            Err(HospitalError::Forbidden(_))
        ));

        let test = h.lab_tests.create(&doctor, order(&patient)).unwrap();
        assert_eq!(test.status, LabTestStatus::Ordered);
        assert_eq!(test.ordered_by, doctor.id);
    }

    #[test]
    fn workflow_moves_forward_and_stamps_times() {
        let h = TestHospital::new();
        let patient = h.account("patient", "p@x.com");
        let nurse = h.account("nurse", "n@x.com");
        let test = h.lab_tests.create(&nurse, order(&patient)).unwrap();
        let id = test.id.to_string();

        let collected = h
            .lab_tests
            .update_status(&nurse, &id, status("sample-collected"))
            .unwrap();
        assert!(collected.sample_collected_at.is_some());

        assert!(matches!(
            h.lab_tests.update_status(&nurse, &id, status("ordered")),
            Err(HospitalError::Validation { .. })
        ));

        let cancelled = h
            .lab_tests
            .update_status(&nurse, &id, status("cancelled"))
            .unwrap();
        assert!(cancelled.cancelled_at.is_some());
        assert!(h
            .lab_tests
            .update_status(&nurse, &id, status("in-progress"))
            .is_err());
    }

    #[test]
    fn recording_results_flags_and_completes() {
        let h = TestHospital::new();
        let patient = h.account("patient", "p@x.com");
        let doctor = h.account("doctor", "d@x.com");
        let test = h.lab_tests.create(&doctor, order(&patient)).unwrap();

        let done = h
            .lab_tests
            .record_results(
                &doctor,
                &test.id.to_string(),
                RecordLabResultsReq {
                    results: vec![
                        LabResultReq {
                            name: "hemoglobin".into(),
                            value: "12.1".into(),
                            ..Default::default()
                        },
                        LabResultReq {
                            name: "WBC".into(),
                            value: "7.2".into(),
                            unit: Some("10^9/L".into()),
                            reference_range: Some("4.0-11.0".into()),
                        },
                    ],
                    notes: Some("Mild anaemia".into()),
                },
            )
            .unwrap();

        assert_eq!(done.status, LabTestStatus::Completed);
        assert!(done.completed_at.is_some());
        assert_eq!(done.parameters.len(), 2);
        assert_eq!(done.parameters[0].flag, Some(ResultFlag::Low));
        assert_eq!(done.parameters[1].flag, Some(ResultFlag::Normal));

        assert!(h
            .lab_tests
            .record_results(
                &doctor,
                &test.id.to_string(),
                RecordLabResultsReq {
                    results: vec![LabResultReq {
                        name: "x".into(),
                        value: "1".into(),
                        ..Default::default()
                    }],
                    notes: None,
                },
            )
            .is_err());
    }

    #[test]
    fn doctors_see_tests_they_ordered_or_for_patients_they_treat() {
        let h = TestHospital::new();
        let patient = h.account("patient", "p@x.com");
        let other_patient = h.account("patient", "q@x.com");
        let ordering = h.account("doctor", "d1@x.com");
        let treating = h.account("doctor", "d2@x.com");
        let unrelated = h.account("doctor", "d3@x.com");
        let nurse = h.account("nurse", "n@x.com");

        let test = h.lab_tests.create(&ordering, order(&patient)).unwrap();
        h.lab_tests.create(&ordering, order(&other_patient)).unwrap();
        h.book(&patient, &treating);
        let id = test.id.to_string();
        let all = LabTestQuery::default();

        assert_eq!(h.lab_tests.list(&ordering, &all).unwrap().len(), 2);
        assert_eq!(h.lab_tests.list(&nurse, &all).unwrap().len(), 2);

        let seen = h.lab_tests.list(&treating, &all).unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].id, test.id);
        assert!(h.lab_tests.get(&treating, &id).is_ok());

        assert!(h.lab_tests.list(&unrelated, &all).unwrap().is_empty());
        assert!(matches!(
            h.lab_tests.get(&unrelated, &id),
            Err(HospitalError::Forbidden(_))
        ));
        assert!(matches!(
            h.lab_tests.update_status(&unrelated, &id, status("sample-collected")),
            Err(HospitalError::Forbidden(_))
        ));
        assert_eq!(h.lab_tests.get(&ordering, &id).unwrap().status, LabTestStatus::Ordered);
    }

    #[test]
    fn patients_see_only_their_tests() {
        let h = TestHospital::new();
        let p1 = h.account("patient", "p1@x.com");
        let p2 = h.account("patient", "p2@x.com");
        let doctor = h.account("doctor", "d@x.com");
        h.lab_tests.create(&doctor, order(&p1)).unwrap();
        let other = h.lab_tests.create(&doctor, order(&p2)).unwrap();

        assert_eq!(h.lab_tests.list(&p1, &LabTestQuery::default()).unwrap().len(), 1);
        assert_eq!(h.lab_tests.list(&doctor, &LabTestQuery::default()).unwrap().len(), 2);
        assert!(matches!(
            h.lab_tests.get(&p1, &other.id.to_string()),
            Err(HospitalError::Forbidden(_))
        ));
    }
}
