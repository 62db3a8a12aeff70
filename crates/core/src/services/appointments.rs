//! Appointment booking and lifecycle.
//!
//! Access rules:
//! - patients book for themselves and see only their own appointments
//! - doctors see the appointments they hold
//! - receptionists and administrators see and manage every appointment
//! - nurses may view but not book or change appointments
//!
//! A doctor cannot hold two scheduled appointments in the same date and slot; the check runs
//! under the collection lock together with the insert or update.

use super::{existing_account, optional_id, require_role};
use crate::constants::DEFAULT_APPOINTMENT_MINUTES;
use crate::models::{Account, Appointment, AppointmentStatus, Role};
use crate::store::{Database, Snapshot};
use crate::validation::{self, optional_text, required_text};
use crate::{HospitalError, HospitalResult, RecordId};
use api_shared::{AppointmentQuery, CreateAppointmentReq, UpdateAppointmentReq, UpdateStatusReq};
use chrono::{NaiveDate, NaiveTime, Utc};
use std::sync::Arc;

const BOOKING_ROLES: &[Role] = &[Role::Patient, Role::Doctor, Role::Admin, Role::Receptionist];

#[derive(Clone)]
pub struct AppointmentService {
    db: Arc<Database>,
}

impl AppointmentService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(&self, actor: &Account, req: CreateAppointmentReq) -> HospitalResult<Appointment> {
        require_role(actor, BOOKING_ROLES, "book appointments")?;

        let patient_id = match actor.role() {
            Role::Patient => {
                let requested = optional_id("patientId", req.patient_id.as_deref())?;
                if requested.is_some_and(|id| id != actor.id) {
                    return Err(HospitalError::forbidden(
                        "Patients can only book appointments for themselves",
                    ));
                }
                actor.id.clone()
            }
            _ => {
                let value = req.patient_id.as_deref().unwrap_or_default();
                existing_account(&self.db, "patientId", value, Role::Patient)?.id
            }
        };

        let doctor = existing_account(&self.db, "doctorId", &req.doctor_id, Role::Doctor)?;
        if !doctor.is_active {
            return Err(HospitalError::validation(
                "doctorId",
                "This doctor is not currently accepting appointments",
            ));
        }

        let (appointment_date, time, time_slot) = slot(&req.appointment_date, &req.time_slot)?;
        let duration_minutes = duration(req.duration_minutes)?;
        let reason = required_text("reason", &req.reason)?;
        let now = Utc::now();

        let candidate = Appointment {
            id: RecordId::new(),
            patient_id,
            doctor_id: doctor.id,
            appointment_date,
            time_slot,
            duration_minutes,
            status: AppointmentStatus::Scheduled,
            reason,
            notes: optional_text(req.notes),
            created_by: actor.id.clone(),
            created_at: now,
            updated_at: now,
        };
        reject_past(appointment_date, time)?;

        let appointment = self.db.appointments.insert_with(|existing| {
            reject_clash(existing, &candidate)?;
            Ok(candidate)
        })?;

        tracing::info!(
            appointment = %appointment.id,
            patient = %appointment.patient_id,
            doctor = %appointment.doctor_id,
            date = %appointment.appointment_date,
            slot = %appointment.time_slot,
            "appointment booked"
        );
        Ok(appointment)
    }

    /// Appointments visible to `actor`, sorted by date then slot.
    pub fn list(&self, actor: &Account, query: &AppointmentQuery) -> HospitalResult<Vec<Appointment>> {
        let mut patient_id = optional_id("patientId", query.patient_id.as_deref())?;
        let mut doctor_id = optional_id("doctorId", query.doctor_id.as_deref())?;
        let status: Option<AppointmentStatus> = query
            .status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| validation::choice("status", s))
            .transpose()?;
        let date = query
            .date
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| validation::date("date", s))
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
            Role::Nurse | Role::Admin | Role::Receptionist => {}
        }

        let mut appointments = self.db.appointments.find(|a| {
            patient_id.as_ref().map_or(true, |id| &a.patient_id == id)
                && doctor_id.as_ref().map_or(true, |id| &a.doctor_id == id)
                && status.map_or(true, |s| a.status == s)
                && date.map_or(true, |d| a.appointment_date == d)
        });
        appointments.sort_by(|a, b| {
            (a.appointment_date, &a.time_slot).cmp(&(b.appointment_date, &b.time_slot))
        });
        Ok(appointments)
    }

    pub fn get(&self, actor: &Account, id: &str) -> HospitalResult<Appointment> {
        let id = validation::record_id("id", id)?;
        let appointment = self
            .db
            .appointments
            .get(&id)
            .ok_or(HospitalError::NotFound("Appointment"))?;
        if !can_view(actor, &appointment) {
            return Err(HospitalError::forbidden(
                "You do not have access to this appointment",
            ));
        }
        Ok(appointment)
    }

    /// Reschedules or edits a scheduled appointment.
    pub fn update(
        &self,
        actor: &Account,
        id: &str,
        req: UpdateAppointmentReq,
    ) -> HospitalResult<Appointment> {
        let existing = self.get(actor, id)?;
        require_manage(actor, &existing)?;

        let reason = req
            .reason
            .as_deref()
            .map(|r| required_text("reason", r))
            .transpose()?;
        let duration_minutes = req.duration_minutes.map(|d| duration(Some(d))).transpose()?;
        let reschedule = if req.appointment_date.is_some() || req.time_slot.is_some() {
            let date = req
                .appointment_date
                .unwrap_or_else(|| existing.appointment_date.to_string());
            let time_slot = req.time_slot.unwrap_or_else(|| existing.time_slot.clone());
            let (date, time, time_slot) = slot(&date, &time_slot)?;
            reject_past(date, time)?;
            Some((date, time_slot))
        } else {
            None
        };
        let notes = optional_text(req.notes);

        let appointment = self.db.appointments.update_checked(&existing.id, |others, appt| {
            if appt.status != AppointmentStatus::Scheduled {
                return Err(HospitalError::validation(
                    "status",
                    "Only scheduled appointments can be changed",
                ));
            }
            if let Some((date, time_slot)) = reschedule {
                appt.appointment_date = date;
                appt.time_slot = time_slot;
                reject_clash(others, appt)?;
            }
            if let Some(reason) = reason {
                appt.reason = reason;
            }
            if let Some(minutes) = duration_minutes {
                appt.duration_minutes = minutes;
            }
            if notes.is_some() {
                appt.notes = notes;
            }
            appt.updated_at = Utc::now();
            Ok(())
        })?;

        tracing::info!(appointment = %appointment.id, by = %actor.id, "appointment updated");
        Ok(appointment)
    }

    pub fn update_status(
        &self,
        actor: &Account,
        id: &str,
        req: UpdateStatusReq,
    ) -> HospitalResult<Appointment> {
        let next: AppointmentStatus = validation::choice("status", &req.status)?;
        let existing = self.get(actor, id)?;
        require_manage(actor, &existing)?;
        if actor.role() == Role::Patient && next != AppointmentStatus::Cancelled {
            return Err(HospitalError::forbidden(
                "Patients can only cancel appointments",
            ));
        }

        let notes = optional_text(req.notes);
        let appointment = self.db.appointments.update(&existing.id, |appt| {
            if !appt.status.can_transition_to(next) {
                return Err(HospitalError::validation(
                    "status",
                    format!("Cannot change appointment status from {} to {}", appt.status, next),
                ));
            }
            appt.status = next;
            if notes.is_some() {
                appt.notes = notes;
            }
            appt.updated_at = Utc::now();
            Ok(())
        })?;

        tracing::info!(appointment = %appointment.id, status = %next, by = %actor.id, "appointment status changed");
        Ok(appointment)
    }
}

fn can_view(actor: &Account, appointment: &Appointment) -> bool {
    match actor.role() {
        Role::Patient => appointment.patient_id == actor.id,
        Role::Doctor => appointment.doctor_id == actor.id,
        Role::Nurse | Role::Admin | Role::Receptionist => true,
    }
}

fn require_manage(actor: &Account, appointment: &Appointment) -> HospitalResult<()> {
    require_role(actor, BOOKING_ROLES, "change appointments")?;
    if can_view(actor, appointment) {
        Ok(())
    } else {
        Err(HospitalError::forbidden(
            "You do not have access to this appointment",
        ))
    }
}

fn slot(date: &str, time_slot: &str) -> HospitalResult<(NaiveDate, NaiveTime, String)> {
    let date = validation::date("appointmentDate", date)?;
    let (time, slot) = validation::time_slot("timeSlot", time_slot)?;
    Ok((date, time, slot))
}

fn reject_past(date: NaiveDate, time: NaiveTime) -> HospitalResult<()> {
    if date.and_time(time) < Utc::now().naive_utc() {
        return Err(HospitalError::validation(
            "appointmentDate",
            "Appointments cannot be booked in the past",
        ));
    }
    Ok(())
}

fn duration(minutes: Option<u32>) -> HospitalResult<u32> {
    let minutes = minutes.unwrap_or(DEFAULT_APPOINTMENT_MINUTES);
    if !(5..=480).contains(&minutes) {
        return Err(HospitalError::validation(
            "durationMinutes",
            "durationMinutes must be between 5 and 480",
        ));
    }
    Ok(minutes)
}

fn reject_clash(existing: &Snapshot<'_, Appointment>, candidate: &Appointment) -> HospitalResult<()> {
    if existing.any(|other| candidate.clashes_with(other)) {
        return Err(HospitalError::Conflict(
            "The doctor already has an appointment in this slot".into(),
        ));
    }
    Ok(())
}
