//! Appointment notifications pushed to whoever is online.

use crate::models::{Account, Appointment, AppointmentStatus};
use crate::presence::{AppointmentEvent, PresenceRegistry, ServerEvent};
use crate::store::Database;
use crate::RecordId;
use chrono::Utc;
use std::sync::Arc;

/// What happened to an existing appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentChange {
    Rescheduled,
    Status(AppointmentStatus),
}

impl AppointmentChange {
    fn kind(self) -> &'static str {
        match self {
            AppointmentChange::Rescheduled => "appointment_rescheduled",
            AppointmentChange::Status(_) => "status_changed",
        }
    }
}

#[derive(Clone)]
pub struct Notifier {
    db: Arc<Database>,
    presence: Arc<PresenceRegistry>,
}

impl Notifier {
    pub fn new(db: Arc<Database>, presence: Arc<PresenceRegistry>) -> Self {
        Self { db, presence }
    }

    /// Tells the doctor about a new booking, and the patient too when someone else booked it.
    ///
    /// Returns how many events were queued.
    pub fn appointment_created(&self, appointment: &Appointment, actor: &Account) -> usize {
        let when = format!("{} at {}", appointment.appointment_date, appointment.time_slot);
        let mut delivered = 0;

        if appointment.doctor_id != actor.id {
            let patient = self.name_of(&appointment.patient_id);
            delivered += self.push(
                &appointment.doctor_id,
                ServerEvent::AppointmentNotification(event(
                    "new_appointment",
                    format!("New appointment with {patient} on {when}"),
                    appointment,
                )),
            );
        }

        if appointment.patient_id != actor.id {
            let doctor = self.name_of(&appointment.doctor_id);
            delivered += self.push(
                &appointment.patient_id,
                ServerEvent::AppointmentNotification(event(
                    "new_appointment",
                    format!("Appointment booked with Dr. {doctor} on {when}"),
                    appointment,
                )),
            );
        }

        delivered
    }

    /// Tells the parties other than the actor that an appointment changed.
    pub fn appointment_updated(
        &self,
        appointment: &Appointment,
        actor: &Account,
        change: AppointmentChange,
    ) -> usize {
        let message = match change {
            AppointmentChange::Rescheduled => format!(
                "Appointment moved to {} at {}",
                appointment.appointment_date, appointment.time_slot
            ),
            AppointmentChange::Status(status) => format!(
                "Appointment on {} at {} is now {}",
                appointment.appointment_date, appointment.time_slot, status
            ),
        };

        [&appointment.patient_id, &appointment.doctor_id]
            .into_iter()
            .filter(|id| **id != actor.id)
            .map(|id| {
                self.push(
                    id,
                    ServerEvent::AppointmentUpdate(event(change.kind(), message.clone(), appointment)),
                )
            })
            .sum()
    }

    fn push(&self, recipient: &RecordId, event: ServerEvent) -> usize {
        usize::from(self.presence.send(recipient, event))
    }

    fn name_of(&self, id: &RecordId) -> String {
        self.db
            .accounts
            .get(id)
            .map(|a| a.full_name())
            .unwrap_or_else(|| "unknown".into())
    }
}

fn event(kind: &str, message: String, appointment: &Appointment) -> AppointmentEvent {
    AppointmentEvent {
        kind: kind.into(),
        message,
        appointment: Some(appointment.clone()),
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::Registration;
    use crate::test_support::TestHospital;
    use api_shared::CreateAppointmentReq;
    use tokio::sync::mpsc;

    fn online(h: &TestHospital, account: &Account) -> mpsc::Receiver<ServerEvent> {
        let (tx, rx) = mpsc::channel(8);
        h.presence.register(
            h.presence.next_connection_id(),
            Registration {
                account_id: account.id.clone(),
                role: account.role(),
                display_name: account.full_name(),
            },
            tx,
        );
        rx
    }

    fn book(h: &TestHospital, actor: &Account, patient: &Account, doctor: &Account) -> Appointment {
        let tomorrow = Utc::now().date_naive() + chrono::Duration::days(1);
        h.appointments
            .create(
                actor,
                CreateAppointmentReq {
                    patient_id: Some(patient.id.to_string()),
                    doctor_id: doctor.id.to_string(),
                    appointment_date: tomorrow.to_string(),
                    time_slot: "10:00".into(),
                    reason: "Check-up".into(),
                    ..Default::default()
                },
            )
            .unwrap()
    }

    #[test]
    fn booking_by_reception_notifies_both_parties() {
        let h = TestHospital::new();
        let patient = h.account("patient", "p@x.com");
        let doctor = h.account("doctor", "d@x.com");
        let reception = h.account("receptionist", "r@x.com");
        let mut doctor_rx = online(&h, &doctor);
        let mut patient_rx = online(&h, &patient);
        let notifier = Notifier::new(h.db.clone(), h.presence.clone());

        let appt = book(&h, &reception, &patient, &doctor);
        assert_eq!(notifier.appointment_created(&appt, &reception), 2);

        match doctor_rx.try_recv().unwrap() {
            ServerEvent::AppointmentNotification(e) => {
                assert_eq!(e.kind, "new_appointment");
                assert!(e.message.contains("Test patient"));
                assert_eq!(e.appointment.unwrap().id, appt.id);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(patient_rx.try_recv().is_ok());
    }

    #[test]
    fn patient_booking_only_notifies_doctor() {
        let h = TestHospital::new();
        let patient = h.account("patient", "p@x.com");
        let doctor = h.account("doctor", "d@x.com");
        let mut patient_rx = online(&h, &patient);
        let notifier = Notifier::new(h.db.clone(), h.presence.clone());

        let appt = book(&h, &patient, &patient, &doctor);
        // Doctor is offline, so nothing is delivered.
        assert_eq!(notifier.appointment_created(&appt, &patient), 0);
        assert!(patient_rx.try_recv().is_err());
    }

    #[test]
    fn status_change_skips_the_actor() {
        let h = TestHospital::new();
        let patient = h.account("patient", "p@x.com");
        let doctor = h.account("doctor", "d@x.com");
        let mut patient_rx = online(&h, &patient);
        let mut doctor_rx = online(&h, &doctor);
        let notifier = Notifier::new(h.db.clone(), h.presence.clone());
        let appt = book(&h, &patient, &patient, &doctor);

        let delivered = notifier.appointment_updated(
            &appt,
            &doctor,
            AppointmentChange::Status(AppointmentStatus::Completed),
        );

        assert_eq!(delivered, 1);
        assert!(doctor_rx.try_recv().is_err());
        match patient_rx.try_recv().unwrap() {
            ServerEvent::AppointmentUpdate(e) => {
                assert_eq!(e.kind, "status_changed");
                assert!(e.message.ends_with("completed"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
