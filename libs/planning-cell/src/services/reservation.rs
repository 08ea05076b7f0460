// libs/planning-cell/src/services/reservation.rs
use std::sync::Arc;

use chrono::{Local, NaiveDateTime, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentStatus, CreateAppointmentRequest, PlanningError, ReserveSlotRequest,
    Slot,
};
use crate::services::conflict::ConflictCheckService;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::store::PlanningStore;

/// The reservation coordinator. Owns the FREE <-> RESERVED transitions and
/// the appointment records they produce; every failed transition surfaces as
/// a typed error, never as a silent success.
pub struct ReservationService {
    store: Arc<dyn PlanningStore>,
    conflict_service: ConflictCheckService,
    lifecycle_service: AppointmentLifecycleService,
}

impl ReservationService {
    pub fn new(store: Arc<dyn PlanningStore>) -> Self {
        let conflict_service = ConflictCheckService::new(Arc::clone(&store));
        let lifecycle_service = AppointmentLifecycleService::new();
        Self {
            store,
            conflict_service,
            lifecycle_service,
        }
    }

    /// Reserve a FREE slot for a patient. Atomic: either the caller gets the
    /// created appointment, or the slot is untouched.
    pub async fn reserve(
        &self,
        request: ReserveSlotRequest,
    ) -> Result<Appointment, PlanningError> {
        debug!(
            "Reserving slot {} for patient {}",
            request.slot_id, request.patient_id
        );

        let slot = self
            .store
            .get_slot(request.slot_id)
            .await
            .ok_or(PlanningError::SlotNotFound)?;

        // Expiry is checked before state so a stale FREE slot reports
        // SlotExpired, not SlotUnavailable.
        if slot.start_datetime() <= now_local() {
            return Err(PlanningError::SlotExpired);
        }

        let appointment = build_appointment(&slot, &request);
        let appointment = self
            .store
            .commit_reservation(slot.id, appointment)
            .await?;

        info!(
            "Slot {} reserved for patient {} (appointment {})",
            slot.id, request.patient_id, appointment.id
        );
        Ok(appointment)
    }

    /// Cancel an appointment and release its slot back to FREE.
    pub async fn release(&self, appointment_id: Uuid) -> Result<Appointment, PlanningError> {
        let appointment = self.store.cancel_appointment(appointment_id).await?;
        info!(
            "Appointment {} cancelled, slot {:?} released",
            appointment_id, appointment.slot_id
        );
        Ok(appointment)
    }

    /// Release addressed by slot id (the HTTP surface of `liberer`). A slot
    /// with no live appointment reports `AlreadyCancelled`, which callers
    /// treat as a non-fatal conflict.
    pub async fn release_slot(&self, slot_id: Uuid) -> Result<Appointment, PlanningError> {
        let slot = self
            .store
            .get_slot(slot_id)
            .await
            .ok_or(PlanningError::SlotNotFound)?;

        match slot.appointment_id {
            Some(appointment_id) => self.release(appointment_id).await,
            None => Err(PlanningError::AlreadyCancelled),
        }
    }

    /// Move an appointment to a new slot, all-or-nothing: release the old
    /// slot, reserve the new one, and re-reserve the old slot if the second
    /// step fails.
    pub async fn reschedule(
        &self,
        appointment_id: Uuid,
        new_slot_id: Uuid,
    ) -> Result<Appointment, PlanningError> {
        let appointment = self
            .store
            .get_appointment(appointment_id)
            .await
            .ok_or(PlanningError::AppointmentNotFound)?;

        let new_slot = self
            .store
            .get_slot(new_slot_id)
            .await
            .ok_or(PlanningError::SlotNotFound)?;
        if new_slot.start_datetime() <= now_local() {
            return Err(PlanningError::SlotExpired);
        }
        if appointment.slot_id == Some(new_slot_id) {
            return Err(PlanningError::Validation(
                "Appointment is already booked on this slot".to_string(),
            ));
        }

        let (_, old_slot_id) = self.store.detach_reservation(appointment_id).await?;

        match self.store.attach_reservation(new_slot_id, appointment_id).await {
            Ok(updated) => {
                info!(
                    "Appointment {} rescheduled from slot {} to slot {}",
                    appointment_id, old_slot_id, new_slot_id
                );
                Ok(updated)
            }
            Err(err) => {
                warn!(
                    "Reschedule of appointment {} to slot {} failed: {} - restoring original slot",
                    appointment_id, new_slot_id, err
                );
                if let Err(comp_err) = self
                    .store
                    .attach_reservation(old_slot_id, appointment_id)
                    .await
                {
                    // The original slot was taken between the two steps; the
                    // binding is lost and must be surfaced, not papered over.
                    error!(
                        "Failed to restore appointment {} to slot {}: {}",
                        appointment_id, old_slot_id, comp_err
                    );
                }
                Err(err)
            }
        }
    }

    /// Move an appointment through its lifecycle. Cancellation routes through
    /// `release` so the slot is freed in the same transition.
    pub async fn transition(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
    ) -> Result<Appointment, PlanningError> {
        if new_status == AppointmentStatus::Cancelled {
            return self.release(appointment_id).await;
        }

        let appointment = self
            .store
            .get_appointment(appointment_id)
            .await
            .ok_or(PlanningError::AppointmentNotFound)?;
        self.lifecycle_service
            .validate_status_transition(&appointment.status, &new_status)?;

        self.store
            .update_appointment_status(appointment_id, new_status)
            .await
    }

    /// Administrative creation outside the slot index. The conflict checker
    /// is consulted first; the appointment carries no slot reference.
    pub async fn create_manual(
        &self,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, PlanningError> {
        if request.end_time <= request.start_time {
            return Err(PlanningError::Validation(
                "Appointment end time must be after start time".to_string(),
            ));
        }

        self.conflict_service
            .assert_no_conflict(
                request.doctor_id,
                request.date,
                request.start_time,
                request.end_time,
            )
            .await?;

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            doctor_id: request.doctor_id,
            service_id: request.service_id,
            hospital_id: request.hospital_id,
            slot_id: None,
            date: request.date,
            start_time: request.start_time,
            end_time: request.end_time,
            consultation_type: request.consultation_type,
            motive: request.motive,
            urgency: request.urgency,
            status: AppointmentStatus::Planned,
            created_at: now,
            updated_at: now,
        };

        let appointment = self.store.insert_appointment(appointment).await;
        info!(
            "Manual appointment {} created for doctor {} on {}",
            appointment.id, appointment.doctor_id, appointment.date
        );
        Ok(appointment)
    }
}

fn build_appointment(slot: &Slot, request: &ReserveSlotRequest) -> Appointment {
    let now = Utc::now();
    Appointment {
        id: Uuid::new_v4(),
        patient_id: request.patient_id,
        doctor_id: slot.doctor_id,
        service_id: slot.service_id,
        hospital_id: slot.hospital_id,
        slot_id: Some(slot.id),
        date: slot.date,
        start_time: slot.start_time,
        end_time: slot.end_time,
        consultation_type: request.consultation_type.clone(),
        motive: request.motive.clone(),
        urgency: request.urgency.clone(),
        status: AppointmentStatus::Planned,
        created_at: now,
        updated_at: now,
    }
}

/// Current wall-clock time in the hospital's operating timezone.
fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}
