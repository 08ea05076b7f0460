// libs/planning-cell/src/store.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentStatus, GenerationOutcome, PlanningError, Slot, SlotQuery, SlotState,
};

/// Storage boundary for slots and appointments, injected into the generator,
/// the availability index and the reservation coordinator.
///
/// Every mutating operation is a single atomic transition: callers never
/// observe a slot RESERVED without its appointment, or the reverse.
#[async_trait]
pub trait PlanningStore: Send + Sync {
    // Slots
    async fn insert_slots(&self, slots: Vec<Slot>);
    async fn get_slot(&self, slot_id: Uuid) -> Option<Slot>;
    async fn query_slots(&self, query: &SlotQuery) -> Vec<Slot>;
    async fn count_available(&self, doctor_id: Uuid, date: NaiveDate) -> usize;

    /// Conditional regeneration over `[from, to]` for one doctor: free slots
    /// in the horizon are removed, reserved slots are kept untouched, and
    /// incoming slots overlapping a kept reservation are suppressed.
    async fn replace_free_slots(
        &self,
        doctor_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        incoming: Vec<Slot>,
    ) -> GenerationOutcome;

    /// Drop free slots whose date has fully elapsed. Reserved slots are never
    /// purged.
    async fn purge_elapsed(&self, before: NaiveDate) -> usize;

    // Reservation transitions
    /// Compare-and-set FREE -> RESERVED plus appointment insert, as one
    /// critical section. Fails with `SlotUnavailable` when the race is lost.
    async fn commit_reservation(
        &self,
        slot_id: Uuid,
        appointment: Appointment,
    ) -> Result<Appointment, PlanningError>;

    /// Cancel an appointment and release its slot (RESERVED -> FREE).
    async fn cancel_appointment(&self, appointment_id: Uuid)
        -> Result<Appointment, PlanningError>;

    /// First half of a reschedule: unbind the appointment from its slot and
    /// free it. Returns the updated appointment and the freed slot id.
    async fn detach_reservation(
        &self,
        appointment_id: Uuid,
    ) -> Result<(Appointment, Uuid), PlanningError>;

    /// Second half of a reschedule (and its compensation): bind an existing
    /// appointment to a FREE slot, re-denormalizing the schedule fields.
    async fn attach_reservation(
        &self,
        slot_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<Appointment, PlanningError>;

    // Appointments
    async fn insert_appointment(&self, appointment: Appointment) -> Appointment;
    async fn get_appointment(&self, appointment_id: Uuid) -> Option<Appointment>;
    async fn update_appointment_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, PlanningError>;
    async fn appointments_for_doctor_on(&self, doctor_id: Uuid, date: NaiveDate)
        -> Vec<Appointment>;
    async fn appointments_for_doctor(&self, doctor_id: Uuid) -> Vec<Appointment>;
    async fn appointments_for_patient(&self, patient_id: Uuid) -> Vec<Appointment>;
}

#[derive(Default)]
struct StoreInner {
    slots: HashMap<Uuid, Slot>,
    appointments: HashMap<Uuid, Appointment>,
}

/// In-memory store. A single writer lock serializes all mutating operations,
/// which makes the per-slot state transitions linearizable; read queries run
/// concurrently and may observe pre- or post-commit state.
pub struct InMemoryPlanningStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryPlanningStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
        }
    }
}

impl Default for InMemoryPlanningStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlanningStore for InMemoryPlanningStore {
    async fn insert_slots(&self, slots: Vec<Slot>) {
        let mut inner = self.inner.write().await;
        for slot in slots {
            inner.slots.insert(slot.id, slot);
        }
    }

    async fn get_slot(&self, slot_id: Uuid) -> Option<Slot> {
        let inner = self.inner.read().await;
        inner.slots.get(&slot_id).cloned()
    }

    async fn query_slots(&self, query: &SlotQuery) -> Vec<Slot> {
        let inner = self.inner.read().await;
        let mut slots: Vec<Slot> = inner
            .slots
            .values()
            .filter(|slot| {
                (query.include_reserved || slot.is_free())
                    && query.doctor_id.map_or(true, |id| slot.doctor_id == id)
                    && query.service_id.map_or(true, |id| slot.service_id == id)
                    && query.hospital_id.map_or(true, |id| slot.hospital_id == id)
                    && query.date.map_or(true, |date| slot.date == date)
                    && query.from.map_or(true, |from| slot.date >= from)
                    && query.to.map_or(true, |to| slot.date <= to)
            })
            .cloned()
            .collect();

        // Deterministic ordering: first available slot must be stable.
        slots.sort_by(|a, b| {
            (a.date, a.start_time, a.doctor_id, a.id)
                .cmp(&(b.date, b.start_time, b.doctor_id, b.id))
        });
        slots
    }

    async fn count_available(&self, doctor_id: Uuid, date: NaiveDate) -> usize {
        let inner = self.inner.read().await;
        inner
            .slots
            .values()
            .filter(|slot| slot.is_free() && slot.doctor_id == doctor_id && slot.date == date)
            .count()
    }

    async fn replace_free_slots(
        &self,
        doctor_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        incoming: Vec<Slot>,
    ) -> GenerationOutcome {
        let mut inner = self.inner.write().await;

        let reserved: Vec<Slot> = inner
            .slots
            .values()
            .filter(|slot| {
                slot.doctor_id == doctor_id
                    && slot.date >= from
                    && slot.date <= to
                    && slot.state == SlotState::Reserved
            })
            .cloned()
            .collect();

        let before = inner.slots.len();
        inner.slots.retain(|_, slot| {
            !(slot.doctor_id == doctor_id
                && slot.date >= from
                && slot.date <= to
                && slot.is_free())
        });
        let replaced = before - inner.slots.len();

        let mut outcome = GenerationOutcome {
            created: 0,
            preserved: reserved.len(),
            suppressed: 0,
            replaced,
        };

        for slot in incoming {
            let collides = reserved
                .iter()
                .any(|kept| kept.overlaps(slot.date, slot.start_time, slot.end_time));
            if collides {
                outcome.suppressed += 1;
                continue;
            }
            inner.slots.insert(slot.id, slot);
            outcome.created += 1;
        }

        outcome
    }

    async fn purge_elapsed(&self, before: NaiveDate) -> usize {
        let mut inner = self.inner.write().await;
        let count = inner.slots.len();
        inner
            .slots
            .retain(|_, slot| !(slot.is_free() && slot.date < before));
        count - inner.slots.len()
    }

    async fn commit_reservation(
        &self,
        slot_id: Uuid,
        mut appointment: Appointment,
    ) -> Result<Appointment, PlanningError> {
        let mut inner = self.inner.write().await;
        let StoreInner { slots, appointments } = &mut *inner;

        let slot = slots.get_mut(&slot_id).ok_or(PlanningError::SlotNotFound)?;
        if !slot.is_free() {
            return Err(PlanningError::SlotUnavailable);
        }

        slot.state = SlotState::Reserved;
        slot.appointment_id = Some(appointment.id);
        appointment.slot_id = Some(slot_id);
        appointments.insert(appointment.id, appointment.clone());

        Ok(appointment)
    }

    async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Appointment, PlanningError> {
        let mut inner = self.inner.write().await;
        let StoreInner { slots, appointments } = &mut *inner;

        let appointment = appointments
            .get_mut(&appointment_id)
            .ok_or(PlanningError::AppointmentNotFound)?;
        if appointment.status == AppointmentStatus::Cancelled {
            return Err(PlanningError::AlreadyCancelled);
        }
        if !appointment.status.can_transition_to(&AppointmentStatus::Cancelled) {
            return Err(PlanningError::InvalidStatusTransition(
                appointment.status.clone(),
            ));
        }

        appointment.status = AppointmentStatus::Cancelled;
        appointment.updated_at = Utc::now();

        if let Some(slot_id) = appointment.slot_id {
            match slots.get_mut(&slot_id) {
                Some(slot) => {
                    slot.state = SlotState::Free;
                    slot.appointment_id = None;
                }
                None => warn!("Cancelled appointment {} referenced missing slot {}", appointment_id, slot_id),
            }
        }

        Ok(appointment.clone())
    }

    async fn detach_reservation(
        &self,
        appointment_id: Uuid,
    ) -> Result<(Appointment, Uuid), PlanningError> {
        let mut inner = self.inner.write().await;
        let StoreInner { slots, appointments } = &mut *inner;

        let appointment = appointments
            .get_mut(&appointment_id)
            .ok_or(PlanningError::AppointmentNotFound)?;
        if !matches!(
            appointment.status,
            AppointmentStatus::Planned | AppointmentStatus::Confirmed
        ) {
            return Err(PlanningError::InvalidStatusTransition(
                appointment.status.clone(),
            ));
        }

        let old_slot_id = appointment.slot_id.take().ok_or_else(|| {
            PlanningError::Validation("Appointment is not bound to a slot".to_string())
        })?;
        appointment.updated_at = Utc::now();

        if let Some(slot) = slots.get_mut(&old_slot_id) {
            slot.state = SlotState::Free;
            slot.appointment_id = None;
        }

        Ok((appointment.clone(), old_slot_id))
    }

    async fn attach_reservation(
        &self,
        slot_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<Appointment, PlanningError> {
        let mut inner = self.inner.write().await;
        let StoreInner { slots, appointments } = &mut *inner;

        let slot = slots.get_mut(&slot_id).ok_or(PlanningError::SlotNotFound)?;
        if !slot.is_free() {
            return Err(PlanningError::SlotUnavailable);
        }
        let appointment = appointments
            .get_mut(&appointment_id)
            .ok_or(PlanningError::AppointmentNotFound)?;

        slot.state = SlotState::Reserved;
        slot.appointment_id = Some(appointment_id);

        appointment.slot_id = Some(slot_id);
        appointment.doctor_id = slot.doctor_id;
        appointment.service_id = slot.service_id;
        appointment.hospital_id = slot.hospital_id;
        appointment.date = slot.date;
        appointment.start_time = slot.start_time;
        appointment.end_time = slot.end_time;
        appointment.updated_at = Utc::now();

        Ok(appointment.clone())
    }

    async fn insert_appointment(&self, appointment: Appointment) -> Appointment {
        let mut inner = self.inner.write().await;
        inner
            .appointments
            .insert(appointment.id, appointment.clone());
        appointment
    }

    async fn get_appointment(&self, appointment_id: Uuid) -> Option<Appointment> {
        let inner = self.inner.read().await;
        inner.appointments.get(&appointment_id).cloned()
    }

    async fn update_appointment_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, PlanningError> {
        let mut inner = self.inner.write().await;
        let StoreInner { slots, appointments } = &mut *inner;

        let appointment = appointments
            .get_mut(&appointment_id)
            .ok_or(PlanningError::AppointmentNotFound)?;
        if !appointment.status.can_transition_to(&status) {
            return Err(PlanningError::InvalidStatusTransition(
                appointment.status.clone(),
            ));
        }

        appointment.status = status.clone();
        appointment.updated_at = Utc::now();

        // Cancellation releases the slot in the same critical section.
        if status == AppointmentStatus::Cancelled {
            if let Some(slot_id) = appointment.slot_id {
                if let Some(slot) = slots.get_mut(&slot_id) {
                    slot.state = SlotState::Free;
                    slot.appointment_id = None;
                }
            }
        }

        Ok(appointment.clone())
    }

    async fn appointments_for_doctor_on(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Vec<Appointment> {
        let inner = self.inner.read().await;
        let mut appointments: Vec<Appointment> = inner
            .appointments
            .values()
            .filter(|apt| apt.doctor_id == doctor_id && apt.date == date)
            .cloned()
            .collect();
        appointments.sort_by_key(|apt| (apt.date, apt.start_time));
        appointments
    }

    async fn appointments_for_doctor(&self, doctor_id: Uuid) -> Vec<Appointment> {
        let inner = self.inner.read().await;
        let mut appointments: Vec<Appointment> = inner
            .appointments
            .values()
            .filter(|apt| apt.doctor_id == doctor_id)
            .cloned()
            .collect();
        appointments.sort_by_key(|apt| (apt.date, apt.start_time));
        appointments
    }

    async fn appointments_for_patient(&self, patient_id: Uuid) -> Vec<Appointment> {
        let inner = self.inner.read().await;
        let mut appointments: Vec<Appointment> = inner
            .appointments
            .values()
            .filter(|apt| apt.patient_id == patient_id)
            .cloned()
            .collect();
        appointments.sort_by_key(|apt| (apt.date, apt.start_time));
        appointments
    }
}
