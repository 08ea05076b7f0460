// libs/planning-cell/tests/reservation_test.rs
use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, Local, NaiveTime};
use futures::future::join_all;
use uuid::Uuid;

use planning_cell::models::{
    AppointmentStatus, ConsultationType, PlanningError, ReserveSlotRequest, Slot, SlotState,
    UrgencyLevel,
};
use planning_cell::services::reservation::ReservationService;
use planning_cell::store::{InMemoryPlanningStore, PlanningStore};

// ==============================================================================
// TEST FIXTURES AND UTILITIES
// ==============================================================================

struct TestSetup {
    store: Arc<dyn PlanningStore>,
    reservation: ReservationService,
    doctor_id: Uuid,
    service_id: Uuid,
    hospital_id: Uuid,
}

impl TestSetup {
    fn new() -> Self {
        let store: Arc<dyn PlanningStore> = Arc::new(InMemoryPlanningStore::new());
        let reservation = ReservationService::new(Arc::clone(&store));
        Self {
            store,
            reservation,
            doctor_id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            hospital_id: Uuid::new_v4(),
        }
    }

    /// Seed one free slot `days_ahead` days in the future.
    async fn seed_slot(&self, days_ahead: i64, start: (u32, u32), end: (u32, u32)) -> Slot {
        let slot = Slot::new(
            self.doctor_id,
            self.service_id,
            self.hospital_id,
            Local::now().date_naive() + Duration::days(days_ahead),
            NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
        );
        self.store.insert_slots(vec![slot.clone()]).await;
        slot
    }

    fn request(&self, slot_id: Uuid) -> ReserveSlotRequest {
        ReserveSlotRequest {
            slot_id,
            patient_id: Uuid::new_v4(),
            consultation_type: ConsultationType::Consultation,
            motive: "Routine visit".to_string(),
            urgency: UrgencyLevel::Normal,
        }
    }
}

// ==============================================================================
// RESERVE
// ==============================================================================

#[tokio::test]
async fn reserve_transitions_slot_and_creates_planned_appointment() {
    let setup = TestSetup::new();
    let slot = setup.seed_slot(3, (9, 0), (9, 30)).await;

    let appointment = setup.reservation.reserve(setup.request(slot.id)).await.unwrap();

    assert_eq!(appointment.status, AppointmentStatus::Planned);
    assert_eq!(appointment.slot_id, Some(slot.id));
    assert_eq!(appointment.doctor_id, setup.doctor_id);
    assert_eq!(appointment.start_time, slot.start_time);

    let stored = setup.store.get_slot(slot.id).await.unwrap();
    assert_eq!(stored.state, SlotState::Reserved);
    assert_eq!(stored.appointment_id, Some(appointment.id));
}

#[tokio::test]
async fn reserve_unknown_slot_reports_not_found() {
    let setup = TestSetup::new();
    let result = setup.reservation.reserve(setup.request(Uuid::new_v4())).await;
    assert_matches!(result, Err(PlanningError::SlotNotFound));
}

#[tokio::test]
async fn reserve_elapsed_slot_reports_expired_not_unavailable() {
    let setup = TestSetup::new();
    let slot = setup.seed_slot(-1, (9, 0), (9, 30)).await;

    let result = setup.reservation.reserve(setup.request(slot.id)).await;
    assert_matches!(result, Err(PlanningError::SlotExpired));

    // The slot itself is untouched by the failed attempt.
    let stored = setup.store.get_slot(slot.id).await.unwrap();
    assert_eq!(stored.state, SlotState::Free);
}

#[tokio::test]
async fn reserve_reserved_slot_reports_unavailable() {
    let setup = TestSetup::new();
    let slot = setup.seed_slot(3, (9, 0), (9, 30)).await;

    setup.reservation.reserve(setup.request(slot.id)).await.unwrap();
    let result = setup.reservation.reserve(setup.request(slot.id)).await;
    assert_matches!(result, Err(PlanningError::SlotUnavailable));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_reservations_yield_exactly_one_success() {
    let setup = TestSetup::new();
    let slot = setup.seed_slot(3, (10, 0), (10, 30)).await;

    let service = Arc::new(ReservationService::new(Arc::clone(&setup.store)));
    let mut handles = Vec::new();
    for _ in 0..16 {
        let service = Arc::clone(&service);
        let request = setup.request(slot.id);
        handles.push(tokio::spawn(async move { service.reserve(request).await }));
    }

    let results = join_all(handles).await;
    let successes = results
        .iter()
        .filter(|r| matches!(r, Ok(Ok(_))))
        .count();
    let lost_races = results
        .iter()
        .filter(|r| matches!(r, Ok(Err(PlanningError::SlotUnavailable))))
        .count();

    assert_eq!(successes, 1);
    assert_eq!(lost_races, 15);

    let stored = setup.store.get_slot(slot.id).await.unwrap();
    assert_eq!(stored.state, SlotState::Reserved);
    assert!(stored.appointment_id.is_some());
}

// ==============================================================================
// RELEASE
// ==============================================================================

#[tokio::test]
async fn reserve_release_reserve_round_trip() {
    let setup = TestSetup::new();
    let slot = setup.seed_slot(5, (11, 0), (11, 30)).await;

    let first = setup.reservation.reserve(setup.request(slot.id)).await.unwrap();

    let cancelled = setup.reservation.release(first.id).await.unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    let freed = setup.store.get_slot(slot.id).await.unwrap();
    assert_eq!(freed.state, SlotState::Free);
    assert_eq!(freed.appointment_id, None);

    let second = setup.reservation.reserve(setup.request(slot.id)).await.unwrap();
    assert_ne!(first.id, second.id);
    let stored = setup.store.get_slot(slot.id).await.unwrap();
    assert_eq!(stored.state, SlotState::Reserved);
    assert_eq!(stored.appointment_id, Some(second.id));
}

#[tokio::test]
async fn release_twice_reports_already_cancelled() {
    let setup = TestSetup::new();
    let slot = setup.seed_slot(2, (9, 0), (9, 30)).await;
    let appointment = setup.reservation.reserve(setup.request(slot.id)).await.unwrap();

    setup.reservation.release(appointment.id).await.unwrap();
    let result = setup.reservation.release(appointment.id).await;
    assert_matches!(result, Err(PlanningError::AlreadyCancelled));
}

#[tokio::test]
async fn release_by_slot_id_is_idempotent_safe() {
    let setup = TestSetup::new();
    let slot = setup.seed_slot(2, (9, 0), (9, 30)).await;
    setup.reservation.reserve(setup.request(slot.id)).await.unwrap();

    setup.reservation.release_slot(slot.id).await.unwrap();
    let second = setup.reservation.release_slot(slot.id).await;
    assert_matches!(second, Err(PlanningError::AlreadyCancelled));
}

#[tokio::test]
async fn release_unknown_ids_report_not_found() {
    let setup = TestSetup::new();
    assert_matches!(
        setup.reservation.release(Uuid::new_v4()).await,
        Err(PlanningError::AppointmentNotFound)
    );
    assert_matches!(
        setup.reservation.release_slot(Uuid::new_v4()).await,
        Err(PlanningError::SlotNotFound)
    );
}

// ==============================================================================
// RESCHEDULE
// ==============================================================================

#[tokio::test]
async fn reschedule_moves_appointment_to_new_slot() {
    let setup = TestSetup::new();
    let old_slot = setup.seed_slot(3, (9, 0), (9, 30)).await;
    let new_slot = setup.seed_slot(4, (14, 0), (14, 30)).await;

    let appointment = setup.reservation.reserve(setup.request(old_slot.id)).await.unwrap();
    let updated = setup
        .reservation
        .reschedule(appointment.id, new_slot.id)
        .await
        .unwrap();

    assert_eq!(updated.slot_id, Some(new_slot.id));
    assert_eq!(updated.date, new_slot.date);
    assert_eq!(updated.start_time, new_slot.start_time);

    let old = setup.store.get_slot(old_slot.id).await.unwrap();
    assert_eq!(old.state, SlotState::Free);
    assert_eq!(old.appointment_id, None);

    let new = setup.store.get_slot(new_slot.id).await.unwrap();
    assert_eq!(new.state, SlotState::Reserved);
    assert_eq!(new.appointment_id, Some(appointment.id));
}

#[tokio::test]
async fn failed_reschedule_restores_the_original_reservation() {
    let setup = TestSetup::new();
    let old_slot = setup.seed_slot(3, (9, 0), (9, 30)).await;
    let taken_slot = setup.seed_slot(4, (14, 0), (14, 30)).await;

    let appointment = setup.reservation.reserve(setup.request(old_slot.id)).await.unwrap();
    let blocker = setup.reservation.reserve(setup.request(taken_slot.id)).await.unwrap();

    let result = setup.reservation.reschedule(appointment.id, taken_slot.id).await;
    assert_matches!(result, Err(PlanningError::SlotUnavailable));

    // All-or-nothing: the appointment stays bound to the original slot.
    let old = setup.store.get_slot(old_slot.id).await.unwrap();
    assert_eq!(old.state, SlotState::Reserved);
    assert_eq!(old.appointment_id, Some(appointment.id));

    let restored = setup.store.get_appointment(appointment.id).await.unwrap();
    assert_eq!(restored.slot_id, Some(old_slot.id));

    // The blocking reservation is untouched.
    let taken = setup.store.get_slot(taken_slot.id).await.unwrap();
    assert_eq!(taken.appointment_id, Some(blocker.id));
}

#[tokio::test]
async fn reschedule_to_elapsed_slot_is_rejected_upfront() {
    let setup = TestSetup::new();
    let old_slot = setup.seed_slot(3, (9, 0), (9, 30)).await;
    let stale_slot = setup.seed_slot(-2, (9, 0), (9, 30)).await;

    let appointment = setup.reservation.reserve(setup.request(old_slot.id)).await.unwrap();
    let result = setup.reservation.reschedule(appointment.id, stale_slot.id).await;
    assert_matches!(result, Err(PlanningError::SlotExpired));

    let old = setup.store.get_slot(old_slot.id).await.unwrap();
    assert_eq!(old.state, SlotState::Reserved);
}

// ==============================================================================
// LIFECYCLE TRANSITIONS
// ==============================================================================

#[tokio::test]
async fn appointment_walks_through_its_lifecycle() {
    let setup = TestSetup::new();
    let slot = setup.seed_slot(3, (9, 0), (9, 30)).await;
    let appointment = setup.reservation.reserve(setup.request(slot.id)).await.unwrap();

    let confirmed = setup
        .reservation
        .transition(appointment.id, AppointmentStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);

    let started = setup
        .reservation
        .transition(appointment.id, AppointmentStatus::InProgress)
        .await
        .unwrap();
    assert_eq!(started.status, AppointmentStatus::InProgress);

    let completed = setup
        .reservation
        .transition(appointment.id, AppointmentStatus::Completed)
        .await
        .unwrap();
    assert_eq!(completed.status, AppointmentStatus::Completed);
}

#[tokio::test]
async fn invalid_transitions_are_rejected() {
    let setup = TestSetup::new();
    let slot = setup.seed_slot(3, (9, 0), (9, 30)).await;
    let appointment = setup.reservation.reserve(setup.request(slot.id)).await.unwrap();

    // PLANNED cannot jump straight to COMPLETED.
    assert_matches!(
        setup
            .reservation
            .transition(appointment.id, AppointmentStatus::Completed)
            .await,
        Err(PlanningError::InvalidStatusTransition(_))
    );

    // An in-progress consultation cannot be cancelled.
    setup
        .reservation
        .transition(appointment.id, AppointmentStatus::Confirmed)
        .await
        .unwrap();
    setup
        .reservation
        .transition(appointment.id, AppointmentStatus::InProgress)
        .await
        .unwrap();
    assert_matches!(
        setup.reservation.release(appointment.id).await,
        Err(PlanningError::InvalidStatusTransition(_))
    );
}

#[tokio::test]
async fn cancelling_a_confirmed_appointment_frees_its_slot() {
    let setup = TestSetup::new();
    let slot = setup.seed_slot(3, (9, 0), (9, 30)).await;
    let appointment = setup.reservation.reserve(setup.request(slot.id)).await.unwrap();

    setup
        .reservation
        .transition(appointment.id, AppointmentStatus::Confirmed)
        .await
        .unwrap();
    let cancelled = setup
        .reservation
        .transition(appointment.id, AppointmentStatus::Cancelled)
        .await
        .unwrap();

    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    let freed = setup.store.get_slot(slot.id).await.unwrap();
    assert_eq!(freed.state, SlotState::Free);
}
