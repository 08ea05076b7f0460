// libs/planning-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::handlers;
use crate::PlanningState;

pub fn planning_routes(state: Arc<PlanningState>) -> Router {
    Router::new()
        // Slot generation
        .route("/generate", post(handlers::generate_plannings))
        .route("/patterns/{doctor_id}", put(handlers::register_working_pattern))
        // Availability discovery
        .route("/creneaux-disponibles", get(handlers::get_available_slots))
        .route("/creneaux-disponibles/date", get(handlers::get_available_slots_by_date))
        .route("/disponible/{slot_id}", get(handlers::is_slot_available))
        .route("/count/disponibles", get(handlers::count_available_slots))
        // Reservation
        .route("/reserver", post(handlers::reserve_slot))
        .route("/liberer/{slot_id}", put(handlers::release_slot))
        .with_state(state)
}

pub fn appointment_routes(state: Arc<PlanningState>) -> Router {
    Router::new()
        .route("/", post(handlers::create_appointment))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/patients/{patient_id}", get(handlers::get_patient_appointments))
        .route("/doctors/{doctor_id}", get(handlers::get_doctor_appointments))
        .route("/conflicts/check", get(handlers::check_appointment_conflicts))
        // Lifecycle
        .route("/{appointment_id}/reschedule", patch(handlers::reschedule_appointment))
        .route("/{appointment_id}/confirmer", patch(handlers::confirm_appointment))
        .route("/{appointment_id}/commencer", patch(handlers::start_appointment))
        .route("/{appointment_id}/terminer", patch(handlers::complete_appointment))
        .route("/{appointment_id}/annuler", patch(handlers::cancel_appointment))
        .with_state(state)
}
