// libs/planning-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{
    AppointmentStatus, CreateAppointmentRequest, PlanningError, RescheduleAppointmentRequest,
    ReserveSlotRequest, Slot, SlotQuery, WorkingPattern,
};
use crate::services::{AvailabilityService, ConflictCheckService, ReservationService, SlotGeneratorService};
use crate::PlanningState;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateParams {
    pub doctor_id: Uuid,
    pub hospital_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityParams {
    pub date_debut: NaiveDate,
    pub date_fin: NaiveDate,
    pub doctor_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub hospital_id: Option<Uuid>,
    #[serde(default)]
    pub include_reserved: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityByDateParams {
    pub date: NaiveDate,
    pub doctor_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub hospital_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountParams {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictParams {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Working pattern registration body. Omitted scheduling fields fall back to
/// the configured hospital defaults.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingPatternRequest {
    pub service_id: Uuid,
    pub working_days: Option<Vec<Weekday>>,
    pub day_start: Option<NaiveTime>,
    pub day_end: Option<NaiveTime>,
    pub slot_duration_minutes: Option<i32>,
    #[serde(default)]
    pub blackout_dates: Vec<NaiveDate>,
}

// ==============================================================================
// PLANNING HANDLERS
// ==============================================================================

/// Trigger slot generation for one doctor over the default rolling horizon.
#[axum::debug_handler]
pub async fn generate_plannings(
    State(state): State<Arc<PlanningState>>,
    Query(params): Query<GenerateParams>,
) -> Result<String, AppError> {
    let pattern = state.pattern_for(params.doctor_id).await.ok_or_else(|| {
        AppError::NotFound(format!(
            "No working pattern registered for doctor {}",
            params.doctor_id
        ))
    })?;

    let generator = SlotGeneratorService::new(Arc::clone(&state.store));
    let outcome = generator
        .generate_default(
            params.doctor_id,
            params.hospital_id,
            &pattern,
            state.config.planning_horizon_days,
        )
        .await
        .map_err(planning_error)?;

    Ok(format!(
        "Planning generated: {} slots created, {} reserved slots preserved, {} suppressed",
        outcome.created, outcome.preserved, outcome.suppressed
    ))
}

/// Register or replace the working pattern used to generate a doctor's slots.
#[axum::debug_handler]
pub async fn register_working_pattern(
    State(state): State<Arc<PlanningState>>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<WorkingPatternRequest>,
) -> Result<Json<Value>, AppError> {
    let pattern = WorkingPattern {
        service_id: request.service_id,
        working_days: request.working_days.unwrap_or_else(default_working_days),
        day_start: request.day_start.unwrap_or(state.config.workday_start),
        day_end: request.day_end.unwrap_or(state.config.workday_end),
        slot_duration_minutes: request
            .slot_duration_minutes
            .unwrap_or(state.config.default_slot_duration_minutes),
        blackout_dates: request.blackout_dates,
    };
    pattern.validate().map_err(planning_error)?;

    state.register_pattern(doctor_id, pattern.clone()).await;

    Ok(Json(json!({
        "success": true,
        "doctorId": doctor_id,
        "pattern": pattern
    })))
}

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<PlanningState>>,
    Query(params): Query<AvailabilityParams>,
) -> Result<Json<Vec<Slot>>, AppError> {
    let availability = AvailabilityService::new(Arc::clone(&state.store));
    let slots = availability
        .search(SlotQuery {
            doctor_id: params.doctor_id,
            service_id: params.service_id,
            hospital_id: params.hospital_id,
            date: None,
            from: Some(params.date_debut),
            to: Some(params.date_fin),
            include_reserved: params.include_reserved,
        })
        .await
        .map_err(planning_error)?;

    Ok(Json(slots))
}

#[axum::debug_handler]
pub async fn get_available_slots_by_date(
    State(state): State<Arc<PlanningState>>,
    Query(params): Query<AvailabilityByDateParams>,
) -> Result<Json<Vec<Slot>>, AppError> {
    let availability = AvailabilityService::new(Arc::clone(&state.store));
    let slots = availability
        .search(SlotQuery {
            doctor_id: params.doctor_id,
            service_id: params.service_id,
            hospital_id: params.hospital_id,
            date: Some(params.date),
            ..Default::default()
        })
        .await
        .map_err(planning_error)?;

    Ok(Json(slots))
}

#[axum::debug_handler]
pub async fn is_slot_available(
    State(state): State<Arc<PlanningState>>,
    Path(slot_id): Path<Uuid>,
) -> Json<bool> {
    let availability = AvailabilityService::new(Arc::clone(&state.store));
    Json(availability.is_available(slot_id).await)
}

#[axum::debug_handler]
pub async fn count_available_slots(
    State(state): State<Arc<PlanningState>>,
    Query(params): Query<CountParams>,
) -> Json<usize> {
    let availability = AvailabilityService::new(Arc::clone(&state.store));
    Json(availability.count_available(params.doctor_id, params.date).await)
}

#[axum::debug_handler]
pub async fn reserve_slot(
    State(state): State<Arc<PlanningState>>,
    Json(request): Json<ReserveSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let reservation = ReservationService::new(Arc::clone(&state.store));

    let appointment = reservation.reserve(request).await.map_err(|e| match e {
        PlanningError::SlotNotFound => AppError::NotFound("Slot not found".to_string()),
        PlanningError::SlotUnavailable => {
            AppError::Conflict("Slot is no longer available".to_string())
        }
        PlanningError::SlotExpired => {
            AppError::Conflict("Slot date and time have already elapsed".to_string())
        }
        other => planning_error(other),
    })?;

    Ok(Json(json!(appointment)))
}

/// Release a reserved slot. Releasing an already-free slot reports the
/// cancellation conflict instead of failing hard.
#[axum::debug_handler]
pub async fn release_slot(
    State(state): State<Arc<PlanningState>>,
    Path(slot_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let reservation = ReservationService::new(Arc::clone(&state.store));
    let appointment = reservation
        .release_slot(slot_id)
        .await
        .map_err(planning_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

/// Manual appointment creation for administrative scheduling; guarded by the
/// conflict checker.
#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<PlanningState>>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let reservation = ReservationService::new(Arc::clone(&state.store));
    let appointment = reservation
        .create_manual(request)
        .await
        .map_err(planning_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<PlanningState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .store
        .get_appointment(appointment_id)
        .await
        .ok_or_else(|| AppError::NotFound("Appointment not found".to_string()))?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn get_patient_appointments(
    State(state): State<Arc<PlanningState>>,
    Path(patient_id): Path<Uuid>,
) -> Json<Value> {
    let appointments = state.store.appointments_for_patient(patient_id).await;
    Json(json!(appointments))
}

#[axum::debug_handler]
pub async fn get_doctor_appointments(
    State(state): State<Arc<PlanningState>>,
    Path(doctor_id): Path<Uuid>,
) -> Json<Value> {
    let appointments = state.store.appointments_for_doctor(doctor_id).await;
    Json(json!(appointments))
}

#[axum::debug_handler]
pub async fn check_appointment_conflicts(
    State(state): State<Arc<PlanningState>>,
    Query(params): Query<ConflictParams>,
) -> Result<Json<bool>, AppError> {
    let conflicts = ConflictCheckService::new(Arc::clone(&state.store));
    let has_conflict = conflicts
        .has_conflict(
            params.doctor_id,
            params.date,
            params.start_time,
            params.end_time,
        )
        .await
        .map_err(planning_error)?;

    Ok(Json(has_conflict))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<PlanningState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let reservation = ReservationService::new(Arc::clone(&state.store));
    let appointment = reservation
        .reschedule(appointment_id, request.new_slot_id)
        .await
        .map_err(planning_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn confirm_appointment(
    State(state): State<Arc<PlanningState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    transition_appointment(state, appointment_id, AppointmentStatus::Confirmed).await
}

#[axum::debug_handler]
pub async fn start_appointment(
    State(state): State<Arc<PlanningState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    transition_appointment(state, appointment_id, AppointmentStatus::InProgress).await
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<PlanningState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    transition_appointment(state, appointment_id, AppointmentStatus::Completed).await
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<PlanningState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    transition_appointment(state, appointment_id, AppointmentStatus::Cancelled).await
}

async fn transition_appointment(
    state: Arc<PlanningState>,
    appointment_id: Uuid,
    new_status: AppointmentStatus,
) -> Result<Json<Value>, AppError> {
    let reservation = ReservationService::new(Arc::clone(&state.store));
    let appointment = reservation
        .transition(appointment_id, new_status)
        .await
        .map_err(planning_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

// ==============================================================================
// HELPERS
// ==============================================================================

fn default_working_days() -> Vec<Weekday> {
    vec![
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ]
}

fn planning_error(err: PlanningError) -> AppError {
    match err {
        PlanningError::SlotNotFound => AppError::NotFound("Slot not found".to_string()),
        PlanningError::AppointmentNotFound => {
            AppError::NotFound("Appointment not found".to_string())
        }
        PlanningError::SlotUnavailable => {
            AppError::Conflict("Slot is no longer available".to_string())
        }
        PlanningError::SlotExpired => {
            AppError::Conflict("Slot date and time have already elapsed".to_string())
        }
        PlanningError::AlreadyCancelled => {
            AppError::Conflict("Appointment is already cancelled".to_string())
        }
        PlanningError::ConflictDetected => {
            AppError::Conflict("Appointment conflicts with an existing booking".to_string())
        }
        PlanningError::InvalidStatusTransition(status) => AppError::Conflict(format!(
            "Appointment cannot be modified in current status: {}",
            status
        )),
        PlanningError::Validation(msg) => AppError::ValidationError(msg),
    }
}
