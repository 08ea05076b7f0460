// libs/planning-cell/src/models.rs
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// CORE SLOT MODELS
// ==============================================================================

/// A discrete bookable time interval for one doctor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub service_id: Uuid,
    pub hospital_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub state: SlotState,
    pub appointment_id: Option<Uuid>,
}

impl Slot {
    pub fn new(
        doctor_id: Uuid,
        service_id: Uuid,
        hospital_id: Uuid,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            doctor_id,
            service_id,
            hospital_id,
            date,
            start_time,
            end_time,
            state: SlotState::Free,
            appointment_id: None,
        }
    }

    pub fn is_free(&self) -> bool {
        self.state == SlotState::Free
    }

    pub fn start_datetime(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    /// Half-open interval overlap on the same calendar date; back-to-back
    /// slots (end == start) do not overlap.
    pub fn overlaps(&self, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> bool {
        self.date == date && self.start_time < end && start < self.end_time
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotState {
    Free,
    Reserved,
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotState::Free => write!(f, "FREE"),
            SlotState::Reserved => write!(f, "RESERVED"),
        }
    }
}

/// A doctor's recurring availability template, input to slot generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingPattern {
    pub service_id: Uuid,
    pub working_days: Vec<Weekday>,
    pub day_start: NaiveTime,
    pub day_end: NaiveTime,
    pub slot_duration_minutes: i32,
    pub blackout_dates: Vec<NaiveDate>,
}

impl WorkingPattern {
    pub fn validate(&self) -> Result<(), PlanningError> {
        if self.working_days.is_empty() {
            return Err(PlanningError::Validation(
                "Working pattern has no working days".to_string(),
            ));
        }
        if self.day_end <= self.day_start {
            return Err(PlanningError::Validation(
                "Daily end time must be after daily start time".to_string(),
            ));
        }
        if self.slot_duration_minutes <= 0 {
            return Err(PlanningError::Validation(
                "Slot duration must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn slot_duration(&self) -> Duration {
        Duration::minutes(self.slot_duration_minutes as i64)
    }
}

// ==============================================================================
// APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub service_id: Uuid,
    pub hospital_id: Uuid,
    /// None for appointments created manually, outside the slot index.
    pub slot_id: Option<Uuid>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub consultation_type: ConsultationType,
    pub motive: String,
    pub urgency: UrgencyLevel,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn scheduled_start(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    pub fn scheduled_end(&self) -> NaiveDateTime {
        self.date.and_time(self.end_time)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Planned,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Statuses a given appointment may move to next.
    pub fn valid_transitions(&self) -> Vec<AppointmentStatus> {
        match self {
            AppointmentStatus::Planned => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Confirmed => vec![
                AppointmentStatus::InProgress,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::InProgress => vec![AppointmentStatus::Completed],
            // Terminal states - no transitions allowed
            AppointmentStatus::Completed => vec![],
            AppointmentStatus::Cancelled => vec![],
        }
    }

    pub fn can_transition_to(&self, next: &AppointmentStatus) -> bool {
        self.valid_transitions().contains(next)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }

    /// Whether an appointment in this status occupies the doctor's schedule
    /// for conflict checking purposes.
    pub fn blocks_schedule(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Planned
                | AppointmentStatus::Confirmed
                | AppointmentStatus::InProgress
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Planned => write!(f, "PLANNED"),
            AppointmentStatus::Confirmed => write!(f, "CONFIRMED"),
            AppointmentStatus::InProgress => write!(f, "IN_PROGRESS"),
            AppointmentStatus::Completed => write!(f, "COMPLETED"),
            AppointmentStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsultationType {
    Consultation,
    FollowUp,
    Checkup,
    Emergency,
}

impl fmt::Display for ConsultationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsultationType::Consultation => write!(f, "CONSULTATION"),
            ConsultationType::FollowUp => write!(f, "FOLLOW_UP"),
            ConsultationType::Checkup => write!(f, "CHECKUP"),
            ConsultationType::Emergency => write!(f, "EMERGENCY"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UrgencyLevel {
    Normal,
    Urgent,
    Critical,
}

impl Default for UrgencyLevel {
    fn default() -> Self {
        UrgencyLevel::Normal
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveSlotRequest {
    pub slot_id: Uuid,
    pub patient_id: Uuid,
    pub consultation_type: ConsultationType,
    pub motive: String,
    #[serde(default)]
    pub urgency: UrgencyLevel,
}

/// Administrative scheduling outside the slot index; the conflict checker
/// is consulted before the appointment is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub service_id: Uuid,
    pub hospital_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub consultation_type: ConsultationType,
    pub motive: String,
    #[serde(default)]
    pub urgency: UrgencyLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleAppointmentRequest {
    pub new_slot_id: Uuid,
}

/// Filter for availability index queries. Free slots only unless
/// `include_reserved` is set (administrative views).
#[derive(Debug, Clone, Default)]
pub struct SlotQuery {
    pub doctor_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub hospital_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub include_reserved: bool,
}

/// Report of one generation run over a horizon.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    /// Newly inserted slots.
    pub created: usize,
    /// Reserved slots in the horizon left untouched.
    pub preserved: usize,
    /// Candidate slots dropped because they overlapped a reserved slot.
    pub suppressed: usize,
    /// Previously existing free slots removed from the horizon.
    pub replaced: usize,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum PlanningError {
    #[error("Slot not found")]
    SlotNotFound,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Slot is no longer available")]
    SlotUnavailable,

    #[error("Slot date and time have already elapsed")]
    SlotExpired,

    #[error("Appointment is already cancelled")]
    AlreadyCancelled,

    #[error("Appointment conflicts with an existing booking")]
    ConflictDetected,

    #[error("Appointment cannot be modified in current status: {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("Validation error: {0}")]
    Validation(String),
}
