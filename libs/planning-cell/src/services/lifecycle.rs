// libs/planning-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{AppointmentStatus, PlanningError};

/// Validates appointment status transitions against the closed state machine
/// PLANNED -> CONFIRMED -> IN_PROGRESS -> COMPLETED, with cancellation
/// allowed from PLANNED and CONFIRMED only.
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_status_transition(
        &self,
        current_status: &AppointmentStatus,
        new_status: &AppointmentStatus,
    ) -> Result<(), PlanningError> {
        debug!(
            "Validating status transition {} -> {}",
            current_status, new_status
        );

        if !current_status.can_transition_to(new_status) {
            warn!(
                "Invalid status transition attempted: {} -> {}",
                current_status, new_status
            );
            return Err(PlanningError::InvalidStatusTransition(
                current_status.clone(),
            ));
        }

        Ok(())
    }

    pub fn can_cancel(&self, current_status: &AppointmentStatus) -> bool {
        current_status.can_transition_to(&AppointmentStatus::Cancelled)
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}
