// libs/planning-cell/src/services/conflict.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::PlanningError;
use crate::store::PlanningStore;

/// Overlap validation for appointments created outside the slot index
/// (administrative manual scheduling) and for reschedule targets.
pub struct ConflictCheckService {
    store: Arc<dyn PlanningStore>,
}

impl ConflictCheckService {
    pub fn new(store: Arc<dyn PlanningStore>) -> Self {
        Self { store }
    }

    /// True iff the proposed interval overlaps an active appointment of the
    /// same doctor. Back-to-back intervals (end == start) do not conflict;
    /// cancelled and completed appointments never block.
    pub async fn has_conflict(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        proposed_start: NaiveTime,
        proposed_end: NaiveTime,
    ) -> Result<bool, PlanningError> {
        if proposed_end <= proposed_start {
            return Err(PlanningError::Validation(
                "Proposed end time must be after start time".to_string(),
            ));
        }

        let existing = self.store.appointments_for_doctor_on(doctor_id, date).await;
        let conflicting = existing
            .iter()
            .filter(|apt| apt.status.blocks_schedule())
            .filter(|apt| {
                Self::intervals_overlap(proposed_start, proposed_end, apt.start_time, apt.end_time)
            })
            .count();

        if conflicting > 0 {
            warn!(
                "Conflict detected for doctor {} on {}: {} overlapping appointments",
                doctor_id, date, conflicting
            );
        } else {
            debug!("No conflict for doctor {} on {}", doctor_id, date);
        }

        Ok(conflicting > 0)
    }

    /// Fails with `ConflictDetected` when the interval is taken.
    pub async fn assert_no_conflict(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        proposed_start: NaiveTime,
        proposed_end: NaiveTime,
    ) -> Result<(), PlanningError> {
        if self
            .has_conflict(doctor_id, date, proposed_start, proposed_end)
            .await?
        {
            return Err(PlanningError::ConflictDetected);
        }
        Ok(())
    }

    fn intervals_overlap(
        start1: NaiveTime,
        end1: NaiveTime,
        start2: NaiveTime,
        end2: NaiveTime,
    ) -> bool {
        // Two intervals overlap if: start1 < end2 AND start2 < end1
        start1 < end2 && start2 < end1
    }
}
