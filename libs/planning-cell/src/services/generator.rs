// libs/planning-cell/src/services/generator.rs
use std::sync::Arc;

use chrono::{Datelike, Duration, Local, NaiveDate};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{GenerationOutcome, PlanningError, Slot, WorkingPattern};
use crate::store::PlanningStore;

/// One doctor's entry in a batch generation run.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub doctor_id: Uuid,
    pub hospital_id: Uuid,
    pub pattern: WorkingPattern,
}

pub struct SlotGeneratorService {
    store: Arc<dyn PlanningStore>,
}

impl SlotGeneratorService {
    pub fn new(store: Arc<dyn PlanningStore>) -> Self {
        Self { store }
    }

    /// Generate slots for one doctor over `[horizon_start, horizon_end]`.
    ///
    /// Free slots already present in the horizon are replaced; reserved slots
    /// are preserved untouched and candidate slots overlapping them are
    /// suppressed. Dates already elapsed are skipped, never regenerated.
    pub async fn generate(
        &self,
        doctor_id: Uuid,
        hospital_id: Uuid,
        pattern: &WorkingPattern,
        horizon_start: NaiveDate,
        horizon_end: NaiveDate,
    ) -> Result<GenerationOutcome, PlanningError> {
        if horizon_end < horizon_start {
            return Err(PlanningError::Validation(
                "Horizon end must not precede horizon start".to_string(),
            ));
        }
        pattern.validate()?;

        debug!(
            "Generating slots for doctor {} from {} to {}",
            doctor_id, horizon_start, horizon_end
        );

        let today = Local::now().date_naive();
        let mut candidates = Vec::new();
        let mut date = horizon_start;
        while date <= horizon_end {
            if date >= today && self.is_working_date(pattern, date) {
                self.build_day_slots(doctor_id, hospital_id, pattern, date, &mut candidates);
            }
            date += Duration::days(1);
        }

        let outcome = self
            .store
            .replace_free_slots(doctor_id, horizon_start, horizon_end, candidates)
            .await;

        info!(
            "Generated {} slots for doctor {} ({} preserved, {} suppressed, {} replaced)",
            outcome.created, doctor_id, outcome.preserved, outcome.suppressed, outcome.replaced
        );
        Ok(outcome)
    }

    /// Generate over the default rolling horizon: tomorrow through
    /// `horizon_days` from today. Elapsed free slots are purged first.
    pub async fn generate_default(
        &self,
        doctor_id: Uuid,
        hospital_id: Uuid,
        pattern: &WorkingPattern,
        horizon_days: i64,
    ) -> Result<GenerationOutcome, PlanningError> {
        if horizon_days <= 0 {
            return Err(PlanningError::Validation(
                "Planning horizon must span at least one day".to_string(),
            ));
        }

        let today = Local::now().date_naive();
        let purged = self.store.purge_elapsed(today).await;
        if purged > 0 {
            info!("Purged {} elapsed free slots", purged);
        }

        self.generate(
            doctor_id,
            hospital_id,
            pattern,
            today + Duration::days(1),
            today + Duration::days(horizon_days),
        )
        .await
    }

    /// Batch run over several doctors. A doctor whose pattern fails
    /// validation is logged and skipped; the batch continues.
    pub async fn generate_batch(
        &self,
        requests: Vec<GenerationRequest>,
        horizon_start: NaiveDate,
        horizon_end: NaiveDate,
    ) -> Vec<(Uuid, GenerationOutcome)> {
        let mut outcomes = Vec::with_capacity(requests.len());
        for request in requests {
            match self
                .generate(
                    request.doctor_id,
                    request.hospital_id,
                    &request.pattern,
                    horizon_start,
                    horizon_end,
                )
                .await
            {
                Ok(outcome) => outcomes.push((request.doctor_id, outcome)),
                Err(err) => {
                    warn!(
                        "Skipping slot generation for doctor {}: {}",
                        request.doctor_id, err
                    );
                }
            }
        }
        outcomes
    }

    fn is_working_date(&self, pattern: &WorkingPattern, date: NaiveDate) -> bool {
        pattern.working_days.contains(&date.weekday())
            && !pattern.blackout_dates.contains(&date)
    }

    /// Partition `[day_start, day_end)` into consecutive slots of the
    /// pattern's duration. A trailing partial interval is dropped.
    fn build_day_slots(
        &self,
        doctor_id: Uuid,
        hospital_id: Uuid,
        pattern: &WorkingPattern,
        date: NaiveDate,
        out: &mut Vec<Slot>,
    ) {
        let duration = pattern.slot_duration();
        let mut cursor = pattern.day_start;
        loop {
            let (slot_end, wrapped) = cursor.overflowing_add_signed(duration);
            if wrapped != 0 || slot_end > pattern.day_end {
                break;
            }
            out.push(Slot::new(
                doctor_id,
                pattern.service_id,
                hospital_id,
                date,
                cursor,
                slot_end,
            ));
            cursor = slot_end;
        }
    }
}
