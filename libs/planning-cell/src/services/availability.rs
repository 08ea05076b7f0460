// libs/planning-cell/src/services/availability.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use crate::models::{PlanningError, Slot, SlotQuery};
use crate::store::PlanningStore;

/// Read-only discovery surface over stored slots. Results are sorted by date
/// then start time, ascending; free slots only unless the query opts into
/// reserved ones.
pub struct AvailabilityService {
    store: Arc<dyn PlanningStore>,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn PlanningStore>) -> Self {
        Self { store }
    }

    pub async fn find_by_doctor(&self, doctor_id: Uuid) -> Vec<Slot> {
        self.store
            .query_slots(&SlotQuery {
                doctor_id: Some(doctor_id),
                ..Default::default()
            })
            .await
    }

    pub async fn find_by_service(&self, service_id: Uuid) -> Vec<Slot> {
        self.store
            .query_slots(&SlotQuery {
                service_id: Some(service_id),
                ..Default::default()
            })
            .await
    }

    pub async fn find_by_hospital(&self, hospital_id: Uuid) -> Vec<Slot> {
        self.store
            .query_slots(&SlotQuery {
                hospital_id: Some(hospital_id),
                ..Default::default()
            })
            .await
    }

    pub async fn find_by_date(&self, date: NaiveDate) -> Vec<Slot> {
        self.store
            .query_slots(&SlotQuery {
                date: Some(date),
                ..Default::default()
            })
            .await
    }

    pub async fn find_by_date_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Slot>, PlanningError> {
        self.search(SlotQuery {
            from: Some(from),
            to: Some(to),
            ..Default::default()
        })
        .await
    }

    /// Conjunction query over any combination of filter dimensions.
    pub async fn search(&self, query: SlotQuery) -> Result<Vec<Slot>, PlanningError> {
        if let (Some(from), Some(to)) = (query.from, query.to) {
            if to < from {
                return Err(PlanningError::Validation(
                    "Range end must not precede range start".to_string(),
                ));
            }
        }

        let slots = self.store.query_slots(&query).await;
        debug!("Availability query matched {} slots", slots.len());
        Ok(slots)
    }

    /// True iff the slot exists and is FREE.
    pub async fn is_available(&self, slot_id: Uuid) -> bool {
        match self.store.get_slot(slot_id).await {
            Some(slot) => slot.is_free(),
            None => false,
        }
    }

    pub async fn count_available(&self, doctor_id: Uuid, date: NaiveDate) -> usize {
        self.store.count_available(doctor_id, date).await
    }
}
