pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use models::*;
pub use services::*;
pub use store::{InMemoryPlanningStore, PlanningStore};

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use shared_config::AppConfig;

/// Shared state for the planning cell: the slot store plus the per-doctor
/// working patterns that drive generation. Patterns are owned by the doctor
/// administration domain; this registry is the engine's injection point.
pub struct PlanningState {
    pub config: AppConfig,
    pub store: Arc<dyn PlanningStore>,
    patterns: RwLock<HashMap<Uuid, WorkingPattern>>,
}

impl PlanningState {
    pub fn new(config: AppConfig) -> Self {
        Self::with_store(config, Arc::new(InMemoryPlanningStore::new()))
    }

    pub fn with_store(config: AppConfig, store: Arc<dyn PlanningStore>) -> Self {
        Self {
            config,
            store,
            patterns: RwLock::new(HashMap::new()),
        }
    }

    pub async fn register_pattern(&self, doctor_id: Uuid, pattern: WorkingPattern) {
        let mut patterns = self.patterns.write().await;
        patterns.insert(doctor_id, pattern);
    }

    pub async fn pattern_for(&self, doctor_id: Uuid) -> Option<WorkingPattern> {
        let patterns = self.patterns.read().await;
        patterns.get(&doctor_id).cloned()
    }
}
