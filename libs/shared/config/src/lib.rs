use std::env;

use chrono::NaiveTime;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub planning_horizon_days: i64,
    pub default_slot_duration_minutes: i32,
    pub workday_start: NaiveTime,
    pub workday_end: NaiveTime,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            planning_horizon_days: env::var("PLANNING_HORIZON_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| {
                    warn!("PLANNING_HORIZON_DAYS not set, using 30");
                    30
                }),
            default_slot_duration_minutes: env::var("DEFAULT_SLOT_DURATION_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| {
                    warn!("DEFAULT_SLOT_DURATION_MINUTES not set, using 30");
                    30
                }),
            workday_start: parse_time_var("WORKDAY_START", NaiveTime::from_hms_opt(8, 0, 0).unwrap()),
            workday_end: parse_time_var("WORKDAY_END", NaiveTime::from_hms_opt(17, 0, 0).unwrap()),
        };

        if !config.is_valid() {
            warn!("Planning configuration is inconsistent - default working patterns will be rejected");
        }

        config
    }

    pub fn is_valid(&self) -> bool {
        self.planning_horizon_days > 0
            && self.default_slot_duration_minutes > 0
            && self.workday_start < self.workday_end
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            planning_horizon_days: 30,
            default_slot_duration_minutes: 30,
            workday_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            workday_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        }
    }
}

fn parse_time_var(name: &str, default: NaiveTime) -> NaiveTime {
    match env::var(name) {
        Ok(raw) => NaiveTime::parse_from_str(&raw, "%H:%M:%S").unwrap_or_else(|_| {
            warn!("{} is not a valid HH:MM:SS time, using {}", name, default);
            default
        }),
        Err(_) => default,
    }
}
