pub mod availability;
pub mod conflict;
pub mod generator;
pub mod lifecycle;
pub mod reservation;

pub use availability::AvailabilityService;
pub use conflict::ConflictCheckService;
pub use generator::SlotGeneratorService;
pub use lifecycle::AppointmentLifecycleService;
pub use reservation::ReservationService;
