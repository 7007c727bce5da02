//! Recurring schedule engine: model, occurrence resolution, notification
//! state tracking, the minute-aligned clock, and persistence.

pub mod clock;
pub mod model;
pub mod occurrence;
pub mod store;
pub mod tracker;

pub use clock::{NotificationClock, TickEntry};
pub use model::{NotifyStage, Repeat, Schedule};
pub use occurrence::Occurrence;
pub use store::{JsonFileStore, MemoryStore, ScheduleBook, ScheduleStore, StoreEvent};
