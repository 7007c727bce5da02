//! Import/export adapters for the schedule set.
//!
//! CSV round-trips and bulk-text entry share one weekday synonym table, so
//! a day set always parses and prints the same way regardless of how it
//! entered the system.

pub mod bulk;
pub mod csv;
pub mod weekday;

pub use bulk::BulkReport;
pub use csv::ImportReport;
