//! Data models for customer import.

pub mod customer;
pub mod outcome;

pub use customer::{CustomerRecord, PartnerFields};
pub use outcome::{ImportResult, RunReport};
