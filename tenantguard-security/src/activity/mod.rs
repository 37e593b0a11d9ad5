//! Suspicious cross-tenant activity tracking.
//!
//! Each user has a sliding window of cross-tenant requests. Expired records
//! are dropped when the next request arrives; there is no background sweep.

mod store;
mod tracker;

pub use store::{ActivityStore, DEFAULT_PRUNE_INTERVAL, InMemoryActivityStore};
pub use tracker::{ActivityAssessment, ActivityState, CrossTenantRequestRecord};
