//! Homepage CMS: block field schemas and section ordering/sync rules

pub mod sections;

pub use sections::{normalized_order, plan_sync, validate_fields, SyncPlan};
