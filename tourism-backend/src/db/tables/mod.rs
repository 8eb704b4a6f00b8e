//! Table modules - extend Database with domain-specific methods
//!
//! Each module adds `impl Database` blocks with methods for a specific table group.

mod auth;            // auth_sessions
mod bookings;        // bookings
mod homepage_blocks; // homepage_blocks
mod homestays;       // homestays
mod integrations;    // integration_channels, channel_sync_logs
mod menu_items;      // menu_items
mod payments;        // payments
mod services;        // services
mod tours;           // tours
mod users;           // users

pub use homepage_blocks::{PublishOutcome, SaveOutcome, SortOutcome};
pub use payments::PaymentUpdate;
