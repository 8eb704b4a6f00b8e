//! Outbound relays to n8n and the channel sync log

pub mod n8n_client;
pub mod retry;
pub mod sync_log;

pub use n8n_client::{N8nClient, SECRET_HEADER};
pub use sync_log::log_channel_sync_event;
