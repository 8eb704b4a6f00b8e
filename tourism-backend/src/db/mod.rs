mod sqlite;
mod tables;

pub use sqlite::Database;
pub(crate) use sqlite::{
    now_rfc3339, parse_date, parse_enum, parse_json, parse_optional_timestamp, parse_timestamp,
};
pub use tables::{PaymentUpdate, PublishOutcome, SaveOutcome, SortOutcome};
