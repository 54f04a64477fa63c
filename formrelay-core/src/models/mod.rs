pub mod record;

pub use record::{DecodedRecord, TIMESTAMP_FIELD, TIMESTAMP_FORMAT};
