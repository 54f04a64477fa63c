pub mod decode;
pub mod worker;

pub use decode::{decode_payload, decode_payload_at, unquote_plus};
pub use worker::IngestWorker;
