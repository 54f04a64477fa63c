pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod relay;
pub mod store;

pub use config::FormRelayConfig;
pub use error::{IngestError, RecordError, RelayError, StoreError};
pub use models::DecodedRecord;
pub use relay::{
    channel_relay, ChannelRelayReceiver, ChannelRelaySender, RelayMessage, RelayReceiver,
    RelaySender, UdpRelayReceiver, UdpRelaySender,
};
pub use store::{DocumentStore, MemoryStore, PgDocumentStore};
