pub mod client;
pub mod config;
pub mod error;
pub mod inbound;
pub mod outbound;
pub mod sink;

pub use client::{BackfillCursor, BridgeClient, BridgeHandle, DEFAULT_BACKFILL_COUNT};
pub use config::{load_settings, load_settings_from, BridgeSettings};
pub use error::{bridge_error, error_code, BridgeResult};
pub use inbound::InboundTranslator;
pub use sink::{ChannelSink, DiscardSink, EventSink};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
