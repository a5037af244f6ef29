//! # Ingestion
//!
//! Bag ingestion module.
//!
//! Responsibilities:
//! - Resolve bag archives (`.tgz`) to the contained MCAP log
//! - Iterate raw channel records out of the container
//! - Parse concatenated ros2msg channel schemas
//! - Decode CDR payloads into `MessageValue` trees, patching stale
//!   perception schemas once on failure
//!
//! ## Usage Example
//!
//! ```ignore
//! use std::path::Path;
//! use ingestion::{resolve_bag_path, BagReader, DecoderSet};
//!
//! let log = resolve_bag_path(Path::new("flight_0.tgz"))?;
//! let reader = BagReader::open(&log)?;
//! let mut decoders = DecoderSet::new(config.topics.perception.clone());
//!
//! for record in reader.records_on_topics(&config.subscribed_topics())? {
//!     let record = record?;
//!     if let Some(value) = decoders.decode(&record)? {
//!         // hand (topic, value) to the normalizer
//!     }
//! }
//! ```

mod cdr;
mod decoder;
mod error;
mod locate;
mod reader;
mod schema;

// Re-exports
pub use cdr::{CdrCursor, CdrWriter};
pub use contracts::{ChannelDescriptor, MessageValue, RawRecord};
pub use decoder::{DecodeStats, DecodeStatsSnapshot, DecoderSet, MessageDecoder};
pub use error::{DecodeError, Result};
pub use locate::{resolve_bag_path, CONTAINED_LOG_NAME};
pub use reader::{BagReader, ChannelInfo, RecordIter};
pub use schema::{Arity, FieldType, MessageSchema, Primitive, StructDef};
