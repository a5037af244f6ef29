//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-crate data structures.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Uses the recorded flight timestamp (seconds, f64) as primary clock
//! - Timestamps come from message payloads (detection time / header stamp), never receipt time

mod config;
mod entity_id;
mod error;
mod event;
mod frame;
mod record;
mod step_policy;
mod value;

pub use config::*;
pub use entity_id::EntityId;
pub use error::*;
pub use event::*;
pub use frame::*;
pub use record::*;
pub use step_policy::*;
pub use value::MessageValue;
