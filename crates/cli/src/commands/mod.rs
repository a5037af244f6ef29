//! Command implementations.

mod events;
mod info;
mod run;
mod validate;

pub use events::run_events;
pub use info::run_info;
pub use run::run_replay;
pub use validate::run_validate;
