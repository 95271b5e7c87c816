//! Command handlers for the Handbook CLI.

pub mod ask;
pub mod status;
pub mod sync;

pub use ask::AskCommand;
pub use status::StatusCommand;
pub use sync::SyncCommand;
