pub mod backup;
pub mod cli;
pub mod error;
pub mod schedule;
pub mod server;
pub mod state;

pub use error::{BackupError, Result};
