// Server records and the registry that owns them
pub mod config;
pub mod registry;


pub use config::{validate_name, Auth, ServerRecord, DEFAULT_SSH_PORT, DEFAULT_SSH_USER};
pub use registry::{Selection, ServerRegistry};
