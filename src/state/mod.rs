// Persistent state: the JSON config file and the legacy importer
pub mod legacy;
pub mod store;


pub use store::{ConfigState, ConfigStore, StoreLock};
