pub mod clock;
pub mod config;
pub mod console;
pub mod error;
pub mod generator;
pub mod hooks;
pub mod models;
pub mod notifier;
pub mod poller;
pub mod remote;
pub mod store;
pub mod sync;

pub use error::SyncError;
pub use models::Report;
pub use sync::{DashboardSync, SyncHandle};
