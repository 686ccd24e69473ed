#![warn(clippy::pedantic)]

pub mod config;
pub mod diff;
pub mod error;
pub mod present;
pub mod render_markdown;
pub mod storage;

pub use config::DriverConfig;
pub use error::DriverError;
pub use present::{normalize, present, write_all, write_back, Presentation};
pub use storage::{DiskStorage, MemoryStorage, Storage};
