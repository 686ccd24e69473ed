#![warn(clippy::pedantic)]

pub mod error;
pub mod frame;
pub mod metadata;
pub mod scan;
pub mod token;

pub use error::WireError;
pub use frame::TextFrame;
pub use metadata::MetadataHeader;
pub use token::Delimiters;
