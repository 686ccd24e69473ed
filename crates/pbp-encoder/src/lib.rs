#![warn(clippy::pedantic)]

pub mod error;
pub mod encoder;
pub mod template;
pub mod tree;

pub use encoder::ContextEncoder;
pub use error::EncodeError;
pub use template::{Preamble, DEFAULT_TEMPLATE};
