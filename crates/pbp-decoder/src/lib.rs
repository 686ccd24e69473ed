#![warn(clippy::pedantic)]

pub mod error;
pub mod decoder;
pub mod incremental;
pub mod part_buffer;
pub mod streaming;

pub use decoder::{BlockDecoder, DecodedText, Segment};
pub use error::DecodeError;
pub use incremental::{Emission, IncrementalDecoder, OpenBlock};
pub use part_buffer::PartBuffer;
pub use streaming::{FragmentSource, StreamingDecoder, TextChunks};
