#![warn(clippy::pedantic)]

pub mod error;
pub mod kind;
pub mod lang;
pub mod identity;
pub mod file;
pub mod snippet;
pub mod terminal_log;
pub mod block;

pub use block::Block;
pub use error::TypeError;
pub use file::FileBlock;
pub use identity::FileIdentity;
pub use kind::BlockKind;
pub use lang::Lang;
pub use snippet::SnippetBlock;
pub use terminal_log::TerminalLogBlock;
