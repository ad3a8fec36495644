//! XML Reader Module
//!
//! Turns tokens into pull-parser events for the document builder:
//! - SliceReader: Zero-copy slice parser
//! - Events: XML event types for pull parsing

pub mod events;
pub mod slice;
