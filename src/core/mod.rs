//! Core XML parsing primitives
//!
//! This module contains the fundamental building blocks for descriptor parsing:
//! - Scanner: SIMD-accelerated delimiter detection using memchr
//! - Tokenizer: Strict state machine for XML token extraction
//! - Entities: XML entity decoding with Cow (zero-copy when possible)
//! - Attributes: Attribute parsing and extraction
//! - Encoding: BOM and declaration sniffing, conversion to UTF-8 via encoding_rs

pub mod attributes;
pub mod encoding;
pub mod entities;
pub mod scanner;
pub mod tokenizer;
