//! Sereal v1: single-pass binary serialization for object graphs.
//!
//! This crate encodes and decodes the Sereal binary format, protocol
//! version 1, raw (uncompressed) body encoding.
//!
//! # Overview
//!
//! Sereal is a graph format, not a tree format:
//! - **Pointer sharing**: two references to the same value encode the value
//!   once, with a REFP back-reference for every later occurrence
//! - **Cycles**: self-referential graphs encode in a single forward pass
//! - **Payload dedup**: repeated strings, byte payloads, and class names
//!   collapse into COPY/OBJECTV back-references
//!
//! # Quick Start
//!
//! ```rust
//! use sereal::{decode, encode, node, Value};
//!
//! let graph = node(Value::array([
//!     node(Value::Integer(42)),
//!     node(Value::from("hello")),
//! ]));
//!
//! let bytes = encode(&graph).unwrap();
//! let decoded = decode(&bytes).unwrap();
//! assert_eq!(decoded, graph);
//! ```
//!
//! # Modules
//!
//! - [`model`]: Graph value types ([`Node`], [`Value`])
//! - [`codec`]: The encoder, decoder, and byte-level primitives
//! - [`protocol`]: Wire constants and decoder limits
//! - [`error`]: Error types
//!
//! # Security
//!
//! The decoder handles untrusted input:
//! - Container counts and payload lengths are checked against remaining input
//! - Varints are bounded to 10 bytes and checked for u64 overflow
//! - Nesting and back-reference replay share one depth limit
//!
//! # Wire Format
//!
//! A document is the 6-byte header (`=srl` magic, version/encoding byte,
//! empty header suffix) followed by one tagged value. Back-reference
//! offsets are absolute stream positions, counted from the magic.

pub mod codec;
pub mod error;
pub mod model;
pub mod protocol;

// Re-export commonly used types at crate root
pub use codec::{decode, decode_with_options, encode, DecoderOptions, Encoder, EncoderOptions};
pub use error::{DecodeError, EncodeError};
pub use model::{node, Node, RegexFlags, Value, WeakNode};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Sereal protocol version this crate implements.
pub const PROTOCOL_VERSION: u8 = protocol::PROTOCOL_VERSION;
