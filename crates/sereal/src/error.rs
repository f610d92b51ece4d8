//! Error types for Sereal encoding and decoding.

use thiserror::Error;

/// Error during encoding.
///
/// Both variants are terminal: the encoder's buffer is left in an
/// offset-inconsistent state and must be cleared with `reset()` before the
/// encoder is used again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The value matched no dispatch rule. Detected structurally: the
    /// dispatch pass emitted zero bytes for it.
    #[error("don't know how to encode: {kind}")]
    UnsupportedValue { kind: &'static str },

    /// A short-form emitter received a payload exceeding its packed length
    /// field. Signals misuse of a low-level entry point.
    #[error("{len} byte payload exceeds short binary maximum of {max}")]
    OversizeShortPayload { len: usize, max: usize },
}

/// Error during decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid magic bytes: expected =srl, found {found:?}")]
    InvalidMagic { found: [u8; 4] },

    #[error("unsupported protocol version: {version}")]
    UnsupportedVersion { version: u8 },

    #[error("unsupported document encoding: {encoding}")]
    UnsupportedEncoding { encoding: u8 },

    #[error("unexpected end of input while reading {context}")]
    UnexpectedEof { context: &'static str },

    #[error("varint exceeds maximum length (10 bytes)")]
    VarintTooLong,

    #[error("varint overflow (value exceeds u64)")]
    VarintOverflow,

    #[error("varint value {value} exceeds the signed integer range")]
    IntegerOutOfRange { value: u64 },

    #[error("invalid UTF-8 in {field}")]
    InvalidUtf8 { field: &'static str },

    #[error("unknown tag byte {tag:#04x} at offset {offset}")]
    UnknownTag { tag: u8, offset: u64 },

    #[error("{field} length {len} exceeds remaining input ({remaining} bytes)")]
    LengthExceedsInput {
        field: &'static str,
        len: usize,
        remaining: usize,
    },

    #[error("back-reference to offset {offset}, which holds no tracked value")]
    DanglingBackref { offset: u64 },

    #[error("back-reference target offset {offset} is outside the document")]
    OffsetOutOfRange { offset: u64 },

    #[error("nesting depth exceeds maximum ({max})")]
    DepthExceeded { max: usize },
}
