//! Wire constants for the Sereal v1 protocol.
//!
//! Tag values, header bytes, bit masks, and the safety limits the decoder
//! enforces on untrusted input.

/// Magic bytes at the start of every document (`"=srl"`).
pub const MAGIC: [u8; 4] = [0x3D, 0x73, 0x72, 0x6C];

/// Protocol version implemented by this crate.
pub const PROTOCOL_VERSION: u8 = 1;

/// Version/encoding byte: protocol 1 in the low nibble, raw (uncompressed)
/// encoding in the high nibble.
pub const VERSION_RAW: u8 = 0x01;

/// Header length: magic + version/encoding byte + header-suffix length byte.
pub const HEADER_LEN: usize = 6;

/// High bit of a tag byte, set retroactively when the tag becomes the target
/// of a back-reference.
pub const TRACK_FLAG: u8 = 0x80;

/// Mask recovering the tag value from a possibly-tracked tag byte.
pub const TAG_MASK: u8 = 0x7F;

// =============================================================================
// TAGS
// =============================================================================

/// Small positive integers 0..=15 are the tag byte itself.
pub const TAG_POS_0: u8 = 0x00;
/// Upper bound (inclusive) of the packed positive integer range.
pub const TAG_POS_15: u8 = 0x0F;
/// Small negative integers -16..=-1 are encoded as `value + 32`.
pub const TAG_NEG_16: u8 = 0x10;
/// Upper bound (inclusive) of the packed negative integer range.
pub const TAG_NEG_1: u8 = 0x1F;

pub const TAG_VARINT: u8 = 0x20;
pub const TAG_ZIGZAG: u8 = 0x21;
pub const TAG_FLOAT: u8 = 0x22;
pub const TAG_DOUBLE: u8 = 0x23;
pub const TAG_UNDEF: u8 = 0x25;
pub const TAG_BINARY: u8 = 0x26;
pub const TAG_STR_UTF8: u8 = 0x27;
pub const TAG_REFN: u8 = 0x28;
pub const TAG_REFP: u8 = 0x29;
pub const TAG_HASH: u8 = 0x2A;
pub const TAG_ARRAY: u8 = 0x2B;
pub const TAG_OBJECT: u8 = 0x2C;
pub const TAG_OBJECTV: u8 = 0x2D;
pub const TAG_ALIAS: u8 = 0x2E;
pub const TAG_COPY: u8 = 0x2F;
pub const TAG_WEAKEN: u8 = 0x30;
pub const TAG_REGEXP: u8 = 0x31;
pub const TAG_FALSE: u8 = 0x3A;
pub const TAG_TRUE: u8 = 0x3B;

/// Base tag for byte payloads of length 0..=31; the length lives in the low
/// five bits.
pub const TAG_SHORT_BINARY_0: u8 = 0x60;

/// Maximum payload length representable by a SHORT_BINARY tag.
pub const SHORT_BINARY_MAX_LEN: usize = 31;

/// Mask recovering the length from a SHORT_BINARY tag.
pub const SHORT_BINARY_LEN_MASK: u8 = 0x1F;

// =============================================================================
// LIMITS
// =============================================================================

/// Maximum bytes in a varint (64-bit payload, 7 bits per byte).
pub const MAX_VARINT_BYTES: usize = 10;

/// Maximum nesting depth the decoder will follow, counting containers,
/// reference wrappers, and back-reference replays.
pub const MAX_DEPTH: usize = 512;
