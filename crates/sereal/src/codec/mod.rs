//! Binary codec for the Sereal format.
//!
//! [`primitives`] holds the byte-level writer/reader, [`track`] the offset
//! tables behind back-references, [`encode`] the single-pass graph encoder,
//! and [`decode`] its inverse.

pub mod decode;
pub mod encode;
pub mod primitives;
pub mod track;

pub use decode::{decode, decode_with_options, DecoderOptions};
pub use encode::{encode, Encoder, EncoderOptions};
pub use primitives::{zigzag_decode, zigzag_encode, Reader, Writer};
