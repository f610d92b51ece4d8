//! Graph decoding for the Sereal binary format.
//!
//! Rebuilds a value graph from a document, including shared identity and
//! cycles. Container nodes are registered at their tag offset before their
//! children are decoded, so a back-reference into a container that is still
//! being filled resolves to the right node. COPY and OBJECTV replay the
//! bytes at their target offset with a positioned sub-reader; all replays
//! and nesting count against one depth limit, so malicious input cannot
//! recurse unboundedly.

use rustc_hash::FxHashMap;

use crate::codec::primitives::Reader;
use crate::error::DecodeError;
use crate::model::{node, Node, RegexFlags, Value};
use crate::protocol::{
    MAGIC, MAX_DEPTH, PROTOCOL_VERSION, SHORT_BINARY_LEN_MASK, TAG_ALIAS, TAG_ARRAY, TAG_BINARY,
    TAG_COPY, TAG_DOUBLE, TAG_FALSE, TAG_FLOAT, TAG_HASH, TAG_MASK, TAG_NEG_16, TAG_OBJECT,
    TAG_OBJECTV, TAG_POS_15, TAG_REFN, TAG_REFP, TAG_REGEXP, TAG_SHORT_BINARY_0, TAG_STR_UTF8,
    TAG_TRUE, TAG_UNDEF, TAG_VARINT, TAG_WEAKEN, TAG_ZIGZAG, TRACK_FLAG,
};

/// Options for decoding documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecoderOptions {
    /// Mirror of the encoder's unwrapped-reference mode.
    ///
    /// In the default mode a REFN directly wrapping an array or hash is
    /// collapsed into the container itself, undoing the encoder's implicit
    /// wrapping. In unwrapped mode every REFN decodes to a [`Value::Ref`].
    pub unwrapped_references: bool,
}

/// Decodes a Sereal v1 document with default options.
pub fn decode(input: &[u8]) -> Result<Node, DecodeError> {
    decode_with_options(input, DecoderOptions::default())
}

/// Decodes a Sereal v1 document.
pub fn decode_with_options(input: &[u8], options: DecoderOptions) -> Result<Node, DecodeError> {
    let mut reader = Reader::new(input);

    let magic = reader.read_bytes(4, "magic")?;
    if magic != MAGIC {
        // SAFETY: read_bytes guarantees exactly 4 bytes, try_into always succeeds
        return Err(DecodeError::InvalidMagic {
            found: magic.try_into().unwrap(),
        });
    }

    let version_byte = reader.read_byte("version")?;
    let version = version_byte & 0x0F;
    let encoding = version_byte >> 4;
    if version != PROTOCOL_VERSION {
        return Err(DecodeError::UnsupportedVersion { version });
    }
    if encoding != 0 {
        return Err(DecodeError::UnsupportedEncoding { encoding });
    }

    let suffix_len = reader.read_varint("header suffix length")? as usize;
    if suffix_len > reader.remaining_len() {
        return Err(DecodeError::LengthExceedsInput {
            field: "header suffix",
            len: suffix_len,
            remaining: reader.remaining_len(),
        });
    }
    reader.read_bytes(suffix_len, "header suffix")?;

    let mut state = DecodeState {
        input,
        options,
        tracked: FxHashMap::default(),
    };
    state.decode_node(&mut reader, 0)
}

struct DecodeState<'a> {
    input: &'a [u8],
    options: DecoderOptions,
    /// Nodes produced at tag offsets carrying the track flag; REFP and
    /// ALIAS resolve against this.
    tracked: FxHashMap<u64, Node>,
}

impl DecodeState<'_> {
    fn decode_node(&mut self, reader: &mut Reader<'_>, depth: usize) -> Result<Node, DecodeError> {
        if depth > MAX_DEPTH {
            return Err(DecodeError::DepthExceeded { max: MAX_DEPTH });
        }

        let offset = reader.position();
        let raw = reader.read_byte("tag")?;
        let is_tracked = raw & TRACK_FLAG != 0;
        let tag = raw & TAG_MASK;

        let out = match tag {
            t if t <= TAG_POS_15 => node(Value::Integer(t as i64)),
            t if (TAG_NEG_16..=0x1F).contains(&t) => node(Value::Integer(t as i64 - 32)),
            t if t >= TAG_SHORT_BINARY_0 => {
                let len = (t & SHORT_BINARY_LEN_MASK) as usize;
                let bytes = reader.read_bytes(len, "short binary")?;
                node(Value::Bytes(bytes.to_vec()))
            }
            TAG_VARINT => {
                let raw_value = reader.read_varint("varint")?;
                let value = i64::try_from(raw_value)
                    .map_err(|_| DecodeError::IntegerOutOfRange { value: raw_value })?;
                node(Value::Integer(value))
            }
            TAG_ZIGZAG => node(Value::Integer(reader.read_zigzag("zigzag")?)),
            TAG_FLOAT => node(Value::Float(reader.read_f32("float")?)),
            TAG_DOUBLE => node(Value::Double(reader.read_f64("double")?)),
            TAG_UNDEF => node(Value::Undef),
            TAG_TRUE => node(Value::Bool(true)),
            TAG_FALSE => node(Value::Bool(false)),
            TAG_BINARY => {
                let bytes = reader.read_bytes_prefixed("binary")?;
                node(Value::Bytes(bytes.to_vec()))
            }
            TAG_STR_UTF8 => {
                let text = reader.read_str_prefixed("utf8 string")?;
                node(Value::Text(text.to_string()))
            }
            TAG_ARRAY => {
                let out = node(Value::Array(Vec::new()));
                if is_tracked {
                    self.register(offset, &out);
                }
                self.fill_array(reader, depth, &out)?;
                out
            }
            TAG_HASH => {
                let out = node(Value::Hash(Vec::new()));
                if is_tracked {
                    self.register(offset, &out);
                }
                self.fill_hash(reader, depth, &out)?;
                out
            }
            TAG_REFN => self.decode_refn(reader, depth, is_tracked, offset)?,
            TAG_REFP => {
                let target = reader.read_varint("REFP offset")?;
                if target == offset {
                    // a reference whose referent is itself, the tightest cycle
                    let out = node(Value::Undef);
                    *out.borrow_mut() = Value::Ref(out.clone());
                    out
                } else {
                    node(Value::Ref(self.lookup(target)?))
                }
            }
            TAG_ALIAS => {
                // an alias is the very node it points at
                let target = reader.read_varint("ALIAS offset")?;
                self.lookup(target)?
            }
            TAG_COPY => {
                let target = reader.read_varint("COPY offset")?;
                if target as usize >= self.input.len() {
                    return Err(DecodeError::OffsetOutOfRange { offset: target });
                }
                let mut replay = Reader::at(self.input, target as usize);
                self.decode_node(&mut replay, depth + 1)?
            }
            TAG_WEAKEN => {
                let inner = self.decode_node(reader, depth + 1)?;
                let target = match &*inner.borrow() {
                    Value::Ref(target) => target.clone(),
                    _ => inner.clone(),
                };
                // the weak edge does not keep its referent alive; a referent
                // with no other strong path decodes to a dangling weak
                node(Value::Weak(std::rc::Rc::downgrade(&target)))
            }
            TAG_REGEXP => {
                let pattern_bytes = self.decode_payload(reader, depth, "regex pattern")?;
                let pattern = String::from_utf8(pattern_bytes)
                    .map_err(|_| DecodeError::InvalidUtf8 { field: "regex pattern" })?;
                let letters = self.decode_payload(reader, depth, "regex flags")?;
                let letters = std::str::from_utf8(&letters)
                    .map_err(|_| DecodeError::InvalidUtf8 { field: "regex flags" })?;
                node(Value::Regex {
                    pattern,
                    flags: RegexFlags::from_letters(letters),
                })
            }
            TAG_OBJECT => {
                let name_bytes = self.decode_payload(reader, depth, "class name")?;
                let class = String::from_utf8(name_bytes)
                    .map_err(|_| DecodeError::InvalidUtf8 { field: "class name" })?;
                let data = self.decode_node(reader, depth + 1)?;
                node(Value::Object { class, data })
            }
            TAG_OBJECTV => {
                let target = reader.read_varint("OBJECTV offset")?;
                if target as usize >= self.input.len() {
                    return Err(DecodeError::OffsetOutOfRange { offset: target });
                }
                let mut replay = Reader::at(self.input, target as usize);
                let name_bytes = self.decode_payload(&mut replay, depth, "class name")?;
                let class = String::from_utf8(name_bytes)
                    .map_err(|_| DecodeError::InvalidUtf8 { field: "class name" })?;
                let data = self.decode_node(reader, depth + 1)?;
                node(Value::Object { class, data })
            }
            _ => return Err(DecodeError::UnknownTag { tag: raw, offset }),
        };

        if is_tracked {
            self.register(offset, &out);
        }
        Ok(out)
    }

    /// Decodes a REFN and its referent. In default mode a directly
    /// following ARRAY/HASH is the encoder's implicit wrapper, and the
    /// container node stands in for the reference; the container is
    /// registered at both tag offsets before it is filled, since either
    /// offset can be a back-reference target.
    fn decode_refn(
        &mut self,
        reader: &mut Reader<'_>,
        depth: usize,
        is_tracked: bool,
        offset: u64,
    ) -> Result<Node, DecodeError> {
        let next = self
            .input
            .get(reader.position() as usize)
            .copied()
            .map(|b| b & TAG_MASK);

        if !self.options.unwrapped_references
            && matches!(next, Some(TAG_ARRAY) | Some(TAG_HASH))
        {
            let inner_offset = reader.position();
            let inner_raw = reader.read_byte("tag")?;
            let inner_tracked = inner_raw & TRACK_FLAG != 0;

            let is_array = inner_raw & TAG_MASK == TAG_ARRAY;
            let out = if is_array {
                node(Value::Array(Vec::new()))
            } else {
                node(Value::Hash(Vec::new()))
            };
            if is_tracked {
                self.register(offset, &out);
            }
            if inner_tracked {
                self.register(inner_offset, &out);
            }
            if is_array {
                self.fill_array(reader, depth, &out)?;
            } else {
                self.fill_hash(reader, depth, &out)?;
            }
            return Ok(out);
        }

        let inner = self.decode_node(reader, depth + 1)?;
        Ok(node(Value::Ref(inner)))
    }

    fn fill_array(
        &mut self,
        reader: &mut Reader<'_>,
        depth: usize,
        out: &Node,
    ) -> Result<(), DecodeError> {
        let count = reader.read_varint("array count")? as usize;
        // every element takes at least one byte
        if count > reader.remaining_len() {
            return Err(DecodeError::LengthExceedsInput {
                field: "array count",
                len: count,
                remaining: reader.remaining_len(),
            });
        }
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(self.decode_node(reader, depth + 1)?);
        }
        *out.borrow_mut() = Value::Array(items);
        Ok(())
    }

    fn fill_hash(
        &mut self,
        reader: &mut Reader<'_>,
        depth: usize,
        out: &Node,
    ) -> Result<(), DecodeError> {
        let count = reader.read_varint("hash pair count")? as usize;
        if count > reader.remaining_len() {
            return Err(DecodeError::LengthExceedsInput {
                field: "hash pair count",
                len: count,
                remaining: reader.remaining_len(),
            });
        }
        let mut pairs = Vec::with_capacity(count);
        for _ in 0..count {
            let key_bytes = self.decode_payload(reader, depth, "hash key")?;
            let key = String::from_utf8(key_bytes)
                .map_err(|_| DecodeError::InvalidUtf8 { field: "hash key" })?;
            let value = self.decode_node(reader, depth + 1)?;
            pairs.push((key, value));
        }
        *out.borrow_mut() = Value::Hash(pairs);
        Ok(())
    }

    /// Reads a scalar payload in place: a short/long byte payload, a UTF-8
    /// string, or a COPY back-reference to one of those.
    fn decode_payload(
        &mut self,
        reader: &mut Reader<'_>,
        depth: usize,
        field: &'static str,
    ) -> Result<Vec<u8>, DecodeError> {
        if depth > MAX_DEPTH {
            return Err(DecodeError::DepthExceeded { max: MAX_DEPTH });
        }

        let offset = reader.position();
        let raw = reader.read_byte(field)?;
        let tag = raw & TAG_MASK;

        match tag {
            t if t >= TAG_SHORT_BINARY_0 => {
                let len = (t & SHORT_BINARY_LEN_MASK) as usize;
                Ok(reader.read_bytes(len, field)?.to_vec())
            }
            TAG_BINARY | TAG_STR_UTF8 => Ok(reader.read_bytes_prefixed(field)?.to_vec()),
            TAG_COPY => {
                let target = reader.read_varint(field)?;
                if target as usize >= self.input.len() {
                    return Err(DecodeError::OffsetOutOfRange { offset: target });
                }
                let mut replay = Reader::at(self.input, target as usize);
                self.decode_payload(&mut replay, depth + 1, field)
            }
            _ => Err(DecodeError::UnknownTag { tag: raw, offset }),
        }
    }

    fn register(&mut self, offset: u64, out: &Node) {
        self.tracked.entry(offset).or_insert_with(|| out.clone());
    }

    fn lookup(&self, offset: u64) -> Result<Node, DecodeError> {
        if offset as usize >= self.input.len() {
            return Err(DecodeError::OffsetOutOfRange { offset });
        }
        self.tracked
            .get(&offset)
            .cloned()
            .ok_or(DecodeError::DanglingBackref { offset })
    }
}
