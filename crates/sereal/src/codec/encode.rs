//! Graph encoding for the Sereal binary format.
//!
//! One forward pass over the value graph, depth-first. Back-references
//! (REFP for pointer identity, COPY for payload equality, ALIAS for value
//! sharing, OBJECTV for class names) are produced by consulting the offset
//! trackers before any bytes are emitted; the only retroactive write is the
//! track flag on a tag byte that becomes a back-reference target. Cycles
//! resolve in the same pass because a container's identity is registered
//! before its children are encoded.

use log::trace;

use crate::codec::primitives::Writer;
use crate::codec::track::{identity, ClassNameTable, CopyTracker, IdentityTracker};
use crate::error::EncodeError;
use crate::model::{Node, Value};
use crate::protocol::{
    MAGIC, SHORT_BINARY_MAX_LEN, TAG_ALIAS, TAG_ARRAY, TAG_BINARY, TAG_COPY, TAG_DOUBLE,
    TAG_FALSE, TAG_FLOAT, TAG_HASH, TAG_OBJECT, TAG_OBJECTV, TAG_REFN, TAG_REFP, TAG_REGEXP,
    TAG_SHORT_BINARY_0, TAG_STR_UTF8, TAG_TRUE, TAG_UNDEF, TAG_VARINT, TAG_WEAKEN, TAG_ZIGZAG,
    VERSION_RAW,
};

/// Options for encoding documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncoderOptions {
    /// Emit container values without the implicit REFN wrapper.
    ///
    /// In this mode pointer sharing is driven entirely by explicit
    /// [`Value::Ref`] wrappers, the way a language with first-class
    /// references hands values to the encoder. In the default mode every
    /// array and hash is wrapped in REFN and identity-deduped on sight.
    pub unwrapped_references: bool,

    /// Enable ALIAS back-references for values wrapped in [`Value::Alias`].
    ///
    /// When disabled the wrapper is transparent and the inner value is
    /// encoded with no alias bookkeeping.
    pub aliases: bool,

    /// Log every dispatch decision via `log::trace!`. Diagnostic only; has
    /// no effect on the wire format.
    pub trace: bool,
}

impl EncoderOptions {
    /// Creates default options: implicit reference wrapping, no aliases.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Encodes a value graph into a Sereal v1 document with default options.
pub fn encode(value: &Node) -> Result<Vec<u8>, EncodeError> {
    Encoder::new(EncoderOptions::default()).write(value)
}

/// Single-pass encoder for Sereal v1 documents.
///
/// An encoder instance is long-lived: its output buffer and tracker tables
/// keep their allocations across documents. All tracker state is scoped to
/// one [`Encoder::write`] call; call [`Encoder::reset`] before reusing the
/// instance. A failed `write` leaves the buffer offset-inconsistent, and
/// only `reset` makes the encoder usable again.
#[derive(Debug)]
pub struct Encoder {
    options: EncoderOptions,
    out: Writer,
    tracked: IdentityTracker,
    copies: CopyTracker,
    classnames: ClassNameTable,
    aliases: IdentityTracker,
    maybe_aliases: IdentityTracker,
}

impl Encoder {
    /// Creates an encoder with the given options.
    pub fn new(options: EncoderOptions) -> Self {
        Self {
            options,
            out: Writer::with_capacity(1024),
            tracked: IdentityTracker::default(),
            copies: CopyTracker::default(),
            classnames: ClassNameTable::default(),
            aliases: IdentityTracker::default(),
            maybe_aliases: IdentityTracker::default(),
        }
    }

    /// Encodes one value graph and returns the finished document.
    ///
    /// Emits the fixed header, then the body depth-first. The internal
    /// buffer holds the document until the next [`Encoder::reset`]; writing
    /// a second document without resetting appends to the first.
    pub fn write(&mut self, value: &Node) -> Result<Vec<u8>, EncodeError> {
        self.out.write_bytes(&MAGIC);
        self.out.write_byte(VERSION_RAW);
        // no header suffix
        self.out.write_byte(0x00);

        self.encode_node(value)?;
        Ok(self.out.as_bytes().to_vec())
    }

    /// Discards all tracker state and the buffered document, keeping
    /// allocated capacity. Must complete before the next `write`.
    pub fn reset(&mut self) {
        self.out.clear();
        self.tracked.clear();
        self.copies.clear();
        self.classnames.clear();
        self.aliases.clear();
        self.maybe_aliases.clear();
    }

    fn encode_node(&mut self, value: &Node) -> Result<(), EncodeError> {
        self.encode_inner(value, true)
    }

    /// Dispatches one node. `implicit_wrap` is cleared when the caller (an
    /// owning-reference wrapper) has already emitted REFN and registered
    /// this node's identity, so a container must not wrap itself again.
    fn encode_inner(&mut self, value: &Node, implicit_wrap: bool) -> Result<(), EncodeError> {
        let location = self.out.position();

        if self.options.aliases {
            let id = identity(value);
            if let Some(offset) = self.aliases.get(id) {
                if self.options.trace {
                    trace!("alias hit at offset {offset}, emitting ALIAS");
                }
                self.emit_alias(offset);
                return Ok(());
            }
            // a later Alias wrapper can promote this occurrence
            self.maybe_aliases.put_latest(id, location);
        }

        let kind;
        {
            let borrowed = value.borrow();
            kind = borrowed.kind();
            if self.options.trace {
                trace!("dispatch {kind} at offset {location}");
            }

            match &*borrowed {
                Value::Undef => self.out.write_byte(TAG_UNDEF),
                Value::Bool(true) => self.out.write_byte(TAG_TRUE),
                Value::Bool(false) => self.out.write_byte(TAG_FALSE),
                Value::Integer(n) => self.emit_integer(*n),
                Value::Double(d) => {
                    self.out.write_byte(TAG_DOUBLE);
                    self.out.write_bytes(&d.to_le_bytes());
                }
                Value::Float(f) => {
                    self.out.write_byte(TAG_FLOAT);
                    self.out.write_bytes(&f.to_le_bytes());
                }
                Value::Bytes(payload) => self.emit_bytes_payload(payload)?,
                Value::Text(payload) => self.emit_text_payload(payload),
                Value::Array(items) => {
                    if implicit_wrap && !self.options.unwrapped_references {
                        if let Some(offset) = self.tracked.get(identity(value)) {
                            self.emit_refp(offset);
                            return Ok(());
                        }
                        self.out.write_byte(TAG_REFN);
                        self.tracked.put(identity(value), self.out.position());
                    }
                    self.out.write_byte(TAG_ARRAY);
                    self.out.write_varint(items.len() as u64);
                    for item in items {
                        self.encode_node(item)?;
                    }
                }
                Value::Hash(pairs) => {
                    if implicit_wrap && !self.options.unwrapped_references {
                        if let Some(offset) = self.tracked.get(identity(value)) {
                            self.emit_refp(offset);
                            return Ok(());
                        }
                        self.out.write_byte(TAG_REFN);
                        self.tracked.put(identity(value), self.out.position());
                    }
                    self.out.write_byte(TAG_HASH);
                    self.out.write_varint(pairs.len() as u64);
                    for (key, val) in pairs {
                        // keys are coerced to text; order is never changed
                        self.emit_text_payload(key);
                        self.encode_node(val)?;
                    }
                }
                Value::Regex { pattern, flags } => {
                    self.out.write_byte(TAG_REGEXP);
                    self.emit_bytes_payload(pattern.as_bytes())?;
                    let (letters, len) = flags.letter_bytes();
                    self.out.write_byte(TAG_SHORT_BINARY_0 | len as u8);
                    self.out.write_bytes(&letters[..len]);
                }
                Value::Ref(target) => self.emit_ref(target)?,
                Value::Weak(weak) => {
                    if let Some(target) = weak.upgrade() {
                        self.out.write_byte(TAG_WEAKEN);
                        self.emit_ref(&target)?;
                    }
                    // a dangling weak writes nothing; the check below fails it
                }
                Value::Alias(target) => {
                    if identity(target) == identity(value) {
                        // an alias of itself shares no underlying value
                        return Err(EncodeError::UnsupportedValue {
                            kind: "self-referential alias",
                        });
                    }
                    if self.options.aliases {
                        let id = identity(target);
                        if let Some(offset) = self.aliases.get(id) {
                            self.emit_alias(offset);
                        } else if let Some(offset) = self.maybe_aliases.get(id) {
                            // promote the tentative occurrence to a confirmed alias
                            self.emit_alias(offset);
                            self.aliases.put(id, offset);
                        } else {
                            self.encode_node(target)?;
                            self.aliases.put(id, location);
                        }
                    } else {
                        self.encode_node(target)?;
                    }
                }
                Value::Object { class, data } => {
                    if let Some(offset) = self.classnames.get(class) {
                        if self.options.trace {
                            trace!("class {class:?} already emitted, emitting OBJECTV");
                        }
                        self.out.write_byte(TAG_OBJECTV);
                        self.out.write_varint(offset);
                    } else {
                        self.out.write_byte(TAG_OBJECT);
                        self.classnames.put(class, self.out.position());
                        self.emit_text_payload(class);
                    }
                    self.encode_node(data)?;
                }
            }
        }

        if self.out.position() == location {
            // no dispatch rule produced bytes for this value
            return Err(EncodeError::UnsupportedValue { kind });
        }
        Ok(())
    }

    /// Emits an owning reference: REFP if the referent is already
    /// registered, otherwise REFN with the referent registered at the
    /// offset of its own encoding, before recursing. Registering first is
    /// what makes true cycles resolvable in one pass.
    fn emit_ref(&mut self, target: &Node) -> Result<(), EncodeError> {
        let id = identity(target);
        if let Some(offset) = self.tracked.get(id) {
            self.emit_refp(offset);
            return Ok(());
        }
        self.out.write_byte(TAG_REFN);
        self.tracked.put(id, self.out.position());
        // identity is already registered, so the referent must not wrap
        // itself in a second REFN or point a REFP at its own offset
        self.encode_inner(target, false)
    }

    fn emit_refp(&mut self, offset: u64) {
        if self.options.trace {
            trace!("emitting REFP for offset {offset}");
        }
        // tag before mark: a reference to itself targets this very byte
        self.out.write_byte(TAG_REFP);
        self.out.mark_tracked(offset);
        self.out.write_varint(offset);
    }

    fn emit_alias(&mut self, offset: u64) {
        self.out.write_byte(TAG_ALIAS);
        self.out.mark_tracked(offset);
        self.out.write_varint(offset);
    }

    fn emit_copy(&mut self, offset: u64) {
        if self.options.trace {
            trace!("emitting COPY for offset {offset}");
        }
        self.out.write_byte(TAG_COPY);
        self.out.write_varint(offset);
    }

    fn emit_integer(&mut self, n: i64) {
        if n < 0 {
            if n > -17 {
                // -16..=-1 pack into the tag byte as value + 32
                self.out.write_byte((n + 32) as u8);
            } else {
                self.out.write_byte(TAG_ZIGZAG);
                self.out.write_zigzag(n);
            }
        } else if n < 16 {
            self.out.write_byte(n as u8);
        } else {
            self.out.write_byte(TAG_VARINT);
            self.out.write_varint(n as u64);
        }
    }

    /// Emits a raw byte payload: COPY on a dedup hit, SHORT_BINARY below
    /// 32 bytes, BINARY with a length prefix otherwise.
    fn emit_bytes_payload(&mut self, payload: &[u8]) -> Result<(), EncodeError> {
        if let Some(offset) = self.copies.get_bytes(payload) {
            self.emit_copy(offset);
            return Ok(());
        }
        let location = self.out.position();
        if payload.len() <= SHORT_BINARY_MAX_LEN {
            self.emit_short_binary(payload)?;
        } else {
            self.out.write_byte(TAG_BINARY);
            self.out.write_varint(payload.len() as u64);
            self.out.write_bytes(payload);
        }
        self.copies.put_bytes(payload, location);
        Ok(())
    }

    /// Emits a byte payload in the short form, length packed into the tag.
    fn emit_short_binary(&mut self, payload: &[u8]) -> Result<(), EncodeError> {
        if payload.len() > SHORT_BINARY_MAX_LEN {
            return Err(EncodeError::OversizeShortPayload {
                len: payload.len(),
                max: SHORT_BINARY_MAX_LEN,
            });
        }
        self.out.write_byte(TAG_SHORT_BINARY_0 | payload.len() as u8);
        self.out.write_bytes(payload);
        Ok(())
    }

    /// Emits a text payload: COPY on a dedup hit, otherwise STR_UTF8 with a
    /// byte-length prefix. Text has no short form.
    fn emit_text_payload(&mut self, payload: &str) {
        if let Some(offset) = self.copies.get_text(payload) {
            self.emit_copy(offset);
            return;
        }
        let location = self.out.position();
        self.out.write_byte(TAG_STR_UTF8);
        self.out.write_varint(payload.len() as u64);
        self.out.write_bytes(payload.as_bytes());
        self.copies.put_text(payload, location);
    }
}
