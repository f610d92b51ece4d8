//! Value types for Sereal object graphs.
//!
//! A graph is built out of [`Node`]s: reference-counted, interior-mutable
//! cells holding one [`Value`] each. Node identity (the `Rc` allocation) is
//! what the encoder tracks for pointer back-references, and the `RefCell` is
//! what makes cyclic graphs constructible before encoding.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// A shared graph node. Two clones of the same `Node` are the same value
/// identity on the wire.
pub type Node = Rc<RefCell<Value>>;

/// A non-owning handle to a graph node.
pub type WeakNode = Weak<RefCell<Value>>;

/// Wraps a value in a fresh graph node.
pub fn node(value: Value) -> Node {
    Rc::new(RefCell::new(value))
}

/// Pattern flags recognized by the REGEXP encoding.
///
/// Each set flag maps to one letter in fixed order: multiline to `m`,
/// dot-all to `s`, case-insensitive to `i`, extended to `x`. Flags outside
/// this set have no representation and are dropped at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegexFlags {
    pub multiline: bool,
    pub dot_all: bool,
    pub case_insensitive: bool,
    pub extended: bool,
}

impl RegexFlags {
    /// Parses a flag string, silently dropping unrecognized letters.
    pub fn from_letters(letters: &str) -> RegexFlags {
        let mut flags = RegexFlags::default();
        for ch in letters.chars() {
            match ch {
                'm' => flags.multiline = true,
                's' => flags.dot_all = true,
                'i' => flags.case_insensitive = true,
                'x' => flags.extended = true,
                _ => {}
            }
        }
        flags
    }

    /// Returns the wire letters and their count, in fixed `msix` order.
    pub(crate) fn letter_bytes(&self) -> ([u8; 4], usize) {
        let mut letters = [0u8; 4];
        let mut len = 0;
        if self.multiline {
            letters[len] = b'm';
            len += 1;
        }
        if self.dot_all {
            letters[len] = b's';
            len += 1;
        }
        if self.case_insensitive {
            letters[len] = b'i';
            len += 1;
        }
        if self.extended {
            letters[len] = b'x';
            len += 1;
        }
        (letters, len)
    }
}

/// A value in a Sereal object graph.
///
/// This is the closed set the encoder dispatches over; anything an
/// application wants serialized has to be expressed in these terms first.
#[derive(Debug, Clone)]
pub enum Value {
    /// The null/empty sentinel.
    Undef,

    /// Boolean, a single TRUE/FALSE tag on the wire.
    Bool(bool),

    /// Signed 64-bit integer. Small magnitudes pack into the tag byte;
    /// larger ones use VARINT or ZIGZAG.
    Integer(i64),

    /// Single-precision IEEE 754 float, 4 raw little-endian bytes.
    Float(f32),

    /// Double-precision IEEE 754 float, 8 raw little-endian bytes.
    Double(f64),

    /// Raw byte payload (latin1 in the source semantics). Short payloads
    /// use the packed SHORT_BINARY form.
    Bytes(Vec<u8>),

    /// UTF-8 text payload. Always length-prefixed STR_UTF8, no short form.
    Text(String),

    /// Ordered sequence of nodes.
    Array(Vec<Node>),

    /// Mapping with text keys, in insertion order. Pair order is preserved
    /// on the wire, never sorted.
    Hash(Vec<(String, Node)>),

    /// Pattern value: pattern source text plus recognized flags.
    Regex { pattern: String, flags: RegexFlags },

    /// Owning pointer to a shared value. Repeat occurrences of the same
    /// referent become REFP back-references.
    Ref(Node),

    /// Non-owning pointer, a WEAKEN marker ahead of the reference on the
    /// wire. A dangling weak node is the one unencodable value.
    Weak(WeakNode),

    /// Value marked for alias sharing, distinct from pointer identity.
    /// Transparent when alias semantics are disabled.
    Alias(Node),

    /// Value carrying a class name. Repeated class names dedup to OBJECTV.
    Object { class: String, data: Node },
}

impl Value {
    /// Short name of this value's dispatch kind, for errors and tracing.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Undef => "undef",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bytes(_) => "bytes",
            Value::Text(_) => "text",
            Value::Array(_) => "array",
            Value::Hash(_) => "hash",
            Value::Regex { .. } => "regex",
            Value::Ref(_) => "ref",
            Value::Weak(_) => "weak ref",
            Value::Alias(_) => "alias",
            Value::Object { .. } => "object",
        }
    }

    /// Wraps this value in a fresh graph node.
    pub fn into_node(self) -> Node {
        node(self)
    }

    /// Builds an array value from anything yielding nodes.
    pub fn array(items: impl IntoIterator<Item = Node>) -> Value {
        Value::Array(items.into_iter().collect())
    }

    /// Builds a hash value from key/node pairs, keeping iteration order.
    pub fn hash(pairs: impl IntoIterator<Item = (String, Node)>) -> Value {
        Value::Hash(pairs.into_iter().collect())
    }
}

// Structural equality. `std::rc::Weak` has no PartialEq, so this cannot be
// derived; weak nodes compare by referent identity. Comparing a cyclic graph
// with itself does not terminate, the same as any derived recursive eq.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undef, Value::Undef) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Hash(a), Value::Hash(b)) => a == b,
            (
                Value::Regex { pattern: pa, flags: fa },
                Value::Regex { pattern: pb, flags: fb },
            ) => pa == pb && fa == fb,
            (Value::Ref(a), Value::Ref(b)) => a == b,
            (Value::Weak(a), Value::Weak(b)) => a.ptr_eq(b),
            (Value::Alias(a), Value::Alias(b)) => a == b,
            (
                Value::Object { class: ca, data: da },
                Value::Object { class: cb, data: db },
            ) => ca == cb && da == db,
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Value {
        Value::Integer(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Value {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::Text(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Value {
        Value::Bytes(v.to_vec())
    }
}
