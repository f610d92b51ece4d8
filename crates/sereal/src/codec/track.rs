//! Offset trackers backing the encoder's back-references.
//!
//! Three kinds of bookkeeping, all mapping "something already written" to
//! the stream offset where its encoding began: value identity (REFP/ALIAS),
//! payload equality (COPY), and class names (OBJECTV). All state is scoped
//! to one document and cleared together on encoder reset.

use rustc_hash::FxHashMap;

use crate::model::Node;
use std::rc::Rc;

/// Returns the identity token of a node: its allocation address.
///
/// Stable for the node's lifetime and never derived from the value's
/// contents, so equal-but-distinct values cannot collide.
pub fn identity(node: &Node) -> usize {
    Rc::as_ptr(node) as *const () as usize
}

/// Maps value identity to the offset where that value's encoding began.
#[derive(Debug, Default)]
pub struct IdentityTracker {
    offsets: FxHashMap<usize, u64>,
}

impl IdentityTracker {
    /// Looks up the offset recorded for an identity token.
    pub fn get(&self, id: usize) -> Option<u64> {
        self.offsets.get(&id).copied()
    }

    /// Records an offset for an identity token. First writer wins.
    pub fn put(&mut self, id: usize, offset: u64) {
        self.offsets.entry(id).or_insert(offset);
    }

    /// Records an offset, replacing any earlier one. Used for tentative
    /// alias positions, which follow the latest plain occurrence.
    pub fn put_latest(&mut self, id: usize, offset: u64) {
        self.offsets.insert(id, offset);
    }

    pub fn clear(&mut self) {
        self.offsets.clear();
    }
}

/// Maps exact scalar payloads to the offset of their first emission.
///
/// Two independent equality domains: raw bytes and text. A hit means the
/// payload is not re-emitted; a COPY back-reference replays the earlier
/// tag and payload verbatim.
#[derive(Debug, Default)]
pub struct CopyTracker {
    bytes: FxHashMap<Vec<u8>, u64>,
    text: FxHashMap<String, u64>,
}

impl CopyTracker {
    pub fn get_bytes(&self, payload: &[u8]) -> Option<u64> {
        self.bytes.get(payload).copied()
    }

    pub fn put_bytes(&mut self, payload: &[u8], offset: u64) {
        self.bytes.entry(payload.to_vec()).or_insert(offset);
    }

    pub fn get_text(&self, payload: &str) -> Option<u64> {
        self.text.get(payload).copied()
    }

    pub fn put_text(&mut self, payload: &str, offset: u64) {
        self.text.entry(payload.to_string()).or_insert(offset);
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
        self.text.clear();
    }
}

/// Maps class names to the offset of their first emission under OBJECT.
#[derive(Debug, Default)]
pub struct ClassNameTable {
    offsets: FxHashMap<String, u64>,
}

impl ClassNameTable {
    pub fn get(&self, name: &str) -> Option<u64> {
        self.offsets.get(name).copied()
    }

    pub fn put(&mut self, name: &str, offset: u64) {
        self.offsets.entry(name.to_string()).or_insert(offset);
    }

    pub fn clear(&mut self) {
        self.offsets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{node, Value};

    #[test]
    fn test_identity_distinguishes_equal_values() {
        let a = node(Value::Integer(1));
        let b = node(Value::Integer(1));
        assert_ne!(identity(&a), identity(&b));
        assert_eq!(identity(&a), identity(&a.clone()));
    }

    #[test]
    fn test_identity_tracker_first_writer_wins() {
        let mut tracker = IdentityTracker::default();
        tracker.put(42, 10);
        tracker.put(42, 99);
        assert_eq!(tracker.get(42), Some(10));
        assert_eq!(tracker.get(7), None);
    }

    #[test]
    fn test_identity_tracker_put_latest_overwrites() {
        let mut tracker = IdentityTracker::default();
        tracker.put_latest(42, 10);
        tracker.put_latest(42, 99);
        assert_eq!(tracker.get(42), Some(99));
    }

    #[test]
    fn test_copy_tracker_domains_are_independent() {
        let mut tracker = CopyTracker::default();
        tracker.put_bytes(b"hi", 6);
        assert_eq!(tracker.get_bytes(b"hi"), Some(6));
        assert_eq!(tracker.get_text("hi"), None);
    }

    #[test]
    fn test_clear() {
        let mut tracker = IdentityTracker::default();
        tracker.put(1, 1);
        tracker.clear();
        assert_eq!(tracker.get(1), None);
    }
}
