//! Indirect object bookkeeping
//!
//! Numbers are handed out in allocation order and never reused. Each
//! object's byte offset is recorded when its bytes start, and the whole
//! table is read once when the cross-reference section is written.

use std::collections::HashMap;
use std::fmt;

use scene::ObjectId;

/// Number of an indirect object. Displays as a reference, `7 0 R`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectNumber(pub u32);

impl fmt::Display for ObjectNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} 0 R", self.0)
    }
}

/// One row of the cross-reference table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndirectObject {
    pub number: u32,
    pub byte_offset: u64,
    pub generation: u16,
    pub in_use: bool,
}

/// Source identity of something serialized once per file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceKey {
    Image(ObjectId),
    Shading(ObjectId),
}

/// Allocates object numbers and remembers where each object was written
#[derive(Debug)]
pub struct ObjectLedger {
    objects: Vec<IndirectObject>,
    sources: HashMap<SourceKey, ObjectNumber>,
}

impl Default for ObjectLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectLedger {
    /// Ledger holding only the free-list head, object 0
    pub fn new() -> Self {
        Self {
            objects: vec![IndirectObject {
                number: 0,
                byte_offset: 0,
                generation: 65535,
                in_use: false,
            }],
            sources: HashMap::new(),
        }
    }

    pub fn allocate(&mut self) -> ObjectNumber {
        let number = self.objects.len() as u32;
        self.objects.push(IndirectObject {
            number,
            byte_offset: 0,
            generation: 0,
            in_use: true,
        });
        ObjectNumber(number)
    }

    /// Record where `number` starts. Offset 0 is the file header, so no
    /// real object can start there.
    pub fn record_offset(&mut self, number: ObjectNumber, offset: u64) {
        if let Some(obj) = self.objects.get_mut(number.0 as usize) {
            obj.byte_offset = offset;
        }
    }

    pub fn find_by_source(&self, key: &SourceKey) -> Option<ObjectNumber> {
        self.sources.get(key).copied()
    }

    pub fn remember(&mut self, key: SourceKey, number: ObjectNumber) {
        self.sources.insert(key, number);
    }

    /// Table size including the free-list head (the trailer's `/Size`)
    pub fn size(&self) -> usize {
        self.objects.len()
    }

    pub fn objects(&self) -> &[IndirectObject] {
        &self.objects
    }

    /// Allocated objects that were never written
    pub fn unrecorded(&self) -> Vec<ObjectNumber> {
        self.objects
            .iter()
            .filter(|obj| obj.in_use && obj.byte_offset == 0)
            .map(|obj| ObjectNumber(obj.number))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_is_monotonic() {
        let mut ledger = ObjectLedger::new();
        assert_eq!(ledger.allocate(), ObjectNumber(1));
        assert_eq!(ledger.allocate(), ObjectNumber(2));
        assert_eq!(ledger.size(), 3);
        assert_eq!(ledger.objects()[0].generation, 65535);
        assert!(!ledger.objects()[0].in_use);
    }

    #[test]
    fn test_unrecorded_objects() {
        let mut ledger = ObjectLedger::new();
        let a = ledger.allocate();
        let b = ledger.allocate();
        ledger.record_offset(a, 15);
        assert_eq!(ledger.unrecorded(), vec![b]);
        ledger.record_offset(b, 90);
        assert!(ledger.unrecorded().is_empty());
    }

    #[test]
    fn test_source_cache() {
        let mut ledger = ObjectLedger::new();
        let n = ledger.allocate();
        let key = SourceKey::Image(42);
        assert_eq!(ledger.find_by_source(&key), None);
        ledger.remember(key.clone(), n);
        assert_eq!(ledger.find_by_source(&key), Some(n));
        assert_eq!(ledger.find_by_source(&SourceKey::Shading(42)), None);
    }

    #[test]
    fn test_reference_display() {
        assert_eq!(ObjectNumber(12).to_string(), "12 0 R");
    }
}
